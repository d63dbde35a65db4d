//! Map grammers/tl types to domain entities, and RPC errors to the domain
//! taxonomy.

use crate::domain::{DomainError, EntityKind, MediaKind, Message, TextEntity};
use grammers_client::tl;

/// Marker for Bot-API-style channel ids (`-100xxxxxxxxxx`).
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// Classify an RPC error by code/name. Pure so the table is testable
/// without constructing SDK types.
pub fn classify_rpc_parts(code: u32, name: &str, value: Option<u32>) -> DomainError {
    if code == 420 {
        return DomainError::FloodWait {
            seconds: u64::from(value.unwrap_or(60)),
        };
    }
    match name {
        "CHAT_FORWARDS_RESTRICTED" | "CHAT_SEND_MEDIA_FORBIDDEN" => {
            DomainError::ForwardsRestricted
        }
        "CHANNEL_PRIVATE" | "CHAT_ADMIN_REQUIRED" | "CHAT_WRITE_FORBIDDEN"
        | "USER_BANNED_IN_CHANNEL" => DomainError::NotAccessible(name.to_string()),
        "USERNAME_INVALID" | "USERNAME_NOT_OCCUPIED" | "INVITE_HASH_INVALID"
        | "INVITE_HASH_EXPIRED" | "PEER_ID_INVALID" => {
            DomainError::InvalidIdentifier(name.to_string())
        }
        "AUTH_KEY_UNREGISTERED" | "AUTH_KEY_INVALID" | "SESSION_REVOKED" | "SESSION_EXPIRED"
        | "USER_DEACTIVATED" => DomainError::Auth(name.to_string()),
        _ => DomainError::Api {
            code: code as i32,
            message: name.to_string(),
        },
    }
}

pub fn classify_invocation(err: grammers_client::InvocationError) -> DomainError {
    match err {
        grammers_client::InvocationError::Rpc(rpc) => {
            classify_rpc_parts(rpc.code as u32, &rpc.name, rpc.value)
        }
        other => {
            let text = other.to_string();
            // A rejected msg_id means the local clock disagrees with the
            // server; retrying cannot help.
            if text.contains("msg_id") {
                DomainError::TimeSync
            } else {
                DomainError::Network(text)
            }
        }
    }
}

/// Bot-API dialog id for a raw chat object (invite previews and GetChats
/// responses carry these rather than peers).
pub fn bot_api_chat_id(chat: &tl::enums::Chat) -> i64 {
    match chat {
        tl::enums::Chat::Empty(c) => -c.id,
        tl::enums::Chat::Chat(c) => -c.id,
        tl::enums::Chat::Forbidden(c) => -c.id,
        tl::enums::Chat::Channel(c) => -(CHANNEL_ID_OFFSET + c.id),
        tl::enums::Chat::ChannelForbidden(c) => -(CHANNEL_ID_OFFSET + c.id),
    }
}

/// Map a raw message into the domain shape. Service and empty messages
/// produce `None`.
pub fn message_to_domain(msg: &tl::enums::Message, chat_id: i64) -> Option<Message> {
    let m = match msg {
        tl::enums::Message::Message(m) => m,
        tl::enums::Message::Empty(_) | tl::enums::Message::Service(_) => return None,
    };

    Some(Message {
        id: m.id,
        chat_id,
        // Prefer edit_date so the "current" version carries its own stamp.
        date: m.edit_date.map(i64::from).unwrap_or(i64::from(m.date)),
        text: m.message.clone(),
        media: m.media.as_ref().and_then(media_kind),
        media_group_id: m.grouped_id,
        is_forward: m.fwd_from.is_some(),
        reply_to_msg_id: m.reply_to.as_ref().and_then(|r| match r {
            tl::enums::MessageReplyHeader::Header(h) => h.reply_to_msg_id,
            _ => None,
        }),
        entities: entities_to_domain(m.entities.as_deref()),
    })
}

/// Content kind of a raw media object. Web pages and other non-file media
/// map to `None` (the message behaves as text for the filter gate).
pub fn media_kind(media: &tl::enums::MessageMedia) -> Option<MediaKind> {
    match media {
        tl::enums::MessageMedia::Photo(_) => Some(MediaKind::Photo),
        tl::enums::MessageMedia::Document(d) => {
            let doc = match d.document.as_ref() {
                Some(tl::enums::Document::Document(doc)) => doc,
                _ => return Some(MediaKind::Document),
            };
            let mut is_video = false;
            let mut is_round = false;
            let mut is_voice = false;
            let mut is_audio = false;
            let mut is_sticker = false;
            let mut is_animated = false;
            for attr in &doc.attributes {
                match attr {
                    tl::enums::DocumentAttribute::Video(v) => {
                        is_video = true;
                        is_round = v.round_message;
                    }
                    tl::enums::DocumentAttribute::Audio(a) => {
                        is_audio = true;
                        is_voice = a.voice;
                    }
                    tl::enums::DocumentAttribute::Sticker(_) => is_sticker = true,
                    tl::enums::DocumentAttribute::Animated => is_animated = true,
                    _ => {}
                }
            }
            Some(if is_round {
                MediaKind::VideoNote
            } else if is_animated {
                MediaKind::Animation
            } else if is_sticker {
                MediaKind::Sticker
            } else if is_voice {
                MediaKind::Voice
            } else if is_video {
                MediaKind::Video
            } else if is_audio {
                MediaKind::Audio
            } else if doc.mime_type.starts_with("video/") {
                MediaKind::Video
            } else if doc.mime_type.starts_with("audio/") {
                MediaKind::Audio
            } else {
                MediaKind::Document
            })
        }
        _ => None,
    }
}

/// Keep the entity kinds the link filter cares about; drop formatting.
pub fn entities_to_domain(entities: Option<&[tl::enums::MessageEntity]>) -> Vec<TextEntity> {
    let Some(entities) = entities else {
        return vec![];
    };
    entities
        .iter()
        .filter_map(|e| {
            let (kind, offset, length) = match e {
                tl::enums::MessageEntity::Url(x) => (EntityKind::Url, x.offset, x.length),
                tl::enums::MessageEntity::TextUrl(x) => (EntityKind::TextLink, x.offset, x.length),
                tl::enums::MessageEntity::Email(x) => (EntityKind::Email, x.offset, x.length),
                tl::enums::MessageEntity::Phone(x) => (EntityKind::Phone, x.offset, x.length),
                _ => return None,
            };
            Some(TextEntity {
                kind,
                offset,
                length,
            })
        })
        .collect()
}

/// Reusable input media for an already-stored photo/document, for album
/// reassembly and post-uploadMedia sends.
pub fn input_media_from_media(media: &tl::enums::MessageMedia) -> Option<tl::enums::InputMedia> {
    match media {
        tl::enums::MessageMedia::Photo(p) => match p.photo.as_ref()? {
            tl::enums::Photo::Photo(photo) => Some(
                tl::types::InputMediaPhoto {
                    spoiler: false,
                    id: tl::types::InputPhoto {
                        id: photo.id,
                        access_hash: photo.access_hash,
                        file_reference: photo.file_reference.clone(),
                    }
                    .into(),
                    ttl_seconds: None,
                }
                .into(),
            ),
            tl::enums::Photo::Empty(_) => None,
        },
        tl::enums::MessageMedia::Document(d) => match d.document.as_ref()? {
            tl::enums::Document::Document(doc) => Some(
                tl::types::InputMediaDocument {
                    spoiler: false,
                    id: tl::types::InputDocument {
                        id: doc.id,
                        access_hash: doc.access_hash,
                        file_reference: doc.file_reference.clone(),
                    }
                    .into(),
                    ttl_seconds: None,
                    query: None,
                }
                .into(),
            ),
            tl::enums::Document::Empty(_) => None,
        },
        _ => None,
    }
}

/// New message ids produced by an Updates response (forward, copy, album
/// send all report through here).
pub fn message_ids_from_updates(updates: &tl::enums::Updates) -> Vec<i32> {
    fn from_update(update: &tl::enums::Update, out: &mut Vec<i32>) {
        match update {
            tl::enums::Update::NewMessage(u) => {
                if let tl::enums::Message::Message(m) = &u.message {
                    out.push(m.id);
                }
            }
            tl::enums::Update::NewChannelMessage(u) => {
                if let tl::enums::Message::Message(m) = &u.message {
                    out.push(m.id);
                }
            }
            tl::enums::Update::MessageId(u) => out.push(u.id),
            _ => {}
        }
    }

    let mut out = Vec::new();
    match updates {
        tl::enums::Updates::Updates(u) => {
            for update in &u.updates {
                from_update(update, &mut out);
            }
        }
        tl::enums::Updates::Combined(u) => {
            for update in &u.updates {
                from_update(update, &mut out);
            }
        }
        tl::enums::Updates::UpdateShortSentMessage(u) => out.push(u.id),
        _ => {}
    }
    out.sort_unstable();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flood_wait_carries_the_server_delay() {
        match classify_rpc_parts(420, "FLOOD_WAIT", Some(37)) {
            DomainError::FloodWait { seconds } => assert_eq!(seconds, 37),
            other => panic!("unexpected: {:?}", other),
        }
        // Missing value falls back to a safe default.
        assert!(matches!(
            classify_rpc_parts(420, "FLOOD_WAIT", None),
            DomainError::FloodWait { seconds: 60 }
        ));
    }

    #[test]
    fn restriction_and_access_errors_map_to_their_kinds() {
        assert!(matches!(
            classify_rpc_parts(403, "CHAT_FORWARDS_RESTRICTED", None),
            DomainError::ForwardsRestricted
        ));
        assert!(matches!(
            classify_rpc_parts(400, "CHANNEL_PRIVATE", None),
            DomainError::NotAccessible(_)
        ));
        assert!(matches!(
            classify_rpc_parts(400, "USERNAME_NOT_OCCUPIED", None),
            DomainError::InvalidIdentifier(_)
        ));
        assert!(matches!(
            classify_rpc_parts(401, "AUTH_KEY_UNREGISTERED", None),
            DomainError::Auth(_)
        ));
        assert!(matches!(
            classify_rpc_parts(400, "RANDOM_ID_DUPLICATE", None),
            DomainError::Api { code: 400, .. }
        ));
    }

    #[test]
    fn bot_api_ids_follow_the_convention() {
        let channel = tl::enums::Chat::ChannelForbidden(tl::types::ChannelForbidden {
            broadcast: true,
            megagroup: false,
            id: 1234567890,
            access_hash: 0,
            title: "c".into(),
            until_date: None,
        });
        assert_eq!(bot_api_chat_id(&channel), -1001234567890);
    }
}
