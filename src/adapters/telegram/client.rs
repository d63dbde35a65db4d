//! Implements TgGateway using the grammers Client.
//!
//! The facade owns the session, classifies RPC errors into the domain
//! taxonomy, and runs **every** outbound call through the flood-wait
//! limiter. Consumers never see the raw client; reconnects and session
//! rebuilds stay invisible behind this boundary.
//!
//! Peers are cached by Bot-API dialog id so we don't re-walk getDialogs on
//! every call (which itself invites FLOOD_WAIT).

use crate::adapters::telegram::mapper;
use crate::domain::{
    emit, ChannelId, ChatInfo, DomainError, EngineEvent, EventSender, MediaItem, Message,
    OutgoingMedia,
};
use crate::ports::{NewMessageStream, TgGateway};
use crate::shared::config::is_fs_safe_session_name;
use crate::shared::RateLimiter;
use async_trait::async_trait;
use grammers_client::peer::PeerRef;
use grammers_client::tl;
use grammers_client::Client;
use grammers_session::storages::SqliteSession;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Buffered live updates before back-pressure hits the update loop.
const SUBSCRIPTION_BUFFER: usize = 256;

/// Bootstrap the client for one account. The session lives at
/// `<sessions_dir>/<session_name>`; the name is re-checked for
/// file-system safety here so a session file can never land outside the
/// sessions directory, whatever produced the name. The sender pool runner
/// is spawned here and lives for the process; authorization is preserved
/// across restarts through the SQLite session file.
pub async fn connect_client(
    api_id: i32,
    sessions_dir: &Path,
    session_name: &str,
) -> Result<Client, DomainError> {
    if !is_fs_safe_session_name(session_name) {
        return Err(DomainError::Config(format!(
            "session name '{}' is not a file-system-safe identifier",
            session_name
        )));
    }
    tokio::fs::create_dir_all(sessions_dir)
        .await
        .map_err(|e| DomainError::Config(format!("create sessions directory: {}", e)))?;

    let path = sessions_dir.join(session_name);
    let session = SqliteSession::open(&path)
        .await
        .map_err(|e| DomainError::Auth(format!("open session {}: {}", path.display(), e)))?;

    let pool = grammers_client::SenderPool::new(Arc::new(session), api_id);
    let handle = pool.handle.clone();
    tokio::spawn(async move {
        pool.runner.run().await;
    });
    Ok(Client::new(handle))
}

pub struct GrammersTgGateway {
    client: Client,
    limiter: RateLimiter,
    events: EventSender,
    /// Peer handles by dialog id; avoids repeated getDialogs sweeps.
    peers: Mutex<HashMap<ChannelId, PeerRef>>,
    /// Human labels picked up while walking dialogs or resolving names.
    labels: Mutex<HashMap<ChannelId, String>>,
    connected: AtomicBool,
}

impl GrammersTgGateway {
    pub fn new(client: Client, events: EventSender, cancel: CancellationToken) -> Self {
        Self {
            client,
            limiter: RateLimiter::new(events.clone(), cancel),
            events,
            peers: Mutex::new(HashMap::new()),
            labels: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// Rate-limited raw invoke with error classification and connection
    /// state tracking.
    async fn invoke<R>(&self, operation: &str, request: &R) -> Result<R::Return, DomainError>
    where
        R: tl::RemoteCall + Sync,
    {
        let result = self
            .limiter
            .run(operation, || async {
                self.client
                    .invoke(request)
                    .await
                    .map_err(mapper::classify_invocation)
            })
            .await;
        self.note_outcome(operation, &result);
        result
    }

    fn note_outcome<T>(&self, operation: &str, result: &Result<T, DomainError>) {
        match result {
            Ok(_) => {
                if !self.connected.swap(true, Ordering::SeqCst) {
                    emit(&self.events, EngineEvent::ConnectionRestored);
                }
            }
            Err(DomainError::Network(_)) => {
                if self.connected.swap(false, Ordering::SeqCst) {
                    warn!(operation, "connection lost");
                    emit(&self.events, EngineEvent::ConnectionLost);
                }
            }
            Err(DomainError::TimeSync) => {
                emit(&self.events, EngineEvent::TimeSyncError);
            }
            Err(_) => {}
        }
    }

    /// Resolve a dialog id to a peer handle, walking dialogs once on miss.
    async fn peer_ref(&self, chat_id: ChannelId) -> Result<PeerRef, DomainError> {
        if let Some(peer) = self.peers.lock().await.get(&chat_id) {
            return Ok(peer.clone());
        }

        let found = self
            .limiter
            .run("get_dialogs", || async {
                let mut dialogs = self.client.iter_dialogs();
                loop {
                    let dialog = dialogs
                        .next()
                        .await
                        .map_err(mapper::classify_invocation)?;
                    let Some(dialog) = dialog else {
                        return Ok(None);
                    };
                    let peer = dialog.peer();
                    let id = peer.id().bot_api_dialog_id();
                    if let Some(name) = peer.name() {
                        self.labels.lock().await.insert(id, name.to_string());
                    }
                    if id == chat_id {
                        return Ok(Some(peer.clone()));
                    }
                }
            })
            .await?;

        let peer = found.ok_or_else(|| {
            DomainError::NotAccessible(format!("chat {} not among the account's dialogs", chat_id))
        })?;
        let peer_ref = peer
            .to_ref()
            .await
            .ok_or_else(|| DomainError::NotAccessible(format!("peer {} not in session", chat_id)))?;
        self.peers.lock().await.insert(chat_id, peer_ref.clone());
        Ok(peer_ref)
    }

    async fn input_peer(&self, chat_id: ChannelId) -> Result<tl::enums::InputPeer, DomainError> {
        Ok(self.peer_ref(chat_id).await?.into())
    }

    /// Raw message objects by id, using the channel-specific call when the
    /// peer is a channel.
    async fn fetch_raw_by_ids(
        &self,
        chat: ChannelId,
        ids: &[i32],
    ) -> Result<Vec<tl::enums::Message>, DomainError> {
        let input_peer = self.input_peer(chat).await?;
        let id: Vec<tl::enums::InputMessage> = ids
            .iter()
            .map(|&i| tl::types::InputMessageId { id: i }.into())
            .collect();

        let raw = match &input_peer {
            tl::enums::InputPeer::Channel(c) => {
                let req = tl::functions::channels::GetMessages {
                    channel: tl::types::InputChannel {
                        channel_id: c.channel_id,
                        access_hash: c.access_hash,
                    }
                    .into(),
                    id,
                };
                self.invoke("get_messages", &req).await?
            }
            _ => {
                let req = tl::functions::messages::GetMessages { id };
                self.invoke("get_messages", &req).await?
            }
        };

        let messages = match raw {
            tl::enums::messages::Messages::Messages(m) => m.messages,
            tl::enums::messages::Messages::Slice(m) => m.messages,
            tl::enums::messages::Messages::ChannelMessages(m) => m.messages,
            tl::enums::messages::Messages::NotModified(_) => vec![],
        };
        Ok(messages)
    }

    /// Upload one local file and register it server-side so the returned
    /// reference can ride in an album.
    async fn upload_for_album(
        &self,
        peer: &tl::enums::InputPeer,
        path: &Path,
        kind: crate::domain::MediaKind,
    ) -> Result<tl::enums::InputMedia, DomainError> {
        let uploaded = self
            .client
            .upload_file(path)
            .await
            .map_err(|e| DomainError::Media(format!("upload {}: {}", path.display(), e)))?;

        let fresh: tl::enums::InputMedia = match kind {
            crate::domain::MediaKind::Photo => tl::types::InputMediaUploadedPhoto {
                spoiler: false,
                file: uploaded.raw.into(),
                stickers: None,
                ttl_seconds: None,
            }
            .into(),
            _ => tl::types::InputMediaUploadedDocument {
                nosound_video: false,
                force_file: false,
                spoiler: false,
                file: uploaded.raw.into(),
                thumb: None,
                mime_type: mime_for(kind).to_string(),
                attributes: vec![tl::types::DocumentAttributeFilename {
                    file_name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "file.bin".to_string()),
                }
                .into()],
                stickers: None,
                video_cover: None,
                video_timestamp: None,
                ttl_seconds: None,
            }
            .into(),
        };

        let registered = self
            .invoke(
                "upload_media",
                &tl::functions::messages::UploadMedia {
                    business_connection_id: None,
                    peer: peer.clone(),
                    media: fresh,
                },
            )
            .await?;
        mapper::input_media_from_media(&registered)
            .ok_or_else(|| DomainError::Media("uploadMedia returned unusable media".into()))
    }
}

fn mime_for(kind: crate::domain::MediaKind) -> &'static str {
    use crate::domain::MediaKind;
    match kind {
        MediaKind::Text => "text/plain",
        MediaKind::Photo => "image/jpeg",
        MediaKind::Video | MediaKind::Animation | MediaKind::VideoNote => "video/mp4",
        MediaKind::Document => "application/octet-stream",
        MediaKind::Audio => "audio/mpeg",
        MediaKind::Sticker => "image/webp",
        MediaKind::Voice => "audio/ogg",
    }
}

#[async_trait]
impl TgGateway for GrammersTgGateway {
    async fn resolve(&self, identifier: &str) -> Result<ChannelId, DomainError> {
        if let Some(hash) = identifier.strip_prefix('+') {
            let invite = self
                .invoke(
                    "check_chat_invite",
                    &tl::functions::messages::CheckChatInvite {
                        hash: hash.to_string(),
                    },
                )
                .await?;
            return match invite {
                tl::enums::ChatInvite::Already(a) => Ok(mapper::bot_api_chat_id(&a.chat)),
                tl::enums::ChatInvite::Peek(p) => Ok(mapper::bot_api_chat_id(&p.chat)),
                tl::enums::ChatInvite::Invite(_) => Err(DomainError::NotAccessible(
                    "not a member of the invite's chat".into(),
                )),
            };
        }

        let resolved = self
            .limiter
            .run("resolve_username", || async {
                self.client
                    .resolve_username(identifier)
                    .await
                    .map_err(mapper::classify_invocation)
            })
            .await?;
        let peer = resolved
            .ok_or_else(|| DomainError::InvalidIdentifier(identifier.to_string()))?;
        let id = peer.id().bot_api_dialog_id();
        if let Some(name) = peer.name() {
            self.labels.lock().await.insert(id, name.to_string());
        }
        if let Some(peer_ref) = peer.to_ref().await {
            self.peers.lock().await.insert(id, peer_ref);
        }
        debug!(identifier, id, "identifier resolved");
        Ok(id)
    }

    async fn chat_info(&self, id: ChannelId) -> Result<ChatInfo, DomainError> {
        let input_peer = self.input_peer(id).await?;
        let chat = match &input_peer {
            tl::enums::InputPeer::Channel(c) => {
                let chats = self
                    .invoke(
                        "get_channels",
                        &tl::functions::channels::GetChannels {
                            id: vec![tl::types::InputChannel {
                                channel_id: c.channel_id,
                                access_hash: c.access_hash,
                            }
                            .into()],
                        },
                    )
                    .await?;
                first_chat(chats)
            }
            tl::enums::InputPeer::Chat(c) => {
                let chats = self
                    .invoke(
                        "get_chats",
                        &tl::functions::messages::GetChats { id: vec![c.chat_id] },
                    )
                    .await?;
                first_chat(chats)
            }
            _ => None,
        };

        match chat {
            Some(tl::enums::Chat::Channel(ch)) => Ok(ChatInfo {
                id,
                label: ch.title,
                can_forward: !ch.noforwards,
            }),
            Some(tl::enums::Chat::Chat(ch)) => Ok(ChatInfo {
                id,
                label: ch.title,
                can_forward: !ch.noforwards,
            }),
            Some(_) => Err(DomainError::NotAccessible(format!("chat {}", id))),
            None => {
                // Users and anything without a chat object: forwarding from a
                // private dialog is never server-restricted.
                let label = self
                    .labels
                    .lock()
                    .await
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| id.to_string());
                Ok(ChatInfo {
                    id,
                    label,
                    can_forward: true,
                })
            }
        }
    }

    async fn newest_message_id(&self, chat: ChannelId) -> Result<i32, DomainError> {
        let page = self.get_history(chat, 0, 0, 1).await?;
        Ok(page.first().map(|m| m.id).unwrap_or(0))
    }

    async fn get_history(
        &self,
        chat: ChannelId,
        min_id: i32,
        max_id: i32,
        limit: i32,
    ) -> Result<Vec<Message>, DomainError> {
        let input_peer = self.input_peer(chat).await?;
        // When paginating backwards Telegram needs offset_id = max_id, or it
        // keeps returning the newest page.
        let offset_id = if max_id > 0 { max_id } else { 0 };
        let raw = self
            .invoke(
                "get_history",
                &tl::functions::messages::GetHistory {
                    peer: input_peer,
                    offset_id,
                    offset_date: 0,
                    add_offset: 0,
                    limit,
                    max_id,
                    min_id,
                    hash: 0,
                },
            )
            .await?;

        let messages = match raw {
            tl::enums::messages::Messages::Messages(m) => m.messages,
            tl::enums::messages::Messages::Slice(m) => m.messages,
            tl::enums::messages::Messages::ChannelMessages(m) => m.messages,
            tl::enums::messages::Messages::NotModified(_) => return Ok(vec![]),
        };
        Ok(messages
            .iter()
            .filter_map(|m| mapper::message_to_domain(m, chat))
            .collect())
    }

    async fn get_messages_by_id(
        &self,
        chat: ChannelId,
        ids: &[i32],
    ) -> Result<Vec<Message>, DomainError> {
        let raw = self.fetch_raw_by_ids(chat, ids).await?;
        Ok(raw
            .iter()
            .filter_map(|m| mapper::message_to_domain(m, chat))
            .collect())
    }

    async fn forward_messages(
        &self,
        dst: ChannelId,
        src: ChannelId,
        ids: &[i32],
        silent: bool,
    ) -> Result<Vec<i32>, DomainError> {
        let from_peer = self.input_peer(src).await?;
        let to_peer = self.input_peer(dst).await?;
        let updates = self
            .invoke(
                "forward_messages",
                &tl::functions::messages::ForwardMessages {
                    silent,
                    background: false,
                    with_my_score: false,
                    drop_author: false,
                    drop_media_captions: false,
                    noforwards: false,
                    allow_paid_floodskip: false,
                    from_peer,
                    id: ids.to_vec(),
                    random_id: ids.iter().map(|_| rand::random()).collect(),
                    to_peer,
                    top_msg_id: None,
                    reply_to: None,
                    schedule_date: None,
                    send_as: None,
                    quick_reply_shortcut: None,
                    video_timestamp: None,
                    allow_paid_stars: None,
                },
            )
            .await?;
        Ok(mapper::message_ids_from_updates(&updates))
    }

    async fn copy_messages(
        &self,
        dst: ChannelId,
        src: ChannelId,
        ids: &[i32],
        caption: Option<&str>,
        silent: bool,
    ) -> Result<Vec<i32>, DomainError> {
        let from_peer = self.input_peer(src).await?;
        let to_peer = self.input_peer(dst).await?;
        // A copy is a forward with the author dropped; a changed caption is
        // applied to the copy afterwards.
        let updates = self
            .invoke(
                "copy_messages",
                &tl::functions::messages::ForwardMessages {
                    silent,
                    background: false,
                    with_my_score: false,
                    drop_author: true,
                    drop_media_captions: false,
                    noforwards: false,
                    allow_paid_floodskip: false,
                    from_peer,
                    id: ids.to_vec(),
                    random_id: ids.iter().map(|_| rand::random()).collect(),
                    to_peer: to_peer.clone(),
                    top_msg_id: None,
                    reply_to: None,
                    schedule_date: None,
                    send_as: None,
                    quick_reply_shortcut: None,
                    video_timestamp: None,
                    allow_paid_stars: None,
                },
            )
            .await?;
        let new_ids = mapper::message_ids_from_updates(&updates);

        if let (Some(caption), Some(&first)) = (caption, new_ids.first()) {
            self.invoke(
                "edit_message",
                &tl::functions::messages::EditMessage {
                    no_webpage: true,
                    invert_media: false,
                    peer: to_peer,
                    id: first,
                    message: Some(caption.to_string()),
                    media: None,
                    reply_markup: None,
                    entities: None,
                    schedule_date: None,
                    quick_reply_shortcut_id: None,
                },
            )
            .await?;
        }
        Ok(new_ids)
    }

    async fn send_media_group(
        &self,
        dst: ChannelId,
        items: &[OutgoingMedia],
        silent: bool,
    ) -> Result<Vec<i32>, DomainError> {
        let peer = self.input_peer(dst).await?;

        let mut multi_media = Vec::with_capacity(items.len());
        for item in items {
            let media = match &item.item {
                MediaItem::Existing {
                    src_chat,
                    message_id,
                    ..
                } => {
                    let raw = self.fetch_raw_by_ids(*src_chat, &[*message_id]).await?;
                    let msg_media = raw
                        .iter()
                        .find_map(|m| match m {
                            tl::enums::Message::Message(m) if m.id == *message_id => {
                                m.media.clone()
                            }
                            _ => None,
                        })
                        .ok_or_else(|| {
                            DomainError::Media(format!(
                                "message {} has no reusable media",
                                message_id
                            ))
                        })?;
                    mapper::input_media_from_media(&msg_media).ok_or_else(|| {
                        DomainError::Media(format!("message {} media is not album-capable", message_id))
                    })?
                }
                MediaItem::Local { path, kind } => {
                    self.upload_for_album(&peer, path, *kind).await?
                }
            };
            multi_media.push(
                tl::types::InputSingleMedia {
                    media,
                    random_id: rand::random(),
                    message: item.caption.clone().unwrap_or_default(),
                    entities: None,
                }
                .into(),
            );
        }

        let updates = self
            .invoke(
                "send_media_group",
                &tl::functions::messages::SendMultiMedia {
                    silent,
                    background: false,
                    clear_draft: false,
                    noforwards: false,
                    update_stickersets_order: false,
                    invert_media: false,
                    allow_paid_floodskip: false,
                    peer,
                    reply_to: None,
                    multi_media,
                    schedule_date: None,
                    send_as: None,
                    quick_reply_shortcut: None,
                    effect: None,
                    allow_paid_stars: None,
                },
            )
            .await?;
        Ok(mapper::message_ids_from_updates(&updates))
    }

    async fn send_message(
        &self,
        dst: ChannelId,
        text: &str,
        html: bool,
        disable_preview: bool,
    ) -> Result<i32, DomainError> {
        let peer_ref = self.peer_ref(dst).await?;
        let input = if html {
            grammers_client::InputMessage::html(text)
        } else {
            grammers_client::InputMessage::text(text)
        };
        let input = input.link_preview(!disable_preview);

        let result = self
            .limiter
            .run("send_message", || async {
                self.client
                    .send_message(peer_ref.clone(), input.clone())
                    .await
                    .map_err(mapper::classify_invocation)
            })
            .await;
        self.note_outcome("send_message", &result);
        Ok(result?.id())
    }

    async fn download_media(
        &self,
        chat: ChannelId,
        message_id: i32,
        dest: &Path,
    ) -> Result<u64, DomainError> {
        let peer_ref = self.peer_ref(chat).await?;

        let bytes = self
            .limiter
            .run("download_media", || async {
                let messages = self
                    .client
                    .get_messages_by_id(peer_ref.clone(), &[message_id])
                    .await
                    .map_err(mapper::classify_invocation)?;
                let msg = messages
                    .into_iter()
                    .flatten()
                    .next()
                    .ok_or_else(|| DomainError::Media(format!("message {} not found", message_id)))?;
                let media = msg
                    .media()
                    .ok_or_else(|| DomainError::Media(format!("message {} has no media", message_id)))?;
                self.client
                    .download_media(&media, dest)
                    .await
                    .map_err(|e| DomainError::Media(e.to_string()))?;
                let meta = tokio::fs::metadata(dest)
                    .await
                    .map_err(|e| DomainError::Media(e.to_string()))?;
                Ok(meta.len())
            })
            .await?;

        debug!(chat, message_id, bytes, path = %dest.display(), "media downloaded");
        emit(
            &self.events,
            EngineEvent::Progress {
                op: "download_bytes".into(),
                current: bytes,
                total: bytes,
                description: format!("message {} media on disk", message_id),
            },
        );
        Ok(bytes)
    }

    async fn subscribe_new_messages(
        &self,
        chats: &[ChannelId],
    ) -> Result<NewMessageStream, DomainError> {
        let wanted: HashSet<ChannelId> = chats.iter().copied().collect();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let client = self.client.clone();

        let handle = tokio::spawn(async move {
            loop {
                match client.next_update().await {
                    Ok(grammers_client::Update::NewMessage(message)) => {
                        if message.outgoing() {
                            continue;
                        }
                        let chat_id = message.chat().id().bot_api_dialog_id();
                        if !wanted.contains(&chat_id) {
                            continue;
                        }
                        let raw = tl::enums::Message::Message(message.raw.clone());
                        if let Some(domain) = mapper::message_to_domain(&raw, chat_id) {
                            if tx.send(domain).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "update loop error, backing off");
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Ok(NewMessageStream::new(rx, handle))
    }
}

fn first_chat(chats: tl::enums::messages::Chats) -> Option<tl::enums::Chat> {
    let list = match chats {
        tl::enums::messages::Chats::Chats(c) => c.chats,
        tl::enums::messages::Chats::Slice(c) => c.chats,
    };
    list.into_iter().next()
}
