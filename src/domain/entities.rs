//! Domain entities. Pure data structures for the core business.
//!
//! No Telegram/IO types here — these are mapped from adapters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Canonical chat identifier (Bot-API-style dialog id).
pub type ChannelId = i64;

/// A replication rule: one source chat mirrored into N target chats,
/// with filters and transforms applied in between.
///
/// Immutable for the duration of a run; `PairController` is the only
/// component that builds or replaces these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPair {
    pub source: ChannelId,
    pub source_label: String,
    /// Deduplicated, order-preserving. Never empty; never contains `source`.
    pub targets: Vec<ChannelId>,
    pub target_labels: Vec<String>,
    /// Batch lower bound. 0 = from the oldest available message.
    pub start_id: i32,
    /// Batch upper bound. 0 = up to the newest at scan time.
    pub end_id: i32,
    /// Media gate: messages whose content kind is absent here are dropped.
    pub media_types: BTreeSet<MediaKind>,
    /// Group-level OR-any-substring match, case-insensitive. Empty = pass all.
    pub keywords: Vec<String>,
    /// Ordered literal substitutions applied to the outgoing text.
    pub text_replacements: Vec<TextReplacement>,
    pub exclude_links: bool,
    pub remove_captions: bool,
    pub hide_author: bool,
    pub enabled: bool,
    pub send_final_message: bool,
    pub final_message_html_path: Option<PathBuf>,
    pub enable_web_page_preview: bool,
}

impl ChannelPair {
    /// Key used to diff pair sets across reconfigurations.
    pub fn key(&self) -> (ChannelId, Vec<ChannelId>) {
        (self.source, self.targets.clone())
    }

    pub fn media_type_allowed(&self, kind: MediaKind) -> bool {
        self.media_types.contains(&kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextReplacement {
    pub find: String,
    pub replace: String,
}

/// Message content kind, as displayed by Telegram.
///
/// `Text` is the pseudo-kind of a message without media; it participates in
/// the `media_types` gate like any other kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Text,
    Photo,
    Video,
    Document,
    Audio,
    Animation,
    Sticker,
    Voice,
    VideoNote,
}

impl MediaKind {
    pub const ALL: [MediaKind; 9] = [
        MediaKind::Text,
        MediaKind::Photo,
        MediaKind::Video,
        MediaKind::Document,
        MediaKind::Audio,
        MediaKind::Animation,
        MediaKind::Sticker,
        MediaKind::Voice,
        MediaKind::VideoNote,
    ];

    /// File extension used for scratch downloads.
    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Text => "txt",
            MediaKind::Photo => "jpg",
            MediaKind::Video => "mp4",
            MediaKind::Document => "bin",
            MediaKind::Audio => "mp3",
            MediaKind::Animation => "mp4",
            MediaKind::Sticker => "webp",
            MediaKind::Voice => "ogg",
            MediaKind::VideoNote => "mp4",
        }
    }
}

/// A single message from a chat.
///
/// For media messages `text` holds the caption; for plain messages it holds
/// the body. `media` is `None` exactly when the message is text-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i32,
    pub chat_id: ChannelId,
    pub date: i64,
    pub text: String,
    pub media: Option<MediaKind>,
    /// Telegram `grouped_id`: messages sharing it render as one album.
    pub media_group_id: Option<i64>,
    pub is_forward: bool,
    pub reply_to_msg_id: Option<i32>,
    pub entities: Vec<TextEntity>,
}

impl Message {
    /// The kind this message contributes to the media-type gate.
    pub fn kind(&self) -> MediaKind {
        self.media.unwrap_or(MediaKind::Text)
    }
}

/// Text entity attached to a message body or caption.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextEntity {
    pub kind: EntityKind,
    pub offset: i32,
    pub length: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Url,
    /// Hidden hyperlink ("click here"); the URL is invisible in the text.
    TextLink,
    Email,
    Phone,
    Other,
}

impl EntityKind {
    pub fn is_link(self) -> bool {
        matches!(
            self,
            EntityKind::Url | EntityKind::TextLink | EntityKind::Email | EntityKind::Phone
        )
    }
}

/// Chat metadata as resolved by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInfo {
    pub id: ChannelId,
    pub label: String,
    /// False when the chat's content-protection flag forbids server-side
    /// forward and copy (restricted source).
    pub can_forward: bool,
}

/// Why the filter dropped a message or a whole group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterReason {
    Link,
    Keyword,
    MediaType,
    Disabled,
}

impl FilterReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterReason::Link => "link",
            FilterReason::Keyword => "keyword",
            FilterReason::MediaType => "media_type",
            FilterReason::Disabled => "disabled",
        }
    }
}

/// Per (group, target) replication outcome, produced by the dispatch and
/// re-upload paths. Filter drops never reach a target, so they are
/// reported as `message_filtered` events instead of appearing here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    SkippedAlreadyForwarded,
    ForwardedNative,
    ForwardedCopied,
    ForwardedReuploaded,
    Failed(String),
}

impl ForwardOutcome {
    /// True when the target actually received the group in this run.
    pub fn is_delivery(&self) -> bool {
        matches!(
            self,
            ForwardOutcome::ForwardedNative
                | ForwardOutcome::ForwardedCopied
                | ForwardOutcome::ForwardedReuploaded
        )
    }
}

/// An item in an outgoing media batch: either a server-side reference to an
/// existing message (reassembly) or a local file (re-upload).
#[derive(Debug, Clone)]
pub enum MediaItem {
    Existing {
        src_chat: ChannelId,
        message_id: i32,
        kind: MediaKind,
    },
    Local {
        path: PathBuf,
        kind: MediaKind,
    },
}

/// Media-batch entry; the caption rides on the first item only.
#[derive(Debug, Clone)]
pub struct OutgoingMedia {
    pub item: MediaItem,
    pub caption: Option<String>,
}

/// Outcome of the interactive sign-in step.
#[derive(Debug, Clone)]
pub enum SignInResult {
    Success,
    /// 2FA is enabled; follow up with `check_password`.
    PasswordRequired { hint: Option<String> },
    /// Wrong code. Recoverable: the pending login survives, the flow may
    /// prompt again without requesting a fresh code.
    CodeRejected,
}
