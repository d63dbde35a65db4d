//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    ChannelId, ChatInfo, DomainError, Message, OutgoingMedia, SignInResult,
};
use std::path::Path;
use tokio::sync::mpsc;

/// Live subscription to new messages. Dropping the handle unsubscribes.
pub struct NewMessageStream {
    pub rx: mpsc::Receiver<Message>,
    handle: tokio::task::JoinHandle<()>,
}

impl NewMessageStream {
    pub fn new(rx: mpsc::Receiver<Message>, handle: tokio::task::JoinHandle<()>) -> Self {
        Self { rx, handle }
    }
}

impl Drop for NewMessageStream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Telegram gateway: the stable facade over the MTProto client.
///
/// Every call is rate-limit aware (the adapter wraps each outbound request
/// in the flood-wait retry loop) and maps SDK errors into `DomainError`.
/// Consumers never hold the raw client; session rebuilds are invisible here.
#[async_trait::async_trait]
pub trait TgGateway: Send + Sync {
    /// Resolve a user-entered identifier (`t.me/name`, `@name`, `+invite`,
    /// numeric id) to its canonical id.
    async fn resolve(&self, identifier: &str) -> Result<ChannelId, DomainError>;

    /// Label and forward-permission flag for a chat.
    async fn chat_info(&self, id: ChannelId) -> Result<ChatInfo, DomainError>;

    /// Id of the newest message in the chat at call time. 0 when empty.
    async fn newest_message_id(&self, chat: ChannelId) -> Result<i32, DomainError>;

    /// One page of history. Only messages with `min_id < id < max_id` are
    /// returned (bounds of 0 are open); newest first, up to `limit`.
    async fn get_history(
        &self,
        chat: ChannelId,
        min_id: i32,
        max_id: i32,
        limit: i32,
    ) -> Result<Vec<Message>, DomainError>;

    /// Fetch specific messages by id. Missing ids are silently absent.
    async fn get_messages_by_id(
        &self,
        chat: ChannelId,
        ids: &[i32],
    ) -> Result<Vec<Message>, DomainError>;

    /// Native server-side forward, preserving attribution.
    /// Returns the new message ids in the destination.
    async fn forward_messages(
        &self,
        dst: ChannelId,
        src: ChannelId,
        ids: &[i32],
        silent: bool,
    ) -> Result<Vec<i32>, DomainError>;

    /// Server-side copy (forward with dropped author), preserving grouping.
    /// `caption` overrides the caption of the first copied message.
    async fn copy_messages(
        &self,
        dst: ChannelId,
        src: ChannelId,
        ids: &[i32],
        caption: Option<&str>,
        silent: bool,
    ) -> Result<Vec<i32>, DomainError>;

    /// Send a fresh media batch (≤ 10 items, caption on the first). Items may
    /// reference existing messages or local files.
    async fn send_media_group(
        &self,
        dst: ChannelId,
        items: &[OutgoingMedia],
        silent: bool,
    ) -> Result<Vec<i32>, DomainError>;

    /// Plain text message. `html` selects HTML parse mode.
    async fn send_message(
        &self,
        dst: ChannelId,
        text: &str,
        html: bool,
        disable_preview: bool,
    ) -> Result<i32, DomainError>;

    /// Download the media of a message to `dest`. Returns bytes written.
    /// Byte-level progress is emitted on the gateway's event channel.
    async fn download_media(
        &self,
        chat: ChannelId,
        message_id: i32,
        dest: &Path,
    ) -> Result<u64, DomainError>;

    /// Subscribe to new messages in the given chats. A single subscription
    /// per engine; re-subscribe by dropping the old stream first.
    async fn subscribe_new_messages(
        &self,
        chats: &[ChannelId],
    ) -> Result<NewMessageStream, DomainError>;
}

/// Persistent replication history: forwards, upload fingerprints, downloads.
///
/// Writes must be durable before the engine reports success to the host.
#[async_trait::async_trait]
pub trait HistoryPort: Send + Sync {
    async fn is_forwarded(
        &self,
        source: ChannelId,
        message_id: i32,
        target: ChannelId,
    ) -> Result<bool, DomainError>;

    async fn mark_forwarded(
        &self,
        source: ChannelId,
        message_id: i32,
        target: ChannelId,
    ) -> Result<(), DomainError>;

    /// Batch insert; a media group is recorded atomically per target.
    async fn mark_forwarded_many(
        &self,
        source: ChannelId,
        message_ids: &[i32],
        target: ChannelId,
    ) -> Result<(), DomainError>;

    /// Range prefilter: ids in `[start_id, end_id]` not yet forwarded to
    /// every one of `targets`.
    async fn unforwarded_in_range(
        &self,
        source: ChannelId,
        start_id: i32,
        end_id: i32,
        targets: &[ChannelId],
    ) -> Result<Vec<i32>, DomainError>;

    async fn count_forwarded_in_range(
        &self,
        source: ChannelId,
        start_id: i32,
        end_id: i32,
        target: ChannelId,
    ) -> Result<u64, DomainError>;

    /// Upload fingerprint: has a file with this SHA-256 already been pushed
    /// to this target?
    async fn is_uploaded(&self, sha256: &str, target: ChannelId) -> Result<bool, DomainError>;

    async fn mark_uploaded(&self, sha256: &str, target: ChannelId) -> Result<(), DomainError>;

    async fn is_downloaded(
        &self,
        source: ChannelId,
        message_id: i32,
    ) -> Result<bool, DomainError>;

    async fn mark_downloaded(
        &self,
        source: ChannelId,
        message_id: i32,
    ) -> Result<(), DomainError>;
}

/// Authentication port. Check auth state and perform login/2FA via Telegram.
#[async_trait::async_trait]
pub trait AuthPort: Send + Sync {
    /// Returns true if the session is already authorized.
    async fn is_authenticated(&self) -> Result<bool, DomainError>;

    /// Request a login code for the given phone. Must be followed by sign_in.
    async fn request_login_code(&self, phone: &str, api_hash: &str) -> Result<(), DomainError>;

    /// Submit the received code. Returns Success, CodeRejected (the pending
    /// login survives; submit another code), or PasswordRequired (2FA).
    async fn sign_in(&self, code: &str) -> Result<SignInResult, DomainError>;

    /// Complete 2FA after sign_in returned PasswordRequired.
    async fn check_password(&self, password: &[u8]) -> Result<(), DomainError>;
}
