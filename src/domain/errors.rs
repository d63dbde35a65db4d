//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// FloodWait: the API demands a pause of `seconds` before retrying.
    /// Handled transparently by the rate limiter.
    #[error("flood wait: retry after {seconds} seconds")]
    FloodWait { seconds: u64 },

    /// The chat's content-protection flag forbids forward/copy. Target-local:
    /// the affected target switches to the re-upload path.
    #[error("chat forbids forwarding")]
    ForwardsRestricted,

    /// Chat exists but we cannot read it (left, banned, private).
    #[error("chat not accessible: {0}")]
    NotAccessible(String),

    /// User-entered identifier could not be parsed or resolved.
    #[error("invalid chat identifier: {0}")]
    InvalidIdentifier(String),

    #[error("network error: {0}")]
    Network(String),

    /// Local clock is out of sync with Telegram. Terminal: the engine stops
    /// and the host informs the user.
    #[error("system clock out of sync with Telegram")]
    TimeSync,

    /// Session invalidated or login required. Terminal until re-login.
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("telegram api error {code}: {message}")]
    Api { code: i32, message: String },

    #[error("history store error: {0}")]
    History(String),

    #[error("media transfer failed: {0}")]
    Media(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Errors that must stop the whole engine, not just the current pair.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DomainError::TimeSync | DomainError::Auth(_) | DomainError::Cancelled
        )
    }

    pub fn is_flood_wait(&self) -> bool {
        matches!(self, DomainError::FloodWait { .. })
    }
}
