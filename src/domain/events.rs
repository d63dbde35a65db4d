//! Engine events surfaced to the host.
//!
//! The core never renders anything itself; it emits these over an unbounded
//! channel and the host decides how to log or display them.

use crate::domain::entities::FilterReason;
use tokio::sync::mpsc;

/// Structured event stream consumed by the host UI/logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress {
        op: String,
        current: u64,
        total: u64,
        description: String,
    },
    MessageForwarded {
        message_id: i32,
        target_label: String,
    },
    MediaGroupForwarded {
        message_ids: Vec<i32>,
        target_label: String,
        count: usize,
        /// Stringified so 32-bit integer transports cannot truncate it.
        target_id: String,
    },
    MessageFiltered {
        message_id: i32,
        filter_type: FilterReason,
        reason: String,
    },
    TextReplacementApplied {
        scope: String,
        original: String,
        replaced: String,
    },
    FloodWaitDetected {
        seconds: u64,
        operation: String,
    },
    CollectionStarted {
        total: u64,
    },
    CollectionProgress {
        fetched: u64,
        total: u64,
    },
    CollectionCompleted {
        fetched: u64,
    },
    PairAdded {
        source: i64,
    },
    PairRemoved {
        source: i64,
    },
    PairModified {
        source: i64,
    },
    ConnectionLost,
    ConnectionRestored,
    /// Terminal: the host is expected to shut down after informing the user.
    TimeSyncError,
}

pub type EventSender = mpsc::UnboundedSender<EngineEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send ignoring a closed receiver: the engine must keep running even when
/// the host stopped listening.
pub fn emit(tx: &EventSender, event: EngineEvent) {
    let _ = tx.send(event);
}
