//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod events;

pub use entities::{
    ChannelId, ChannelPair, ChatInfo, EntityKind, FilterReason, ForwardOutcome, MediaItem,
    MediaKind, Message, OutgoingMedia, SignInResult, TextEntity, TextReplacement,
};
pub use errors::DomainError;
pub use events::{emit, event_channel, EngineEvent, EventReceiver, EventSender};
