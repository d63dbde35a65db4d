//! tg-relay: channel-pair replication for Telegram, with Hexagonal
//! Architecture. Batch range walks, live monitoring, filtering, and
//! restricted-source re-upload.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
