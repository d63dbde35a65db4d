//! Telegram adapters: the grammers-backed gateway (session bootstrap
//! included), auth flow, and tl-to-domain mapping.

pub mod auth_adapter;
pub mod client;
pub mod mapper;

pub use auth_adapter::GrammersAuthAdapter;
pub use client::{connect_client, GrammersTgGateway};
