//! Shared infrastructure-neutral helpers: configuration and flood control.

pub mod config;
pub mod flood;

pub use config::AppConfig;
pub use flood::RateLimiter;
