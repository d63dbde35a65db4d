//! Persistence adapters.

pub mod history_sqlite;

pub use history_sqlite::SqliteHistory;
