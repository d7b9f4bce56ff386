//! Caching layer for price data.

pub mod sqlite;

pub use sqlite::{CacheStats, SqliteCache, SymbolSummary};
