//! Cache manager for market data.
//!
//! Opens the SQLite price cache at a platform-specific default location.

use std::path::PathBuf;
use treynor_data::cache::SqliteCache;
use treynor_data::error::DataError;

/// Get the default cache directory path.
///
/// Uses platform-specific cache directories:
/// - Linux: `~/.cache/treynor/`
/// - macOS: `~/Library/Caches/treynor/`
/// - Windows: `%LOCALAPPDATA%\treynor\`
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("treynor")
}

/// Get the cache database path.
pub(crate) fn cache_path() -> PathBuf {
    default_cache_dir().join("treynor.db")
}

/// Open the cache, creating the directory if needed.
pub(crate) fn open_cache() -> Result<SqliteCache, DataError> {
    let path = cache_path();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    SqliteCache::new(&path)
}
