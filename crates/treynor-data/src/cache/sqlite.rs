//! SQLite caching layer for daily price bars.

use crate::error::{DataError, Result};
use crate::range::DateRange;
use crate::source::{PRICE_COLUMN, PriceBar, bars_to_frame};
use chrono::{NaiveDate, Utc};
use polars::prelude::*;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Share of weekdays in a range that must be cached for the range to count
/// as covered. Exchange holidays account for the rest.
pub const COVERAGE_RATIO: f64 = 0.9;

/// SQLite cache for price bars keyed by `(symbol, date)`.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Create a new SQLite cache.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS quotes (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume INTEGER NOT NULL,
                adjusted_close REAL NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (symbol, date)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_quotes_symbol_date ON quotes(symbol, date)",
            [],
        )?;

        Ok(())
    }

    /// Number of cached bars for a symbol within a range.
    pub fn count_quotes(&self, symbol: &str, range: DateRange) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM quotes
             WHERE symbol = ?1 AND date >= ?2 AND date <= ?3",
            params![symbol, range.start().to_string(), range.end().to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Check whether most trading days of the range are cached for a symbol.
    pub fn has_quotes(&self, symbol: &str, range: DateRange) -> Result<bool> {
        let count = self.count_quotes(symbol, range)?;
        let expected = (range.weekdays() as f64 * COVERAGE_RATIO).floor() as usize;
        Ok(count > 0 && count >= expected)
    }

    /// Get cached bars for a symbol and range as a long frame.
    pub fn get_quotes(&self, symbol: &str, range: DateRange) -> Result<DataFrame> {
        let mut stmt = self.conn.prepare(
            "SELECT date, open, high, low, close, volume, adjusted_close
             FROM quotes
             WHERE symbol = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC",
        )?;

        let rows = stmt.query_map(
            params![symbol, range.start().to_string(), range.end().to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, f64>(6)?,
                ))
            },
        )?;

        let mut bars = Vec::new();
        for row in rows {
            let (date, open, high, low, close, volume, adjusted_close) = row?;
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|e| DataError::Parse(format!("cached date {date}: {e}")))?;
            bars.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
                volume: volume.max(0) as u64,
                adjusted_close,
            });
        }

        if bars.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No cached data found".to_string(),
            });
        }

        bars_to_frame(symbol, &bars)
    }

    /// Store bars from a long frame in the cache.
    pub fn put_quotes(&self, df: &DataFrame) -> Result<()> {
        let cached_at = Utc::now().to_rfc3339();

        let symbols = df.column("symbol")?.str()?;
        let dates = df.column("date")?.cast(&DataType::String)?;
        let dates = dates.str()?;
        let opens = df.column("open")?.f64()?;
        let highs = df.column("high")?.f64()?;
        let lows = df.column("low")?.f64()?;
        let closes = df.column("close")?.f64()?;
        let volumes = df.column("volume")?.cast(&DataType::Int64)?;
        let volumes = volumes.i64()?;
        let adj_closes = df.column(PRICE_COLUMN)?.f64()?;

        let tx = self.conn.unchecked_transaction()?;

        for i in 0..df.height() {
            let symbol = symbols
                .get(i)
                .ok_or_else(|| DataError::Parse("Missing symbol".to_string()))?;
            let date = dates
                .get(i)
                .ok_or_else(|| DataError::Parse("Missing date".to_string()))?;
            // Bars without a usable adjusted close are not worth caching.
            let Some(adj_close) = adj_closes.get(i).filter(|p| p.is_finite()) else {
                continue;
            };
            let open = opens.get(i).unwrap_or(adj_close);
            let high = highs.get(i).unwrap_or(adj_close);
            let low = lows.get(i).unwrap_or(adj_close);
            let close = closes.get(i).unwrap_or(adj_close);
            let volume = volumes.get(i).unwrap_or(0);

            tx.execute(
                "INSERT OR REPLACE INTO quotes
                 (symbol, date, open, high, low, close, volume, adjusted_close, cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    symbol, date, open, high, low, close, volume, adj_close, cached_at
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Clear all cached data.
    pub fn clear_all(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM quotes", [])?)
    }

    /// Clear cached data for a specific symbol.
    pub fn clear_symbol(&self, symbol: &str) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM quotes WHERE symbol = ?1", params![symbol])?)
    }

    /// Per-symbol bar counts and date coverage.
    pub fn symbol_summaries(&self) -> Result<Vec<SymbolSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol, COUNT(*), MIN(date), MAX(date)
             FROM quotes
             GROUP BY symbol
             ORDER BY symbol ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (symbol, bars, first, last) = row?;
            summaries.push(SymbolSummary {
                symbol,
                bars: bars as usize,
                first_date: parse_cached_date(&first)?,
                last_date: parse_cached_date(&last)?,
            });
        }
        Ok(summaries)
    }

    /// Get cache statistics.
    pub fn get_stats(&self) -> Result<CacheStats> {
        let quotes_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;

        let symbols_count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT symbol) FROM quotes", [], |row| {
                    row.get(0)
                })?;

        let (oldest, newest): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(date), MAX(date) FROM quotes",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(CacheStats {
            total_quotes: quotes_count as usize,
            unique_symbols: symbols_count as usize,
            oldest_date: oldest.as_deref().map(parse_cached_date).transpose()?,
            newest_date: newest.as_deref().map(parse_cached_date).transpose()?,
        })
    }
}

fn parse_cached_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| DataError::Parse(format!("cached date {value}: {e}")))
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total number of cached bars
    pub total_quotes: usize,
    /// Number of unique symbols
    pub unique_symbols: usize,
    /// Earliest cached date
    pub oldest_date: Option<NaiveDate>,
    /// Latest cached date
    pub newest_date: Option<NaiveDate>,
}

/// Cached coverage for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSummary {
    /// Symbol
    pub symbol: String,
    /// Number of cached bars
    pub bars: usize,
    /// First cached date
    pub first_date: NaiveDate,
    /// Last cached date
    pub last_date: NaiveDate,
}
