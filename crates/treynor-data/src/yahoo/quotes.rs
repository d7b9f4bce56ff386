//! Daily price bars from Yahoo Finance.

use crate::error::{DataError, Result};
use crate::range::DateRange;
use crate::source::{PriceBar, PriceSource, bars_to_frame};
use chrono::DateTime;
use polars::prelude::DataFrame;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use yahoo_finance_api as yahoo;

/// Yahoo Finance quote provider with rate limiting.
pub struct YahooQuoteProvider {
    provider: yahoo::YahooConnector,
    rate_limit_delay: Duration,
}

impl std::fmt::Debug for YahooQuoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooQuoteProvider")
            .field("rate_limit_delay", &self.rate_limit_delay)
            .finish_non_exhaustive()
    }
}

impl YahooQuoteProvider {
    /// Create a provider with the default rate limit (1 req/sec).
    pub fn new() -> Result<Self> {
        Self::with_rate_limit(Duration::from_millis(1000))
    }

    /// Create a provider with a custom delay after each request.
    pub fn with_rate_limit(rate_limit_delay: Duration) -> Result<Self> {
        Ok(Self {
            provider: yahoo::YahooConnector::new()?,
            rate_limit_delay,
        })
    }

    /// Delay applied after each request
    pub const fn rate_limit_delay(&self) -> Duration {
        self.rate_limit_delay
    }

    /// Fetch OHLCV bars for a single symbol.
    ///
    /// # Returns
    /// A long frame with columns: symbol, date, open, high, low, close,
    /// volume, adjusted_close
    pub async fn fetch_quotes(&self, symbol: &str, range: DateRange) -> Result<DataFrame> {
        if symbol.trim().is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
        }

        let start_time = time::OffsetDateTime::from_unix_timestamp(range.start_utc().timestamp())
            .map_err(|e| DataError::TimeConversion(e.to_string()))?;
        let end_time = time::OffsetDateTime::from_unix_timestamp(range.end_utc().timestamp())
            .map_err(|e| DataError::TimeConversion(e.to_string()))?;

        debug!(symbol, start = %range.start(), end = %range.end(), "requesting quote history");
        let response = self
            .provider
            .get_quote_history(symbol, start_time, end_time)
            .await;

        // Apply rate limiting whether or not the request succeeded
        sleep(self.rate_limit_delay).await;

        let quotes = response?
            .quotes()
            .map_err(|e| DataError::YahooApi(e.to_string()))?;

        let mut bars = Vec::with_capacity(quotes.len());
        for q in &quotes {
            let date = DateTime::from_timestamp(q.timestamp, 0)
                .ok_or_else(|| {
                    DataError::TimeConversion(format!("invalid timestamp {}", q.timestamp))
                })?
                .date_naive();
            if !range.contains(date) {
                continue;
            }
            bars.push(PriceBar {
                date,
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume,
                adjusted_close: q.adjclose,
            });
        }

        if bars.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No data returned from Yahoo Finance".to_string(),
            });
        }

        bars_to_frame(symbol, &bars)
    }
}

impl PriceSource for YahooQuoteProvider {
    async fn fetch_prices(&self, symbol: &str, range: DateRange) -> Result<DataFrame> {
        self.fetch_quotes(symbol, range).await
    }
}
