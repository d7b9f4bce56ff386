//! Price sources.
//!
//! Every source returns daily bars as a long frame with the columns
//! `symbol, date, open, high, low, close, volume, adjusted_close`,
//! sorted by date.

use crate::error::{DataError, Result};
use crate::range::DateRange;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;

/// Column used as the price series by the model.
pub const PRICE_COLUMN: &str = "adjusted_close";

/// One daily OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading date
    pub date: NaiveDate,
    /// Opening price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Traded volume
    pub volume: u64,
    /// Split and dividend adjusted close
    pub adjusted_close: f64,
}

impl PriceBar {
    /// A bar with every price field set to `price`.
    pub const fn flat(date: NaiveDate, price: f64) -> Self {
        Self {
            date,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0,
            adjusted_close: price,
        }
    }
}

/// Build the long bar frame for one symbol.
pub fn bars_to_frame(symbol: &str, bars: &[PriceBar]) -> Result<DataFrame> {
    let dates: Vec<String> = bars.iter().map(|b| b.date.to_string()).collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();
    let adj_closes: Vec<f64> = bars.iter().map(|b| b.adjusted_close).collect();

    let df = DataFrame::new(vec![
        Series::new("symbol".into(), vec![symbol; bars.len()]).into(),
        Series::new("date".into(), dates).into(),
        Series::new("open".into(), opens).into(),
        Series::new("high".into(), highs).into(),
        Series::new("low".into(), lows).into(),
        Series::new("close".into(), closes).into(),
        Series::new("volume".into(), volumes).into(),
        Series::new(PRICE_COLUMN.into(), adj_closes).into(),
    ])?;

    let df = df
        .lazy()
        .with_column(col("date").cast(DataType::Date))
        .sort(["date"], SortMultipleOptions::default())
        .collect()?;

    Ok(df)
}

/// Count the rows of a bar frame with a usable (finite, positive) price.
pub fn usable_prices(frame: &DataFrame) -> Result<usize> {
    let prices = frame.column(PRICE_COLUMN)?.f64()?;
    Ok(prices
        .into_iter()
        .flatten()
        .filter(|p| p.is_finite() && *p > 0.0)
        .count())
}

/// A source of daily price bars.
pub trait PriceSource {
    /// Fetch bars for `symbol` within `range`.
    ///
    /// Returns [`DataError::MissingData`] when the source has nothing for the
    /// symbol in that window.
    fn fetch_prices(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> impl Future<Output = Result<DataFrame>>;
}

/// Price source backed by bars held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceSource {
    bars: HashMap<String, Vec<PriceBar>>,
}

impl InMemoryPriceSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the bars for a symbol.
    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<PriceBar>) {
        self.bars.insert(symbol.into(), bars);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_symbol(mut self, symbol: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        self.insert(symbol, bars);
        self
    }

    /// Symbols known to the source.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.bars.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}

impl PriceSource for InMemoryPriceSource {
    async fn fetch_prices(&self, symbol: &str, range: DateRange) -> Result<DataFrame> {
        let bars: Vec<PriceBar> = self
            .bars
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| range.contains(b.date))
                    .copied()
                    .collect()
            })
            .unwrap_or_default();

        if bars.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No bars in range".to_string(),
            });
        }

        bars_to_frame(symbol, &bars)
    }
}
