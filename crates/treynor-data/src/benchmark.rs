//! Benchmark resolution with ordered fallback.

use crate::error::{DataError, Result};
use crate::range::DateRange;
use crate::source::{PriceSource, usable_prices};
use polars::prelude::DataFrame;
use tracing::{info, warn};

/// A benchmark symbol together with the bars that were fetched for it.
#[derive(Debug, Clone)]
pub struct ResolvedBenchmark {
    /// Symbol that returned usable prices
    pub symbol: String,
    /// Long-format bars for the symbol
    pub prices: DataFrame,
}

/// Return the first benchmark candidate with usable prices in `range`.
///
/// Candidates are tried in order. A candidate whose fetch fails, or whose
/// bars contain no positive finite price, is skipped. When every candidate
/// is exhausted the error lists what was tried.
pub async fn resolve_benchmark<S: PriceSource>(
    source: &S,
    candidates: &[String],
    range: DateRange,
) -> Result<ResolvedBenchmark> {
    let mut tried = Vec::with_capacity(candidates.len());

    for symbol in candidates {
        tried.push(symbol.clone());
        match source.fetch_prices(symbol, range).await {
            Ok(prices) => match usable_prices(&prices) {
                Ok(0) => warn!(symbol = %symbol, "benchmark returned no usable prices"),
                Ok(count) => {
                    info!(symbol = %symbol, bars = count, "resolved benchmark");
                    return Ok(ResolvedBenchmark {
                        symbol: symbol.clone(),
                        prices,
                    });
                }
                Err(e) => warn!(symbol = %symbol, error = %e, "unreadable benchmark data"),
            },
            Err(e) => warn!(symbol = %symbol, error = %e, "benchmark fetch failed"),
        }
    }

    Err(DataError::BenchmarkUnavailable { tried })
}
