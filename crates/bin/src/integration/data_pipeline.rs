//! Data pipeline for fetching and preparing model input.
//!
//! Resolves the benchmark, fetches candidate bars concurrently and pivots
//! everything into a [`PriceTable`]. Reads go through the SQLite cache when
//! one is available so repeated runs avoid Yahoo Finance calls.

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use polars::prelude::*;
use tracing::{debug, warn};
use treynor_data::{
    DataError, DateRange, PRICE_COLUMN, PriceSource, SqliteCache, resolve_benchmark,
};
use treynor_model::{ModelError, PriceTable};

/// Error type for data pipeline operations.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DataPipelineError {
    /// Data fetch error.
    #[error("Data fetch error: {0}")]
    Fetch(#[from] DataError),
    /// Price table assembly error.
    #[error("Price table error: {0}")]
    Model(#[from] ModelError),
    /// Polars DataFrame error.
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Default number of concurrent fetches.
pub(crate) const DEFAULT_CONCURRENCY: usize = 10;

/// Configuration for data fetching.
#[derive(Debug, Clone)]
pub(crate) struct FetchConfig {
    /// Whether to use the cache.
    pub use_cache: bool,
    /// Whether to force refresh (ignore cached bars, still store new ones).
    pub force_refresh: bool,
    /// Maximum number of requests in flight.
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_refresh: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// A price source that serves covered ranges from the cache and stores
/// whatever it has to fetch.
#[derive(Debug)]
pub(crate) struct CachedSource<'a, S> {
    inner: &'a S,
    cache: Option<&'a SqliteCache>,
    force_refresh: bool,
}

impl<'a, S> CachedSource<'a, S> {
    pub(crate) const fn new(
        inner: &'a S,
        cache: Option<&'a SqliteCache>,
        force_refresh: bool,
    ) -> Self {
        Self {
            inner,
            cache,
            force_refresh,
        }
    }
}

impl<S: PriceSource> PriceSource for CachedSource<'_, S> {
    async fn fetch_prices(&self, symbol: &str, range: DateRange) -> treynor_data::Result<DataFrame> {
        if let Some(cache) = self.cache
            && !self.force_refresh
        {
            match cache.has_quotes(symbol, range) {
                Ok(true) => match cache.get_quotes(symbol, range) {
                    Ok(df) => {
                        debug!(symbol, "cache hit");
                        return Ok(df);
                    }
                    Err(e) => warn!(symbol, error = %e, "failed to read cached quotes"),
                },
                Ok(false) => debug!(symbol, "cache miss"),
                Err(e) => warn!(symbol, error = %e, "failed to check cache coverage"),
            }
        }

        let df = self.inner.fetch_prices(symbol, range).await?;

        if let Some(cache) = self.cache
            && let Err(e) = cache.put_quotes(&df)
        {
            warn!(symbol, error = %e, "failed to cache quotes");
        }

        Ok(df)
    }
}

/// Prices ready for the model.
#[derive(Debug)]
pub(crate) struct MarketData {
    /// Benchmark that was resolved
    pub benchmark: String,
    /// Wide price table holding the benchmark and every fetched candidate
    pub prices: PriceTable,
    /// Candidates whose fetch failed
    pub failed: Vec<String>,
}

/// Fetch the benchmark and all candidates and build the price table.
///
/// A candidate that cannot be fetched is logged and left out of the table;
/// the model later reports it as an exclusion. Failing to resolve any
/// benchmark aborts the run.
pub(crate) async fn load_market_data<S: PriceSource>(
    source: &S,
    cache: Option<&SqliteCache>,
    candidates: &[String],
    benchmarks: &[String],
    range: DateRange,
    config: &FetchConfig,
    progress: Option<&ProgressBar>,
) -> Result<MarketData, DataPipelineError> {
    let cache = if config.use_cache { cache } else { None };
    let source = CachedSource::new(source, cache, config.force_refresh);

    if let Some(pb) = progress {
        pb.set_length(candidates.len() as u64 + 1);
        pb.set_message("Resolving benchmark...");
    }

    let benchmark = resolve_benchmark(&source, benchmarks, range).await?;

    let to_fetch: Vec<&String> = candidates
        .iter()
        .filter(|s| **s != benchmark.symbol)
        .collect();

    if let Some(pb) = progress {
        pb.inc(1);
        pb.set_message(format!(
            "Fetching {} symbols ({} concurrent)...",
            to_fetch.len(),
            config.concurrency
        ));
    }

    let results: Vec<(String, treynor_data::Result<DataFrame>)> = stream::iter(to_fetch)
        .map(|symbol| {
            let source = &source;
            async move { (symbol.clone(), source.fetch_prices(symbol, range).await) }
        })
        .buffer_unordered(config.concurrency.max(1))
        .inspect(|_| {
            if let Some(pb) = progress {
                pb.inc(1);
            }
        })
        .collect()
        .await;

    let mut frames = vec![benchmark.prices.lazy()];
    let mut failed = Vec::new();
    for (symbol, result) in results {
        match result {
            Ok(df) => frames.push(df.lazy()),
            Err(e) => {
                match progress {
                    Some(pb) => pb.suspend(|| warn!(symbol = %symbol, error = %e, "fetch failed")),
                    None => warn!(symbol = %symbol, error = %e, "fetch failed"),
                }
                failed.push(symbol);
            }
        }
    }

    let combined = concat(frames, UnionArgs::default())?.collect()?;
    let prices = PriceTable::from_long(&combined, PRICE_COLUMN)?;

    Ok(MarketData {
        benchmark: benchmark.symbol,
        prices,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Datelike, NaiveDate, Weekday};
    use treynor_data::{InMemoryPriceSource, PriceBar};
    use treynor_model::SingleIndexModel;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    fn weekdays() -> Vec<NaiveDate> {
        range()
            .start()
            .iter_days()
            .take_while(|d| *d <= range().end())
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .collect()
    }

    /// Bars whose daily return mixes a shared market term with a
    /// symbol-specific one.
    fn bars(beta: f64, drift: f64, phase: f64) -> Vec<PriceBar> {
        let mut price = 100.0;
        weekdays()
            .into_iter()
            .enumerate()
            .map(|(t, date)| {
                if t > 0 {
                    let t = t as f64;
                    let market = 0.01 * t.sin();
                    let own = 0.004 * (1.7 * t + phase).cos();
                    price *= 1.0 + drift + beta * market + own;
                }
                PriceBar::flat(date, price)
            })
            .collect()
    }

    fn candidates() -> Vec<String> {
        ["AAA", "BBB", "CCC", "DDD", "EEE"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn benchmarks() -> Vec<String> {
        vec!["^GSPC".to_string(), "^DJI".to_string()]
    }

    fn source() -> InMemoryPriceSource {
        InMemoryPriceSource::new()
            .with_symbol("^GSPC", bars(1.0, 0.0, 0.0))
            .with_symbol("^DJI", bars(0.9, 0.0, 0.0))
            .with_symbol("AAA", bars(1.2, 0.003, 0.3))
            .with_symbol("BBB", bars(0.8, 0.001, 1.1))
            .with_symbol("CCC", bars(1.0, -0.002, 2.0))
            .with_symbol("DDD", bars(1.5, 0.002, 2.9))
            .with_symbol("EEE", bars(0.5, 0.000, 4.2))
    }

    fn no_cache() -> FetchConfig {
        FetchConfig {
            use_cache: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_loads_benchmark_and_candidates() {
        let data = load_market_data(
            &source(),
            None,
            &candidates(),
            &benchmarks(),
            range(),
            &no_cache(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(data.benchmark, "^GSPC");
        assert!(data.failed.is_empty());
        assert_eq!(data.prices.height(), weekdays().len());
        for symbol in candidates() {
            assert!(data.prices.contains(&symbol));
        }
    }

    #[tokio::test]
    async fn test_benchmark_fallback() {
        let mut source = source();
        source.insert("^GSPC", Vec::new());

        let data = load_market_data(
            &source,
            None,
            &candidates(),
            &benchmarks(),
            range(),
            &no_cache(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(data.benchmark, "^DJI");
    }

    #[tokio::test]
    async fn test_no_benchmark_aborts() {
        let source = InMemoryPriceSource::new().with_symbol("AAA", bars(1.0, 0.0, 0.0));
        let err = load_market_data(
            &source,
            None,
            &candidates(),
            &benchmarks(),
            range(),
            &no_cache(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DataPipelineError::Fetch(DataError::BenchmarkUnavailable { ref tried }) if tried.len() == 2
        ));
    }

    #[tokio::test]
    async fn test_failed_candidate_is_left_out() {
        let mut symbols = candidates();
        symbols.push("GONE".to_string());

        let data = load_market_data(
            &source(),
            None,
            &symbols,
            &benchmarks(),
            range(),
            &no_cache(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(data.failed, vec!["GONE".to_string()]);
        assert!(!data.prices.contains("GONE"));

        let result = SingleIndexModel::default()
            .optimize(&data.prices, &data.benchmark, &symbols)
            .unwrap();
        assert!(result.exclusions().iter().any(|e| e.symbol == "GONE"));
    }

    #[tokio::test]
    async fn test_fetched_bars_are_cached() {
        let cache = SqliteCache::in_memory().unwrap();
        load_market_data(
            &source(),
            Some(&cache),
            &candidates(),
            &benchmarks(),
            range(),
            &FetchConfig::default(),
            None,
        )
        .await
        .unwrap();

        assert!(cache.has_quotes("^GSPC", range()).unwrap());
        assert!(cache.has_quotes("AAA", range()).unwrap());
        // The fallback benchmark was never needed.
        assert!(!cache.has_quotes("^DJI", range()).unwrap());

        // A second run is served from the cache alone.
        let empty = InMemoryPriceSource::new();
        let data = load_market_data(
            &empty,
            Some(&cache),
            &candidates(),
            &benchmarks(),
            range(),
            &FetchConfig::default(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(data.benchmark, "^GSPC");
        assert!(data.failed.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_bypasses_cache() {
        let cache = SqliteCache::in_memory().unwrap();
        load_market_data(
            &source(),
            Some(&cache),
            &candidates(),
            &benchmarks(),
            range(),
            &FetchConfig::default(),
            None,
        )
        .await
        .unwrap();

        let refresh = FetchConfig {
            force_refresh: true,
            ..Default::default()
        };
        let err = load_market_data(
            &InMemoryPriceSource::new(),
            Some(&cache),
            &candidates(),
            &benchmarks(),
            range(),
            &refresh,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DataPipelineError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_pipeline_feeds_model() {
        let data = load_market_data(
            &source(),
            None,
            &candidates(),
            &benchmarks(),
            range(),
            &no_cache(),
            None,
        )
        .await
        .unwrap();

        let result = SingleIndexModel::default()
            .optimize(&data.prices, &data.benchmark, &candidates())
            .unwrap();

        assert_eq!(result.n_periods(), weekdays().len() - 1);
        assert_eq!(result.candidates().len(), 5);
        if !result.is_empty_selection() {
            assert_relative_eq!(result.allocation().total_weight(), 1.0, epsilon = 1e-9);
        }
    }
}
