//! Fetch a benchmark and a few symbols from Yahoo Finance and cache them.
//!
//! Run with: `cargo run -p treynor-data --example fetch_and_cache`

use std::time::Duration;
use treynor_data::{DateRange, PriceSource, SqliteCache, YahooQuoteProvider, resolve_benchmark};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = YahooQuoteProvider::with_rate_limit(Duration::from_millis(500))?;
    let cache = SqliteCache::in_memory()?;
    let range = DateRange::default();

    let benchmarks = vec!["^GSPC".to_string(), "^DJI".to_string(), "^IXIC".to_string()];
    let benchmark = resolve_benchmark(&provider, &benchmarks, range).await?;
    println!(
        "Benchmark {} with {} bars",
        benchmark.symbol,
        benchmark.prices.height()
    );
    cache.put_quotes(&benchmark.prices)?;

    for symbol in ["AAPL", "MSFT", "NVDA"] {
        match provider.fetch_prices(symbol, range).await {
            Ok(df) => {
                cache.put_quotes(&df)?;
                println!("{symbol}: {} bars", df.height());
            }
            Err(e) => println!("{symbol}: {e}"),
        }
    }

    let stats = cache.get_stats()?;
    println!(
        "Cache holds {} bars for {} symbols",
        stats.total_quotes, stats.unique_symbols
    );
    Ok(())
}
