#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/treynor/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod benchmark;
pub mod cache;
pub mod error;
pub mod range;
pub mod source;
pub mod yahoo;

pub use benchmark::{ResolvedBenchmark, resolve_benchmark};
pub use cache::{CacheStats, SqliteCache};
pub use error::{DataError, Result};
pub use range::DateRange;
pub use source::{InMemoryPriceSource, PRICE_COLUMN, PriceBar, PriceSource};
pub use yahoo::YahooQuoteProvider;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
