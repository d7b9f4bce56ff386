#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/treynor/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod universe;

// Re-export main types from sub-crates
pub use treynor_data as data;
pub use treynor_model as model;
pub use treynor_output as output;

pub use treynor_model::{ModelConfig, Optimization, SingleIndexModel};

// Re-export common universe types
pub use universe::{
    CandidateList, DEFAULT_BENCHMARKS, MAX_CANDIDATES, MIN_CANDIDATES, Universe, UniverseError,
    benchmark_candidates,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
