#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/treynor/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod allocation;
pub mod capm;
pub mod config;
pub mod cutoff;
pub mod error;
pub mod estimator;
pub mod model;
pub mod returns;
pub mod selector;

// Re-export main types
pub use allocation::{Allocation, Position, WeightAllocator};
pub use capm::{ExcessReturnAdjuster, SecurityStatistics};
pub use config::{CutoffMethod, ModelConfig};
pub use cutoff::{CutoffEngine, CutoffResult, RankedCandidate, rank_candidates};
pub use error::ModelError;
pub use estimator::{MarketStatistics, SingleIndexEstimate, SingleIndexEstimator};
pub use model::{Exclusion, Optimization, SingleIndexModel};
pub use returns::{PriceTable, ReturnMatrix, ReturnSeriesBuilder};
pub use selector::{AllPositions, PositionSelector, TopN};
