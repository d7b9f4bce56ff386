//! Error types for the single index pipeline.

use thiserror::Error;

/// Errors that can occur while building returns, estimating the model,
/// or allocating weights.
///
/// Per-security failures ([`ModelError::MissingSymbol`] and
/// [`ModelError::DegenerateRegression`]) are attached to an
/// [`Exclusion`](crate::Exclusion) in the batch result instead of aborting
/// the run. Everything else aborts the batch.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Not enough aligned observations to estimate anything
    #[error("Insufficient data: need at least {required} return periods, got {actual}")]
    InsufficientData {
        /// Required number of periods
        required: usize,
        /// Actual number of periods
        actual: usize,
    },

    /// A requested symbol has no usable prices in the table
    #[error("Insufficient data: no usable prices for {0}")]
    MissingSymbol(String),

    /// The regression is undefined for this sample
    #[error("Degenerate regression: {0}")]
    DegenerateRegression(String),

    /// The cutoff rate cannot be used to scale allocation scores
    #[error("Degenerate cutoff rate: {0}")]
    DegenerateCutoff(f64),

    /// Allocation scores of the selected set sum to zero
    #[error("Allocation scores of the selected securities sum to zero")]
    ZeroAllocation,

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

impl ModelError {
    /// Returns true for failures that belong to a single security rather
    /// than to the whole batch.
    #[must_use]
    pub const fn is_per_security(&self) -> bool {
        matches!(self, Self::MissingSymbol(_) | Self::DegenerateRegression(_))
    }

    /// Returns true for the insufficient-data family (too few periods or an
    /// absent symbol).
    #[must_use]
    pub const fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. } | Self::MissingSymbol(_))
    }
}
