//! Model configuration.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// How the optimal cutoff rate `C*` is determined from the ranked candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutoffMethod {
    /// Cumulative sums over the entire ranked candidate set.
    ///
    /// This is the deployed formula. It deviates from the textbook
    /// Elton-Gruber-Padberg procedure, which truncates the sums at the last
    /// self-consistent rank, and can admit a slightly different selection.
    #[default]
    FullUniverse,
    /// Textbook truncation: `C*` is the cumulative value at the largest rank
    /// `k` for which every candidate up to `k` satisfies `Ci >= C*_k`.
    Iterative,
}

/// Configuration for the single index model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Annualized risk-free rate (default: 0.04)
    pub risk_free_rate: f64,

    /// Return periods per year used for annualization (default: 252 trading days)
    pub periods_per_year: f64,

    /// Cutoff rule (default: full universe)
    pub cutoff_method: CutoffMethod,

    /// Number of positions kept for presentation (default: 5)
    pub top_n: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.04,
            periods_per_year: 252.0,
            cutoff_method: CutoffMethod::FullUniverse,
            top_n: 5,
        }
    }
}

impl ModelConfig {
    /// Check that the parameters describe a usable model.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.risk_free_rate.is_finite() {
            return Err(ModelError::InvalidParameter(format!(
                "risk-free rate must be finite, got {}",
                self.risk_free_rate
            )));
        }
        if !(self.periods_per_year.is_finite() && self.periods_per_year > 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "periods per year must be positive, got {}",
                self.periods_per_year
            )));
        }
        if self.top_n == 0 {
            return Err(ModelError::InvalidParameter(
                "top_n must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
