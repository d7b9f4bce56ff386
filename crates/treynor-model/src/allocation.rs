//! Weight Allocator
//!
//! Each selected candidate receives the unnormalized score
//!
//! z_i = (α_i / σ²(ε_i)) · (β_i / C*)
//!
//! and the final weight `w_i = z_i / Σ z_j` over the selected set.

use crate::cutoff::{CutoffResult, RankedCandidate};
use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// A selected security with its allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Security symbol
    pub symbol: String,
    /// Rank by attractiveness ratio
    pub rank: usize,
    /// Attractiveness ratio `Ci`
    pub ci: f64,
    /// Systematic sensitivity β
    pub beta: f64,
    /// Annualized excess alpha
    pub alpha: f64,
    /// Annualized residual variance
    pub residual_variance: f64,
    /// Unnormalized allocation score `z`
    pub score: f64,
    /// Normalized weight
    pub weight: f64,
}

/// Normalized weights for the selected set, in rank order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    positions: Vec<Position>,
}

impl Allocation {
    /// Positions in rank order
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Consume the allocation, returning its positions.
    pub fn into_positions(self) -> Vec<Position> {
        self.positions
    }

    /// Whether nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of positions
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Sum of all weights.
    pub fn total_weight(&self) -> f64 {
        self.positions.iter().map(|p| p.weight).sum()
    }

    /// Weight of a symbol, if it was selected.
    pub fn weight_of(&self, symbol: &str) -> Option<f64> {
        self.positions
            .iter()
            .find(|p| p.symbol == symbol)
            .map(|p| p.weight)
    }
}

/// Weight allocator
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightAllocator;

impl WeightAllocator {
    /// Create a new allocator.
    pub const fn new() -> Self {
        Self
    }

    /// Unnormalized score for one candidate.
    pub const fn score(candidate: &RankedCandidate, cutoff: f64) -> f64 {
        candidate.ci * (candidate.statistics.beta / cutoff)
    }

    /// Compute normalized weights for the selected candidates.
    ///
    /// An empty selection yields an empty allocation. A non-empty selection
    /// needs a finite, non-zero cutoff and a non-zero score total.
    pub fn allocate(&self, result: &CutoffResult) -> Result<Allocation, ModelError> {
        let selected: Vec<&RankedCandidate> = result.selected().collect();
        if selected.is_empty() {
            return Ok(Allocation::default());
        }

        let cutoff = result.cutoff();
        if cutoff == 0.0 || !cutoff.is_finite() {
            return Err(ModelError::DegenerateCutoff(cutoff));
        }

        let scores: Vec<f64> = selected.iter().map(|c| Self::score(c, cutoff)).collect();
        let total: f64 = scores.iter().sum();
        let magnitude: f64 = scores.iter().map(|z| z.abs()).sum();
        if !total.is_finite() || total.abs() <= f64::EPSILON * magnitude {
            return Err(ModelError::ZeroAllocation);
        }

        let positions = selected
            .into_iter()
            .zip(scores)
            .map(|(candidate, score)| Position {
                symbol: candidate.symbol().to_string(),
                rank: candidate.rank,
                ci: candidate.ci,
                beta: candidate.statistics.beta,
                alpha: candidate.statistics.alpha,
                residual_variance: candidate.statistics.residual_variance,
                score,
                weight: score / total,
            })
            .collect();

        Ok(Allocation { positions })
    }
}
