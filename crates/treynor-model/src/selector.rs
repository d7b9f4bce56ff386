//! Presentation-stage position selection.
//!
//! Truncation happens after weighting and never changes weight values.

use crate::allocation::Position;

/// Chooses which positions to present from a completed allocation.
pub trait PositionSelector {
    /// Select positions from the allocation, in presentation order.
    fn select<'a>(&self, positions: &'a [Position]) -> Vec<&'a Position>;
}

fn by_weight_descending(positions: &[Position]) -> Vec<&Position> {
    let mut sorted: Vec<&Position> = positions.iter().collect();
    sorted.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    sorted
}

/// The `n` largest positions by weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopN(pub usize);

impl Default for TopN {
    fn default() -> Self {
        Self(5)
    }
}

impl PositionSelector for TopN {
    fn select<'a>(&self, positions: &'a [Position]) -> Vec<&'a Position> {
        let mut sorted = by_weight_descending(positions);
        sorted.truncate(self.0);
        sorted
    }
}

/// Every position, sorted by weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllPositions;

impl PositionSelector for AllPositions {
    fn select<'a>(&self, positions: &'a [Position]) -> Vec<&'a Position> {
        by_weight_descending(positions)
    }
}
