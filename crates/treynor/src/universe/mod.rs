//! Candidate universes and benchmark defaults.

pub mod benchmark;
pub mod candidates;

pub use benchmark::{DEFAULT_BENCHMARKS, benchmark_candidates};
pub use candidates::{CandidateList, MAX_CANDIDATES, MIN_CANDIDATES, UniverseError};

/// Trait for stock universes.
pub trait Universe {
    /// Get all symbols in the universe.
    fn symbols(&self) -> Vec<String>;

    /// Check if a symbol is in the universe.
    fn contains(&self, symbol: &str) -> bool {
        self.symbols().iter().any(|s| s == symbol)
    }

    /// Get the number of constituents.
    fn size(&self) -> usize {
        self.symbols().len()
    }
}

impl Universe for CandidateList {
    fn symbols(&self) -> Vec<String> {
        self.as_slice().to_vec()
    }

    fn contains(&self, symbol: &str) -> bool {
        self.as_slice().iter().any(|s| s == symbol)
    }

    fn size(&self) -> usize {
        self.len()
    }
}
