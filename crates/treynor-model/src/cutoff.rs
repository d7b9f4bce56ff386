//! Cutoff & Selection Engine
//!
//! Ranks candidates by their attractiveness ratio
//!
//! Ci = α_i / σ²(ε_i)
//!
//! and computes the cumulative cutoff rate over the ranked order:
//!
//! C*_k = (Σ_{i≤k} α_i β_i / σ²(ε_i)) / (1 + Σ_{i≤k} β_i² / σ²(ε_i))
//!
//! Every candidate with `Ci > C*` is selected. See [`CutoffMethod`] for the
//! two ways `C*` is picked from the cumulative sequence.

use crate::capm::SecurityStatistics;
use crate::config::CutoffMethod;
use serde::{Deserialize, Serialize};

/// A candidate in ranked order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// Statistics the ranking was computed from
    pub statistics: SecurityStatistics,
    /// Attractiveness ratio `α / σ²(ε)`
    pub ci: f64,
    /// 1-based rank by descending `ci`
    pub rank: usize,
    /// Cumulative cutoff `C*_k` over ranks `1..=rank`
    pub cumulative_cutoff: f64,
}

impl RankedCandidate {
    /// Security symbol
    pub fn symbol(&self) -> &str {
        &self.statistics.symbol
    }
}

/// Rank statistics by descending `Ci` and attach the cumulative cutoff.
///
/// The sort is stable, so equal ratios keep their input order.
pub fn rank_candidates(statistics: Vec<SecurityStatistics>) -> Vec<RankedCandidate> {
    let mut scored: Vec<(f64, SecurityStatistics)> =
        statistics.into_iter().map(|s| (s.ci(), s)).collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    scored
        .into_iter()
        .enumerate()
        .map(|(index, (ci, statistics))| {
            numerator += statistics.alpha_beta_over_variance();
            denominator += statistics.beta_squared_over_variance();
            RankedCandidate {
                statistics,
                ci,
                rank: index + 1,
                cumulative_cutoff: numerator / (1.0 + denominator),
            }
        })
        .collect()
}

/// Ranked candidates together with the chosen cutoff rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutoffResult {
    candidates: Vec<RankedCandidate>,
    cutoff: f64,
    method: CutoffMethod,
}

impl CutoffResult {
    /// Pair ranked candidates with an explicit cutoff rate.
    pub const fn new(candidates: Vec<RankedCandidate>, cutoff: f64, method: CutoffMethod) -> Self {
        Self {
            candidates,
            cutoff,
            method,
        }
    }

    /// The optimal cutoff rate `C*`.
    pub const fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Rule used to pick the cutoff.
    pub const fn method(&self) -> CutoffMethod {
        self.method
    }

    /// All candidates in rank order.
    pub fn candidates(&self) -> &[RankedCandidate] {
        &self.candidates
    }

    /// Whether a candidate clears the cutoff. The comparison is strict.
    pub fn is_selected(&self, candidate: &RankedCandidate) -> bool {
        candidate.ci > self.cutoff
    }

    /// Candidates with `Ci > C*`, in rank order.
    pub fn selected(&self) -> impl Iterator<Item = &RankedCandidate> + '_ {
        self.candidates.iter().filter(|c| self.is_selected(c))
    }

    /// Number of selected candidates.
    pub fn selected_count(&self) -> usize {
        self.selected().count()
    }
}

/// Cutoff & selection engine
#[derive(Debug, Clone, Copy, Default)]
pub struct CutoffEngine {
    method: CutoffMethod,
}

impl CutoffEngine {
    /// Create an engine using the given cutoff rule.
    pub const fn new(method: CutoffMethod) -> Self {
        Self { method }
    }

    /// Rank the statistics and determine `C*`.
    pub fn select(&self, statistics: Vec<SecurityStatistics>) -> CutoffResult {
        let candidates = rank_candidates(statistics);
        let cutoff = match self.method {
            // Known simplification: sums run over every candidate.
            CutoffMethod::FullUniverse => candidates
                .last()
                .map_or(0.0, |last| last.cumulative_cutoff),
            CutoffMethod::Iterative => candidates
                .iter()
                .take_while(|c| c.ci >= c.cumulative_cutoff)
                .last()
                .map_or(0.0, |c| c.cumulative_cutoff),
        };

        CutoffResult::new(candidates, cutoff, self.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stats(symbol: &str, alpha: f64, beta: f64, residual_variance: f64) -> SecurityStatistics {
        SecurityStatistics {
            symbol: symbol.to_string(),
            beta,
            intercept: alpha,
            alpha,
            residual_variance,
            expected_return: alpha,
            observations: 252,
        }
    }

    fn symbols(result: &CutoffResult) -> Vec<&str> {
        result.selected().map(RankedCandidate::symbol).collect()
    }

    #[test]
    fn test_ranking_and_cumulative_cutoff() {
        let ranked = rank_candidates(vec![
            stats("LOW", 0.01, 1.0, 0.04),
            stats("HIGH", 0.10, 1.0, 0.04),
            stats("MID", 0.05, 2.0, 0.04),
        ]);

        let order: Vec<&str> = ranked.iter().map(RankedCandidate::symbol).collect();
        assert_eq!(order, vec!["HIGH", "MID", "LOW"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].rank, 3);

        // k = 1: 2.5 / (1 + 25) ; k = 2: (2.5 + 2.5) / (1 + 25 + 100)
        assert_relative_eq!(ranked[0].cumulative_cutoff, 2.5 / 26.0, epsilon = 1e-12);
        assert_relative_eq!(ranked[1].cumulative_cutoff, 5.0 / 126.0, epsilon = 1e-12);
        assert_relative_eq!(ranked[2].cumulative_cutoff, 5.25 / 151.0, epsilon = 1e-12);
    }

    #[test]
    fn test_full_universe_cutoff() {
        let result = CutoffEngine::new(CutoffMethod::FullUniverse).select(vec![
            stats("A", 0.10, 1.0, 0.04),
            stats("B", 0.05, 2.0, 0.04),
            stats("C", -0.02, 1.0, 0.04),
        ]);

        // (2.5 + 2.5 - 0.5) / (1 + 25 + 100 + 25)
        assert_relative_eq!(result.cutoff(), 4.5 / 151.0, epsilon = 1e-12);
        assert_eq!(symbols(&result), vec!["A", "B"]);
        assert_eq!(result.method(), CutoffMethod::FullUniverse);
    }

    #[test]
    fn test_iterative_cutoff_stops_at_first_failure() {
        let candidates = vec![
            stats("A", 0.10, 1.0, 0.04),
            stats("B", 0.05, 2.0, 0.04),
            stats("C", -0.02, 1.0, 0.04),
        ];
        let result = CutoffEngine::new(CutoffMethod::Iterative).select(candidates);

        // C has Ci = -0.5 < C*_3, so the cutoff stops at rank 2.
        assert_relative_eq!(result.cutoff(), 5.0 / 126.0, epsilon = 1e-12);
        assert_eq!(symbols(&result), vec!["A", "B"]);
    }

    #[test]
    fn test_iterative_and_full_can_disagree() {
        // A large negative-alpha, high-beta tail drags the full-universe
        // cutoff below zero and admits a weak candidate.
        let candidates = vec![
            stats("STRONG", 0.20, 1.0, 0.04),
            stats("WEAK", 0.001, 1.0, 0.04),
            stats("DRAG", -0.50, 3.0, 0.04),
        ];

        let full = CutoffEngine::new(CutoffMethod::FullUniverse).select(candidates.clone());
        let iterative = CutoffEngine::new(CutoffMethod::Iterative).select(candidates);

        assert!(full.cutoff() < 0.0);
        assert_eq!(symbols(&full), vec!["STRONG", "WEAK"]);
        assert!(iterative.cutoff() > 0.0);
        assert_eq!(symbols(&iterative), vec!["STRONG"]);
    }

    #[test]
    fn test_candidate_equal_to_cutoff_is_excluded() {
        // Ci = 1/4 and C* = (2/4) / (1 + 4/4) = 1/4 exactly.
        let result = CutoffEngine::default().select(vec![stats("EDGE", 1.0, 2.0, 4.0)]);
        assert_eq!(result.cutoff(), 0.25);
        assert_eq!(result.candidates()[0].ci, 0.25);
        assert_eq!(result.selected_count(), 0);
    }

    #[test]
    fn test_candidate_just_above_cutoff_is_included() {
        let result = CutoffEngine::default().select(vec![stats("EDGE", 1.0, 2.0, 4.0 - 1e-12)]);
        assert!(result.candidates()[0].ci > result.cutoff());
        assert_eq!(symbols(&result), vec!["EDGE"]);
    }

    #[test]
    fn test_explicit_cutoff_boundary() {
        let ranked = rank_candidates(vec![stats("A", 0.1, 1.0, 0.1), stats("B", 0.2, 1.0, 0.1)]);
        let ci_b = ranked[0].ci;

        let at = CutoffResult::new(ranked.clone(), ci_b, CutoffMethod::FullUniverse);
        assert_eq!(at.selected_count(), 0);

        let below = CutoffResult::new(ranked, ci_b - 1e-12, CutoffMethod::FullUniverse);
        assert_eq!(symbols(&below), vec!["B"]);
    }

    #[test]
    fn test_empty_universe() {
        let result = CutoffEngine::default().select(Vec::new());
        assert_eq!(result.cutoff(), 0.0);
        assert!(result.candidates().is_empty());
        assert_eq!(result.selected_count(), 0);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let ranked = rank_candidates(vec![
            stats("FIRST", 0.1, 1.0, 0.1),
            stats("SECOND", 0.1, 1.0, 0.1),
        ]);
        assert_eq!(ranked[0].symbol(), "FIRST");
        assert_eq!(ranked[1].symbol(), "SECOND");
    }
}
