//! Single Index Model
//!
//! Wires the pipeline together:
//!
//! prices → returns → regression → CAPM excess alpha → cutoff → weights
//!
//! Data flows strictly forward. Per-security failures are collected as
//! [`Exclusion`]s so a batch with a few bad symbols still produces a result.

use crate::allocation::{Allocation, Position, WeightAllocator};
use crate::capm::{ExcessReturnAdjuster, SecurityStatistics};
use crate::config::{CutoffMethod, ModelConfig};
use crate::cutoff::{CutoffEngine, CutoffResult, RankedCandidate};
use crate::error::ModelError;
use crate::estimator::{MarketStatistics, SingleIndexEstimator};
use crate::returns::{PriceTable, ReturnMatrix, ReturnSeriesBuilder};
use crate::selector::{PositionSelector, TopN};
use chrono::NaiveDate;

/// A security dropped from the batch, with the reason.
#[derive(Debug)]
pub struct Exclusion {
    /// Security symbol
    pub symbol: String,
    /// Why it was excluded
    pub reason: ModelError,
}

impl Exclusion {
    /// Create a new exclusion
    pub fn new(symbol: impl Into<String>, reason: ModelError) -> Self {
        Self {
            symbol: symbol.into(),
            reason,
        }
    }
}

/// Result of one optimization run.
#[derive(Debug)]
pub struct Optimization {
    market: MarketStatistics,
    cutoff: CutoffResult,
    allocation: Allocation,
    exclusions: Vec<Exclusion>,
    first_date: Option<NaiveDate>,
    last_date: Option<NaiveDate>,
    top_n: usize,
}

impl Optimization {
    /// Benchmark statistics
    pub const fn market(&self) -> &MarketStatistics {
        &self.market
    }

    /// Every estimated candidate in rank order, selected or not.
    pub fn candidates(&self) -> &[RankedCandidate] {
        self.cutoff.candidates()
    }

    /// Statistics for the estimated candidates in rank order.
    pub fn statistics(&self) -> impl Iterator<Item = &SecurityStatistics> + '_ {
        self.cutoff.candidates().iter().map(|c| &c.statistics)
    }

    /// The optimal cutoff rate `C*`.
    pub const fn cutoff(&self) -> f64 {
        self.cutoff.cutoff()
    }

    /// Rule used to pick the cutoff.
    pub const fn cutoff_method(&self) -> CutoffMethod {
        self.cutoff.method()
    }

    /// Full cutoff result.
    pub const fn cutoff_result(&self) -> &CutoffResult {
        &self.cutoff
    }

    /// Weights over the whole selected set.
    pub const fn allocation(&self) -> &Allocation {
        &self.allocation
    }

    /// Selected positions in rank order.
    pub fn positions(&self) -> &[Position] {
        self.allocation.positions()
    }

    /// Securities excluded along the way.
    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    /// True when no candidate cleared the cutoff.
    pub fn is_empty_selection(&self) -> bool {
        self.allocation.is_empty()
    }

    /// Positions chosen by a presentation selector.
    pub fn top<S: PositionSelector>(&self, selector: &S) -> Vec<&Position> {
        selector.select(self.allocation.positions())
    }

    /// The configured number of largest positions.
    pub fn top_positions(&self) -> Vec<&Position> {
        self.top(&TopN(self.top_n))
    }

    /// Date of the first return period.
    pub const fn first_date(&self) -> Option<NaiveDate> {
        self.first_date
    }

    /// Date of the last return period.
    pub const fn last_date(&self) -> Option<NaiveDate> {
        self.last_date
    }

    /// Number of aligned return periods.
    pub const fn n_periods(&self) -> usize {
        self.market.observations
    }
}

/// Single index portfolio model
#[derive(Debug, Clone)]
pub struct SingleIndexModel {
    config: ModelConfig,
}

impl Default for SingleIndexModel {
    fn default() -> Self {
        Self {
            config: ModelConfig::default(),
        }
    }
}

impl SingleIndexModel {
    /// Create a model from a validated configuration.
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Model configuration
    pub const fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Run the full pipeline on a price table.
    ///
    /// # Arguments
    /// * `prices` - Wide price table with a `date` column
    /// * `benchmark` - Benchmark column name
    /// * `candidates` - Candidate symbols; duplicates are ignored
    pub fn optimize(
        &self,
        prices: &PriceTable,
        benchmark: &str,
        candidates: &[String],
    ) -> Result<Optimization, ModelError> {
        let aligned = ReturnSeriesBuilder::new().build(prices, benchmark, candidates)?;
        let mut optimization = self.optimize_returns(&aligned.returns)?;

        let mut exclusions = aligned.exclusions;
        exclusions.append(&mut optimization.exclusions);
        optimization.exclusions = exclusions;
        Ok(optimization)
    }

    /// Run the pipeline on already aligned returns.
    pub fn optimize_returns(&self, returns: &ReturnMatrix) -> Result<Optimization, ModelError> {
        let periods_per_year = self.config.periods_per_year;
        let market = MarketStatistics::from_returns(
            returns.benchmark_symbol(),
            returns.benchmark(),
            periods_per_year,
        );

        let outcome = SingleIndexEstimator::new(periods_per_year).estimate_all(returns);
        let statistics = ExcessReturnAdjuster::new(self.config.risk_free_rate)
            .adjust_all(&outcome.estimates, &market);
        let cutoff = CutoffEngine::new(self.config.cutoff_method).select(statistics);
        let allocation = WeightAllocator::new().allocate(&cutoff)?;

        Ok(Optimization {
            market,
            cutoff,
            allocation,
            exclusions: outcome.exclusions,
            first_date: returns.dates().first().copied(),
            last_date: returns.dates().last().copied(),
            top_n: self.config.top_n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n).map(|i| start + Duration::days(i as i64)).collect()
    }

    fn prices_from_returns(returns: &[f64]) -> Vec<Option<f64>> {
        let mut price = 100.0;
        let mut out = vec![Some(price)];
        for r in returns {
            price *= 1.0 + r;
            out.push(Some(price));
        }
        out
    }

    fn sample_table() -> PriceTable {
        let market = [0.01, -0.02, 0.015, 0.005, -0.01, 0.02, -0.005, 0.01];
        let good = [0.02, -0.015, 0.02, 0.0, -0.005, 0.03, 0.0, 0.012];
        let weak = [0.005, -0.03, 0.01, 0.008, -0.02, 0.01, -0.012, 0.004];
        PriceTable::from_columns(
            &dates(market.len() + 1),
            vec![
                ("SPX".to_string(), prices_from_returns(&market)),
                ("GOOD".to_string(), prices_from_returns(&good)),
                ("WEAK".to_string(), prices_from_returns(&weak)),
                ("FLAT".to_string(), vec![Some(10.0); market.len() + 1]),
            ],
        )
        .unwrap()
    }

    fn candidates(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_optimize_end_to_end() {
        let model = SingleIndexModel::default();
        let result = model
            .optimize(&sample_table(), "SPX", &candidates(&["GOOD", "WEAK", "GONE"]))
            .unwrap();

        assert_eq!(result.n_periods(), 8);
        assert_eq!(result.candidates().len(), 2);
        assert_eq!(result.exclusions().len(), 1);
        assert_eq!(result.exclusions()[0].symbol, "GONE");
        assert!(matches!(
            result.exclusions()[0].reason,
            ModelError::MissingSymbol(_)
        ));
        assert_eq!(result.candidates()[0].symbol(), "GOOD");
        assert_eq!(result.cutoff_method(), CutoffMethod::FullUniverse);

        assert!(result.cutoff() < 0.0);
        assert_eq!(result.positions().len(), 1);
        assert_relative_eq!(result.allocation().weight_of("GOOD").unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(result.top_positions()[0].symbol, "GOOD");
    }

    #[test]
    fn test_flat_security_is_excluded() {
        let model = SingleIndexModel::default();
        let result = model
            .optimize(&sample_table(), "SPX", &candidates(&["GOOD", "FLAT"]))
            .unwrap();

        let excluded: Vec<&str> = result.exclusions().iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(excluded, vec!["FLAT"]);
        assert!(matches!(
            result.exclusions()[0].reason,
            ModelError::DegenerateRegression(_)
        ));
    }

    #[test]
    fn test_missing_benchmark_fails_batch() {
        let err = SingleIndexModel::default()
            .optimize(&sample_table(), "NDX", &candidates(&["GOOD"]))
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingSymbol(ref s) if s == "NDX"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ModelConfig {
            periods_per_year: 0.0,
            ..Default::default()
        };
        assert!(SingleIndexModel::new(config).is_err());
    }

    #[test]
    fn test_period_dates() {
        let result = SingleIndexModel::default()
            .optimize(&sample_table(), "SPX", &candidates(&["GOOD"]))
            .unwrap();
        assert_eq!(result.first_date(), Some(dates(9)[1]));
        assert_eq!(result.last_date(), Some(dates(9)[8]));
    }
}
