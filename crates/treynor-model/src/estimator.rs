//! Single-Index Estimator
//!
//! Fits the market model for each security independently:
//!
//! R_i = α + β · R_m + ε
//!
//! by ordinary least squares over the paired return series, then annualizes
//! the per-period statistics:
//! - β is scale-invariant and is not annualized
//! - mean return, intercept and residual variance are multiplied by the
//!   number of periods per year
//!
//! Variances use the sample divisor `n - 1`.

use crate::error::ModelError;
use crate::model::Exclusion;
use crate::returns::{MIN_RETURN_PERIODS, ReturnMatrix};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// A residual variance at or below this fraction of the security's own
/// return variance is treated as zero.
pub const RESIDUAL_VARIANCE_TOLERANCE: f64 = 1e-12;

/// Per-period OLS fit of security returns on benchmark returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionFit {
    /// Regression intercept (α), per period
    pub intercept: f64,
    /// Regression slope (β)
    pub slope: f64,
    /// Sample variance of the residuals, per period
    pub residual_variance: f64,
    /// Mean security return, per period
    pub mean_return: f64,
    /// Sample variance of the security returns, per period
    pub return_variance: f64,
    /// Number of paired observations
    pub observations: usize,
}

/// Ordinary least squares of `security` on `market`.
///
/// Fails with [`ModelError::DegenerateRegression`] when the market series
/// has zero variance over the window.
pub fn ols_fit(
    market: ArrayView1<'_, f64>,
    security: ArrayView1<'_, f64>,
) -> Result<RegressionFit, ModelError> {
    let n = market.len();
    if security.len() != n {
        return Err(ModelError::InvalidParameter(format!(
            "security has {} returns, benchmark has {}",
            security.len(),
            n
        )));
    }
    if n < MIN_RETURN_PERIODS {
        return Err(ModelError::InsufficientData {
            required: MIN_RETURN_PERIODS,
            actual: n,
        });
    }

    let n_f = n as f64;
    let mean_x = market.sum() / n_f;
    let mean_y = security.sum() / n_f;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (&x, &y) in market.iter().zip(security.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    // Relative to the raw second moment so a constant non-zero series whose
    // deviations are pure rounding noise still counts as flat.
    let scale = market.iter().map(|x| x * x).sum::<f64>();
    if !sxx.is_finite() || sxx <= f64::EPSILON * scale {
        return Err(ModelError::DegenerateRegression(
            "benchmark returns have zero variance over the sample window".to_string(),
        ));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let residuals = security.to_owned() - &market.mapv(|x| intercept + slope * x);
    let residual_mean = residuals.sum() / n_f;
    let residual_variance = residuals
        .iter()
        .map(|e| (e - residual_mean).powi(2))
        .sum::<f64>()
        / (n_f - 1.0);

    Ok(RegressionFit {
        intercept,
        slope,
        residual_variance,
        mean_return: mean_y,
        return_variance: syy / (n_f - 1.0),
        observations: n,
    })
}

/// Annualized statistics of the benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStatistics {
    /// Benchmark symbol
    pub symbol: String,
    /// Annualized mean return E[R_m]
    pub expected_return: f64,
    /// Annualized sample variance
    pub variance: f64,
    /// Number of return periods
    pub observations: usize,
}

impl MarketStatistics {
    /// Compute benchmark statistics from its return series.
    pub fn from_returns(
        symbol: impl Into<String>,
        returns: ArrayView1<'_, f64>,
        periods_per_year: f64,
    ) -> Self {
        let n = returns.len();
        let mean = returns.mean().unwrap_or(0.0);
        let variance = if n > 1 {
            returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0)
        } else {
            0.0
        };

        Self {
            symbol: symbol.into(),
            expected_return: mean * periods_per_year,
            variance: variance * periods_per_year,
            observations: n,
        }
    }
}

/// Annualized single index estimate for one security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleIndexEstimate {
    /// Security symbol
    pub symbol: String,
    /// Systematic sensitivity β
    pub beta: f64,
    /// Annualized regression intercept α
    pub intercept: f64,
    /// Annualized residual variance σ²(ε), strictly positive
    pub residual_variance: f64,
    /// Annualized mean return E[R_i]
    pub expected_return: f64,
    /// Number of return periods
    pub observations: usize,
}

/// Estimates produced for a batch, with the securities that failed.
#[derive(Debug)]
pub struct EstimationOutcome {
    /// Successful estimates, in return-matrix column order
    pub estimates: Vec<SingleIndexEstimate>,
    /// Securities whose regression was degenerate
    pub exclusions: Vec<Exclusion>,
}

/// Single index estimator
#[derive(Debug, Clone, Copy)]
pub struct SingleIndexEstimator {
    periods_per_year: f64,
}

impl Default for SingleIndexEstimator {
    fn default() -> Self {
        Self::new(252.0)
    }
}

impl SingleIndexEstimator {
    /// Create an estimator that annualizes with `periods_per_year`.
    pub const fn new(periods_per_year: f64) -> Self {
        Self { periods_per_year }
    }

    /// Annualization constant
    pub const fn periods_per_year(&self) -> f64 {
        self.periods_per_year
    }

    /// Estimate one security against the benchmark.
    ///
    /// A residual variance that is zero, negative, or numerically
    /// indistinguishable from zero is rejected as degenerate.
    pub fn estimate(
        &self,
        symbol: &str,
        market: ArrayView1<'_, f64>,
        security: ArrayView1<'_, f64>,
    ) -> Result<SingleIndexEstimate, ModelError> {
        let fit = ols_fit(market, security)?;

        let residual_variance = fit.residual_variance;
        if !residual_variance.is_finite()
            || residual_variance <= 0.0
            || residual_variance <= RESIDUAL_VARIANCE_TOLERANCE * fit.return_variance
        {
            return Err(ModelError::DegenerateRegression(format!(
                "residual variance of {symbol} is zero"
            )));
        }

        Ok(SingleIndexEstimate {
            symbol: symbol.to_string(),
            beta: fit.slope,
            intercept: fit.intercept * self.periods_per_year,
            residual_variance: residual_variance * self.periods_per_year,
            expected_return: fit.mean_return * self.periods_per_year,
            observations: fit.observations,
        })
    }

    /// Estimate every security in the matrix.
    ///
    /// Each regression reads its own column and the shared benchmark view;
    /// failures are collected per security instead of aborting the batch.
    pub fn estimate_all(&self, returns: &ReturnMatrix) -> EstimationOutcome {
        let market = returns.benchmark();
        let mut estimates = Vec::with_capacity(returns.n_securities());
        let mut exclusions = Vec::new();

        for (index, symbol) in returns.symbols().iter().enumerate() {
            match self.estimate(symbol, market, returns.security(index)) {
                Ok(estimate) => estimates.push(estimate),
                Err(reason) => exclusions.push(Exclusion::new(symbol.clone(), reason)),
            }
        }

        EstimationOutcome {
            estimates,
            exclusions,
        }
    }
}
