//! Excess-Return Adjuster
//!
//! Re-expresses each security's return net of what CAPM says it should have
//! earned given its systematic risk:
//!
//! α_excess = E[R_i] − (r_f + β_i · (E[R_m] − r_f))

use crate::estimator::{MarketStatistics, SingleIndexEstimate};
use serde::{Deserialize, Serialize};

/// Per-security statistics after the CAPM adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityStatistics {
    /// Security symbol
    pub symbol: String,
    /// Systematic sensitivity β
    pub beta: f64,
    /// Annualized regression intercept
    pub intercept: f64,
    /// Annualized excess alpha net of the CAPM-implied return
    pub alpha: f64,
    /// Annualized residual variance σ²(ε)
    pub residual_variance: f64,
    /// Annualized mean return E[R_i]
    pub expected_return: f64,
    /// Number of return periods
    pub observations: usize,
}

impl SecurityStatistics {
    /// Attractiveness ratio `Ci = α / σ²(ε)`.
    pub const fn ci(&self) -> f64 {
        self.alpha / self.residual_variance
    }

    /// `α · β / σ²(ε)`, the numerator term of the cutoff rate.
    pub const fn alpha_beta_over_variance(&self) -> f64 {
        self.alpha * self.beta / self.residual_variance
    }

    /// `β² / σ²(ε)`, the denominator term of the cutoff rate.
    pub const fn beta_squared_over_variance(&self) -> f64 {
        self.beta * self.beta / self.residual_variance
    }
}

/// CAPM excess-return adjuster
#[derive(Debug, Clone, Copy)]
pub struct ExcessReturnAdjuster {
    risk_free_rate: f64,
}

impl ExcessReturnAdjuster {
    /// Create an adjuster for an annualized risk-free rate.
    pub const fn new(risk_free_rate: f64) -> Self {
        Self { risk_free_rate }
    }

    /// Risk-free rate
    pub const fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    /// CAPM-implied return `r_f + β (E[R_m] − r_f)`.
    pub const fn capm_return(&self, beta: f64, market_expected_return: f64) -> f64 {
        self.risk_free_rate + beta * (market_expected_return - self.risk_free_rate)
    }

    /// Excess alpha for one security.
    pub const fn excess_alpha(
        &self,
        expected_return: f64,
        beta: f64,
        market_expected_return: f64,
    ) -> f64 {
        expected_return - self.capm_return(beta, market_expected_return)
    }

    /// Attach the excess alpha to an estimate.
    pub fn adjust(
        &self,
        estimate: &SingleIndexEstimate,
        market: &MarketStatistics,
    ) -> SecurityStatistics {
        SecurityStatistics {
            symbol: estimate.symbol.clone(),
            beta: estimate.beta,
            intercept: estimate.intercept,
            alpha: self.excess_alpha(
                estimate.expected_return,
                estimate.beta,
                market.expected_return,
            ),
            residual_variance: estimate.residual_variance,
            expected_return: estimate.expected_return,
            observations: estimate.observations,
        }
    }

    /// Adjust a batch of estimates, preserving order.
    pub fn adjust_all(
        &self,
        estimates: &[SingleIndexEstimate],
        market: &MarketStatistics,
    ) -> Vec<SecurityStatistics> {
        estimates.iter().map(|e| self.adjust(e, market)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn market(expected_return: f64) -> MarketStatistics {
        MarketStatistics {
            symbol: "SPX".to_string(),
            expected_return,
            variance: 0.04,
            observations: 252,
        }
    }

    fn estimate(beta: f64, expected_return: f64) -> SingleIndexEstimate {
        SingleIndexEstimate {
            symbol: "AAPL".to_string(),
            beta,
            intercept: 0.05,
            residual_variance: 0.02,
            expected_return,
            observations: 252,
        }
    }

    #[test]
    fn test_capm_return() {
        let adjuster = ExcessReturnAdjuster::new(0.04);
        assert_relative_eq!(adjuster.capm_return(1.0, 0.10), 0.10, epsilon = 1e-12);
        assert_relative_eq!(adjuster.capm_return(0.0, 0.10), 0.04, epsilon = 1e-12);
        assert_relative_eq!(adjuster.capm_return(1.5, 0.10), 0.13, epsilon = 1e-12);
    }

    #[test]
    fn test_excess_alpha() {
        let adjuster = ExcessReturnAdjuster::new(0.04);
        let stats = adjuster.adjust(&estimate(1.5, 0.20), &market(0.10));

        // 0.20 - (0.04 + 1.5 * 0.06) = 0.07
        assert_relative_eq!(stats.alpha, 0.07, epsilon = 1e-12);
        assert_relative_eq!(stats.ci(), 0.07 / 0.02, epsilon = 1e-12);
        assert_relative_eq!(stats.alpha_beta_over_variance(), 0.07 * 1.5 / 0.02, epsilon = 1e-12);
        assert_relative_eq!(stats.beta_squared_over_variance(), 2.25 / 0.02, epsilon = 1e-12);
        assert_eq!(stats.intercept, 0.05);
    }

    #[test]
    fn test_negative_beta() {
        let adjuster = ExcessReturnAdjuster::new(0.04);
        // 0.03 - (0.04 - 0.5 * 0.06) = 0.02
        assert_relative_eq!(adjuster.excess_alpha(0.03, -0.5, 0.10), 0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_adjust_all_preserves_order() {
        let adjuster = ExcessReturnAdjuster::new(0.0);
        let mut second = estimate(1.0, 0.1);
        second.symbol = "MSFT".to_string();
        let stats = adjuster.adjust_all(&[estimate(1.0, 0.2), second], &market(0.1));
        assert_eq!(stats[0].symbol, "AAPL");
        assert_eq!(stats[1].symbol, "MSFT");
        assert_relative_eq!(stats[1].alpha, 0.0, epsilon = 1e-12);
    }
}
