//! Intermediate statistics of an optimization run.
//!
//! Lists every estimated candidate with its beta, excess alpha, residual
//! variance, attractiveness ratio and cumulative cutoff, plus the symbols
//! that were excluded and why.

use crate::summary::{cutoff_method_label, format_percent};
use serde::{Deserialize, Serialize};
use treynor_model::Optimization;

/// Statistics of one ranked candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticsRow {
    /// Rank by attractiveness ratio.
    pub rank: usize,

    /// Security symbol.
    pub symbol: String,

    /// Systematic sensitivity.
    pub beta: f64,

    /// Annualized excess alpha.
    pub alpha: f64,

    /// Annualized residual variance.
    pub residual_variance: f64,

    /// Annualized mean return.
    pub expected_return: f64,

    /// Attractiveness ratio `Ci`.
    pub ci: f64,

    /// Cumulative cutoff at this rank.
    pub cumulative_cutoff: f64,

    /// Whether the candidate cleared `C*`.
    pub selected: bool,

    /// Final weight, if selected.
    pub weight: Option<f64>,
}

/// A symbol left out of the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExclusionRow {
    /// Security symbol.
    pub symbol: String,

    /// Reason for the exclusion.
    pub reason: String,
}

/// Full diagnostics for an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticsTable {
    /// Benchmark symbol.
    pub benchmark: String,

    /// Annualized benchmark mean return.
    pub market_expected_return: f64,

    /// Annualized benchmark variance.
    pub market_variance: f64,

    /// Number of aligned return periods.
    pub periods: usize,

    /// Cutoff rule used.
    pub cutoff_method: String,

    /// Optimal cutoff rate `C*`.
    pub cutoff: f64,

    /// Candidates in rank order.
    pub rows: Vec<DiagnosticsRow>,

    /// Excluded symbols.
    pub exclusions: Vec<ExclusionRow>,
}

impl DiagnosticsTable {
    /// Collect diagnostics from an optimization.
    pub fn from_optimization(result: &Optimization) -> Self {
        let cutoff = result.cutoff_result();
        let rows = result
            .candidates()
            .iter()
            .map(|c| DiagnosticsRow {
                rank: c.rank,
                symbol: c.symbol().to_string(),
                beta: c.statistics.beta,
                alpha: c.statistics.alpha,
                residual_variance: c.statistics.residual_variance,
                expected_return: c.statistics.expected_return,
                ci: c.ci,
                cumulative_cutoff: c.cumulative_cutoff,
                selected: cutoff.is_selected(c),
                weight: result.allocation().weight_of(c.symbol()),
            })
            .collect();

        let exclusions = result
            .exclusions()
            .iter()
            .map(|e| ExclusionRow {
                symbol: e.symbol.clone(),
                reason: e.reason.to_string(),
            })
            .collect();

        Self {
            benchmark: result.market().symbol.clone(),
            market_expected_return: result.market().expected_return,
            market_variance: result.market().variance,
            periods: result.n_periods(),
            cutoff_method: cutoff_method_label(result.cutoff_method()).to_string(),
            cutoff: result.cutoff(),
            rows,
            exclusions,
        }
    }

    fn weight_label(row: &DiagnosticsRow) -> String {
        row.weight.map_or_else(|| "-".to_string(), format_percent)
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nDiagnostics (benchmark {})\n", self.benchmark));
        output.push_str(&"=".repeat(100));
        output.push('\n');
        output.push_str(&format!(
            "  E[R_m]: {:.4}   Var(R_m): {:.6}   Periods: {}\n",
            self.market_expected_return, self.market_variance, self.periods
        ));
        output.push_str(&format!(
            "  Cutoff C*: {:.6} ({})\n",
            self.cutoff, self.cutoff_method
        ));
        output.push_str(&"-".repeat(100));
        output.push('\n');
        output.push_str(&format!(
            "{:<4} {:<10} {:>9} {:>10} {:>12} {:>10} {:>12} {:>12} {:>4} {:>9}\n",
            "#", "Symbol", "Beta", "Alpha", "Resid Var", "E[R]", "Ci", "C*_k", "Sel", "Weight"
        ));
        output.push_str(&"-".repeat(100));
        output.push('\n');

        for row in &self.rows {
            output.push_str(&format!(
                "{:<4} {:<10} {:>9.4} {:>10.4} {:>12.6} {:>10.4} {:>12.4} {:>12.6} {:>4} {:>9}\n",
                row.rank,
                row.symbol,
                row.beta,
                row.alpha,
                row.residual_variance,
                row.expected_return,
                row.ci,
                row.cumulative_cutoff,
                if row.selected { "yes" } else { "no" },
                Self::weight_label(row)
            ));
        }

        if !self.exclusions.is_empty() {
            output.push_str("\nExcluded:\n");
            for exclusion in &self.exclusions {
                output.push_str(&format!("  {:<10} {}\n", exclusion.symbol, exclusion.reason));
            }
        }

        output.push_str(&"=".repeat(100));
        output.push('\n');

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("## Diagnostics\n\n");
        output.push_str(&format!(
            "- **Benchmark:** {} (E[R_m] {:.4}, variance {:.6}, {} periods)\n",
            self.benchmark, self.market_expected_return, self.market_variance, self.periods
        ));
        output.push_str(&format!(
            "- **Cutoff C\\*:** {:.6} ({})\n\n",
            self.cutoff, self.cutoff_method
        ));

        output.push_str(
            "| Rank | Symbol | Beta | Alpha | Residual Var | E[R] | Ci | C*_k | Selected | Weight |\n",
        );
        output.push_str(
            "|-----:|--------|-----:|------:|-------------:|-----:|---:|-----:|:--------:|-------:|\n",
        );
        for row in &self.rows {
            output.push_str(&format!(
                "| {} | {} | {:.4} | {:.4} | {:.6} | {:.4} | {:.4} | {:.6} | {} | {} |\n",
                row.rank,
                row.symbol,
                row.beta,
                row.alpha,
                row.residual_variance,
                row.expected_return,
                row.ci,
                row.cumulative_cutoff,
                if row.selected { "yes" } else { "no" },
                Self::weight_label(row)
            ));
        }

        if !self.exclusions.is_empty() {
            output.push_str("\n### Excluded\n\n");
            for exclusion in &self.exclusions {
                output.push_str(&format!("- **{}**: {}\n", exclusion.symbol, exclusion.reason));
            }
        }

        output
    }
}
