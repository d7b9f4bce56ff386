//! Weight table for the selected portfolio.
//!
//! Shows the presented positions (by default the five largest) with their
//! weights as percentages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use treynor_model::{CutoffMethod, Optimization, PositionSelector};

/// Format a weight fraction as a percentage with two decimals.
///
/// # Examples
///
/// ```
/// use treynor_output::format_percent;
///
/// assert_eq!(format_percent(0.830744), "83.07%");
/// assert_eq!(format_percent(1.0), "100.00%");
/// ```
pub fn format_percent(weight: f64) -> String {
    format!("{:.2}%", weight * 100.0)
}

/// Human-readable name of a cutoff rule.
pub const fn cutoff_method_label(method: CutoffMethod) -> &'static str {
    match method {
        CutoffMethod::FullUniverse => "full universe",
        CutoffMethod::Iterative => "iterative",
    }
}

/// One presented position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightRow {
    /// Security symbol.
    pub symbol: String,

    /// Weight as a fraction of the active portfolio.
    pub weight: f64,
}

/// Presented positions of an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightTable {
    /// Benchmark the securities were regressed on.
    pub benchmark: String,

    /// First return period.
    pub period_start: Option<NaiveDate>,

    /// Last return period.
    pub period_end: Option<NaiveDate>,

    /// Optimal cutoff rate `C*`.
    pub cutoff: f64,

    /// Number of securities that cleared the cutoff.
    pub selected: usize,

    /// Positions in descending weight order.
    pub rows: Vec<WeightRow>,
}

impl WeightTable {
    /// Build the table from an optimization, presenting what `selector` picks.
    pub fn from_optimization<S: PositionSelector>(result: &Optimization, selector: &S) -> Self {
        let rows = result
            .top(selector)
            .into_iter()
            .map(|p| WeightRow {
                symbol: p.symbol.clone(),
                weight: p.weight,
            })
            .collect();

        Self {
            benchmark: result.market().symbol.clone(),
            period_start: result.first_date(),
            period_end: result.last_date(),
            cutoff: result.cutoff(),
            selected: result.positions().len(),
            rows,
        }
    }

    /// True when no security cleared the cutoff.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of the presented weights.
    pub fn presented_weight(&self) -> f64 {
        self.rows.iter().map(|r| r.weight).sum()
    }

    fn period_label(&self) -> String {
        match (self.period_start, self.period_end) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            _ => "n/a".to_string(),
        }
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nTop {} Stocks & Their Weights\n", self.rows.len()));
        output.push_str(&format!(
            "Benchmark: {}  Period: {}\n",
            self.benchmark,
            self.period_label()
        ));
        output.push_str(&"=".repeat(40));
        output.push('\n');

        if self.is_empty() {
            output.push_str("No securities cleared the cutoff rate.\n");
        } else {
            output.push_str(&format!("{:<4} {:<12} {:>12}\n", "#", "Symbol", "Weight"));
            output.push_str(&"-".repeat(40));
            output.push('\n');
            for (i, row) in self.rows.iter().enumerate() {
                output.push_str(&format!(
                    "{:<4} {:<12} {:>12}\n",
                    i + 1,
                    row.symbol,
                    format_percent(row.weight)
                ));
            }
        }

        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!(
            "Cutoff rate C*: {:.6}  ({} selected)\n",
            self.cutoff, self.selected
        ));
        output.push_str(&"=".repeat(40));
        output.push('\n');

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "# Top {} Stocks & Their Weights\n\n",
            self.rows.len()
        ));
        output.push_str(&format!(
            "**Benchmark:** {}  \n**Period:** {}\n\n",
            self.benchmark,
            self.period_label()
        ));

        if self.is_empty() {
            output.push_str("_No securities cleared the cutoff rate._\n\n");
        } else {
            output.push_str("| Symbol | Weight |\n");
            output.push_str("|--------|-------:|\n");
            for row in &self.rows {
                output.push_str(&format!(
                    "| {} | {} |\n",
                    row.symbol,
                    format_percent(row.weight)
                ));
            }
            output.push('\n');
        }

        output.push_str(&format!(
            "**Cutoff rate C\\*:** {:.6} ({} selected)\n",
            self.cutoff, self.selected
        ));

        output
    }
}

impl fmt::Display for WeightTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{:<8} {:>8}", row.symbol, format_percent(row.weight))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn table(rows: Vec<(&str, f64)>) -> WeightTable {
        WeightTable {
            benchmark: "^GSPC".to_string(),
            period_start: NaiveDate::from_ymd_opt(2022, 1, 4),
            period_end: NaiveDate::from_ymd_opt(2024, 12, 31),
            cutoff: 0.085,
            selected: rows.len(),
            rows: rows
                .into_iter()
                .map(|(symbol, weight)| WeightRow {
                    symbol: symbol.to_string(),
                    weight,
                })
                .collect(),
        }
    }

    #[rstest]
    #[case(0.8307439963810841, "83.07%")]
    #[case(0.16925600361891585, "16.93%")]
    #[case(0.0, "0.00%")]
    #[case(-0.25, "-25.00%")]
    fn test_format_percent(#[case] weight: f64, #[case] expected: &str) {
        assert_eq!(format_percent(weight), expected);
    }

    #[test]
    fn test_ascii_table() {
        let ascii = table(vec![("ALFA", 0.83), ("BRVO", 0.17)]).to_ascii_table();
        assert!(ascii.contains("Top 2 Stocks"));
        assert!(ascii.contains("^GSPC"));
        assert!(ascii.contains("2022-01-04 to 2024-12-31"));
        assert!(ascii.contains("ALFA"));
        assert!(ascii.contains("83.00%"));
        assert!(ascii.contains("0.085000"));
    }

    #[test]
    fn test_markdown() {
        let markdown = table(vec![("ALFA", 1.0)]).to_markdown();
        assert!(markdown.contains("# Top 1 Stocks"));
        assert!(markdown.contains("| Symbol | Weight |"));
        assert!(markdown.contains("| ALFA | 100.00% |"));
    }

    #[test]
    fn test_empty_table() {
        let empty = table(vec![]);
        assert!(empty.is_empty());
        assert!(empty.to_ascii_table().contains("No securities cleared"));
        assert!(empty.to_markdown().contains("No securities cleared"));
        assert_eq!(empty.presented_weight(), 0.0);
    }

    #[test]
    fn test_display() {
        let shown = table(vec![("ALFA", 0.5), ("BRVO", 0.5)]).to_string();
        assert_eq!(shown.lines().count(), 2);
        assert!(shown.starts_with("ALFA"));
    }
}
