//! Renders and exports the result of a small optimization.

use chrono::{Duration, NaiveDate};
use treynor_model::{PriceTable, SingleIndexModel, TopN};
use treynor_output::{DiagnosticsTable, ExportFormat, Exporter, WeightTable};

fn series(start: f64, step: &[f64]) -> Vec<Option<f64>> {
    let mut price = start;
    let mut out = vec![Some(price)];
    for r in step.iter().cycle().take(60) {
        price *= 1.0 + r;
        out.push(Some(price));
    }
    out
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Treynor Export Demo ===\n");

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("invalid date")?;
    let dates: Vec<NaiveDate> = (0..=60).map(|d| start + Duration::days(d)).collect();

    let prices = PriceTable::from_columns(
        &dates,
        vec![
            ("^GSPC".to_string(), series(4700.0, &[0.004, -0.006, 0.003, 0.001, -0.002])),
            ("AAA".to_string(), series(50.0, &[0.007, -0.005, 0.006, 0.002, -0.001])),
            ("BBB".to_string(), series(80.0, &[0.003, -0.004, 0.004, 0.003, -0.001])),
            ("CCC".to_string(), series(20.0, &[0.002, -0.009, 0.001, 0.0, -0.004])),
        ],
    )?;

    let candidates = vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()];
    let result = SingleIndexModel::default().optimize(&prices, "^GSPC", &candidates)?;

    let weights = WeightTable::from_optimization(&result, &TopN(5));
    println!("{}", weights.to_ascii_table());
    println!("{}", weights.to_markdown());

    println!("CSV:");
    println!("{}", weights.export_to_string(ExportFormat::Csv)?);

    let diagnostics = DiagnosticsTable::from_optimization(&result);
    println!("{}", diagnostics.to_ascii_table());
    println!("JSON:");
    println!("{}", diagnostics.export_to_string(ExportFormat::PrettyJson)?);

    Ok(())
}
