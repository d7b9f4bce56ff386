//! Runs the single index model on a small synthetic universe.

use chrono::{Duration, NaiveDate};
use treynor_model::{AllPositions, CutoffMethod, ModelConfig, PriceTable, SingleIndexModel};

fn synthetic_prices(
    n_days: usize,
    beta: f64,
    drift: f64,
    market: &[f64],
    seed: u64,
) -> Vec<Option<f64>> {
    let mut state = seed;
    let mut price = 100.0;
    let mut out = vec![Some(price)];
    for r_m in market.iter().take(n_days) {
        // Small linear congruential noise keeps the demo dependency free.
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let noise = ((state >> 33) as f64 / (1u64 << 31) as f64 - 0.5) * 0.02;
        price *= 1.0 + drift + beta * r_m + noise;
        out.push(Some(price));
    }
    out
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("==========================================================");
    println!("          Treynor Single Index Model - Demo");
    println!("==========================================================\n");

    let n_days = 250;
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("invalid start date")?;
    let dates: Vec<NaiveDate> = (0..=n_days as i64).map(|d| start + Duration::days(d)).collect();
    let market: Vec<f64> = (0..n_days)
        .map(|t| 0.0004 + 0.01 * ((t as f64) * 0.37).sin())
        .collect();

    let mut market_prices = vec![Some(100.0)];
    let mut level = 100.0;
    for r in &market {
        level *= 1.0 + r;
        market_prices.push(Some(level));
    }

    let universe = [
        ("ALFA", 1.2, 0.0010),
        ("BRVO", 0.8, 0.0006),
        ("CHRL", 1.0, -0.0004),
        ("DLTA", 1.5, 0.0002),
        ("ECHO", 0.6, 0.0008),
    ];

    let mut columns = vec![("^GSPC".to_string(), market_prices)];
    for (i, (symbol, beta, drift)) in universe.iter().enumerate() {
        columns.push((
            symbol.to_string(),
            synthetic_prices(n_days, *beta, *drift, &market, i as u64 + 1),
        ));
    }
    let prices = PriceTable::from_columns(&dates, columns)?;
    let candidates: Vec<String> = universe.iter().map(|(s, _, _)| s.to_string()).collect();

    for method in [CutoffMethod::FullUniverse, CutoffMethod::Iterative] {
        let model = SingleIndexModel::new(ModelConfig {
            cutoff_method: method,
            ..Default::default()
        })?;
        let result = model.optimize(&prices, "^GSPC", &candidates)?;

        println!("Cutoff method: {method:?}");
        println!("  E[R_m] = {:.4}", result.market().expected_return);
        println!("  C*     = {:.6}", result.cutoff());
        println!("  {:<6} {:>10} {:>8} {:>10}", "Symbol", "Ci", "Beta", "Alpha");
        for candidate in result.candidates() {
            println!(
                "  {:<6} {:>10.4} {:>8.3} {:>10.4}",
                candidate.symbol(),
                candidate.ci,
                candidate.statistics.beta,
                candidate.statistics.alpha
            );
        }
        println!("  Weights:");
        for position in result.top(&AllPositions) {
            println!("    {:<6} {:>7.2}%", position.symbol, position.weight * 100.0);
        }
        println!();
    }

    Ok(())
}
