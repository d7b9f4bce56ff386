//! Benchmark defaults.

/// Benchmarks tried in order when none is given: S&P 500, Dow Jones
/// Industrial Average, Nasdaq Composite.
pub const DEFAULT_BENCHMARKS: [&str; 3] = ["^GSPC", "^DJI", "^IXIC"];

/// Ordered benchmark candidates.
///
/// Uses `preferred` (trimmed, uppercased, deduplicated) when non-empty and
/// [`DEFAULT_BENCHMARKS`] otherwise.
pub fn benchmark_candidates(preferred: &[String]) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    for symbol in preferred {
        let symbol = symbol.trim().to_ascii_uppercase();
        if !symbol.is_empty() && !candidates.contains(&symbol) {
            candidates.push(symbol);
        }
    }

    if candidates.is_empty() {
        DEFAULT_BENCHMARKS.iter().map(|s| s.to_string()).collect()
    } else {
        candidates
    }
}
