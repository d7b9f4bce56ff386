//! Treynor CLI binary.
//!
//! Runs the single index portfolio model against Yahoo Finance prices and
//! manages the local price cache.

mod integration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use integration::cache_manager::{cache_path, open_cache};
use integration::data_pipeline::{DEFAULT_CONCURRENCY, FetchConfig, load_market_data};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration as StdDuration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use treynor::{CandidateList, benchmark_candidates};
use treynor_data::{DateRange, YahooQuoteProvider};
use treynor_model::{CutoffMethod, ModelConfig, SingleIndexModel, TopN};
use treynor_output::{DiagnosticsTable, ExportFormat, Exporter, ReportBuilder, WeightTable};

#[derive(Parser)]
#[command(name = "treynor")]
#[command(about = "Treynor: single index portfolio construction", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select securities and compute optimal weights
    Optimize(OptimizeArgs),

    /// Inspect or clear the price cache
    Cache {
        /// Show cache statistics
        #[arg(long)]
        stats: bool,

        /// Remove cached bars
        #[arg(long)]
        clear: bool,

        /// Restrict to one symbol
        #[arg(long)]
        symbol: Option<String>,
    },
}

#[derive(Args)]
struct OptimizeArgs {
    /// Comma-separated candidate tickers (5 to 50)
    #[arg(long)]
    tickers: String,

    /// First date of the price window (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date of the price window, inclusive (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Annualized risk-free rate
    #[arg(long)]
    risk_free_rate: Option<f64>,

    /// Return periods per year
    #[arg(long)]
    periods_per_year: Option<f64>,

    /// Number of positions to present
    #[arg(long)]
    top: Option<usize>,

    /// Benchmark symbol; repeat for an ordered fallback list
    #[arg(long = "benchmark")]
    benchmarks: Vec<String>,

    /// Cutoff rule
    #[arg(long, value_enum)]
    cutoff: Option<CutoffArg>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Include per-candidate statistics and exclusions
    #[arg(long)]
    diagnostics: bool,

    /// Disable caching (always fetch fresh data)
    #[arg(long)]
    no_cache: bool,

    /// Force refresh cached data
    #[arg(long)]
    refresh: bool,

    /// JSON file with model parameters; flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CutoffArg {
    /// Cumulative sums over every candidate
    Full,
    /// Stop at the last self-consistent rank
    Iterative,
}

impl From<CutoffArg> for CutoffMethod {
    fn from(value: CutoffArg) -> Self {
        match value {
            CutoffArg::Full => Self::FullUniverse,
            CutoffArg::Iterative => Self::Iterative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Markdown,
    Json,
    Csv,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Optimize(args) => optimize(args).await,
        Commands::Cache {
            stats,
            clear,
            symbol,
        } => manage_cache(stats, clear, symbol),
    }
}

/// Model parameters: defaults, then the config file, then flags.
fn model_config(args: &OptimizeArgs) -> Result<ModelConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ModelConfig::default(),
    };

    if let Some(rate) = args.risk_free_rate {
        config.risk_free_rate = rate;
    }
    if let Some(periods) = args.periods_per_year {
        config.periods_per_year = periods;
    }
    if let Some(top) = args.top {
        config.top_n = top;
    }
    if let Some(cutoff) = args.cutoff {
        config.cutoff_method = cutoff.into();
    }

    Ok(config)
}

fn load_config(path: &Path) -> Result<ModelConfig, Box<dyn Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
    let config = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
    Ok(config)
}

fn date_range(args: &OptimizeArgs) -> Result<DateRange, Box<dyn Error>> {
    let defaults = DateRange::default();
    Ok(DateRange::new(
        args.start.unwrap_or(defaults.start()),
        args.end.unwrap_or(defaults.end()),
    )?)
}

async fn optimize(args: OptimizeArgs) -> Result<(), Box<dyn Error>> {
    let tickers: CandidateList = args.tickers.parse()?;
    let config = model_config(&args)?;
    let model = SingleIndexModel::new(config.clone())?;
    let range = date_range(&args)?;
    let benchmarks = benchmark_candidates(&args.benchmarks);

    info!(
        tickers = %tickers,
        start = %range.start(),
        end = %range.end(),
        "starting optimization"
    );

    let fetch_config = FetchConfig {
        use_cache: !args.no_cache,
        force_refresh: args.refresh,
        concurrency: DEFAULT_CONCURRENCY,
    };
    let cache = if fetch_config.use_cache {
        open_cache()
            .map_err(|e| warn!(error = %e, "cache unavailable, fetching without it"))
            .ok()
    } else {
        None
    };

    let provider = YahooQuoteProvider::new()?;

    let pb = ProgressBar::new(tickers.len() as u64 + 1);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(StdDuration::from_millis(100));

    let data = match load_market_data(
        &provider,
        cache.as_ref(),
        tickers.as_slice(),
        &benchmarks,
        range,
        &fetch_config,
        Some(&pb),
    )
    .await
    {
        Ok(data) => {
            pb.finish_and_clear();
            data
        }
        Err(e) => {
            pb.finish_and_clear();
            return Err(format!("Failed to fetch market data: {}", e).into());
        }
    };

    let result = model.optimize(&data.prices, &data.benchmark, tickers.as_slice())?;
    for exclusion in result.exclusions() {
        warn!(symbol = %exclusion.symbol, reason = %exclusion.reason, "excluded");
    }
    info!(
        benchmark = %data.benchmark,
        cutoff = result.cutoff(),
        selected = result.positions().len(),
        "optimization complete"
    );

    let weights = WeightTable::from_optimization(&result, &TopN(config.top_n));
    let diagnostics = args
        .diagnostics
        .then(|| DiagnosticsTable::from_optimization(&result));

    let rendered = render(
        args.format,
        weights,
        diagnostics,
        tickers.into_inner(),
        &config,
    )?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn render(
    format: OutputFormat,
    weights: WeightTable,
    diagnostics: Option<DiagnosticsTable>,
    tickers: Vec<String>,
    config: &ModelConfig,
) -> Result<String, Box<dyn Error>> {
    let output = match format {
        OutputFormat::Text => {
            let mut output = weights.to_ascii_table();
            if let Some(diagnostics) = &diagnostics {
                output.push_str(&diagnostics.to_ascii_table());
            }
            output
        }
        OutputFormat::Markdown => {
            let mut output = weights.to_markdown();
            if let Some(diagnostics) = &diagnostics {
                output.push('\n');
                output.push_str(&diagnostics.to_markdown());
            }
            output
        }
        OutputFormat::Json => {
            let mut builder = ReportBuilder::new()
                .tickers(tickers)
                .parameters(config)?
                .weights(weights);
            if let Some(diagnostics) = diagnostics {
                builder = builder.diagnostics(diagnostics);
            }
            let mut json = builder.build()?.to_json()?;
            json.push('\n');
            json
        }
        // One CSV document per run: the candidate table replaces the weight
        // table when diagnostics are requested.
        OutputFormat::Csv => match &diagnostics {
            Some(diagnostics) => diagnostics.export_to_string(ExportFormat::Csv)?,
            None => weights.export_to_string(ExportFormat::Csv)?,
        },
    };

    Ok(output)
}

fn manage_cache(stats: bool, clear: bool, symbol: Option<String>) -> Result<(), Box<dyn Error>> {
    let cache = open_cache()?;
    let symbol = symbol.map(|s| s.trim().to_uppercase());

    println!("Cache location: {}", cache_path().display());

    if clear {
        match &symbol {
            Some(symbol) => {
                let removed = cache.clear_symbol(symbol)?;
                println!("Removed {} cached bars for {}", removed, symbol);
            }
            None => {
                let removed = cache.clear_all()?;
                println!("Removed {} cached bars", removed);
            }
        }
        if !stats {
            return Ok(());
        }
    }

    let summary = cache.get_stats()?;
    println!(
        "Cached data: {} bars for {} symbols",
        summary.total_quotes, summary.unique_symbols
    );
    if let (Some(oldest), Some(newest)) = (summary.oldest_date, summary.newest_date) {
        println!("Date coverage: {} to {}", oldest, newest);
    }

    let symbols: Vec<_> = cache
        .symbol_summaries()?
        .into_iter()
        .filter(|s| symbol.as_ref().is_none_or(|wanted| &s.symbol == wanted))
        .collect();

    if !symbols.is_empty() {
        println!();
        println!("{:<10} {:>8} {:>12} {:>12}", "Symbol", "Bars", "First", "Last");
        println!("{}", "-".repeat(45));
        for s in symbols {
            println!(
                "{:<10} {:>8} {:>12} {:>12}",
                s.symbol, s.bars, s.first_date, s.last_date
            );
        }
    } else if let Some(symbol) = &symbol {
        println!("No cached bars for {}", symbol);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> OptimizeArgs {
        let mut argv = vec!["treynor", "optimize"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Optimize(args) => args,
            Commands::Cache { .. } => panic!("expected optimize"),
        }
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = parse(&[
            "--tickers",
            "AAPL,MSFT,NVDA,AMZN,GOOG",
            "--risk-free-rate",
            "0.05",
            "--top",
            "3",
            "--cutoff",
            "iterative",
        ]);
        let config = model_config(&args).unwrap();
        assert_eq!(config.risk_free_rate, 0.05);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.cutoff_method, CutoffMethod::Iterative);
        assert_eq!(config.periods_per_year, 252.0);
    }

    #[test]
    fn test_config_file_then_flags() {
        let path = std::env::temp_dir().join(format!("treynor-config-{}.json", process::id()));
        std::fs::write(&path, r#"{"risk_free_rate": 0.02, "periods_per_year": 52}"#).unwrap();

        let path_arg = path.to_string_lossy().to_string();
        let args = parse(&[
            "--tickers",
            "AAPL,MSFT,NVDA,AMZN,GOOG",
            "--config",
            &path_arg,
            "--periods-per-year",
            "12",
        ]);
        let config = model_config(&args).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.risk_free_rate, 0.02);
        assert_eq!(config.periods_per_year, 12.0);
    }

    #[test]
    fn test_repeated_benchmarks_keep_order() {
        let args = parse(&[
            "--tickers",
            "AAPL,MSFT,NVDA,AMZN,GOOG",
            "--benchmark",
            "^DJI",
            "--benchmark",
            "^GSPC",
        ]);
        assert_eq!(benchmark_candidates(&args.benchmarks), vec!["^DJI", "^GSPC"]);
    }

    #[test]
    fn test_default_date_range() {
        let args = parse(&["--tickers", "AAPL,MSFT,NVDA,AMZN,GOOG"]);
        assert_eq!(date_range(&args).unwrap(), DateRange::default());

        let inverted = parse(&[
            "--tickers",
            "AAPL,MSFT,NVDA,AMZN,GOOG",
            "--start",
            "2024-06-01",
            "--end",
            "2024-01-01",
        ]);
        assert!(date_range(&inverted).is_err());
    }
}
