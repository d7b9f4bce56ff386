//! Return Series Builder
//!
//! Turns a wide table of prices (one column per symbol, benchmark included)
//! into aligned periodic simple returns.
//!
//! Returns are taken per column over the full date grid,
//!
//! r_t = P_t / P_{t-1} - 1
//!
//! and regression needs paired observations, so a period whose return is
//! undefined in any usable column (a missing price on either side, a zero
//! previous price) is dropped for every symbol. A gap therefore removes the
//! two periods that touch it rather than merging them.

use crate::error::ModelError;
use crate::model::Exclusion;
use chrono::NaiveDate;
use ndarray::{Array1, Array2, ArrayView1};
use polars::prelude::*;
use std::collections::HashSet;

/// Name of the date column in a [`PriceTable`].
pub const DATE_COLUMN: &str = "date";

/// Minimum number of aligned return periods required by the model.
pub const MIN_RETURN_PERIODS: usize = 2;

/// Daily prices indexed by date, one nullable `Float64` column per symbol.
///
/// Dates are sorted and unique once the table is constructed. Gaps are
/// represented as nulls.
#[derive(Debug, Clone)]
pub struct PriceTable {
    frame: DataFrame,
    dates: Vec<NaiveDate>,
}

impl PriceTable {
    /// Wrap a wide price frame.
    ///
    /// The frame must contain a `date` column (Date or ISO-8601 string);
    /// every other column is treated as a symbol's price series.
    pub fn new(frame: DataFrame) -> Result<Self, ModelError> {
        let frame = frame
            .lazy()
            .with_column(col(DATE_COLUMN).cast(DataType::Date))
            .sort([DATE_COLUMN], SortMultipleOptions::default())
            .collect()?;

        let dates = read_dates(&frame)?;
        if let Some(pair) = dates.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(ModelError::InvalidParameter(format!(
                "duplicate date {} in price table",
                pair[1]
            )));
        }

        Ok(Self { frame, dates })
    }

    /// Build a table from dates and per-symbol price columns.
    ///
    /// # Arguments
    /// * `dates` - Observation dates, one per row
    /// * `columns` - `(symbol, prices)` pairs; `None` marks a gap
    pub fn from_columns(
        dates: &[NaiveDate],
        columns: Vec<(String, Vec<Option<f64>>)>,
    ) -> Result<Self, ModelError> {
        let date_strings: Vec<String> = dates.iter().map(ToString::to_string).collect();

        let mut series: Vec<Column> = Vec::with_capacity(columns.len() + 1);
        series.push(Series::new(DATE_COLUMN.into(), date_strings).into());
        for (symbol, prices) in columns {
            if prices.len() != dates.len() {
                return Err(ModelError::InvalidParameter(format!(
                    "{} has {} prices for {} dates",
                    symbol,
                    prices.len(),
                    dates.len()
                )));
            }
            series.push(Series::new(symbol.as_str().into(), prices).into());
        }

        Self::new(DataFrame::new(series)?)
    }

    /// Pivot a long frame (`symbol`, `date`, price column) into a wide table.
    ///
    /// Rows with a null or non-finite price are skipped. Symbols without a
    /// single usable price get no column at all. Columns follow the order in
    /// which symbols first appear; a repeated `(symbol, date)` keeps the last
    /// price.
    pub fn from_long(frame: &DataFrame, price_column: &str) -> Result<Self, ModelError> {
        let long = frame
            .clone()
            .lazy()
            .select([
                col("symbol").cast(DataType::String),
                col(DATE_COLUMN).cast(DataType::Date),
                col(price_column).cast(DataType::Float64).alias(LONG_PRICE),
            ])
            .filter(is_finite(col(LONG_PRICE)))
            .collect()?;

        let symbols = long
            .column("symbol")?
            .as_materialized_series()
            .unique_stable()?;

        let mut wide = long
            .clone()
            .lazy()
            .select([col(DATE_COLUMN).unique()]);
        for symbol in symbols.str()?.into_iter().flatten() {
            let prices = long
                .clone()
                .lazy()
                .filter(col("symbol").eq(lit(symbol)))
                .group_by([col(DATE_COLUMN)])
                .agg([col(LONG_PRICE).last().alias(symbol)]);
            wide = wide.join(
                prices,
                [col(DATE_COLUMN)],
                [col(DATE_COLUMN)],
                JoinArgs::new(JoinType::Left),
            );
        }

        Self::new(wide.collect()?)
    }

    /// Observation dates in ascending order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of price rows.
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Symbols with a price column, in column order.
    pub fn symbols(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != DATE_COLUMN)
            .map(|name| name.to_string())
            .collect()
    }

    /// Whether the table has a column for `symbol`.
    pub fn contains(&self, symbol: &str) -> bool {
        symbol != DATE_COLUMN
            && self
                .frame
                .get_column_names()
                .into_iter()
                .any(|name| name.as_str() == symbol)
    }

    /// Price series for `symbol`, with gaps as `None`.
    ///
    /// Fails with [`ModelError::MissingSymbol`] if the column does not exist
    /// or holds no usable price.
    pub fn prices(&self, symbol: &str) -> Result<Vec<Option<f64>>, ModelError> {
        if !self.contains(symbol) {
            return Err(ModelError::MissingSymbol(symbol.to_string()));
        }

        let column = self.frame.column(symbol)?.cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = column
            .f64()?
            .into_iter()
            .map(|v| v.filter(|p| p.is_finite()))
            .collect();

        if values.iter().all(Option::is_none) {
            return Err(ModelError::MissingSymbol(symbol.to_string()));
        }
        Ok(values)
    }

    /// The underlying polars frame.
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }
}

fn read_dates(frame: &DataFrame) -> Result<Vec<NaiveDate>, ModelError> {
    let dates = frame.column(DATE_COLUMN)?.cast(&DataType::String)?;
    dates
        .str()?
        .into_iter()
        .map(|date| {
            date.ok_or_else(|| ModelError::InvalidParameter("null date in price table".to_string()))
                .and_then(parse_date)
        })
        .collect()
}

fn parse_date(raw: &str) -> Result<NaiveDate, ModelError> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| ModelError::InvalidParameter(format!("invalid date {raw:?}: {e}")))
}

/// Aligned periodic returns for the benchmark and the usable candidates.
///
/// Row `t` of [`securities`](Self::securities) and element `t` of
/// [`benchmark`](Self::benchmark) refer to the same period.
#[derive(Debug, Clone)]
pub struct ReturnMatrix {
    dates: Vec<NaiveDate>,
    benchmark_symbol: String,
    benchmark: Array1<f64>,
    symbols: Vec<String>,
    securities: Array2<f64>,
}

impl ReturnMatrix {
    /// Build a matrix directly from return series.
    ///
    /// # Arguments
    /// * `dates` - Period dates
    /// * `benchmark_symbol` - Name of the benchmark
    /// * `benchmark` - Benchmark returns, one per period
    /// * `columns` - `(symbol, returns)` pairs with the same length
    pub fn from_returns(
        dates: Vec<NaiveDate>,
        benchmark_symbol: impl Into<String>,
        benchmark: Vec<f64>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, ModelError> {
        let n_periods = benchmark.len();
        if dates.len() != n_periods {
            return Err(ModelError::InvalidParameter(format!(
                "{} dates for {} benchmark returns",
                dates.len(),
                n_periods
            )));
        }
        if n_periods < MIN_RETURN_PERIODS {
            return Err(ModelError::InsufficientData {
                required: MIN_RETURN_PERIODS,
                actual: n_periods,
            });
        }

        let mut symbols = Vec::with_capacity(columns.len());
        let mut securities = Array2::<f64>::zeros((n_periods, columns.len()));
        for (j, (symbol, returns)) in columns.into_iter().enumerate() {
            if returns.len() != n_periods {
                return Err(ModelError::InvalidParameter(format!(
                    "{} has {} returns, expected {}",
                    symbol,
                    returns.len(),
                    n_periods
                )));
            }
            securities.column_mut(j).assign(&Array1::from_vec(returns));
            symbols.push(symbol);
        }

        Ok(Self {
            dates,
            benchmark_symbol: benchmark_symbol.into(),
            benchmark: Array1::from_vec(benchmark),
            symbols,
            securities,
        })
    }

    /// Period dates (the later date of each price pair).
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Benchmark symbol.
    pub fn benchmark_symbol(&self) -> &str {
        &self.benchmark_symbol
    }

    /// Benchmark returns.
    pub fn benchmark(&self) -> ArrayView1<'_, f64> {
        self.benchmark.view()
    }

    /// Security symbols, in column order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Returns of the `index`-th security.
    pub fn security(&self, index: usize) -> ArrayView1<'_, f64> {
        self.securities.column(index)
    }

    /// Full security return matrix (periods x securities).
    pub const fn securities(&self) -> &Array2<f64> {
        &self.securities
    }

    /// Number of return periods.
    pub fn n_periods(&self) -> usize {
        self.benchmark.len()
    }

    /// Number of securities.
    pub fn n_securities(&self) -> usize {
        self.symbols.len()
    }
}

/// Output of the builder: the aligned matrix plus the candidates that could
/// not be included.
#[derive(Debug)]
pub struct AlignedReturns {
    /// Aligned returns
    pub returns: ReturnMatrix,
    /// Candidates without usable prices
    pub exclusions: Vec<Exclusion>,
}

/// Builds aligned return series from a [`PriceTable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnSeriesBuilder;

impl ReturnSeriesBuilder {
    /// Create a new builder
    pub const fn new() -> Self {
        Self
    }

    /// Compute aligned returns for `benchmark` and `candidates`.
    ///
    /// Candidates missing from the table (or without any price) are reported
    /// as exclusions and do not take part in the alignment. A missing
    /// benchmark, or fewer than two aligned return periods, fails the batch.
    pub fn build(
        &self,
        prices: &PriceTable,
        benchmark: &str,
        candidates: &[String],
    ) -> Result<AlignedReturns, ModelError> {
        prices.prices(benchmark)?;

        let mut seen = HashSet::new();
        let mut symbols = Vec::new();
        let mut exclusions = Vec::new();

        for symbol in candidates {
            if !seen.insert(symbol.as_str()) {
                continue;
            }
            match prices.prices(symbol) {
                Ok(_) => symbols.push(symbol.clone()),
                Err(reason) => exclusions.push(Exclusion::new(symbol.clone(), reason)),
            }
        }

        // Benchmark first; a candidate equal to the benchmark reads its column.
        let mut columns: Vec<&str> = vec![benchmark];
        columns.extend(
            symbols
                .iter()
                .map(String::as_str)
                .filter(|s| *s != benchmark),
        );

        let clean: Vec<Expr> = std::iter::once(col(DATE_COLUMN))
            .chain(columns.iter().map(|s| {
                let price = col(*s).cast(DataType::Float64);
                when(is_finite(price.clone()))
                    .then(price)
                    .otherwise(lit(NULL))
                    .alias(*s)
            }))
            .collect();
        let returns: Vec<Expr> = columns
            .iter()
            .map(|s| (col(*s) / col(*s).shift(lit(1)) - lit(1.0)).alias(*s))
            .collect();
        let complete = columns
            .iter()
            .map(|s| is_finite(col(*s)))
            .reduce(|all, next| all.and(next))
            .unwrap_or_else(|| lit(false));

        let frame = prices
            .frame()
            .clone()
            .lazy()
            .select(clean)
            .with_columns(returns)
            .filter(complete)
            .collect()?;

        let dates = read_dates(&frame)?;
        let benchmark_returns = finite_values(&frame, benchmark)?;
        let security_returns = symbols
            .iter()
            .map(|symbol| Ok((symbol.clone(), finite_values(&frame, symbol)?)))
            .collect::<Result<Vec<_>, ModelError>>()?;

        Ok(AlignedReturns {
            returns: ReturnMatrix::from_returns(
                dates,
                benchmark,
                benchmark_returns,
                security_returns,
            )?,
            exclusions,
        })
    }
}

/// Name of the price column while pivoting a long frame.
const LONG_PRICE: &str = "__price";

/// True for finite values; false for NaN and infinities, null for nulls.
fn is_finite(expr: Expr) -> Expr {
    expr.clone()
        .lt(lit(f64::INFINITY))
        .and(expr.gt(lit(f64::NEG_INFINITY)))
}

/// Values of a column known to hold no nulls after filtering.
fn finite_values(frame: &DataFrame, symbol: &str) -> Result<Vec<f64>, ModelError> {
    Ok(frame.column(symbol)?.f64()?.into_no_null_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_simple_returns() {
        let table = PriceTable::from_columns(
            &dates(3),
            vec![
                ("SPX".to_string(), vec![Some(100.0), Some(110.0), Some(99.0)]),
                ("AAPL".to_string(), vec![Some(50.0), Some(55.0), Some(66.0)]),
            ],
        )
        .unwrap();

        let aligned = ReturnSeriesBuilder::new()
            .build(&table, "SPX", &symbols(&["AAPL"]))
            .unwrap();
        let returns = aligned.returns;

        assert!(aligned.exclusions.is_empty());
        assert_eq!(returns.n_periods(), 2);
        assert_eq!(returns.dates(), &dates(3)[1..]);
        assert_relative_eq!(returns.benchmark()[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(returns.benchmark()[1], -0.1, epsilon = 1e-12);
        assert_relative_eq!(returns.security(0)[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(returns.security(0)[1], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_gap_drops_both_adjacent_periods() {
        let table = PriceTable::from_columns(
            &dates(5),
            vec![
                (
                    "SPX".to_string(),
                    vec![Some(100.0), Some(101.0), Some(102.0), Some(103.0), Some(104.0)],
                ),
                (
                    "AAPL".to_string(),
                    vec![Some(10.0), Some(11.0), None, Some(12.0), Some(13.0)],
                ),
                (
                    "MSFT".to_string(),
                    vec![Some(20.0), Some(21.0), Some(22.0), Some(23.0), Some(24.0)],
                ),
            ],
        )
        .unwrap();

        let returns = ReturnSeriesBuilder::new()
            .build(&table, "SPX", &symbols(&["AAPL", "MSFT"]))
            .unwrap()
            .returns;

        // AAPL has no return into or out of row 2, so both periods go for
        // everyone and no multi-day return is formed.
        assert_eq!(returns.n_periods(), 2);
        let all = dates(5);
        assert_eq!(returns.dates(), &[all[1], all[4]]);
        assert_relative_eq!(returns.benchmark()[0], 0.01, epsilon = 1e-12);
        assert_relative_eq!(returns.benchmark()[1], 104.0 / 103.0 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(returns.security(0)[1], 13.0 / 12.0 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(returns.security(1)[1], 24.0 / 23.0 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_candidate_equal_to_benchmark() {
        let table = PriceTable::from_columns(
            &dates(3),
            vec![("SPX".to_string(), vec![Some(100.0), Some(110.0), Some(99.0)])],
        )
        .unwrap();

        let returns = ReturnSeriesBuilder::new()
            .build(&table, "SPX", &symbols(&["SPX"]))
            .unwrap()
            .returns;
        assert_eq!(returns.symbols(), &symbols(&["SPX"]));
        assert_eq!(returns.security(0), returns.benchmark());
    }

    #[test]
    fn test_absent_and_empty_symbols_are_excluded() {
        let table = PriceTable::from_columns(
            &dates(4),
            vec![
                (
                    "SPX".to_string(),
                    vec![Some(100.0), Some(101.0), Some(102.0), Some(103.0)],
                ),
                ("AAPL".to_string(), vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
                ("DEAD".to_string(), vec![None, None, None, None]),
            ],
        )
        .unwrap();

        let aligned = ReturnSeriesBuilder::new()
            .build(&table, "SPX", &symbols(&["AAPL", "DEAD", "GONE", "AAPL"]))
            .unwrap();

        assert_eq!(aligned.returns.symbols(), &symbols(&["AAPL"]));
        assert_eq!(aligned.returns.n_periods(), 3);
        let excluded: Vec<&str> = aligned
            .exclusions
            .iter()
            .map(|e| e.symbol.as_str())
            .collect();
        assert_eq!(excluded, vec!["DEAD", "GONE"]);
        assert!(
            aligned
                .exclusions
                .iter()
                .all(|e| e.reason.is_insufficient_data())
        );
    }

    #[test]
    fn test_missing_benchmark_fails_batch() {
        let table = PriceTable::from_columns(
            &dates(3),
            vec![("AAPL".to_string(), vec![Some(1.0), Some(2.0), Some(3.0)])],
        )
        .unwrap();

        let result = ReturnSeriesBuilder::new().build(&table, "SPX", &symbols(&["AAPL"]));
        assert!(matches!(result, Err(ModelError::MissingSymbol(s)) if s == "SPX"));
    }

    #[test]
    fn test_insufficient_periods() {
        let table = PriceTable::from_columns(
            &dates(3),
            vec![
                ("SPX".to_string(), vec![Some(100.0), None, Some(102.0)]),
                ("AAPL".to_string(), vec![Some(1.0), Some(2.0), Some(3.0)]),
            ],
        )
        .unwrap();

        // Both returns touch the missing benchmark price.
        let result = ReturnSeriesBuilder::new().build(&table, "SPX", &symbols(&["AAPL"]));
        assert!(matches!(
            result,
            Err(ModelError::InsufficientData {
                required: 2,
                actual: 0
            })
        ));
    }

    #[test]
    fn test_zero_price_period_is_dropped() {
        let table = PriceTable::from_columns(
            &dates(4),
            vec![
                (
                    "SPX".to_string(),
                    vec![Some(100.0), Some(101.0), Some(102.0), Some(103.0)],
                ),
                ("AAPL".to_string(), vec![Some(1.0), Some(0.0), Some(3.0), Some(4.0)]),
            ],
        )
        .unwrap();

        let returns = ReturnSeriesBuilder::new()
            .build(&table, "SPX", &symbols(&["AAPL"]))
            .unwrap()
            .returns;

        // 0 -> 3 is undefined, so only two periods survive.
        assert_eq!(returns.n_periods(), 2);
        assert_relative_eq!(returns.security(0)[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(returns.security(0)[1], 4.0 / 3.0 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_table_is_sorted_and_rejects_duplicates() {
        let d = dates(3);
        let table = PriceTable::from_columns(
            &[d[2], d[0], d[1]],
            vec![("SPX".to_string(), vec![Some(3.0), Some(1.0), Some(2.0)])],
        )
        .unwrap();
        assert_eq!(table.dates(), &d[..]);
        assert_eq!(
            table.prices("SPX").unwrap(),
            vec![Some(1.0), Some(2.0), Some(3.0)]
        );

        let duplicated = PriceTable::from_columns(
            &[d[0], d[0]],
            vec![("SPX".to_string(), vec![Some(1.0), Some(2.0)])],
        );
        assert!(matches!(duplicated, Err(ModelError::InvalidParameter(_))));
    }

    #[test]
    fn test_from_long_pivots_symbols() {
        let long = DataFrame::new(vec![
            Series::new("symbol".into(), vec!["SPX", "AAPL", "SPX", "AAPL", "SPX"]).into(),
            Series::new(
                "date".into(),
                vec![
                    "2024-01-01",
                    "2024-01-01",
                    "2024-01-02",
                    "2024-01-03",
                    "2024-01-03",
                ],
            )
            .into(),
            Series::new(
                "adjusted_close".into(),
                vec![Some(100.0), Some(10.0), Some(101.0), Some(12.0), None],
            )
            .into(),
        ])
        .unwrap();

        let table = PriceTable::from_long(&long, "adjusted_close").unwrap();

        assert_eq!(table.symbols(), symbols(&["SPX", "AAPL"]));
        assert_eq!(table.height(), 3);
        assert_eq!(
            table.prices("SPX").unwrap(),
            vec![Some(100.0), Some(101.0), None]
        );
        assert_eq!(
            table.prices("AAPL").unwrap(),
            vec![Some(10.0), None, Some(12.0)]
        );
    }

    #[test]
    fn test_from_long_drops_unusable_prices() {
        let long = DataFrame::new(vec![
            Series::new("symbol".into(), vec!["SPX", "SPX", "SPX", "BAD", "SPX"]).into(),
            Series::new(
                "date".into(),
                vec![
                    "2024-01-02",
                    "2024-01-01",
                    "2024-01-03",
                    "2024-01-01",
                    "2024-01-03",
                ],
            )
            .into(),
            Series::new(
                "adjusted_close".into(),
                vec![101.0, 100.0, f64::NAN, f64::INFINITY, 102.0],
            )
            .into(),
        ])
        .unwrap();

        let table = PriceTable::from_long(&long, "adjusted_close").unwrap();

        assert_eq!(table.symbols(), symbols(&["SPX"]));
        assert!(!table.contains("BAD"));
        assert_eq!(table.dates(), &dates(3)[..]);
        assert_eq!(
            table.prices("SPX").unwrap(),
            vec![Some(100.0), Some(101.0), Some(102.0)]
        );
    }

    #[test]
    fn test_from_returns_validates_lengths() {
        let d = dates(3);
        let result = ReturnMatrix::from_returns(
            d.clone(),
            "SPX",
            vec![0.01, 0.02, 0.03],
            vec![("AAPL".to_string(), vec![0.01, 0.02])],
        );
        assert!(matches!(result, Err(ModelError::InvalidParameter(_))));

        let result = ReturnMatrix::from_returns(d[..1].to_vec(), "SPX", vec![0.01], vec![]);
        assert!(matches!(result, Err(ModelError::InsufficientData { .. })));
    }
}
