//! Candidate ticker lists.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fewest candidates accepted for one run.
pub const MIN_CANDIDATES: usize = 5;

/// Most candidates accepted for one run.
pub const MAX_CANDIDATES: usize = 50;

/// Errors raised while validating a candidate list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UniverseError {
    /// Fewer than [`MIN_CANDIDATES`] distinct tickers
    #[error("Please enter at least {min} tickers (got {actual})")]
    TooFew {
        /// Minimum accepted
        min: usize,
        /// Distinct tickers supplied
        actual: usize,
    },

    /// More than [`MAX_CANDIDATES`] distinct tickers
    #[error("Please enter at most {max} tickers (got {actual})")]
    TooMany {
        /// Maximum accepted
        max: usize,
        /// Distinct tickers supplied
        actual: usize,
    },

    /// A ticker contains characters no exchange symbol uses
    #[error("Invalid ticker: {0:?}")]
    InvalidTicker(String),
}

/// A validated, normalized list of candidate tickers.
///
/// Tickers are trimmed and uppercased, empty entries are dropped, and
/// duplicates keep their first position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CandidateList(Vec<String>);

impl CandidateList {
    /// Validate raw ticker strings.
    pub fn new<I, S>(tickers: I) -> Result<Self, UniverseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut symbols: Vec<String> = Vec::new();
        for raw in tickers {
            let symbol = raw.as_ref().trim().to_ascii_uppercase();
            if symbol.is_empty() {
                continue;
            }
            if !symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
            {
                return Err(UniverseError::InvalidTicker(symbol));
            }
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }

        match symbols.len() {
            n if n < MIN_CANDIDATES => Err(UniverseError::TooFew {
                min: MIN_CANDIDATES,
                actual: n,
            }),
            n if n > MAX_CANDIDATES => Err(UniverseError::TooMany {
                max: MAX_CANDIDATES,
                actual: n,
            }),
            _ => Ok(Self(symbols)),
        }
    }

    /// Symbols in input order
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated list.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the list.
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl FromStr for CandidateList {
    type Err = UniverseError;

    /// Parse a comma-separated list such as `"AAPL, msft,NVDA"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.split(','))
    }
}

impl TryFrom<Vec<String>> for CandidateList {
    type Error = UniverseError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CandidateList> for Vec<String> {
    fn from(value: CandidateList) -> Self {
        value.0
    }
}

impl AsRef<[String]> for CandidateList {
    fn as_ref(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for CandidateList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}
