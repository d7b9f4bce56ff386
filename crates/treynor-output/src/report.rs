//! JSON report envelope for an optimization run.

use crate::diagnostics::DiagnosticsTable;
use crate::summary::WeightTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required section was not provided.
    #[error("Missing report section: {0}")]
    MissingSection(&'static str),
}

/// A report of one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Candidate symbols that were requested.
    pub tickers: Vec<String>,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Model parameters used for the run.
    pub parameters: serde_json::Value,

    /// Presented weights.
    pub weights: WeightTable,

    /// Full intermediate statistics, when requested.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub diagnostics: Option<DiagnosticsTable>,
}

impl Report {
    /// Create a new report.
    pub fn new(
        tickers: Vec<String>,
        parameters: serde_json::Value,
        weights: WeightTable,
        diagnostics: Option<DiagnosticsTable>,
    ) -> Self {
        Self {
            tickers,
            timestamp: Utc::now(),
            parameters,
            weights,
            diagnostics,
        }
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    tickers: Vec<String>,
    parameters: Option<serde_json::Value>,
    weights: Option<WeightTable>,
    diagnostics: Option<DiagnosticsTable>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the requested tickers.
    pub fn tickers(mut self, tickers: Vec<String>) -> Self {
        self.tickers = tickers;
        self
    }

    /// Record the model parameters.
    pub fn parameters<P: Serialize>(mut self, parameters: &P) -> Result<Self, ReportError> {
        self.parameters = Some(serde_json::to_value(parameters)?);
        Ok(self)
    }

    /// Set the weight table.
    pub fn weights(mut self, weights: WeightTable) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Attach diagnostics.
    pub fn diagnostics(mut self, diagnostics: DiagnosticsTable) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Build the report.
    pub fn build(self) -> Result<Report, ReportError> {
        let weights = self.weights.ok_or(ReportError::MissingSection("weights"))?;
        Ok(Report::new(
            self.tickers,
            self.parameters.unwrap_or(serde_json::Value::Null),
            weights,
            self.diagnostics,
        ))
    }
}
