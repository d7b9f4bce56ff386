#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/treynor/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod diagnostics;
pub mod export;
pub mod report;
pub mod summary;

pub use diagnostics::{DiagnosticsRow, DiagnosticsTable, ExclusionRow};
pub use export::{ExportError, ExportFormat, Exporter};
pub use report::{Report, ReportBuilder, ReportError};
pub use summary::{WeightRow, WeightTable, cutoff_method_label, format_percent};
