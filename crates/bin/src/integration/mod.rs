//! Glue between the CLI, the data layer and the model.
//!
//! Resolves the benchmark, fetches candidate prices through the SQLite cache
//! and assembles the wide price table the model consumes.

pub(crate) mod cache_manager;
pub(crate) mod data_pipeline;
