//! Full-refresh batch ETL of customer, product and sales extracts into a
//! SQLite star schema (`dim_customer`, `dim_product`, `fact_sales`).
//!
//! Stages: [`extract`] reads a delimited source, [`scrub::clean`] normalizes
//! and deduplicates it, [`schema`] creates/resets the warehouse tables, and
//! [`load`] writes dimensions before facts. [`pipeline::Pipeline`] sequences
//! them and reports counts for every stage.

pub mod config;
pub mod error;
pub mod extract;
pub mod load;
pub mod logging;
pub mod pipeline;
pub mod records;
pub mod schema;
pub mod scrub;
pub mod warehouse;

pub use config::PipelineConfig;
pub use error::{EtlError, Result};
pub use pipeline::{run_pipeline, Pipeline, PipelineOutcome, PipelineState};
