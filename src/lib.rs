//! Customer Trends - customer behavior ETL and reporting dashboard
//!
//! The pipeline reads the shopping behavior CSV export, cleans and enriches it
//! with Polars and replaces the `customer` table in a SQL store. The report
//! side runs fixed aggregate queries over that table and renders charts.

pub mod charts;
pub mod data;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod settings;
pub mod stats;
pub mod store;

pub use pipeline::{run, run_with_store, PipelineError, RunSummary};
pub use settings::{Settings, VerifyMode};
