//! Data module - CSV loading and cleaning

mod loader;
mod processor;
pub mod schema;

pub use loader::{DataLoader, LoaderError};
pub use processor::{DataProcessor, ProcessorError, TransformOutcome};
