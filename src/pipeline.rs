//! Transform-and-load pipeline: CSV export in, `customer` table out.

use crate::data::schema::TABLE_NAME;
use crate::data::{DataLoader, DataProcessor, LoaderError, ProcessorError, TransformOutcome};
use crate::settings::{Settings, SettingsError, VerifyMode};
use crate::store::{SqlStore, StoreError, TableStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("Unsupported destination: {0}")]
    UnsupportedDestination(String),
    #[error("Configuration error: {0}")]
    Configuration(SettingsError),
    #[error("Failed to read input: {0}")]
    Read(LoaderError),
    #[error("Transform failed: {0}")]
    Transform(#[from] ProcessorError),
    #[error("Error loading to database: {0}")]
    Load(StoreError),
    #[error("Verification failed: table '{table}' has {found} rows, expected {expected}")]
    VerificationMismatch {
        table: String,
        expected: u64,
        found: u64,
    },
}

impl From<LoaderError> for PipelineError {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::NotFound(path) => PipelineError::InputNotFound(path),
            other => PipelineError::Read(other),
        }
    }
}

impl From<SettingsError> for PipelineError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::UnsupportedStoreType(kind) => PipelineError::UnsupportedDestination(kind),
            other => PipelineError::Configuration(other),
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DriverUnavailable(kind) => {
                PipelineError::UnsupportedDestination(format!("{} (no driver available)", kind))
            }
            StoreError::Settings(e) => e.into(),
            other => PipelineError::Load(other),
        }
    }
}

/// What a pipeline run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub table: String,
    pub input_rows: usize,
    pub input_columns: usize,
    pub output_columns: Vec<String>,
    pub imputed_ratings: usize,
    pub promo_code_dropped: bool,
    pub rows_loaded: u64,
    pub verified_rows: u64,
}

/// Run the full ETL into the destination named by `settings`.
///
/// The destination is resolved before the input is transformed, so a bad
/// store type fails fast; the connection is only opened once the table is
/// ready to be written.
pub fn run(input: &Path, settings: &Settings) -> Result<RunSummary, PipelineError> {
    info!("Starting ETL process");
    if !input.is_file() {
        return Err(PipelineError::InputNotFound(input.to_path_buf()));
    }
    let destination = settings.destination()?;

    let (outcome, input_shape) = extract_transform(input)?;

    let mut store = SqlStore::connect(&destination).map_err(|e| {
        error!(error = %e, destination = %destination.describe(), "Could not connect");
        PipelineError::from(e)
    })?;
    let summary = load(&mut store, outcome, input_shape, settings.verify_mode)?;

    if let Err(e) = store.close() {
        warn!(error = %e, "Failed to close connection cleanly");
    }
    Ok(summary)
}

/// Run the full ETL into an already opened store.
pub fn run_with_store<S: TableStore>(
    input: &Path,
    store: &mut S,
    verify_mode: VerifyMode,
) -> Result<RunSummary, PipelineError> {
    info!("Starting ETL process");
    let (outcome, input_shape) = extract_transform(input)?;
    load(store, outcome, input_shape, verify_mode)
}

fn extract_transform(input: &Path) -> Result<(TransformOutcome, (usize, usize)), PipelineError> {
    let df = DataLoader::load_csv(input)?;
    let input_shape = df.shape();
    let outcome = DataProcessor::transform(df)?;
    info!(columns = ?DataLoader::get_columns(&outcome.df), "Columns");
    Ok((outcome, input_shape))
}

fn load<S: TableStore>(
    store: &mut S,
    outcome: TransformOutcome,
    (input_rows, input_columns): (usize, usize),
    verify_mode: VerifyMode,
) -> Result<RunSummary, PipelineError> {
    let df = outcome.df;
    info!(table = TABLE_NAME, "Loading data into table");

    let rows_loaded = store.replace_table(TABLE_NAME, &df).map_err(|e| {
        error!(error = %e, table = TABLE_NAME, "Error loading to database");
        PipelineError::from(e)
    })?;
    info!(rows = rows_loaded, "Data successfully loaded");

    let verified_rows = store.count_rows(TABLE_NAME).map_err(|e| {
        error!(error = %e, table = TABLE_NAME, "Could not verify loaded rows");
        PipelineError::from(e)
    })?;
    info!(table = TABLE_NAME, rows = verified_rows, "Verification");

    let expected = df.height() as u64;
    if verified_rows != expected {
        match verify_mode {
            VerifyMode::Warn => warn!(
                table = TABLE_NAME,
                expected,
                found = verified_rows,
                "Row count mismatch after load"
            ),
            VerifyMode::Fail => {
                return Err(PipelineError::VerificationMismatch {
                    table: TABLE_NAME.to_string(),
                    expected,
                    found: verified_rows,
                })
            }
        }
    }

    Ok(RunSummary {
        table: TABLE_NAME.to_string(),
        input_rows,
        input_columns,
        output_columns: DataLoader::get_columns(&df),
        imputed_ratings: outcome.imputed_ratings,
        promo_code_dropped: outcome.promo_code_dropped,
        rows_loaded,
        verified_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use polars::prelude::DataFrame;
    use std::io::Write;

    /// Store that always reports one row fewer than it was given.
    struct LossyStore(MemoryStore);

    impl TableStore for LossyStore {
        fn replace_table(&mut self, table: &str, df: &DataFrame) -> Result<u64, StoreError> {
            self.0.replace_table(table, df)
        }

        fn count_rows(&mut self, table: &str) -> Result<u64, StoreError> {
            Ok(self.0.count_rows(table)?.saturating_sub(1))
        }
    }

    /// Store that accepts writes but loses the table afterwards.
    struct ForgetfulStore;

    impl TableStore for ForgetfulStore {
        fn replace_table(&mut self, _table: &str, df: &DataFrame) -> Result<u64, StoreError> {
            Ok(df.height() as u64)
        }

        fn count_rows(&mut self, table: &str) -> Result<u64, StoreError> {
            Err(StoreError::TableNotFound(table.to_string()))
        }
    }

    fn sample_csv() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "Customer ID,Age,Gender,Item Purchased,Category,Purchase Amount (USD),Review Rating,Subscription Status,Frequency of Purchases,Discount Applied,Promo Code Used"
        )
        .unwrap();
        let rows = [
            "1,19,Male,Blouse,Clothing,53,3.1,Yes,Fortnightly,Yes,Yes",
            "2,55,Female,Sweater,Clothing,64,,No,Weekly,No,No",
            "3,41,Male,Jeans,Clothing,73,4.1,No,Annually,Yes,Yes",
            "4,27,Female,Sandals,Footwear,90,3.5,Yes,Quarterly,No,No",
            "5,63,Male,Boots,Footwear,49,,No,Every 3 Months,Yes,Yes",
            "6,34,Female,Sneakers,Footwear,20,2.9,No,Monthly,No,No",
        ];
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn memory_run_keeps_row_count() {
        let csv = sample_csv();
        let mut store = MemoryStore::new();

        let summary = run_with_store(csv.path(), &mut store, VerifyMode::Fail).unwrap();
        assert_eq!(summary.input_rows, 6);
        assert_eq!(summary.rows_loaded, 6);
        assert_eq!(summary.verified_rows, 6);
        assert_eq!(summary.imputed_ratings, 2);
        assert!(summary.promo_code_dropped);
        assert!(!summary.output_columns.contains(&"promo_code_used".to_string()));
        assert_eq!(store.table(TABLE_NAME).unwrap().height(), 6);
    }

    #[test]
    fn mismatch_warns_by_default() {
        let csv = sample_csv();
        let mut store = LossyStore(MemoryStore::new());
        let summary = run_with_store(csv.path(), &mut store, VerifyMode::Warn).unwrap();
        assert_eq!(summary.verified_rows, 5);
    }

    #[test]
    fn mismatch_fails_when_strict() {
        let csv = sample_csv();
        let mut store = LossyStore(MemoryStore::new());
        let err = run_with_store(csv.path(), &mut store, VerifyMode::Fail).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::VerificationMismatch { expected: 6, found: 5, .. }
        ));
    }

    #[test]
    fn failed_count_is_a_load_error() {
        let csv = sample_csv();
        let err = run_with_store(csv.path(), &mut ForgetfulStore, VerifyMode::Warn).unwrap_err();
        assert!(matches!(err, PipelineError::Load(StoreError::TableNotFound(t)) if t == TABLE_NAME));
    }

    #[test]
    fn missing_input_fails_before_anything_else() {
        let settings = Settings {
            db_type: "oracle".to_string(),
            ..Settings::default()
        };
        let err = run(Path::new("no/such/file.csv"), &settings).unwrap_err();
        assert!(matches!(err, PipelineError::InputNotFound(_)));
    }

    #[test]
    fn unknown_store_type_is_unsupported_destination() {
        let csv = sample_csv();
        let settings = Settings {
            db_type: "oracle".to_string(),
            ..Settings::default()
        };
        let err = run(csv.path(), &settings).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedDestination(t) if t == "oracle"));
    }

    #[test]
    fn mssql_without_driver_is_unsupported_destination() {
        let csv = sample_csv();
        let settings = Settings {
            db_type: "mssql".to_string(),
            ..Settings::default()
        };
        let err = run(csv.path(), &settings).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedDestination(_)));
    }
}
