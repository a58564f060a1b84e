//! Customer Trends - customer behavior ETL and reporting dashboard CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use customer_trends::charts::DashboardRenderer;
use customer_trends::logging::init_logging;
use customer_trends::report::{ReportClient, SAMPLE_LIMIT};
use customer_trends::store::MemoryStore;
use customer_trends::{pipeline, Settings};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "customer-trends")]
#[command(version, about = "Customer behavior ETL into SQL and reporting dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file layered under DB_* / INPUT_PATH / VERIFY_MODE env vars
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the CSV export, clean it and replace the customer table
    Etl {
        /// Input CSV file path (defaults to INPUT_PATH)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Run every step against an in-memory store
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Query the customer table and write the dashboard
    Report {
        /// Gender values to include in the revenue by gender section
        #[arg(short, long = "gender", default_values_t = vec!["Male".to_string(), "Female".to_string()])]
        genders: Vec<String>,

        /// Directory for report.json and the chart images
        #[arg(short, long, default_value = "dashboard")]
        out_dir: PathBuf,

        /// Also fetch this many raw rows (at most 100)
        #[arg(long)]
        sample: Option<usize>,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let settings = Settings::new(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Commands::Etl { input, dry_run } => {
            let input = input.unwrap_or_else(|| settings.input_path.clone());
            let summary = if dry_run {
                let mut store = MemoryStore::new();
                pipeline::run_with_store(&input, &mut store, settings.verify_mode)?
            } else {
                pipeline::run(&input, &settings)?
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Report {
            genders,
            out_dir,
            sample,
        } => {
            let destination = settings.destination()?;
            let mut client = ReportClient::connect(&destination)?;
            let report = client.build_dashboard(&genders, sample.map(|n| n.min(SAMPLE_LIMIT)))?;
            client.close()?;

            println!("{}", report.to_text());
            for path in DashboardRenderer::render(&report, &out_dir)? {
                info!(path = %path.display(), "Wrote");
            }
        }
    }

    Ok(())
}
