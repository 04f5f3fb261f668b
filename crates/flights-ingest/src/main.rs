//! Flights Ingest - monthly on-time performance loader

use anyhow::Result;
use clap::Parser;
use flights_common::logging::{init_logging, LogConfig, LogLevel};
use flights_ingest::resolver::MonthResolver;
use flights_ingest::storage::S3Storage;
use flights_ingest::warehouse::BigQueryWarehouse;
use flights_ingest::{IngestConfig, IngestPipeline, Trigger};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// The SDK's HTTP stack is chatty at debug level
const QUIET_DEPENDENCIES: &str = "aws_smithy_runtime=warn,aws_config=warn,hyper=warn";

#[derive(Parser, Debug)]
#[command(name = "flights-ingest")]
#[command(author, version, about = "Monthly flight on-time performance ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Ingest one month; without --year/--month the next unstaged month is used
    Run {
        /// Bucket to stage into (defaults to FLIGHTS_DEFAULT_BUCKET)
        #[arg(short, long)]
        bucket: Option<String>,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        month: Option<u32>,
    },

    /// Print the month a bare `run` would ingest, without writing anything
    NextMonth {
        #[arg(short, long)]
        bucket: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("flights-ingest")
        .filter_directives(QUIET_DEPENDENCIES)
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    match execute(cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!(kind = e.kind(), retriable = e.is_retriable(), "{}", e);
            Ok(ExitCode::FAILURE)
        },
    }
}

async fn execute(command: Command) -> flights_ingest::Result<()> {
    let config = IngestConfig::load()?;
    let store = Arc::new(S3Storage::new(&config.storage).await?);

    match command {
        Command::Run {
            bucket,
            year,
            month,
        } => {
            let warehouse = Arc::new(BigQueryWarehouse::new(&config.warehouse)?);
            let pipeline = IngestPipeline::new(&config, store, warehouse)?;

            let loaded = pipeline
                .run(&Trigger {
                    year,
                    month,
                    bucket,
                })
                .await?;

            info!(
                table_reference = %loaded.table_reference,
                row_count = loaded.row_count,
                "Ingestion complete"
            );
        },
        Command::NextMonth { bucket } => {
            let bucket = bucket.unwrap_or_else(|| config.default_bucket.clone());
            let next = MonthResolver::new(store).next_month(&bucket).await?;
            info!(
                bucket = %bucket,
                year = next.year(),
                month = next.month(),
                "Next month to ingest: {}",
                next
            );
        },
    }

    Ok(())
}
