//! MediaOpt CLI: runs one pipeline invocation per object-finalized event.
//!
//! Configuration comes from the environment (and `.env`). See `Config::from_env`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use mediaopt_cli::{event_from_object, exit_code, outcome_summary, parse_metadata_pair, read_event, ObjectArgs};
use mediaopt_core::Config;
use mediaopt_db::{create_pool, run_migrations, PgRecordStore};
use mediaopt_infra::{init_telemetry, shutdown_telemetry};
use mediaopt_processing::{process_uploaded_media, InvocationOutcome, PipelineContext};
use mediaopt_storage::create_storage;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mediaopt", about = "Uploaded media optimization pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one uploaded object
    Process {
        /// Event JSON file, or `-` for stdin
        #[arg(long, conflicts_with_all = ["bucket", "path"])]
        event: Option<String>,
        /// Bucket of the object
        #[arg(long, requires = "path")]
        bucket: Option<String>,
        /// Object path, e.g. uploads/a.jpg
        #[arg(long, requires = "bucket")]
        path: Option<String>,
        /// Declared content type (read from the store when omitted)
        #[arg(long)]
        content_type: Option<String>,
        /// Object size in bytes (read from the store when omitted)
        #[arg(long)]
        size: Option<u64>,
        /// Object metadata entry, repeatable
        #[arg(long = "metadata", value_name = "KEY=VALUE", value_parser = parse_metadata_pair)]
        metadata: Vec<(String, String)>,
    },
    /// Apply the record-store schema
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_telemetry(config.log_format())?;
    config.validate().context("Invalid configuration")?;

    let limits = config.limits();
    tracing::info!(
        cpu = limits.cpu,
        memory = %limits.memory,
        region = %limits.region,
        invocation_timeout_secs = config.invocation_timeout().as_secs(),
        optimizer_timeout_secs = config.optimizer_timeout().as_secs(),
        "Deployment limits"
    );

    let code = match cli.command {
        Commands::Migrate => {
            migrate(&config).await?;
            0
        }
        Commands::Process {
            event,
            bucket,
            path,
            content_type,
            size,
            metadata,
        } => {
            let ctx = build_context(&config).await?;
            let event = match (event, bucket, path) {
                (Some(source), _, _) => read_event(&source)?,
                (None, Some(bucket), Some(path)) => {
                    event_from_object(
                        ctx.storage.as_ref(),
                        ObjectArgs {
                            bucket,
                            path,
                            content_type,
                            size,
                            metadata,
                        },
                    )
                    .await?
                }
                _ => anyhow::bail!("Either --event or --bucket and --path is required"),
            };

            let outcome = match tokio::time::timeout(
                config.invocation_timeout(),
                process_uploaded_media(&ctx, event),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::error!(
                        timeout_secs = config.invocation_timeout().as_secs(),
                        "Invocation exceeded its time budget"
                    );
                    InvocationOutcome::Aborted {
                        reason: "invocation timed out".to_string(),
                    }
                }
            };

            println!("{}", serde_json::to_string_pretty(&outcome_summary(&outcome))?);
            exit_code(&outcome)
        }
    };

    shutdown_telemetry().await;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

async fn build_context(config: &Config) -> anyhow::Result<PipelineContext> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize object store")?;
    tracing::info!(backend = %storage.backend_type(), "Object store ready");

    let database_url = config
        .database_url()
        .context("DATABASE_URL is required")?;
    let pool = create_pool(database_url, config.db_max_connections())
        .await
        .context("Failed to connect to record store")?;
    let records = Arc::new(PgRecordStore::new(pool));

    Ok(PipelineContext::from_config(config, storage, records))
}

async fn migrate(config: &Config) -> anyhow::Result<()> {
    let database_url = config
        .database_url()
        .context("DATABASE_URL is required")?;
    let pool = create_pool(database_url, 1)
        .await
        .context("Failed to connect to record store")?;
    run_migrations(&pool).await.context("Failed to run migrations")?;
    tracing::info!("Migrations applied");
    Ok(())
}
