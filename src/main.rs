//! Cloud Disk E2E - end-to-end verifier for the cloud-disk backend
//!
//! Runs the file workflow against a live deployment and probes the object
//! storage bucket behind it.

use anyhow::Context;
use clap::{Parser, Subcommand};
use cloud_disk_e2e::config::{Config, ConfigLoader};
use cloud_disk_e2e::storage::{s3::S3ObjectStore, StorageProbe};
use cloud_disk_e2e::telemetry::{self, LogFormat};
use cloud_disk_e2e::workflow::Workflow;
use cloud_disk_e2e::metrics;
use std::path::PathBuf;
use tracing::info;

/// Cloud Disk E2E - workflow verifier and storage capability probe
#[derive(Parser, Debug)]
#[command(name = "cloud-disk-e2e")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file (defaults to the environment)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directives, overridden by RUST_LOG
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format (pretty, json)
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    /// Print Prometheus metrics to stdout when finished
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run the end-to-end file workflow (default)
    Workflow,
    /// Check bucket info, write, read and delete permissions on object storage
    StorageProbe,
    /// Run the storage probe, then the workflow
    All,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    telemetry::init_subscriber(&args.log_level, args.log_format)?;
    info!("Starting Cloud Disk E2E v{}", cloud_disk_e2e::VERSION);

    let config = match &args.config {
        Some(path) => {
            let config = ConfigLoader::read(path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => ConfigLoader::read_env(),
    };

    let command = args.command.unwrap_or(Command::Workflow);
    let result = run(command, &config).await;

    if args.print_metrics {
        print!("{}", metrics::gather_text());
    }

    result
}

async fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    // Every section the command needs is checked before the first request
    let runs_workflow = matches!(command, Command::Workflow | Command::All);
    let runs_probe = matches!(command, Command::StorageProbe | Command::All);
    if runs_workflow {
        config.validate()?;
    }
    if runs_probe {
        config.require_storage()?;
    }

    if runs_probe {
        storage_probe(config).await?;
    }
    if runs_workflow {
        workflow(config).await?;
    }
    Ok(())
}

async fn storage_probe(config: &Config) -> anyhow::Result<()> {
    let storage = config.require_storage()?;
    info!(bucket = %storage.bucket, endpoint = %storage.endpoint(), "Probing object storage");

    let store = S3ObjectStore::connect(storage, config.api.request_timeout()).await;
    let report = StorageProbe::new(store)
        .run()
        .await
        .context("Storage capability probe failed")?;

    info!(key = %report.key, steps = report.steps.len(), "Storage probe passed");
    Ok(())
}

async fn workflow(config: &Config) -> anyhow::Result<()> {
    let mut workflow = Workflow::new(config.api.clone())?;
    let report = workflow.run().await.context("Workflow failed")?;

    if report.upload_degraded {
        info!(
            file = %report.file.name,
            "Workflow passed in degraded mode (upload refused by object storage)"
        );
    } else {
        info!(file = %report.file.name, "Workflow passed");
    }
    Ok(())
}
