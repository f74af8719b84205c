mod config;
mod orchestrator;
mod reader;
mod report;
mod schema;
mod writer;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use svckit::config::DatabaseDriver;
use svckit::errors::DataError;
use svckit::database::{Connector, MemoryConnector, ScyllaConnector};

use crate::config::{ConfigOverrides, UserRegistryConfig};
use crate::orchestrator::{Orchestrator, RunSummary};

const EXIT_FATAL: u8 = 1;
/// The run finished but some inserts or reads failed.
const EXIT_PARTIAL_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "user-registry")]
#[command(
    about = "Bootstraps a users table on a Cassandra/ScyllaDB cluster and exercises writes and reads"
)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Contact point (host or host:port); repeat for several nodes
    #[arg(long = "host")]
    hosts: Vec<String>,

    /// Session driver: scylla (also for Cassandra) or memory
    #[arg(long)]
    driver: Option<String>,

    /// Exit 0 even when individual inserts or reads failed
    #[arg(long, default_value = "false")]
    allow_partial: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let overrides = ConfigOverrides {
        hosts: args.hosts.clone(),
        driver: args.driver.clone(),
    };
    let config = config::load_config(args.config.as_deref(), &overrides)?;

    // Initialize tracing; logs go to stderr so stdout carries only the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "user_registry={level},svckit={level}",
                    level = config.observability.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting user-registry (driver: {:?}, keyspace: {}, table: {})",
        config.database.driver, config.schema.keyspace, config.schema.table
    );

    let result = match config.database.driver {
        DatabaseDriver::Scylla => run(&ScyllaConnector, &config).await,
        DatabaseDriver::Memory => run(&MemoryConnector::new(), &config).await,
    };

    Ok(ExitCode::from(exit_status(result, args.allow_partial)))
}

async fn run<C: Connector>(
    connector: &C,
    config: &UserRegistryConfig,
) -> Result<RunSummary, DataError> {
    let stdout = std::io::stdout();
    Orchestrator::new(connector, config, stdout.lock()).run().await
}

fn exit_status(
    result: Result<RunSummary, DataError>,
    allow_partial: bool,
) -> u8 {
    match result {
        Ok(summary) if summary.is_clean() => {
            info!("Run completed: {} user(s) inserted", summary.inserted.len());
            0
        }
        Ok(summary) => {
            warn!(
                "Run completed with {} non-fatal error(s)",
                summary.failures.len()
            );
            if allow_partial {
                0
            } else {
                EXIT_PARTIAL_FAILURE
            }
        }
        Err(e) => {
            error!("Run failed: {}", e);
            EXIT_FATAL
        }
    }
}
