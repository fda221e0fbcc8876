use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use taskline::config::ServerConfig;
use taskline::driver::{self, DriverConfig, Manifest};
use taskline::logging::{self, LogConfig};
use taskline::rpc::TaskServer;
use tracing::info;

#[derive(Parser)]
#[command(name = "taskline")]
#[command(about = "Line-delimited JSON task server and load driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level
    #[arg(long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the task server
    Serve(ServeArgs),
    /// Fan out concurrent clients against a running server
    Client(ClientArgs),
}

/// Command-line overrides, layered over the config file.
#[derive(Args, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ServeArgs {
    #[serde(skip)]
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    welcome_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    max_message_size: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    max_concurrent_connections: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    connection_idle_timeout_seconds: Option<u64>,
}

#[derive(Args)]
struct ClientArgs {
    /// Server address
    #[arg(long, default_value = "localhost:8080")]
    addr: String,

    /// JSON array of requests
    #[arg(long, default_value = "tasks.json")]
    manifest: PathBuf,

    /// Task numbers to send, one logical client each
    #[arg(long, value_delimiter = ',', default_value = "1")]
    tasks: Vec<i64>,

    /// Logical clients per task
    #[arg(long, default_value_t = 1)]
    clients_per_task: usize,

    #[arg(long, default_value_t = 2000)]
    connect_timeout_ms: u64,

    /// Pause between client launches
    #[arg(long, default_value_t = 150)]
    spawn_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(LogConfig {
        json: cli.json_logs,
        verbose: cli.verbose,
    });

    match cli.command {
        Commands::Serve(args) => run_server(args).await.context("Failed to run server")?,
        Commands::Client(args) => run_clients(args).await.context("Failed to run clients")?,
    }

    Ok(())
}

async fn run_server(args: ServeArgs) -> Result<()> {
    let config = ServerConfig::load(&args.config, Some(&args))
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    info!(?config, "Configuration loaded");

    let server = TaskServer::bind(config).await?;
    server.serve().await
}

async fn run_clients(args: ClientArgs) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)?;
    let requests = manifest.select(&args.tasks)?;

    let config = DriverConfig {
        addr: args.addr,
        clients_per_task: args.clients_per_task,
        connect_timeout: Duration::from_millis(args.connect_timeout_ms),
        spawn_delay: Duration::from_millis(args.spawn_delay_ms),
    };

    let reports = driver::run(&config, requests).await;
    for report in &reports {
        match &report.outcome {
            Ok(response) => println!(
                "[Client {}] task #{} -> {}",
                report.client_id,
                report.task,
                serde_json::to_string(response)?
            ),
            Err(e) => println!(
                "[Client {}] task #{} failed: {}",
                report.client_id, report.task, e
            ),
        }
    }

    Ok(())
}
