//! `irops`: serve the coordinator over HTTP or drive it from the shell.

mod config;
mod fixture;

use clap::{Parser, Subcommand};
use config::{IropsConfig, StorageBackend};
use fixture::Fixture;
use irops_agent::build_recommender;
use irops_core::JobId;
use irops_gateway::GatewayServer;
use irops_orchestrator::{AuditLog, Coordinator};
use irops_store::{MemoryStore, SqliteStore, Store};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "irops", about = "Airline irregular-operations coordinator")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "irops.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run one coordination and print the report
    Coordinate {
        /// Disruption id
        id: JobId,
        /// Load this fixture first
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
    /// Show persisted worker records
    Status,
    /// Load flights and disruptions from a JSON fixture
    Seed {
        /// Fixture file
        fixture: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = IropsConfig::load(&cli.config).await?;
    let store = open_store(&config)?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let audit = AuditLog::new(config.audit_dir());
            let coordinator = build_coordinator(&config, store).await?.with_audit(audit);
            let app = GatewayServer::build(Arc::new(coordinator));

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!(%addr, "IROPS gateway listening");
            axum::serve(listener, app).await?;
        }
        Commands::Coordinate { id, fixture } => {
            if let Some(path) = fixture {
                Fixture::read(&path).await?.load_into(store.as_ref()).await?;
            }
            let audit = AuditLog::new(config.audit_dir());
            let coordinator = build_coordinator(&config, store)
                .await?
                .with_audit(audit.clone());
            let report = coordinator.run(id).await?;
            audit.flush().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Status => {
            let workers = store.list_workers().await?;
            if workers.is_empty() {
                println!("No worker records yet.");
                println!("Run `irops coordinate <id>` or `irops serve` first.");
            } else {
                println!("Workers:");
                for worker in &workers {
                    let task = worker.current_task.as_deref().unwrap_or("-");
                    println!(
                        "  {:<24} {:<11} {task}",
                        worker.name,
                        worker.status.to_string()
                    );
                }
                println!("\nTotal: {} worker(s)", workers.len());
            }
        }
        Commands::Seed { fixture } => {
            let fixture = Fixture::read(&fixture).await?;
            fixture.load_into(store.as_ref()).await?;
            println!(
                "Loaded {} flight(s) and {} disruption(s).",
                fixture.flights.len(),
                fixture.disruptions.len()
            );
        }
    }

    Ok(())
}

fn open_store(config: &IropsConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.storage.backend {
        StorageBackend::Sqlite => {
            let path = config.database_path();
            info!(path = %path.display(), "Opening SQLite store");
            Ok(Arc::new(SqliteStore::open(&path)?))
        }
        StorageBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn build_coordinator(
    config: &IropsConfig,
    store: Arc<dyn Store>,
) -> anyhow::Result<Coordinator> {
    let recommender = build_recommender(&config.recommender);
    let coordinator =
        Coordinator::airline(store, recommender, config.coordinator.clone()).await?;
    Ok(coordinator)
}
