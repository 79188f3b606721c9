//! CLI entry point for the kinship-resolve family graph service.
//!
//! Designed for subprocess invocation from the citizen profile service:
//! results are written as JSON to stdout, logs go to stderr.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use kinship_core::{CitizenId, KinshipConfig, RelationshipAssertion};
use kinship_graph::{GraphConfig, LazyGraphClient};
use kinship_resolve::{CleanupScheduler, FamilyResolver};
use kinship_store::PgStore;

#[derive(Parser)]
#[command(name = "kinship-resolve")]
#[command(about = "Family graph resolution and relationship cache maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: kinship).
    #[arg(short, long, default_value = "kinship", global = true)]
    config: String,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a citizen's family graph.
    Resolve {
        #[arg(long)]
        citizen_id: CitizenId,
        /// Traversal depth (default from config).
        #[arg(long)]
        depth: Option<u32>,
    },
    /// Refresh a citizen's cached relationships from the graph store.
    Sync {
        #[arg(long)]
        citizen_id: CitizenId,
        #[arg(long)]
        depth: Option<u32>,
    },
    /// Delete expired relationship cache rows once.
    Cleanup,
    /// Replace a citizen's relationships with operator assertions (reads a
    /// JSON array from stdin).
    Override {
        #[arg(long)]
        citizen_id: CitizenId,
    },
    /// Run the periodic cache cleanup until interrupted.
    Daemon,
    /// Apply database migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = KinshipConfig::load(&cli.config)?;

    let store = PgStore::connect(&config.database).await?;
    if config.database.run_migrations || matches!(cli.command, Command::Migrate) {
        store.migrate().await?;
    }
    let store = Arc::new(store);
    let graph = Arc::new(LazyGraphClient::new(GraphConfig::from(&config.neo4j)));

    let resolver = FamilyResolver::new(store.clone(), graph, store, &config);
    let default_depth = config.resolution.default_depth;

    match cli.command {
        Command::Resolve { citizen_id, depth } => {
            let result = resolver
                .resolve_family_graph(&citizen_id, depth.unwrap_or(default_depth))
                .await?;
            println!("{}", serde_json::to_string(&result)?);
            resolver.drain_background().await;
        }
        Command::Sync { citizen_id, depth } => {
            let depth = config.resolution.clamp_depth(depth.unwrap_or(default_depth));
            let synced = resolver
                .synchronizer()
                .sync_from_graph_store(&citizen_id, depth)
                .await?;
            println!("{}", serde_json::json!({ "synced": synced }));
        }
        Command::Cleanup => {
            let deleted = resolver.synchronizer().cleanup_expired_cache().await?;
            println!("{}", serde_json::json!({ "deleted": deleted }));
        }
        Command::Override { citizen_id } => {
            let input = std::io::read_to_string(std::io::stdin())?;
            let assertions: Vec<RelationshipAssertion> = serde_json::from_str(&input)?;
            let saved = resolver
                .synchronizer()
                .update_relationships_manually(&citizen_id, &assertions)
                .await?;
            println!("{}", serde_json::json!({ "saved": saved }));
        }
        Command::Daemon => {
            let scheduler = CleanupScheduler::new(
                resolver.synchronizer().clone(),
                config.cache.cleanup_interval(),
            );
            scheduler
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %e, "Failed to listen for shutdown signal");
                    }
                })
                .await;
        }
        Command::Migrate => {
            tracing::info!("Migrations applied");
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
