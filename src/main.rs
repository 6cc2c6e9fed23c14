//! # Shepherd — Church Operations Backend
//!
//! Follow-up tracking, cell group management, and reminder scheduling.
//!
//! Usage:
//!   shepherd run                 # Start the reminder scheduler daemon
//!   shepherd sweep               # Run one due-reminder sweep and exit
//!   shepherd cell-report <id>    # Print attendance metrics for a cell
//!   shepherd init-config         # Write a default config file

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shepherd_cells::CellEngine;
use shepherd_channels::ReminderRouter;
use shepherd_core::config::ShepherdConfig;
use shepherd_core::traits::{CellStore, FollowUpStore, MemberDirectory, UserDirectory};
use shepherd_followup::FollowUpEngine;
use shepherd_scheduler::ReminderJob;
use shepherd_store::{MemoryStore, SqliteStore};

#[derive(Parser)]
#[command(
    name = "shepherd",
    version,
    about = "⛪ Shepherd — follow-up tracking and cell group operations"
)]
struct Cli {
    /// Config file path (default: ~/.shepherd/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the reminder scheduler and keep running
    Run,
    /// Run one due-reminder sweep and exit
    Sweep,
    /// Print attendance metrics for a cell and exit
    CellReport {
        /// Cell id
        id: String,
        /// Rolling window size in weeks
        #[arg(long, default_value_t = 4)]
        weeks: usize,
    },
    /// Write a default config file and exit
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "shepherd=debug"
    } else {
        "shepherd=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => ShepherdConfig::load_from(path)?,
        None => ShepherdConfig::load()?,
    };

    match cli.command {
        Command::InitConfig => {
            let path = ShepherdConfig::default_path();
            if path.exists() {
                println!("⚠️  Config already exists at {}", path.display());
            } else {
                ShepherdConfig::default().save()?;
                println!("✅ Default config written to {}", path.display());
            }
            Ok(())
        }
        Command::Sweep => {
            let engines = build_engines(&config)?;
            let count = engines.follow_up.run_due_reminders().await?;
            println!("🔔 Examined {count} due follow-up(s)");
            Ok(())
        }
        Command::CellReport { id, weeks } => {
            let engines = build_engines(&config)?;
            let metrics = engines.cells.metrics(&id, weeks).await?;
            println!("{}", serde_json::to_string_pretty(&metrics)?);
            Ok(())
        }
        Command::Run => {
            println!("⛪ Shepherd v{}", env!("CARGO_PKG_VERSION"));
            println!("   🗄️  Store:   {} ({})", config.store.backend, config.store.db_path().display());
            println!("   ⏰ Sweep:   every {}s", config.scheduler.sweep_interval_secs);
            println!("   📨 Channels: {}", config.channels.priority.join(" → "));
            println!();

            if !config.scheduler.enabled {
                tracing::warn!("scheduler disabled in config; reminders will not fire");
                tokio::signal::ctrl_c().await?;
                return Ok(());
            }

            let engines = build_engines(&config)?;
            let job = ReminderJob::new(engines.follow_up, config.scheduler.sweep_interval_secs);
            let handle = job.spawn();

            tokio::signal::ctrl_c().await?;
            tracing::info!("shutting down");
            handle.abort();
            Ok(())
        }
    }
}

struct Engines {
    follow_up: Arc<FollowUpEngine>,
    cells: Arc<CellEngine>,
}

impl std::fmt::Debug for Engines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engines").finish_non_exhaustive()
    }
}

/// Wire the engines to the configured store and channels.
fn build_engines(config: &ShepherdConfig) -> Result<Engines> {
    let router = ReminderRouter::from_config(&config.channels);
    if router.is_empty() {
        tracing::warn!("no delivery channels configured; reminder dispatch will fail");
    }
    let router = Arc::new(router);

    match config.store.backend.as_str() {
        "memory" => Ok(wire(Arc::new(MemoryStore::new()), router)),
        "sqlite" => Ok(wire(
            Arc::new(SqliteStore::open(&config.store.db_path())?),
            router,
        )),
        other => anyhow::bail!("unknown store backend '{other}' (expected \"sqlite\" or \"memory\")"),
    }
}

fn wire<S>(store: Arc<S>, router: Arc<ReminderRouter>) -> Engines
where
    S: FollowUpStore + CellStore + MemberDirectory + UserDirectory + 'static,
{
    Engines {
        follow_up: Arc::new(FollowUpEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            router,
        )),
        cells: Arc::new(CellEngine::new(store.clone(), store)),
    }
}
