//! feedstash - A feed aggregation engine with credential pooling and note export
//!
//! This is the main entry point for the feedstash application.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;

use feedstash::api::HttpContentApi;
use feedstash::config::Config;
use feedstash::database::{Database, SqliteDatabase};
use feedstash::logging::init_logging;
use feedstash::models::{Credential, CredentialStatus, Feed};
use feedstash::notes::FilesystemNoteStore;
use feedstash::pool::CredentialPool;
use feedstash::sync::{Scheduler, SyncEngine, SyncOptions};

/// feedstash - A feed aggregation engine with credential pooling and note export
#[derive(Parser, Debug)]
#[command(name = "feedstash")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "FEEDSTASH_CONFIG", global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the sync scheduler until interrupted
    Serve,

    /// Run a single sync in the foreground and exit
    Sync {
        /// Limit the run to these feed IDs (comma separated)
        #[arg(long, value_delimiter = ',')]
        feeds: Option<Vec<i64>>,

        /// Override the staleness threshold in hours (0 selects every feed)
        #[arg(long)]
        stale_hours: Option<u32>,

        /// Skip note materialization for this run
        #[arg(long)]
        no_notes: bool,
    },

    /// Manage the credential pool
    Credential {
        #[command(subcommand)]
        command: CredentialCommands,
    },

    /// Manage feeds
    Feed {
        #[command(subcommand)]
        command: FeedCommands,
    },
}

#[derive(Subcommand, Debug)]
enum CredentialCommands {
    /// Add a credential to the pool
    Add {
        /// Label shown in listings and logs
        #[arg(long)]
        label: String,

        /// Secret the content platform expects
        #[arg(long)]
        secret: String,
    },

    /// List all credentials with their status
    List,

    /// Force a credential into a specific status
    SetStatus {
        /// Credential ID
        #[arg(long)]
        id: i64,

        /// One of: active, disabled, expired, blacklisted
        #[arg(long)]
        status: String,
    },
}

#[derive(Subcommand, Debug)]
enum FeedCommands {
    /// Register a feed for syncing
    Add {
        /// Display name
        #[arg(long)]
        name: String,

        /// Identifier of the feed on the content platform
        #[arg(long)]
        source_id: String,

        /// Credential this feed was discovered with
        #[arg(long)]
        credential_id: i64,
    },

    /// List all feeds with their last sync time
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let config = load_config(&args)?;

    // Initialize tracing/logging
    init_logging(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting feedstash");

    // Initialize database
    let database = SqliteDatabase::new(&config.database.path).await?;
    let database = Arc::new(database);
    info!(path = %config.database.path, "Database initialized");

    match args.command {
        Commands::Serve => serve(database, &config).await,
        Commands::Sync {
            feeds,
            stale_hours,
            no_notes,
        } => sync_once(database, &config, feeds, stale_hours, no_notes).await,
        Commands::Credential { command } => manage_credentials(database, &config, command).await,
        Commands::Feed { command } => manage_feeds(database, command).await,
    }
}

/// Run the scheduler until a shutdown signal arrives
async fn serve(database: Arc<SqliteDatabase>, config: &Config) -> anyhow::Result<()> {
    config.validate()?;

    let api = Arc::new(HttpContentApi::new(&config.api));
    let notes = Arc::new(FilesystemNoteStore::new_with_init(&config.notes.dir).await?);
    let engine = Arc::new(SyncEngine::new(database, api, notes, config));

    let scheduler = Scheduler::new(config.scheduler.clone());
    let handle = scheduler.handle();
    let interval = Duration::from_secs(u64::from(config.sync.interval_minutes) * 60);
    handle.register(engine, interval).await;

    info!(
        interval_minutes = config.sync.interval_minutes,
        notes_dir = %config.notes.dir,
        "Starting scheduler"
    );

    let scheduler_task = scheduler.start();

    shutdown_signal().await;
    handle.stop();
    let _ = scheduler_task.await;

    info!("feedstash shutdown complete");

    Ok(())
}

/// Run one sync in the foreground and print the report
async fn sync_once(
    database: Arc<SqliteDatabase>,
    config: &Config,
    feeds: Option<Vec<i64>>,
    stale_hours: Option<u32>,
    no_notes: bool,
) -> anyhow::Result<()> {
    config.validate()?;

    let api = Arc::new(HttpContentApi::new(&config.api));
    let notes = Arc::new(FilesystemNoteStore::new_with_init(&config.notes.dir).await?);
    let engine = SyncEngine::new(database, api, notes, config);

    let options = SyncOptions {
        feed_ids: feeds,
        stale_threshold_hours: stale_hours,
        materialize: if no_notes { Some(false) } else { None },
    };

    let report = engine.run(options).await?;
    println!("{}", report);
    for error in &report.errors {
        println!("  {}", error);
    }

    Ok(())
}

/// Handle the credential management subcommands
async fn manage_credentials(
    database: Arc<SqliteDatabase>,
    config: &Config,
    command: CredentialCommands,
) -> anyhow::Result<()> {
    match command {
        CredentialCommands::Add { label, secret } => {
            let id = database
                .create_credential(&Credential::new(0, label.clone(), secret))
                .await?;
            println!("Created credential {} ({})", id, label);
        }
        CredentialCommands::List => {
            let credentials = database.list_credentials().await?;
            if credentials.is_empty() {
                println!("No credentials configured");
            }
            for credential in credentials {
                match credential.blacklisted_until {
                    Some(until) => println!(
                        "{:>4}  {:<20} {} (until {})",
                        credential.id, credential.label, credential.status, until
                    ),
                    None => println!(
                        "{:>4}  {:<20} {}",
                        credential.id, credential.label, credential.status
                    ),
                }
            }
        }
        CredentialCommands::SetStatus { id, status } => {
            let status: CredentialStatus = status.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let pool = CredentialPool::new(database, config.pool.clone());
            pool.set_status(id, status).await?;
            println!("Credential {} set to {}", id, status);
        }
    }

    Ok(())
}

/// Handle the feed management subcommands
async fn manage_feeds(database: Arc<SqliteDatabase>, command: FeedCommands) -> anyhow::Result<()> {
    match command {
        FeedCommands::Add {
            name,
            source_id,
            credential_id,
        } => {
            let id = database
                .create_feed(&Feed::new(0, name.clone(), source_id, credential_id))
                .await?;
            println!("Created feed {} ({})", id, name);
        }
        FeedCommands::List => {
            let feeds = database.list_feeds().await?;
            if feeds.is_empty() {
                println!("No feeds configured");
            }
            for feed in feeds {
                match feed.last_sync_at {
                    Some(at) => println!(
                        "{:>4}  {:<24} {:<20} last synced {}",
                        feed.id, feed.name, feed.source_id, at
                    ),
                    None => println!(
                        "{:>4}  {:<24} {:<20} never synced",
                        feed.id, feed.name, feed.source_id
                    ),
                }
            }
        }
    }

    Ok(())
}

/// Load configuration from file or environment
fn load_config(args: &Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path);
            Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
        None => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from environment variables");
            Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
    }
}

/// Create a future that resolves when a shutdown signal is received
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
