mod catalog;
mod celebration;
mod contact;
mod db;
mod engagement;
mod flags;
mod models;
mod score;
mod settings;
mod unlocks;
mod utils;

pub use catalog::{CatalogEntry, ItemCategory, RewardCatalog};
pub use celebration::{
    CelebrationCause, CelebrationController, CelebrationState, CelebrationStatus,
    CelebrationTiming, Intensity, MilestonePolicy,
};
pub use contact::{
    classify_contact, is_valid_contact, ContactError, ContactKind, ContactRequestSubmitter,
    ContactStage, ContactSubmission, DeliveryError, Notifier, OutboxNotifier, SubmitOutcome,
};
pub use db::{Database, OutboxMessage};
pub use engagement::{commands::run_command, Command, EngagementSession, EngagementSnapshot};
pub use flags::{KeyValueStore, MemoryStore, PersistentFlags};
pub use models::{ContactPayload, UnlockableItem};
pub use score::{level_for, LevelUpAnnouncer, LevelUpNotice, ScoreSnapshot, ScoreStore};
pub use settings::{EngagementSettings, SettingsStore};
pub use unlocks::UnlockTracker;

use std::{env, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

const DATA_DIR_ENV: &str = "DISCOVERY_DATA_DIR";
const DEBUG_ENV: &str = "DISCOVERY_DEBUG";
const DEFAULT_DATA_DIR: &str = ".discovery";

fn data_dir() -> PathBuf {
    env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

fn init_logging() {
    let debug_mode = env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let level = if debug_mode {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // RUST_LOG, when set, wins over the default level.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Runs one engagement session driven by commands on stdin, printing a JSON
/// snapshot after each one.
pub fn run() -> Result<()> {
    init_logging();
    info!("Discovery session starting up...");

    let app_data_dir = data_dir();
    std::fs::create_dir_all(&app_data_dir)
        .with_context(|| format!("failed to create data directory {}", app_data_dir.display()))?;

    let settings_store = SettingsStore::new(app_data_dir.join("settings.json"))?;
    let settings = settings_store.engagement();
    let database = Database::new(app_data_dir.join("discovery.sqlite3"))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let result = runtime.block_on(async move {
        let session = EngagementSession::new(
            PersistentFlags::new(Arc::new(database.clone())),
            OutboxNotifier::new(database.clone()),
            &settings,
        );

        let cancel_token = CancellationToken::new();
        let ctrl_c_token = cancel_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c_token.cancel();
            }
        });

        let result = serve(&session, cancel_token).await;
        session.shutdown();

        match database.count_outbox_messages().await {
            Ok(pending) => info!("{pending} contact request(s) waiting in outbox"),
            Err(err) => warn!("Failed to count outbox messages: {err:#}"),
        }
        result
    });

    // A pending stdin read would otherwise hold up shutdown after ctrl-c.
    runtime.shutdown_background();
    result
}

async fn serve<N: Notifier>(
    session: &EngagementSession<N>,
    cancel_token: CancellationToken,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read command")?,
            _ = cancel_token.cancelled() => {
                info!("Interrupted; ending session");
                break;
            }
        };

        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let reply = match line.parse::<Command>() {
            Ok(command) => run_command(session, command).await,
            Err(err) => Err(err.to_string()),
        };

        let output = match reply {
            Ok(snapshot) => serde_json::to_string(&snapshot)?,
            Err(message) => serde_json::json!({ "error": message }).to_string(),
        };
        println!("{output}");
    }

    Ok(())
}
