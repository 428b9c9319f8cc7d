/// Matchwatch — Live Alerts
///
/// Co dělá:
///   1. Každých ~40s polluje živé fotbalové zápasy (Sportmonks)
///   2. Sleduje stav zápasu (začátek / konec / zrušení)
///   3. Klasifikuje události: neuznaný gól, tyčka/břevno, brzká žlutá, góly
///   4. Hlídá prahy statistik (střely na branku, xG) do 30. minuty
///   5. Každý alert právě jednou do Telegramu
///
/// Spuštění:
///   cargo run --bin live-alerts

use anyhow::{bail, Context, Result};
use chrono::Utc;
use dotenv::dotenv;
use football_monitor::{build_digest, MonitorConfig, Orchestrator, PollMode, SportmonksClient};
use logger::EventLogger;
use notifier::{notifier_from_env, Notifier};
use std::env;
use std::fs::File;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!("=== Matchwatch Live Alerts ===");

    // Single instance lock
    let lock_file_path = env::temp_dir().join("matchwatch_live_alerts.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of live-alerts is already running! Exiting.");
            return Ok(());
        }
    };

    let cfg = MonitorConfig::from_env();
    if cfg.api_token.is_none() {
        bail!("SPORTMONKS_API_TOKEN is not set, nothing to poll");
    }

    info!(
        mode = cfg.poll_mode.as_str(),
        interval_secs = cfg.poll_interval.as_secs(),
        competitions = cfg.competitions.len(),
        var_policy = ?cfg.var_policy,
        "configuration loaded"
    );
    info!("Logs: {}/", cfg.log_dir);

    let source = Arc::new(SportmonksClient::from_config(&cfg).context("building Sportmonks client")?);
    let notifier = notifier_from_env(cfg.http.timeout)?;
    let event_logger = EventLogger::new(&cfg.log_dir);

    let mode = cfg.poll_mode;
    let competitions = cfg.competitions.clone();
    let tz = cfg.digest_tz;
    let mut orchestrator = Orchestrator::new(cfg, source.clone(), notifier.clone()).with_logger(event_logger);

    // Scheduled mode polls the day's list instead of the in-play endpoint
    if mode == PollMode::Scheduled {
        let today = Utc::now().with_timezone(&tz).date_naive();
        let digest = build_digest(source.as_ref(), today, &competitions, tz)
            .await
            .context("loading today's fixtures")?;
        orchestrator.seed_schedule(digest.fixtures);
    }

    let hello = format!(
        "🟢 <b>Matchwatch</b> live alerts started ({} mode, {} fixtures scheduled)",
        mode.as_str(),
        orchestrator.schedule().len()
    );
    if let Err(e) = notifier.send(&hello).await {
        warn!("startup message not delivered: {e:#}");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            let _ = shutdown_tx.send(true);
        }
    });

    orchestrator.run(shutdown_rx).await;

    info!(
        tracked = orchestrator.state().tracker.active_count(),
        alerts = orchestrator.state().ledger.len(),
        "live-alerts stopped"
    );
    Ok(())
}
