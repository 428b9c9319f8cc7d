/// Matchwatch — Daily Digest
///
/// Ranní přehled: dnešní zápasy sledovaných soutěží do Telegramu.
/// Spouštět jednou denně (cron / systemd timer).
///
/// Spuštění:
///   cargo run --bin daily-digest               # dnešek v DIGEST_TIMEZONE
///   cargo run --bin daily-digest -- 2024-05-01 # konkrétní den

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use dotenv::dotenv;
use football_monitor::{build_digest, MonitorConfig, SportmonksClient};
use notifier::{notifier_from_env, Notifier};
use std::env;
use tracing::info;
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

    let cfg = MonitorConfig::from_env();

    let date = match env::args().nth(1) {
        Some(arg) => NaiveDate::parse_from_str(&arg, "%Y-%m-%d")
            .with_context(|| format!("'{arg}' is not a YYYY-MM-DD date"))?,
        None => Utc::now().with_timezone(&cfg.digest_tz).date_naive(),
    };

    let source = SportmonksClient::from_config(&cfg).context("building Sportmonks client")?;
    let notifier = notifier_from_env(cfg.http.timeout)?;

    let digest = build_digest(&source, date, &cfg.competitions, cfg.digest_tz).await?;
    info!(%date, fixtures = digest.fixtures.len(), "digest built");

    notifier.send(&digest.text).await.context("sending daily digest")?;
    info!("digest sent");
    Ok(())
}
