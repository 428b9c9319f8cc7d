/// Matchwatch — Logger
/// JSONL event stream (one file per UTC day)

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open {}", path.display()))?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct AlertSentEvent {
    pub ts:         String,
    pub event:      &'static str,   // "ALERT_SENT"
    pub fixture_id: String,
    pub fixture:    String,         // "Home vs Away"
    pub alert:      String,         // "disallowed_goal" | "woodwork_shot" | ...
    pub key:        String,
    pub delivered:  bool,
}

#[derive(Serialize, Debug)]
pub struct LifecycleEvent {
    pub ts:         String,
    pub event:      &'static str,   // "LIFECYCLE"
    pub fixture_id: String,
    pub from:       Option<String>,
    pub to:         String,
}

#[derive(Serialize, Debug)]
pub struct ApiStatusEvent {
    pub ts:           String,
    pub event:        &'static str, // "API_STATUS"
    pub source:       String,
    pub scope:        String,
    pub ok:           bool,
    pub status_code:  Option<u16>,
    pub message:      String,
    pub items_logged: usize,
}

#[derive(Serialize, Debug)]
pub struct PollCycleEvent {
    pub ts:                String,
    pub event:             &'static str, // "POLL_CYCLE"
    pub mode:              String,
    pub poll_interval_secs: u64,
    pub fixtures_polled:   usize,
    pub fixtures_failed:   usize,
    pub alerts_sent:       usize,
    pub alerts_failed:     usize,
    pub list_ok:           bool,
}
