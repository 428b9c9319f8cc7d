//! Matchwatch — Notifier
//!
//! Doručení alertů do Telegramu. Delivery is fire-and-forget: a failed send
//! is returned as an error for the caller to log, and never retried here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

pub mod format;

pub use format::{escape_html, render_alert};

const TELEGRAM_API: &str = "https://api.telegram.org";

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

pub struct TelegramNotifier {
    client:     reqwest::Client,
    api_base:   String,
    token:      String,
    chat_id:    String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building telegram http client")?;
        Ok(Self {
            client,
            api_base: TELEGRAM_API.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// sendMessage(chat, text); returns the Telegram message id
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<i64> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let body = message_body(chat_id, text);

        let resp = self.client.post(&url).json(&body).send().await.context("telegram request failed")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            anyhow::bail!("Telegram sendMessage failed: {} — {}", status, snippet);
        }
        let resp_json: serde_json::Value = resp.json().await.context("telegram response decode")?;
        Ok(resp_json["result"]["message_id"].as_i64().unwrap_or(0))
    }
}

/// Alerts are rendered as Telegram HTML
fn message_body(chat_id: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "chat_id": chat_id,
        "text": text,
        "parse_mode": "HTML",
        "disable_web_page_preview": true,
    })
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let msg_id = self.send_message(&self.chat_id, text).await?;
        info!(chat = %self.chat_id, msg_id, "telegram alert sent");
        Ok(())
    }
}

/// Telegram when `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID` are both set,
/// otherwise alerts only go to the log.
pub fn notifier_from_env(timeout: Duration) -> Result<Arc<dyn Notifier>> {
    let token = env::var("TELEGRAM_BOT_TOKEN").ok().filter(|v| !v.trim().is_empty());
    let chat_id = env::var("TELEGRAM_CHAT_ID").ok().filter(|v| !v.trim().is_empty());

    match (token, chat_id) {
        (Some(token), Some(chat_id)) => {
            info!(chat = %chat_id, "telegram notifier enabled");
            Ok(Arc::new(TelegramNotifier::new(token, chat_id, timeout)?))
        }
        _ => {
            warn!("telegram credentials missing, alerts will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Used when no Telegram credentials are configured: alerts go to the log.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        warn!("TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set, alert only logged:\n{}", text);
        Ok(())
    }
}

/// Keeps every message in memory. Handy for dry runs and tests.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(text.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_notifier_keeps_order() {
        let n = RecordingNotifier::new();
        n.send("one").await.unwrap();
        n.send("two").await.unwrap();
        assert_eq!(n.messages(), vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test]
    async fn unreachable_telegram_is_an_error_not_a_panic() {
        let n = TelegramNotifier::new("token", "42", Duration::from_millis(300))
            .unwrap()
            .with_api_base("http://127.0.0.1:9");
        assert!(n.send("hello").await.is_err());
    }

    #[test]
    fn message_body_is_html() {
        let body = message_body("42", "<b>GOAL</b>");
        assert_eq!(body["chat_id"], "42");
        assert_eq!(body["parse_mode"], "HTML");
        assert_eq!(body["text"], "<b>GOAL</b>");
    }
}
