//! Konfigurace z prostředí (`.env` načítá binárka přes dotenv)

use anyhow::{bail, Result};
use chrono_tz::Tz;
use match_engine::classifier::{
    DEFAULT_DISALLOWED_KEYWORDS, DEFAULT_EARLY_CAUTION_MINUTE, DEFAULT_VAR_REASON_KEYWORDS, DEFAULT_WOODWORK_KEYWORDS,
};
use match_engine::thresholds::{DEFAULT_SHOTS_ON_TARGET, DEFAULT_STATS_CUTOFF_MINUTE, DEFAULT_XG};
use match_engine::{Classifier, KeywordPolicy, RuleTable, StatMetric, StatThreshold, ThresholdPolicy};
use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const DEFAULT_KICKOFF_LEAD_MINS: i64 = 5;
const MAX_KICKOFF_LEAD_MINS: i64 = 24 * 60;

/// Ligy sledované ve výchozím stavu (Sportmonks league ids)
pub const DEFAULT_COMPETITIONS: &[u64] = &[
    2, 3, 4, 5, 6, 7, 8, 9, 13, 82, 94, 140, 141, 151, 152, 203, 235, 253, 262,
];

pub const DEFAULT_SPORTMONKS_BASE: &str = "https://api.sportmonks.com/v3/football";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// One in-play list call per tick
    InPlay,
    /// Pre-enumerated daily list, per-fixture detail calls
    Scheduled,
}

impl FromStr for PollMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inplay" | "in_play" | "live" => Ok(PollMode::InPlay),
            "scheduled" | "daily" => Ok(PollMode::Scheduled),
            other => bail!("unknown poll mode '{other}'"),
        }
    }
}

impl PollMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PollMode::InPlay => "inplay",
            PollMode::Scheduled => "scheduled",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout:             Duration,
    pub max_attempts:        u32,
    pub retry_base_delay:    Duration,
    pub requests_per_minute: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout:             Duration::from_secs(10),
            max_attempts:        3,
            retry_base_delay:    Duration::from_millis(500),
            requests_per_minute: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub api_token:            Option<String>,
    pub api_base:             String,
    pub poll_mode:            PollMode,
    pub poll_interval:        Duration,
    /// Empty set = every competition
    pub competitions:         HashSet<u64>,
    pub kickoff_lead:         chrono::Duration,
    pub early_caution_minute: u32,
    pub stats_cutoff_minute:  u32,
    pub shots_on_target:      f64,
    pub xg_threshold:         f64,
    pub disallowed_keywords:  Vec<String>,
    pub var_reason_keywords:  Vec<String>,
    pub var_policy:           KeywordPolicy,
    pub woodwork_keywords:    Vec<String>,
    pub alert_goals:          bool,
    pub http:                 HttpConfig,
    pub digest_tz:            Tz,
    pub log_dir:              String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            api_token:            None,
            api_base:             DEFAULT_SPORTMONKS_BASE.to_string(),
            poll_mode:            PollMode::InPlay,
            poll_interval:        Duration::from_secs(40),
            competitions:         DEFAULT_COMPETITIONS.iter().copied().collect(),
            kickoff_lead:         chrono::Duration::minutes(DEFAULT_KICKOFF_LEAD_MINS),
            early_caution_minute: DEFAULT_EARLY_CAUTION_MINUTE,
            stats_cutoff_minute:  DEFAULT_STATS_CUTOFF_MINUTE,
            shots_on_target:      DEFAULT_SHOTS_ON_TARGET,
            xg_threshold:         DEFAULT_XG,
            disallowed_keywords:  owned(DEFAULT_DISALLOWED_KEYWORDS),
            var_reason_keywords:  owned(DEFAULT_VAR_REASON_KEYWORDS),
            var_policy:           KeywordPolicy::Primary,
            woodwork_keywords:    owned(DEFAULT_WOODWORK_KEYWORDS),
            alert_goals:          true,
            http:                 HttpConfig::default(),
            digest_tz:            chrono_tz::Europe::Madrid,
            log_dir:              "logs".to_string(),
        }
    }
}

impl MonitorConfig {
    pub fn from_env() -> Self {
        let d = MonitorConfig::default();

        let poll_interval_secs = env_parse("MONITOR_POLL_INTERVAL_SECS", d.poll_interval.as_secs());
        if !(15..=40).contains(&poll_interval_secs) {
            warn!(
                poll_interval_secs,
                "poll interval outside 15-40s: faster risks rate limits, slower risks missing events"
            );
        }

        let poll_mode = match env::var("MONITOR_POLL_MODE") {
            Ok(v) => v.parse().unwrap_or_else(|e| {
                warn!("{e}, falling back to inplay");
                PollMode::InPlay
            }),
            Err(_) => d.poll_mode,
        };

        let var_policy = env::var("MONITOR_VAR_POLICY")
            .ok()
            .and_then(|v| {
                let parsed = KeywordPolicy::parse(&v);
                if parsed.is_none() {
                    warn!("MONITOR_VAR_POLICY='{v}' not understood, using 'any'");
                }
                parsed
            })
            .unwrap_or(d.var_policy);

        let competitions = match env::var("MONITOR_COMPETITIONS") {
            Ok(v) => parse_id_list(&v),
            Err(_) => d.competitions,
        };

        let digest_tz = env::var("DIGEST_TIMEZONE")
            .ok()
            .and_then(|v| match v.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(_) => {
                    warn!("DIGEST_TIMEZONE='{v}' unknown, using Europe/Madrid");
                    None
                }
            })
            .unwrap_or(d.digest_tz);

        Self {
            api_token: env::var("SPORTMONKS_API_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            api_base: env::var("SPORTMONKS_BASE_URL").unwrap_or(d.api_base),
            poll_mode,
            poll_interval: Duration::from_secs(poll_interval_secs),
            competitions,
            kickoff_lead: kickoff_lead(env_parse("MONITOR_KICKOFF_LEAD_MINS", DEFAULT_KICKOFF_LEAD_MINS)),
            early_caution_minute: env_parse("MONITOR_EARLY_CAUTION_MINUTE", d.early_caution_minute),
            stats_cutoff_minute: env_parse("MONITOR_STATS_CUTOFF_MINUTE", d.stats_cutoff_minute),
            shots_on_target: env_parse("MONITOR_SHOTS_ON_TARGET", d.shots_on_target),
            xg_threshold: env_parse("MONITOR_XG_THRESHOLD", d.xg_threshold),
            disallowed_keywords: env_list("MONITOR_DISALLOWED_KEYWORDS").unwrap_or(d.disallowed_keywords),
            var_reason_keywords: env_list("MONITOR_VAR_REASON_KEYWORDS").unwrap_or(d.var_reason_keywords),
            var_policy,
            woodwork_keywords: env_list("MONITOR_WOODWORK_KEYWORDS").unwrap_or(d.woodwork_keywords),
            alert_goals: env_parse("MONITOR_ALERT_GOALS", d.alert_goals),
            http: HttpConfig {
                timeout: Duration::from_secs(env_parse("HTTP_TIMEOUT_SECS", d.http.timeout.as_secs())),
                max_attempts: env_parse("HTTP_MAX_ATTEMPTS", d.http.max_attempts).max(1),
                retry_base_delay: Duration::from_millis(env_parse(
                    "HTTP_RETRY_BASE_MS",
                    d.http.retry_base_delay.as_millis() as u64,
                )),
                requests_per_minute: env_parse("PROVIDER_REQUESTS_PER_MINUTE", d.http.requests_per_minute).max(1),
            },
            digest_tz,
            log_dir: env::var("LOG_DIR").unwrap_or(d.log_dir),
        }
    }

    pub fn rule_table(&self) -> RuleTable {
        RuleTable::standard(
            &self.disallowed_keywords,
            &self.var_reason_keywords,
            self.var_policy,
            &self.woodwork_keywords,
            self.early_caution_minute,
        )
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.rule_table(), self.alert_goals)
    }

    pub fn threshold_policy(&self) -> ThresholdPolicy {
        ThresholdPolicy {
            thresholds: vec![
                StatThreshold::new(StatMetric::ShotsOnTarget, self.shots_on_target),
                StatThreshold::new(StatMetric::ExpectedGoals, self.xg_threshold),
            ],
            max_minute: self.stats_cutoff_minute,
        }
    }

    /// Empty allow-list lets everything through
    pub fn allows_competition(&self, competition_id: u64) -> bool {
        self.competitions.is_empty() || self.competitions.contains(&competition_id)
    }
}

/// 0..=1 den; cokoliv jiného → default
fn kickoff_lead(minutes: i64) -> chrono::Duration {
    if (0..=MAX_KICKOFF_LEAD_MINS).contains(&minutes) {
        return chrono::Duration::minutes(minutes);
    }
    warn!(minutes, "MONITOR_KICKOFF_LEAD_MINS out of range, using {DEFAULT_KICKOFF_LEAD_MINS}");
    chrono::Duration::minutes(DEFAULT_KICKOFF_LEAD_MINS)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

/// Comma-separated list; unset or blank → None
fn env_list(key: &str) -> Option<Vec<String>> {
    let raw = env::var(key).ok()?;
    let items = parse_keyword_list(&raw);
    (!items.is_empty()).then_some(items)
}

pub fn parse_keyword_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

pub fn parse_id_list(raw: &str) -> HashSet<u64> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            match s.parse::<u64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!("ignoring competition id '{s}'");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kickoff_lead_out_of_range_falls_back() {
        assert_eq!(kickoff_lead(15), chrono::Duration::minutes(15));
        assert_eq!(kickoff_lead(0), chrono::Duration::zero());
        let fallback = chrono::Duration::minutes(DEFAULT_KICKOFF_LEAD_MINS);
        assert_eq!(kickoff_lead(i64::MAX), fallback);
        assert_eq!(kickoff_lead(-3), fallback);
        assert_eq!(kickoff_lead(MAX_KICKOFF_LEAD_MINS + 1), fallback);
    }

    #[test]
    fn id_list_tolerates_junk() {
        let ids = parse_id_list("8, 564 ,abc,,  82");
        assert_eq!(ids, [8, 564, 82].into_iter().collect());
    }

    #[test]
    fn keyword_list_trims() {
        assert_eq!(parse_keyword_list(" post, crossbar ,, "), vec!["post", "crossbar"]);
    }

    #[test]
    fn poll_mode_parsing() {
        assert_eq!("InPlay".parse::<PollMode>().unwrap(), PollMode::InPlay);
        assert_eq!("daily".parse::<PollMode>().unwrap(), PollMode::Scheduled);
        assert!("weekly".parse::<PollMode>().is_err());
    }

    #[test]
    fn empty_allow_list_admits_everything() {
        let mut cfg = MonitorConfig::default();
        assert!(cfg.allows_competition(8));
        assert!(!cfg.allows_competition(999_999));
        cfg.competitions.clear();
        assert!(cfg.allows_competition(999_999));
    }

    #[test]
    fn thresholds_follow_config() {
        let cfg = MonitorConfig { shots_on_target: 6.0, stats_cutoff_minute: 20, ..MonitorConfig::default() };
        let policy = cfg.threshold_policy();
        assert_eq!(policy.max_minute, 20);
        assert_eq!(policy.thresholds[0].min_value, 6.0);
    }
}
