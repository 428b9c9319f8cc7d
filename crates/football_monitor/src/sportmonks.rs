//! Sportmonks v3 adapter
//!
//! Endpointy:
//!   livescores/inplay          — živé zápasy vč. událostí a statistik
//!   fixtures/{id}              — detail jednoho zápasu
//!   fixtures/date/{YYYY-MM-DD} — denní program (stránkovaný)
//!
//! Every raw field is optional and read through lenient deserializers, so a
//! malformed record degrades to defaults instead of failing the whole call.
//! Records that cannot be tracked at all (no fixture id) are skipped.

use crate::config::{HttpConfig, MonitorConfig};
use crate::error::{ProviderError, ProviderResult};
use crate::source::{FixtureFeed, FixtureSource};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use match_engine::{
    EventId, EventKind, Fixture, FixtureId, GoalStatus, LifecycleState, MatchEvent, StatMetric, StatisticSnapshot,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

const LIVE_INCLUDES: &str = "participants;state;periods;events.type;statistics.type";
const DETAIL_INCLUDES: &str = "participants;state;periods;events.type";
const STATS_INCLUDES: &str = "participants;statistics.type";
const DAILY_INCLUDES: &str = "participants;state;league.country";
const DAILY_PAGE_SIZE: u32 = 50;
const DAILY_MAX_PAGES: u32 = 20;
const MAX_BACKOFF: Duration = Duration::from_secs(30);

// Sportmonks type ids, used when the `type` include is missing
const TYPE_SHOTS_ON_TARGET: u64 = 86;
const TYPE_EXPECTED_GOALS: u64 = 5304;

// ====================================================================
// Lenient field readers
// ====================================================================

mod lenient {
    use super::*;

    pub fn opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(v.as_ref().and_then(value_u64))
    }

    pub fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(v.and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }))
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(v.as_ref().and_then(value_f64))
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(v.as_ref().and_then(value_string))
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(matches!(v, Some(Value::Bool(true))) || v.as_ref().and_then(value_u64) == Some(1))
    }

    /// Array of records; `null` or a non-array is empty, a bad item is dropped
    pub fn list<'de, D: Deserializer<'de>, T: DeserializeOwned>(d: D) -> Result<Vec<T>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(match v {
            Some(Value::Array(items)) => items.into_iter().filter_map(|i| serde_json::from_value(i).ok()).collect(),
            _ => Vec::new(),
        })
    }

    /// Like `list`, but keeps "absent" apart from "empty"
    pub fn opt_list<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<Value>>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(match v {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        })
    }

    /// Nested include; anything but a well-formed object is `None`
    pub fn opt_object<'de, D: Deserializer<'de>, T: DeserializeOwned>(d: D) -> Result<Option<T>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(match v {
            Some(obj @ Value::Object(_)) => serde_json::from_value(obj).ok(),
            _ => None,
        })
    }

    pub fn value_u64(v: &Value) -> Option<u64> {
        match v {
            Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn value_f64(v: &Value) -> Option<f64> {
        let f = match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
            _ => None,
        }?;
        f.is_finite().then_some(f)
    }

    pub fn value_string(v: &Value) -> Option<String> {
        match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

// ====================================================================
// Raw payload types
// ====================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SmFixture {
    #[serde(deserialize_with = "lenient::opt_u64")]
    id: Option<u64>,
    #[serde(deserialize_with = "lenient::opt_u64")]
    league_id: Option<u64>,
    #[serde(deserialize_with = "lenient::opt_u64")]
    state_id: Option<u64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    starting_at: Option<String>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    starting_at_timestamp: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_u64")]
    minute: Option<u64>,
    /// object `{developer_name, state, short_name}` or a bare code
    state: Option<Value>,
    #[serde(deserialize_with = "lenient::opt_object")]
    league: Option<SmLeague>,
    #[serde(deserialize_with = "lenient::list")]
    participants: Vec<SmParticipant>,
    #[serde(deserialize_with = "lenient::list")]
    periods: Vec<SmPeriod>,
    #[serde(deserialize_with = "lenient::list")]
    events: Vec<Value>,
    #[serde(deserialize_with = "lenient::opt_list")]
    statistics: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SmLeague {
    #[serde(deserialize_with = "lenient::opt_string")]
    name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_object")]
    country: Option<SmCountry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SmCountry {
    #[serde(deserialize_with = "lenient::opt_string")]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SmParticipant {
    #[serde(deserialize_with = "lenient::opt_u64")]
    id: Option<u64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_object")]
    meta: Option<SmMeta>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SmMeta {
    #[serde(deserialize_with = "lenient::opt_string")]
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SmPeriod {
    #[serde(deserialize_with = "lenient::flag")]
    ticking: bool,
    #[serde(deserialize_with = "lenient::opt_u64")]
    minutes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SmEvent {
    #[serde(deserialize_with = "lenient::opt_string")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_u64")]
    type_id: Option<u64>,
    #[serde(rename = "type")]
    kind: Option<Value>,
    #[serde(deserialize_with = "lenient::opt_u64")]
    participant_id: Option<u64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    player_name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    result: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    info: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    addition: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    detail: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    text: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    comment: Option<String>,
    #[serde(deserialize_with = "lenient::opt_u64")]
    minute: Option<u64>,
    #[serde(deserialize_with = "lenient::flag")]
    rescinded: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SmStatistic {
    #[serde(deserialize_with = "lenient::opt_u64")]
    type_id: Option<u64>,
    #[serde(rename = "type")]
    kind: Option<Value>,
    #[serde(deserialize_with = "lenient::opt_u64")]
    participant_id: Option<u64>,
    data: Option<Value>,
}

// ====================================================================
// Raw → model
// ====================================================================

/// `type` / `state` include: object with a developer name, or a bare string
fn label_of(v: &Value) -> Option<String> {
    match v {
        Value::Object(map) => ["developer_name", "state", "code", "short_name", "name"]
            .iter()
            .find_map(|k| map.get(*k).and_then(lenient::value_string)),
        other => lenient::value_string(other),
    }
}

fn state_from_id(state_id: u64) -> LifecycleState {
    match state_id {
        1 | 13 | 25 => LifecycleState::Scheduled,
        2 | 22 => LifecycleState::Live,
        3 | 4 => LifecycleState::HalfTime,
        6 | 9 | 21 => LifecycleState::ExtraTime,
        5 | 7 | 8 | 14 | 17 => LifecycleState::Finished,
        10 | 12 | 15 | 20 => LifecycleState::Cancelled,
        _ => LifecycleState::Unknown,
    }
}

fn event_kind_from_type_id(type_id: u64) -> Option<EventKind> {
    let kind = match type_id {
        10 => EventKind::Var,
        14 | 23 => EventKind::Goal,
        15 => EventKind::OwnGoal,
        16 => EventKind::Penalty,
        17 | 22 => EventKind::MissedPenalty,
        18 => EventKind::Substitution,
        19 => EventKind::YellowCard,
        20 => EventKind::RedCard,
        21 => EventKind::SecondYellow,
        _ => return None,
    };
    Some(kind)
}

fn parse_kickoff(raw: &SmFixture) -> Option<DateTime<Utc>> {
    if let Some(ts) = raw.starting_at_timestamp {
        if let Some(dt) = Utc.timestamp_opt(ts, 0).single() {
            return Some(dt);
        }
    }
    let s = raw.starting_at.as_deref()?;
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)).ok())
}

fn team_names(raw: &SmFixture) -> (String, String) {
    let by_location = |loc: &str| {
        raw.participants
            .iter()
            .find(|p| {
                p.meta
                    .as_ref()
                    .and_then(|m| m.location.as_deref())
                    .map(|l| l.eq_ignore_ascii_case(loc))
                    .unwrap_or(false)
            })
            .and_then(|p| p.name.clone())
    };

    let mut home = by_location("home");
    let mut away = by_location("away");

    if home.is_none() && away.is_none() {
        home = raw.participants.first().and_then(|p| p.name.clone());
        away = raw.participants.get(1).and_then(|p| p.name.clone());
    }

    // "Home vs Away" v poli name jako poslední záchrana
    if home.is_none() || away.is_none() {
        if let Some((h, a)) = raw.name.as_deref().and_then(|n| n.split_once(" vs ")) {
            home = home.or_else(|| Some(h.trim().to_string()));
            away = away.or_else(|| Some(a.trim().to_string()));
        }
    }

    (home.unwrap_or_else(|| "TBD".to_string()), away.unwrap_or_else(|| "TBD".to_string()))
}

fn fixture_from_raw(raw: &SmFixture) -> Option<Fixture> {
    let Some(id) = raw.id else {
        warn!(name = ?raw.name, "fixture without id skipped");
        return None;
    };

    let state = raw
        .state
        .as_ref()
        .and_then(label_of)
        .map(|code| LifecycleState::from_status_code(&code))
        .filter(|s| *s != LifecycleState::Unknown)
        .or_else(|| raw.state_id.map(state_from_id))
        .unwrap_or(LifecycleState::Unknown);

    let minute = raw
        .minute
        .or_else(|| raw.periods.iter().find(|p| p.ticking).and_then(|p| p.minutes))
        .and_then(|m| u32::try_from(m).ok());

    let (home, away) = team_names(raw);

    Some(Fixture {
        id: FixtureId::from(id),
        home,
        away,
        competition_id: raw.league_id.unwrap_or(0),
        competition_name: raw.league.as_ref().and_then(|l| l.name.clone()),
        country: raw
            .league
            .as_ref()
            .and_then(|l| l.country.as_ref())
            .and_then(|c| c.name.clone()),
        kickoff: parse_kickoff(raw),
        state,
        minute,
    })
}

fn participant_names(raw: &SmFixture) -> HashMap<u64, String> {
    raw.participants
        .iter()
        .filter_map(|p| Some((p.id?, p.name.clone()?)))
        .collect()
}

fn event_from_raw(fixture_id: &FixtureId, raw: SmEvent, teams: &HashMap<u64, String>) -> MatchEvent {
    let kind = raw
        .kind
        .as_ref()
        .and_then(label_of)
        .map(|l| EventKind::from_label(&l))
        .filter(|k| !matches!(k, EventKind::Other(_)))
        .or_else(|| raw.type_id.and_then(event_kind_from_type_id))
        .unwrap_or_else(|| {
            let label = raw.kind.as_ref().and_then(label_of).unwrap_or_default();
            EventKind::Other(label)
        });

    let comment = [raw.info, raw.text, raw.comment]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    let goal_status = if raw.rescinded {
        Some(GoalStatus::Cancelled)
    } else {
        raw.result.as_deref().and_then(GoalStatus::from_result)
    };

    MatchEvent {
        fixture_id:  fixture_id.clone(),
        id:          raw.id.map(EventId),
        kind,
        detail:      raw.detail.or(raw.addition),
        comment:     (!comment.is_empty()).then_some(comment),
        minute:      raw.minute.and_then(|m| u32::try_from(m).ok()),
        team:        raw.participant_id.and_then(|pid| teams.get(&pid).cloned()),
        player:      raw.player_name,
        goal_status,
    }
}

fn stat_metric(raw: &SmStatistic) -> Option<StatMetric> {
    let by_label = raw.kind.as_ref().and_then(label_of).and_then(|label| {
        let l = label.to_ascii_uppercase().replace([' ', '-'], "_");
        match l.as_str() {
            "SHOTS_ON_TARGET" | "SHOTS_ON_GOAL" => Some(StatMetric::ShotsOnTarget),
            "EXPECTED_GOALS" | "XG" | "EXPECTED_GOALS_XG" => Some(StatMetric::ExpectedGoals),
            _ => None,
        }
    });
    by_label.or_else(|| match raw.type_id? {
        TYPE_SHOTS_ON_TARGET => Some(StatMetric::ShotsOnTarget),
        TYPE_EXPECTED_GOALS => Some(StatMetric::ExpectedGoals),
        _ => None,
    })
}

fn stat_value(raw: &SmStatistic) -> Option<f64> {
    match raw.data.as_ref()? {
        Value::Object(map) => map.get("value").and_then(lenient::value_f64),
        other => lenient::value_f64(other),
    }
}

fn snapshots_from_raw(fixture_id: &FixtureId, raw: Vec<Value>, teams: &HashMap<u64, String>) -> Vec<StatisticSnapshot> {
    let mut per_team: BTreeMap<String, StatisticSnapshot> = BTreeMap::new();

    for item in raw {
        let stat: SmStatistic = match serde_json::from_value(item) {
            Ok(s) => s,
            Err(e) => {
                debug!(fixture = %fixture_id, "statistic skipped: {e}");
                continue;
            }
        };
        let (Some(metric), Some(value)) = (stat_metric(&stat), stat_value(&stat)) else {
            continue;
        };
        // bez týmu nelze deduplikovat
        let Some(team) = stat.participant_id.and_then(|pid| teams.get(&pid)) else {
            continue;
        };
        per_team
            .entry(team.clone())
            .or_insert_with(|| StatisticSnapshot::new(fixture_id.clone(), team.clone()))
            .metrics
            .insert(metric, value);
    }

    per_team.into_values().collect()
}

/// Parses one fixture object (with whatever includes it carries)
fn feed_from_value(v: Value) -> Option<FixtureFeed> {
    let raw: SmFixture = match serde_json::from_value(v) {
        Ok(r) => r,
        Err(e) => {
            warn!("malformed fixture record skipped: {e}");
            return None;
        }
    };
    let fixture = fixture_from_raw(&raw)?;
    let teams = participant_names(&raw);

    let events = raw
        .events
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<SmEvent>(item) {
            Ok(ev) => Some(event_from_raw(&fixture.id, ev, &teams)),
            Err(e) => {
                debug!(fixture = %fixture.id, "event skipped: {e}");
                None
            }
        })
        .collect();

    let statistics = raw.statistics.map(|s| snapshots_from_raw(&fixture.id, s, &teams));

    Some(FixtureFeed { fixture, events, statistics })
}

fn data_items(body: &Value) -> Vec<Value> {
    match body.get("data") {
        Some(Value::Array(items)) => items.clone(),
        Some(obj @ Value::Object(_)) => vec![obj.clone()],
        _ => Vec::new(),
    }
}

fn has_more_pages(body: &Value) -> bool {
    body.pointer("/pagination/has_more").and_then(Value::as_bool).unwrap_or(false)
}

// ====================================================================
// HTTP client
// ====================================================================

pub struct SportmonksClient {
    client:  reqwest::Client,
    base:    String,
    token:   Option<String>,
    http:    HttpConfig,
    limiter: DefaultDirectRateLimiter,
}

impl SportmonksClient {
    pub fn new(base: impl Into<String>, token: Option<String>, http: HttpConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(http.timeout)
            .user_agent(concat!("matchwatch-live/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let per_minute = NonZeroU32::new(http.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            token,
            http,
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        })
    }

    pub fn from_config(cfg: &MonitorConfig) -> anyhow::Result<Self> {
        Self::new(cfg.api_base.clone(), cfg.api_token.clone(), cfg.http.clone())
    }

    /// GET with rate limiting and bounded retry on transient failures
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> ProviderResult<Value> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("SPORTMONKS_API_TOKEN".to_string()))?;
        let url = format!("{}/{}", self.base, path.trim_start_matches('/'));
        let url = url.as_str();

        with_retry(&self.http, path, move || async move {
            self.limiter.until_ready().await;
            self.get_once(url, token, query).await
        })
        .await
    }

    async fn get_once(&self, url: &str, token: &str, query: &[(&str, String)]) -> ProviderResult<Value> {
        let resp = self
            .client
            .get(url)
            .query(&[("api_token", token)])
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status:  status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let raw = resp.text().await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Runs `op` until it succeeds, fails permanently or `max_attempts` is used up
pub async fn with_retry<T, F, Fut>(http: &HttpConfig, path: &str, mut op: F) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < http.max_attempts => {
                let delay = backoff_delay(http.retry_base_delay, attempt);
                warn!(path, attempt, delay_ms = delay.as_millis() as u64, "transient provider error: {e}");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// base · 2^(attempt-1), capped
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

#[async_trait]
impl FixtureSource for SportmonksClient {
    async fn live_fixtures(&self) -> ProviderResult<Vec<FixtureFeed>> {
        let body = self.get_json("livescores/inplay", &[("include", LIVE_INCLUDES.to_string())]).await?;
        Ok(data_items(&body).into_iter().filter_map(feed_from_value).collect())
    }

    async fn fixture_feed(&self, id: &FixtureId) -> ProviderResult<FixtureFeed> {
        let body = self
            .get_json(&format!("fixtures/{id}"), &[("include", DETAIL_INCLUDES.to_string())])
            .await?;
        data_items(&body)
            .into_iter()
            .next()
            .and_then(feed_from_value)
            .ok_or_else(|| ProviderError::NotFound(format!("fixture {id}")))
    }

    async fn fixture_statistics(&self, id: &FixtureId) -> ProviderResult<Vec<StatisticSnapshot>> {
        let body = self
            .get_json(&format!("fixtures/{id}"), &[("include", STATS_INCLUDES.to_string())])
            .await?;
        Ok(data_items(&body)
            .into_iter()
            .next()
            .and_then(feed_from_value)
            .and_then(|feed| feed.statistics)
            .unwrap_or_default())
    }

    async fn fixtures_on(&self, date: NaiveDate) -> ProviderResult<Vec<Fixture>> {
        let path = format!("fixtures/date/{}", date.format("%Y-%m-%d"));
        let mut fixtures = Vec::new();

        for page in 1..=DAILY_MAX_PAGES {
            let body = self
                .get_json(
                    &path,
                    &[
                        ("include", DAILY_INCLUDES.to_string()),
                        ("per_page", DAILY_PAGE_SIZE.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            fixtures.extend(data_items(&body).into_iter().filter_map(feed_from_value).map(|f| f.fixture));
            if !has_more_pages(&body) {
                break;
            }
        }
        Ok(fixtures)
    }
}
