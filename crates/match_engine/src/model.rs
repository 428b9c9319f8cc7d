//! Doménový model — zápasy, události, statistiky
//!
//! Provider-specific field names never reach this module; the adapters in
//! `football_monitor` translate raw payloads into these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ── Identifikátory ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FixtureId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub String);

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FixtureId {
    fn from(s: &str) -> Self {
        FixtureId(s.to_string())
    }
}

impl From<u64> for FixtureId {
    fn from(id: u64) -> Self {
        FixtureId(id.to_string())
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        EventId(s.to_string())
    }
}

// ── Lifecycle ────────────────────────────────────────────────────────────────

/// Coarse match-progress phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    Scheduled,
    Live,
    HalfTime,
    ExtraTime,
    Finished,
    Cancelled,
    Unknown,
}

impl LifecycleState {
    /// Maps a provider status code onto a lifecycle phase.
    ///
    /// Understands the long Sportmonks developer names (`INPLAY_1ST_HALF`,
    /// `POSTPONED`, ...) as well as the short codes used by most other feeds
    /// (`1H`, `HT`, `PST`, ...). Anything else is `Unknown`.
    pub fn from_status_code(code: &str) -> Self {
        let code = code.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match code.as_str() {
            "NS" | "TBA" | "TBD" | "NOT_STARTED" | "SCHEDULED" | "PENDING" => LifecycleState::Scheduled,

            "INPLAY_1ST_HALF" | "INPLAY_2ND_HALF" | "1ST_HALF" | "2ND_HALF" | "1H" | "2H"
            | "LIVE" | "INPLAY" | "IN_PLAY" => LifecycleState::Live,

            "HT" | "BREAK" | "HALF_TIME" | "HALFTIME" => LifecycleState::HalfTime,

            "INPLAY_ET" | "ET" | "EXTRA_TIME" | "EXTRA_TIME_BREAK" | "BT" | "INPLAY_PENALTIES"
            | "PEN_LIVE" | "P" => LifecycleState::ExtraTime,

            "FT" | "AET" | "FT_PEN" | "PEN" | "FINISHED" | "AWARDED" | "AWD" | "WO" => LifecycleState::Finished,

            "CANCELLED" | "CANCELED" | "CANCL" | "CANC" | "POSTPONED" | "POSTP" | "PST"
            | "ABANDONED" | "ABAN" | "ABD" | "DELETED" => LifecycleState::Cancelled,

            _ => LifecycleState::Unknown,
        }
    }

    /// Stavy, ve kterých zpracováváme události a statistiky
    pub fn is_in_play(self) -> bool {
        matches!(self, LifecycleState::Live | LifecycleState::HalfTime | LifecycleState::ExtraTime)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Finished | LifecycleState::Cancelled)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Scheduled => "scheduled",
            LifecycleState::Live => "live",
            LifecycleState::HalfTime => "half-time",
            LifecycleState::ExtraTime => "extra-time",
            LifecycleState::Finished => "finished",
            LifecycleState::Cancelled => "cancelled",
            LifecycleState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

// ── Fixture ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id:               FixtureId,
    pub home:             String,
    pub away:             String,
    pub competition_id:   u64,
    pub competition_name: Option<String>,   // jen pro digest
    pub country:          Option<String>,
    pub kickoff:          Option<DateTime<Utc>>,
    pub state:            LifecycleState,
    pub minute:           Option<u32>,      // None dokud zápas neběží
}

impl Fixture {
    /// "Home vs Away"
    pub fn title(&self) -> String {
        format!("{} vs {}", self.home, self.away)
    }
}

// ── Events ───────────────────────────────────────────────────────────────────

/// Normalised event type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Goal,
    OwnGoal,
    Penalty,
    MissedPenalty,
    GoalCancelled,
    Var,
    YellowCard,
    RedCard,
    SecondYellow,
    /// Card of unspecified colour; the colour lives in the detail text
    Card,
    Shot,
    ShotOnTarget,
    ShotOffTarget,
    Woodwork,
    Substitution,
    Other(String),
}

impl EventKind {
    /// Builds a kind from any provider label, ignoring case and punctuation
    /// (`"goal_cancelled"`, `"Hit-Woodwork"`, `"YELLOWCARD"`, `"Card"` ...).
    pub fn from_label(label: &str) -> Self {
        let folded: String = label
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(|c| c.to_lowercase())
            .collect();

        match folded.as_str() {
            "goal" | "penaltyshootoutgoal" => EventKind::Goal,
            "owngoal" => EventKind::OwnGoal,
            "penalty" | "penaltygoal" => EventKind::Penalty,
            "missedpenalty" | "penaltymissed" | "penaltyshootoutmiss" => EventKind::MissedPenalty,
            "goalcancelled" | "goalcanceled" | "goaldisallowed" | "disallowedgoal" => EventKind::GoalCancelled,
            "var" | "varcard" | "varcheck" => EventKind::Var,
            "yellowcard" | "yellow" => EventKind::YellowCard,
            "redcard" | "red" => EventKind::RedCard,
            "yellowredcard" | "secondyellow" | "secondyellowcard" => EventKind::SecondYellow,
            "card" => EventKind::Card,
            "shot" | "attempt" => EventKind::Shot,
            "shotontarget" | "shotsontarget" | "saved" => EventKind::ShotOnTarget,
            "shotofftarget" | "shotsofftarget" | "miss" => EventKind::ShotOffTarget,
            "hitwoodwork" | "woodwork" | "hitpost" | "hitbar" => EventKind::Woodwork,
            "substitution" | "subst" | "sub" => EventKind::Substitution,
            _ => EventKind::Other(label.trim().to_string()),
        }
    }

    /// Goal-like kinds are the ones a disallowance can apply to
    pub fn is_goal_like(&self) -> bool {
        matches!(
            self,
            EventKind::Goal | EventKind::OwnGoal | EventKind::Penalty | EventKind::GoalCancelled | EventKind::Var
        )
    }

    /// Kinds that count as a scored goal when nothing else matches
    pub fn is_scoring(&self) -> bool {
        matches!(self, EventKind::Goal | EventKind::OwnGoal | EventKind::Penalty)
    }

    pub fn is_shot_like(&self) -> bool {
        matches!(
            self,
            EventKind::Shot
                | EventKind::ShotOnTarget
                | EventKind::ShotOffTarget
                | EventKind::MissedPenalty
                | EventKind::Woodwork
        )
    }

    pub fn is_card(&self) -> bool {
        matches!(self, EventKind::YellowCard | EventKind::Card)
    }

    /// Stable short label used inside composite dedup keys
    pub fn label(&self) -> &str {
        match self {
            EventKind::Goal => "goal",
            EventKind::OwnGoal => "own-goal",
            EventKind::Penalty => "penalty",
            EventKind::MissedPenalty => "missed-penalty",
            EventKind::GoalCancelled => "goal-cancelled",
            EventKind::Var => "var",
            EventKind::YellowCard => "yellow-card",
            EventKind::RedCard => "red-card",
            EventKind::SecondYellow => "second-yellow",
            EventKind::Card => "card",
            EventKind::Shot => "shot",
            EventKind::ShotOnTarget => "shot-on-target",
            EventKind::ShotOffTarget => "shot-off-target",
            EventKind::Woodwork => "woodwork",
            EventKind::Substitution => "substitution",
            EventKind::Other(label) => label.as_str(),
        }
    }
}

/// Review status of a goal as reported by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalStatus {
    Confirmed,
    UnderReview,
    Cancelled,
    Unconfirmed,
}

impl GoalStatus {
    /// Parses the free-form result field; scorelines such as "2-1" carry no
    /// review information and yield `None`.
    pub fn from_result(result: &str) -> Option<Self> {
        let r = result.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match r.as_str() {
            "confirmed" | "awarded" | "goal_confirmed" => Some(GoalStatus::Confirmed),
            "under_review" | "review" | "var_check" | "checking" => Some(GoalStatus::UnderReview),
            "cancelled" | "canceled" | "disallowed" | "annulled" | "rescinded" => Some(GoalStatus::Cancelled),
            _ => None,
        }
    }
}

/// One observed in-match event. Never mutated after observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub fixture_id:  FixtureId,
    pub id:          Option<EventId>,
    pub kind:        EventKind,
    pub detail:      Option<String>,
    pub comment:     Option<String>,
    pub minute:      Option<u32>,
    pub team:        Option<String>,
    pub player:      Option<String>,
    pub goal_status: Option<GoalStatus>,
}

impl MatchEvent {
    /// Detail and comment joined with a space; missing parts are skipped
    pub fn text(&self) -> String {
        [self.detail.as_deref(), self.comment.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ── Statistics ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatMetric {
    ShotsOnTarget,
    ExpectedGoals,
}

impl StatMetric {
    pub fn name(self) -> &'static str {
        match self {
            StatMetric::ShotsOnTarget => "shots_on_target",
            StatMetric::ExpectedGoals => "expected_goals",
        }
    }
}

/// Per-team metrics at one poll. Replaced wholesale by the next snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticSnapshot {
    pub fixture_id: FixtureId,
    pub team:       String,
    pub metrics:    BTreeMap<StatMetric, f64>,
}

impl StatisticSnapshot {
    pub fn new(fixture_id: FixtureId, team: impl Into<String>) -> Self {
        Self { fixture_id, team: team.into(), metrics: BTreeMap::new() }
    }

    pub fn with(mut self, metric: StatMetric, value: f64) -> Self {
        self.metrics.insert(metric, value);
        self
    }

    /// Non-finite values count as missing
    pub fn value(&self, metric: StatMetric) -> Option<f64> {
        self.metrics.get(&metric).copied().filter(|v| v.is_finite())
    }
}
