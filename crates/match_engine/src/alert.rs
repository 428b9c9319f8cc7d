//! Alert payload předávaný Notifieru

use crate::classifier::AlertCategory;
use crate::key::AlertKey;
use crate::model::{Fixture, FixtureId, LifecycleState, MatchEvent, StatMetric};
use crate::thresholds::ThresholdHit;
use crate::tracker::LifecycleSignal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureSummary {
    pub id:   FixtureId,
    pub home: String,
    pub away: String,
}

impl From<&Fixture> for FixtureSummary {
    fn from(f: &Fixture) -> Self {
        Self { id: f.id.clone(), home: f.home.clone(), away: f.away.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AlertKind {
    Lifecycle {
        signal: LifecycleSignal,
        state:  LifecycleState,
        /// Terminal state seen on first observation: the match will not be played
        first_sight: bool,
    },
    Event {
        category: AlertCategory,
        minute:   Option<u32>,
        team:     Option<String>,
        player:   Option<String>,
        text:     String,
    },
    Statistic {
        metric:    StatMetric,
        team:      String,
        value:     f64,
        threshold: f64,
        minute:    Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub key:     AlertKey,
    pub fixture: FixtureSummary,
    pub kind:    AlertKind,
}

impl Alert {
    pub fn lifecycle(fixture: &Fixture, signal: LifecycleSignal, first_sight: bool) -> Self {
        Self {
            key:     AlertKey::for_lifecycle(&fixture.id, signal),
            fixture: fixture.into(),
            kind:    AlertKind::Lifecycle { signal, state: fixture.state, first_sight },
        }
    }

    pub fn event(fixture: &Fixture, key: AlertKey, category: AlertCategory, event: &MatchEvent) -> Self {
        Self {
            key,
            fixture: fixture.into(),
            kind: AlertKind::Event {
                category,
                minute: event.minute,
                team:   event.team.clone(),
                player: event.player.clone(),
                text:   event.text(),
            },
        }
    }

    pub fn statistic(fixture: &Fixture, key: AlertKey, hit: &ThresholdHit) -> Self {
        Self {
            key,
            fixture: fixture.into(),
            kind: AlertKind::Statistic {
                metric:    hit.threshold.metric,
                team:      hit.team.clone(),
                value:     hit.value,
                threshold: hit.threshold.min_value,
                minute:    fixture.minute,
            },
        }
    }

    /// Short machine label for logs
    pub fn label(&self) -> &'static str {
        match &self.kind {
            AlertKind::Lifecycle { signal: LifecycleSignal::Started, .. } => "match_started",
            AlertKind::Lifecycle { signal: LifecycleSignal::Finished, .. } => "match_finished",
            AlertKind::Lifecycle { signal: LifecycleSignal::Cancelled, .. } => "match_cancelled",
            AlertKind::Event { category, .. } => category.name(),
            AlertKind::Statistic { metric, .. } => metric.name(),
        }
    }
}
