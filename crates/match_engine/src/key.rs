//! AlertKey — deterministická identita jednoho alertu

use crate::classifier::AlertCategory;
use crate::model::{EventId, FixtureId, MatchEvent};
use crate::tracker::LifecycleSignal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKey {
    /// Provider gave the event an id
    Event { fixture: FixtureId, event: EventId },
    /// No id upstream; identity is rebuilt from the event's own fields
    Composite {
        fixture: FixtureId,
        minute:  u32,
        team:    String,
        kind:    String,
        detail:  String,
    },
    /// Threshold alerts fire once per team and threshold
    Statistic { fixture: FixtureId, team: String, threshold: String },
    /// At most one alert of this kind per team and fixture
    Team { fixture: FixtureId, team: String, condition: String },
    Lifecycle { fixture: FixtureId, signal: LifecycleSignal },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("event on fixture {fixture} has neither id nor minute")]
    InsufficientData { fixture: FixtureId },
    #[error("statistic key for fixture {fixture} without team")]
    MissingTeam { fixture: FixtureId },
}

impl AlertKey {
    pub fn for_event(event: &MatchEvent) -> Result<Self, KeyError> {
        if let Some(id) = event.id.as_ref().filter(|id| !id.0.trim().is_empty()) {
            return Ok(AlertKey::Event { fixture: event.fixture_id.clone(), event: id.clone() });
        }

        let minute = event.minute.ok_or_else(|| KeyError::InsufficientData {
            fixture: event.fixture_id.clone(),
        })?;

        Ok(AlertKey::Composite {
            fixture: event.fixture_id.clone(),
            minute,
            team:    event.team.as_deref().unwrap_or("").trim().to_lowercase(),
            kind:    event.kind.label().to_lowercase(),
            detail:  event.detail.as_deref().unwrap_or("").trim().to_lowercase(),
        })
    }

    /// Early cautions are keyed per team; the rest per event
    pub fn for_classified(event: &MatchEvent, category: AlertCategory) -> Result<Self, KeyError> {
        let team = event.team.as_deref().map(str::trim).filter(|t| !t.is_empty());
        match (category, team) {
            (AlertCategory::EarlyCaution, Some(team)) => Ok(AlertKey::Team {
                fixture:   event.fixture_id.clone(),
                team:      team.to_lowercase(),
                condition: category.name().to_string(),
            }),
            _ => Self::for_event(event),
        }
    }

    pub fn for_statistic(fixture: &FixtureId, team: &str, threshold: &str) -> Result<Self, KeyError> {
        if team.trim().is_empty() {
            return Err(KeyError::MissingTeam { fixture: fixture.clone() });
        }
        Ok(AlertKey::Statistic {
            fixture:   fixture.clone(),
            team:      team.trim().to_string(),
            threshold: threshold.to_string(),
        })
    }

    pub fn for_lifecycle(fixture: &FixtureId, signal: LifecycleSignal) -> Self {
        AlertKey::Lifecycle { fixture: fixture.clone(), signal }
    }

    pub fn fixture(&self) -> &FixtureId {
        match self {
            AlertKey::Event { fixture, .. }
            | AlertKey::Composite { fixture, .. }
            | AlertKey::Statistic { fixture, .. }
            | AlertKey::Team { fixture, .. }
            | AlertKey::Lifecycle { fixture, .. } => fixture,
        }
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKey::Event { fixture, event } => write!(f, "{fixture}:event:{event}"),
            AlertKey::Composite { fixture, minute, team, kind, detail } => {
                write!(f, "{fixture}:{minute}:{team}:{kind}:{detail}")
            }
            AlertKey::Statistic { fixture, team, threshold } => write!(f, "{fixture}:stat:{team}:{threshold}"),
            AlertKey::Team { fixture, team, condition } => write!(f, "{fixture}:team:{team}:{condition}"),
            AlertKey::Lifecycle { fixture, signal } => write!(f, "{fixture}:lifecycle:{signal:?}"),
        }
    }
}
