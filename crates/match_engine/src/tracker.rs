//! Fixture State Tracker — stavový automat zápasu
//!
//! Independent of event classification. Every fixture yields at most one
//! `Started` and one terminal signal; once terminal it is retired and never
//! looked at again.

use crate::model::{Fixture, FixtureId, LifecycleState};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleSignal {
    Started,
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from:   Option<LifecycleState>,
    pub to:     LifecycleState,
    pub signal: Option<LifecycleSignal>,
}

impl Transition {
    /// Events and statistics are only read for in-play fixtures
    pub fn should_process_events(&self) -> bool {
        self.to.is_in_play()
    }
}

#[derive(Debug, Clone)]
struct TrackedFixture {
    state:   LifecycleState,
    started: bool,
}

#[derive(Debug, Default)]
pub struct FixtureTracker {
    fixtures: HashMap<FixtureId, TrackedFixture>,
    /// Terminal fixtures with the state they ended in
    retired:  HashMap<FixtureId, LifecycleState>,
}

impl FixtureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, id: &FixtureId, observed: LifecycleState) -> Transition {
        if let Some(state) = self.retired_state(id) {
            // žádné vzkříšení
            return Transition { from: Some(state), to: state, signal: None };
        }

        let previous = self.fixtures.get(id).cloned();
        let from = previous.as_ref().map(|t| t.state);
        let already_started = previous.as_ref().map(|t| t.started).unwrap_or(false);

        let signal = match observed {
            LifecycleState::Finished => Some(LifecycleSignal::Finished),
            LifecycleState::Cancelled => Some(LifecycleSignal::Cancelled),
            s if s.is_in_play() && !already_started => Some(LifecycleSignal::Started),
            _ => None,
        };

        if observed.is_terminal() {
            self.fixtures.remove(id);
            self.retired.insert(id.clone(), observed);
            info!(fixture = %id, state = %observed, "fixture retired");
        } else {
            self.fixtures.insert(
                id.clone(),
                TrackedFixture {
                    state:   observed,
                    started: already_started || observed.is_in_play(),
                },
            );
        }

        if from != Some(observed) {
            debug!(fixture = %id, from = ?from, to = %observed, "lifecycle transition");
        }

        Transition { from, to: observed, signal }
    }

    pub fn is_retired(&self, id: &FixtureId) -> bool {
        self.retired.contains_key(id)
    }

    pub fn state_of(&self, id: &FixtureId) -> Option<LifecycleState> {
        self.fixtures.get(id).map(|t| t.state).or_else(|| self.retired_state(id))
    }

    /// Fixtures seen and not yet retired
    pub fn active_count(&self) -> usize {
        self.fixtures.len()
    }

    /// Ids seen and not yet retired, in a stable order
    pub fn active_ids(&self) -> Vec<FixtureId> {
        let mut ids: Vec<FixtureId> = self.fixtures.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn retired_state(&self, id: &FixtureId) -> Option<LifecycleState> {
        self.retired.get(id).copied()
    }
}

/// Fixtures kicking off more than `lead` from now are not polled at all.
/// Unknown kickoff counts as due.
pub fn is_due(fixture: &Fixture, now: DateTime<Utc>, lead: Duration) -> bool {
    match fixture.kickoff {
        Some(kickoff) => now >= kickoff - lead,
        None => true,
    }
}
