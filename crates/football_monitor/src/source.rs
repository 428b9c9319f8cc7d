//! Provider boundary — the only shape the monitoring core depends on

use crate::error::ProviderResult;
use async_trait::async_trait;
use chrono::NaiveDate;
use match_engine::{Fixture, FixtureId, MatchEvent, StatisticSnapshot};

/// One fixture as seen at one poll
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureFeed {
    pub fixture:    Fixture,
    pub events:     Vec<MatchEvent>,
    /// `None` when the call did not embed statistics
    pub statistics: Option<Vec<StatisticSnapshot>>,
}

impl FixtureFeed {
    pub fn bare(fixture: Fixture) -> Self {
        Self { fixture, events: Vec::new(), statistics: None }
    }
}

#[async_trait]
pub trait FixtureSource: Send + Sync {
    /// Fixtures currently in play, with events and statistics embedded
    async fn live_fixtures(&self) -> ProviderResult<Vec<FixtureFeed>>;

    /// Current status and events of one fixture
    async fn fixture_feed(&self, id: &FixtureId) -> ProviderResult<FixtureFeed>;

    /// Per-team statistics of one fixture
    async fn fixture_statistics(&self, id: &FixtureId) -> ProviderResult<Vec<StatisticSnapshot>>;

    /// Every fixture scheduled on `date` (UTC)
    async fn fixtures_on(&self, date: NaiveDate) -> ProviderResult<Vec<Fixture>>;
}
