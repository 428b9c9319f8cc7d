//! Poll Cycle Orchestrator
//!
//! `MonitorState` je čisté jádro ticku (tracker → klasifikace/prahy → ledger),
//! `Orchestrator` k němu přidává zdroj dat, notifier, JSONL log a časovač.

use crate::config::{MonitorConfig, PollMode};
use crate::error::ProviderError;
use crate::source::{FixtureFeed, FixtureSource};
use chrono::{DateTime, Utc};
use logger::{now_iso, AlertSentEvent, ApiStatusEvent, EventLogger, LifecycleEvent, PollCycleEvent};
use match_engine::{
    is_due, Alert, AlertKey, Classifier, DedupLedger, Fixture, FixtureId, FixtureTracker, ThresholdPolicy, Transition,
};
use notifier::{render_alert, Notifier};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const SOURCE_NAME: &str = "sportmonks";

// ── Pure tick body ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FeedOutcome {
    pub transition: Transition,
    /// Already accepted by the ledger, ready to send
    pub alerts:     Vec<Alert>,
}

/// All mutable monitoring state of one run
pub struct MonitorState {
    pub tracker: FixtureTracker,
    pub ledger:  DedupLedger,
    classifier:  Classifier,
    thresholds:  ThresholdPolicy,
}

impl MonitorState {
    pub fn new(classifier: Classifier, thresholds: ThresholdPolicy) -> Self {
        Self {
            tracker: FixtureTracker::new(),
            ledger: DedupLedger::new(),
            classifier,
            thresholds,
        }
    }

    pub fn from_config(cfg: &MonitorConfig) -> Self {
        Self::new(cfg.classifier(), cfg.threshold_policy())
    }

    /// One fixture at one poll. No I/O, no clock.
    pub fn process_feed(&mut self, feed: &FixtureFeed) -> FeedOutcome {
        let fixture = &feed.fixture;
        let transition = self.tracker.observe(&fixture.id, fixture.state);
        let mut alerts = Vec::new();

        if let Some(signal) = transition.signal {
            let first_sight = transition.from.is_none();
            let alert = Alert::lifecycle(fixture, signal, first_sight);
            if self.ledger.should_alert(&alert.key) {
                alerts.push(alert);
            }
        }

        if !transition.should_process_events() {
            return FeedOutcome { transition, alerts };
        }

        for event in &feed.events {
            let Some(category) = self.classifier.classify(event) else {
                continue;
            };
            let key = match AlertKey::for_classified(event, category) {
                Ok(k) => k,
                Err(e) => {
                    warn!(fixture = %fixture.id, kind = event.kind.label(), "event skipped: {e}");
                    continue;
                }
            };
            if self.ledger.should_alert(&key) {
                alerts.push(Alert::event(fixture, key, category, event));
            } else {
                debug!(fixture = %fixture.id, %key, "duplicate event suppressed");
            }
        }

        for snapshot in feed.statistics.iter().flatten() {
            if snapshot.team.trim().is_empty() {
                debug_assert!(false, "statistic snapshot without team for fixture {}", fixture.id);
                continue;
            }
            for hit in self.thresholds.evaluate(snapshot, fixture.minute) {
                let key = match AlertKey::for_statistic(&fixture.id, &hit.team, &hit.threshold.name()) {
                    Ok(k) => k,
                    Err(e) => {
                        warn!("statistic skipped: {e}");
                        continue;
                    }
                };
                if self.ledger.should_alert(&key) {
                    alerts.push(Alert::statistic(fixture, key, &hit));
                }
            }
        }

        FeedOutcome { transition, alerts }
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub list_ok:         bool,
    pub fixtures_polled: usize,
    pub fixtures_failed: usize,
    pub alerts_sent:     usize,
    pub alerts_failed:   usize,
}

pub struct Orchestrator {
    source:   Arc<dyn FixtureSource>,
    notifier: Arc<dyn Notifier>,
    config:   MonitorConfig,
    state:    MonitorState,
    schedule: Vec<Fixture>,
    logger:   Option<EventLogger>,
}

impl Orchestrator {
    pub fn new(config: MonitorConfig, source: Arc<dyn FixtureSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: MonitorState::from_config(&config),
            source,
            notifier,
            config,
            schedule: Vec::new(),
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: EventLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn mode(&self) -> PollMode {
        self.config.poll_mode
    }

    /// Daily list for `Scheduled` mode; fixtures outside the allow-list are dropped
    pub fn seed_schedule(&mut self, fixtures: Vec<Fixture>) {
        let total = fixtures.len();
        self.schedule = fixtures
            .into_iter()
            .filter(|f| self.config.allows_competition(f.competition_id))
            .collect();
        info!(total, tracked = self.schedule.len(), "schedule seeded");
    }

    pub fn schedule(&self) -> &[Fixture] {
        &self.schedule
    }

    /// Every scheduled fixture reached a terminal state
    pub fn schedule_exhausted(&self) -> bool {
        self.schedule.iter().all(|f| self.state.tracker.is_retired(&f.id))
    }

    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport { list_ok: true, ..TickReport::default() };

        match self.config.poll_mode {
            PollMode::InPlay => self.tick_in_play(&mut report).await,
            PollMode::Scheduled => self.tick_scheduled(now, &mut report).await,
        }

        info!(
            mode = self.config.poll_mode.as_str(),
            polled = report.fixtures_polled,
            failed = report.fixtures_failed,
            sent = report.alerts_sent,
            send_failed = report.alerts_failed,
            active = self.state.tracker.active_count(),
            "poll cycle done"
        );
        self.log(&PollCycleEvent {
            ts: now_iso(),
            event: "POLL_CYCLE",
            mode: self.config.poll_mode.as_str().to_string(),
            poll_interval_secs: self.config.poll_interval.as_secs(),
            fixtures_polled: report.fixtures_polled,
            fixtures_failed: report.fixtures_failed,
            alerts_sent: report.alerts_sent,
            alerts_failed: report.alerts_failed,
            list_ok: report.list_ok,
        });

        report
    }

    async fn tick_in_play(&mut self, report: &mut TickReport) {
        let feeds = match self.source.live_fixtures().await {
            Ok(feeds) => feeds,
            Err(e) => {
                // celý tick vynechat, příští tick jede normálně
                warn!("live fixture list failed: {e}");
                self.log_api("livescores", Err(&e), 0);
                report.list_ok = false;
                return;
            }
        };
        self.log_api("livescores", Ok(()), feeds.len());

        let listed: HashSet<FixtureId> = feeds.iter().map(|f| f.fixture.id.clone()).collect();
        for feed in feeds {
            if !self.config.allows_competition(feed.fixture.competition_id) {
                continue;
            }
            report.fixtures_polled += 1;
            self.handle_feed(feed, report).await;
        }

        // Zápas po FT z in-play seznamu zmizí; konečný stav dotáhnout zvlášť
        let vanished: Vec<FixtureId> = self
            .state
            .tracker
            .active_ids()
            .into_iter()
            .filter(|id| !listed.contains(id))
            .collect();
        for id in vanished {
            debug!(fixture = %id, "fixture left the in-play list, reconciling");
            self.poll_fixture(&id, report).await;
        }
    }

    async fn tick_scheduled(&mut self, now: DateTime<Utc>, report: &mut TickReport) {
        let due: Vec<FixtureId> = self
            .schedule
            .iter()
            .filter(|f| !self.state.tracker.is_retired(&f.id))
            .filter(|f| is_due(f, now, self.config.kickoff_lead))
            .map(|f| f.id.clone())
            .collect();

        for id in due {
            self.poll_fixture(&id, report).await;
        }
    }

    /// Per-fixture detail call; a failure only affects this fixture
    async fn poll_fixture(&mut self, id: &FixtureId, report: &mut TickReport) {
        report.fixtures_polled += 1;
        match self.source.fixture_feed(id).await {
            Ok(feed) => self.handle_feed(feed, report).await,
            Err(e) => {
                report.fixtures_failed += 1;
                warn!(fixture = %id, "fixture poll failed: {e}");
                self.log_api(&format!("fixture/{id}"), Err(&e), 0);
            }
        }
    }

    async fn handle_feed(&mut self, mut feed: FixtureFeed, report: &mut TickReport) {
        if feed.statistics.is_none() && self.wants_statistics(&feed.fixture) {
            match self.source.fixture_statistics(&feed.fixture.id).await {
                Ok(stats) => feed.statistics = Some(stats),
                Err(e) => {
                    warn!(fixture = %feed.fixture.id, "statistics fetch failed: {e}");
                    self.log_api(&format!("statistics/{}", feed.fixture.id), Err(&e), 0);
                }
            }
        }

        let outcome = self.state.process_feed(&feed);

        let t = outcome.transition;
        if t.from != Some(t.to) {
            self.log(&LifecycleEvent {
                ts: now_iso(),
                event: "LIFECYCLE",
                fixture_id: feed.fixture.id.to_string(),
                from: t.from.map(|s| s.to_string()),
                to: t.to.to_string(),
            });
        }

        for alert in &outcome.alerts {
            self.deliver(alert, report).await;
        }
    }

    /// Statistics only matter while a threshold can still be hit
    fn wants_statistics(&self, fixture: &Fixture) -> bool {
        fixture.state.is_in_play()
            && !self.state.tracker.is_retired(&fixture.id)
            && fixture.minute.is_some_and(|m| m <= self.config.stats_cutoff_minute)
    }

    async fn deliver(&self, alert: &Alert, report: &mut TickReport) {
        let text = render_alert(alert);
        let delivered = match self.notifier.send(&text).await {
            Ok(()) => {
                report.alerts_sent += 1;
                info!(fixture = %alert.fixture.id, alert = alert.label(), "alert sent");
                true
            }
            Err(e) => {
                // klíč zůstává v ledgeru, žádný retry
                report.alerts_failed += 1;
                warn!(fixture = %alert.fixture.id, alert = alert.label(), "alert delivery failed: {e:#}");
                false
            }
        };

        self.log(&AlertSentEvent {
            ts: now_iso(),
            event: "ALERT_SENT",
            fixture_id: alert.fixture.id.to_string(),
            fixture: format!("{} vs {}", alert.fixture.home, alert.fixture.away),
            alert: alert.label().to_string(),
            key: alert.key.to_string(),
            delivered,
        });
    }

    fn log_api(&self, scope: &str, result: Result<(), &ProviderError>, items: usize) {
        let (ok, status_code, message) = match result {
            Ok(()) => (true, None, "ok".to_string()),
            Err(e) => (false, e.status_code(), e.to_string()),
        };
        self.log(&ApiStatusEvent {
            ts: now_iso(),
            event: "API_STATUS",
            source: SOURCE_NAME.to_string(),
            scope: scope.to_string(),
            ok,
            status_code,
            message,
            items_logged: items,
        });
    }

    fn log<T: serde::Serialize>(&self, event: &T) {
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log(event) {
                debug!("jsonl write failed: {e:#}");
            }
        }
    }

    /// Fixed-interval loop. Shutdown stops new ticks; a tick in flight finishes.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            mode = self.config.poll_mode.as_str(),
            interval_secs = self.config.poll_interval.as_secs(),
            "🚀 monitoring loop started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => {
                    info!("shutdown requested, leaving loop");
                    break;
                }
            }
            if *shutdown.borrow() {
                break;
            }

            self.tick(Utc::now()).await;

            if self.config.poll_mode == PollMode::Scheduled && self.schedule_exhausted() {
                info!(fixtures = self.schedule.len(), "every scheduled fixture is over, stopping");
                break;
            }
        }
    }
}
