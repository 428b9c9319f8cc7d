//! End-to-end ticks against an in-memory provider and a recording notifier

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use football_monitor::{
    FixtureFeed, FixtureSource, MonitorConfig, Orchestrator, PollMode, ProviderError, ProviderResult,
};
use match_engine::{
    EventKind, Fixture, FixtureId, LifecycleState, MatchEvent, StatMetric, StatisticSnapshot,
};
use notifier::{Notifier, RecordingNotifier};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ScriptedSource {
    live:    Mutex<VecDeque<ProviderResult<Vec<FixtureFeed>>>>,
    details: Mutex<HashMap<FixtureId, VecDeque<FixtureFeed>>>,
    stats:   Mutex<HashMap<FixtureId, Vec<StatisticSnapshot>>>,
    daily:   Vec<Fixture>,
}

impl ScriptedSource {
    fn push_live(&self, tick: ProviderResult<Vec<FixtureFeed>>) {
        self.live.lock().unwrap().push_back(tick);
    }

    fn push_detail(&self, feed: FixtureFeed) {
        self.details
            .lock()
            .unwrap()
            .entry(feed.fixture.id.clone())
            .or_default()
            .push_back(feed);
    }
}

#[async_trait]
impl FixtureSource for ScriptedSource {
    async fn live_fixtures(&self) -> ProviderResult<Vec<FixtureFeed>> {
        self.live.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fixture_feed(&self, id: &FixtureId) -> ProviderResult<FixtureFeed> {
        self.details
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(|q| q.pop_front())
            .ok_or_else(|| ProviderError::Timeout(format!("no scripted feed for {id}")))
    }

    async fn fixture_statistics(&self, id: &FixtureId) -> ProviderResult<Vec<StatisticSnapshot>> {
        Ok(self.stats.lock().unwrap().get(id).cloned().unwrap_or_default())
    }

    async fn fixtures_on(&self, _date: NaiveDate) -> ProviderResult<Vec<Fixture>> {
        Ok(self.daily.clone())
    }
}

struct BrokenNotifier;

#[async_trait]
impl Notifier for BrokenNotifier {
    async fn send(&self, _text: &str) -> Result<()> {
        Err(anyhow!("telegram unreachable"))
    }
}

// ── Builders ─────────────────────────────────────────────────────────────────

fn fixture(id: &str, state: LifecycleState, minute: Option<u32>) -> Fixture {
    Fixture {
        id: FixtureId::from(id),
        home: "Atlético".to_string(),
        away: "Sevilla".to_string(),
        competition_id: 564,
        competition_name: Some("La Liga".to_string()),
        country: Some("Spain".to_string()),
        kickoff: Some(Utc.with_ymd_and_hms(2024, 5, 1, 19, 0, 0).unwrap()),
        state,
        minute,
    }
}

fn event(fixture: &str, id: &str, kind: EventKind, detail: &str, comment: &str, minute: u32) -> MatchEvent {
    MatchEvent {
        fixture_id: FixtureId::from(fixture),
        id: Some(id.into()),
        kind,
        detail: Some(detail.to_string()),
        comment: Some(comment.to_string()),
        minute: Some(minute),
        team: Some("Atlético".to_string()),
        player: Some("Griezmann".to_string()),
        goal_status: None,
    }
}

fn config(mode: PollMode) -> MonitorConfig {
    MonitorConfig { poll_mode: mode, competitions: [564].into_iter().collect(), ..MonitorConfig::default() }
}

fn orchestrator(mode: PollMode, source: Arc<ScriptedSource>, notifier: Arc<dyn Notifier>) -> Orchestrator {
    Orchestrator::new(config(mode), source, notifier)
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn disallowed_goal_is_sent_once() {
    let source = Arc::new(ScriptedSource::default());
    let notifier = Arc::new(RecordingNotifier::new());
    let feed = FixtureFeed {
        fixture: fixture("F1", LifecycleState::Live, Some(41)),
        events: vec![event("F1", "e1", EventKind::Goal, "Goal Disallowed", "VAR Offside", 41)],
        statistics: Some(Vec::new()),
    };
    source.push_live(Ok(vec![feed.clone()]));
    source.push_live(Ok(vec![feed]));

    let mut orch = orchestrator(PollMode::InPlay, source, notifier.clone());
    let first = orch.tick(Utc::now()).await;
    let second = orch.tick(Utc::now()).await;

    assert_eq!(first.alerts_sent, 2); // kick-off + disallowed goal
    assert_eq!(second.alerts_sent, 0);

    let messages = notifier.messages();
    assert_eq!(messages.iter().filter(|m| m.contains("GOAL DISALLOWED")).count(), 1);
    assert!(messages.iter().any(|m| m.contains("Minute 41'")));
}

#[tokio::test]
async fn shots_on_target_threshold_fires_once() {
    let source = Arc::new(ScriptedSource::default());
    let notifier = Arc::new(RecordingNotifier::new());

    let snap = |sot: f64| {
        vec![StatisticSnapshot::new(FixtureId::from("F2"), "Atlético").with(StatMetric::ShotsOnTarget, sot)]
    };
    source.push_live(Ok(vec![FixtureFeed {
        fixture: fixture("F2", LifecycleState::Live, Some(25)),
        events: vec![],
        statistics: Some(snap(4.0)),
    }]));
    source.push_live(Ok(vec![FixtureFeed {
        fixture: fixture("F2", LifecycleState::Live, Some(29)),
        events: vec![],
        statistics: Some(snap(6.0)),
    }]));

    let mut orch = orchestrator(PollMode::InPlay, source, notifier.clone());
    orch.tick(Utc::now()).await;
    let second = orch.tick(Utc::now()).await;

    assert_eq!(second.alerts_sent, 0);
    let stat_alerts: Vec<_> = notifier.messages().into_iter().filter(|m| m.contains("shots on target")).collect();
    assert_eq!(stat_alerts.len(), 1);
    assert!(stat_alerts[0].contains("4 shots on target"));
    assert!(stat_alerts[0].contains("by minute 25'"));
}

#[tokio::test]
async fn statistics_are_fetched_when_not_embedded() {
    let source = Arc::new(ScriptedSource::default());
    source.stats.lock().unwrap().insert(
        FixtureId::from("F7"),
        vec![StatisticSnapshot::new(FixtureId::from("F7"), "Sevilla").with(StatMetric::ExpectedGoals, 1.7)],
    );
    source.push_live(Ok(vec![FixtureFeed::bare(fixture("F7", LifecycleState::Live, Some(22)))]));

    let notifier = Arc::new(RecordingNotifier::new());
    let mut orch = orchestrator(PollMode::InPlay, source, notifier.clone());
    orch.tick(Utc::now()).await;

    assert!(notifier.messages().iter().any(|m| m.contains("1.70 xG")));
}

#[tokio::test]
async fn lifecycle_round_trip_sends_start_and_finish_only() {
    let states = [
        (LifecycleState::Scheduled, None),
        (LifecycleState::Live, Some(1)),
        (LifecycleState::HalfTime, Some(45)),
        (LifecycleState::Live, Some(46)),
        (LifecycleState::Finished, Some(90)),
    ];

    let mut daily = fixture("F3", LifecycleState::Scheduled, None);
    daily.kickoff = Some(Utc::now() - Duration::minutes(1));

    let source = Arc::new(ScriptedSource { daily: vec![daily.clone()], ..ScriptedSource::default() });
    for (state, minute) in states {
        source.push_detail(FixtureFeed::bare(fixture("F3", state, minute)));
    }

    let notifier = Arc::new(RecordingNotifier::new());
    let mut orch = orchestrator(PollMode::Scheduled, source, notifier.clone());
    orch.seed_schedule(vec![daily]);

    for _ in 0..states.len() {
        assert!(!orch.schedule_exhausted());
        orch.tick(Utc::now()).await;
    }
    assert!(orch.schedule_exhausted());

    // retired fixture is not polled again
    let after = orch.tick(Utc::now()).await;
    assert_eq!(after.fixtures_polled, 0);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("has kicked off"));
    assert!(messages[1].contains("has finished"));
}

#[tokio::test]
async fn fixture_leaving_the_live_list_is_finished_via_detail() {
    let source = Arc::new(ScriptedSource::default());
    source.push_live(Ok(vec![FixtureFeed::bare(fixture("F9", LifecycleState::Live, Some(88)))]));
    source.push_live(Ok(Vec::new()));
    source.push_detail(FixtureFeed::bare(fixture("F9", LifecycleState::Finished, Some(90))));

    let notifier = Arc::new(RecordingNotifier::new());
    let mut orch = orchestrator(PollMode::InPlay, source, notifier.clone());

    orch.tick(Utc::now()).await;
    assert_eq!(orch.state().tracker.active_count(), 1);

    let gone = orch.tick(Utc::now()).await;
    assert_eq!(gone.fixtures_polled, 1);
    assert_eq!(gone.alerts_sent, 1);
    assert_eq!(orch.state().tracker.active_count(), 0);
    assert!(orch.state().tracker.is_retired(&FixtureId::from("F9")));

    // retired, so neither the list nor the detail call touches it again
    let after = orch.tick(Utc::now()).await;
    assert_eq!(after.fixtures_polled, 0);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("has kicked off"));
    assert!(messages[1].contains("has finished"));
}

#[tokio::test]
async fn list_failure_skips_one_tick_only() {
    let source = Arc::new(ScriptedSource::default());
    source.push_live(Err(ProviderError::Timeout("livescores".to_string())));
    source.push_live(Ok(vec![FixtureFeed {
        fixture: fixture("F4", LifecycleState::Live, Some(60)),
        events: vec![event("F4", "w1", EventKind::Shot, "Shot", "Hits the crossbar", 60)],
        statistics: Some(Vec::new()),
    }]));

    let notifier = Arc::new(RecordingNotifier::new());
    let mut orch = orchestrator(PollMode::InPlay, source, notifier.clone());

    let failed = orch.tick(Utc::now()).await;
    assert!(!failed.list_ok);
    assert_eq!(failed.alerts_sent, 0);
    assert!(notifier.messages().is_empty());

    let next = orch.tick(Utc::now()).await;
    assert!(next.list_ok);
    assert_eq!(next.alerts_sent, 2);
    assert!(notifier.messages().iter().any(|m| m.contains("WOODWORK")));
}

#[tokio::test]
async fn late_caution_is_ignored_early_one_alerts() {
    let source = Arc::new(ScriptedSource::default());
    source.push_live(Ok(vec![FixtureFeed {
        fixture: fixture("F5", LifecycleState::Live, Some(11)),
        events: vec![
            event("F5", "c1", EventKind::YellowCard, "Yellow Card", "", 11),
            event("F5", "c0", EventKind::YellowCard, "Yellow Card", "", 7),
        ],
        statistics: Some(Vec::new()),
    }]));

    let notifier = Arc::new(RecordingNotifier::new());
    let mut orch = orchestrator(PollMode::InPlay, source, notifier.clone());
    orch.tick(Utc::now()).await;

    let cautions: Vec<_> = notifier.messages().into_iter().filter(|m| m.contains("booked early")).collect();
    assert_eq!(cautions.len(), 1);
    assert!(cautions[0].contains("Minute 7'"));
}

#[tokio::test]
async fn failed_delivery_is_counted_and_not_retried() {
    let source = Arc::new(ScriptedSource::default());
    let feed = FixtureFeed::bare(fixture("F6", LifecycleState::Live, Some(3)));
    source.push_live(Ok(vec![feed.clone()]));
    source.push_live(Ok(vec![feed]));

    let mut orch = orchestrator(PollMode::InPlay, source, Arc::new(BrokenNotifier));
    let first = orch.tick(Utc::now()).await;
    assert_eq!((first.alerts_sent, first.alerts_failed), (0, 1));

    let second = orch.tick(Utc::now()).await;
    assert_eq!((second.alerts_sent, second.alerts_failed), (0, 0));
}

#[tokio::test]
async fn other_competitions_are_filtered_out() {
    let source = Arc::new(ScriptedSource::default());
    let mut foreign = fixture("F8", LifecycleState::Live, Some(5));
    foreign.competition_id = 999;
    source.push_live(Ok(vec![FixtureFeed::bare(foreign)]));

    let notifier = Arc::new(RecordingNotifier::new());
    let mut orch = orchestrator(PollMode::InPlay, source, notifier.clone());
    let report = orch.tick(Utc::now()).await;

    assert_eq!(report.fixtures_polled, 0);
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn scheduled_fixture_failure_is_isolated() {
    let now = Utc::now();
    let mut a = fixture("A", LifecycleState::Scheduled, None);
    let mut b = fixture("B", LifecycleState::Scheduled, None);
    let mut later = fixture("C", LifecycleState::Scheduled, None);
    a.kickoff = Some(now);
    b.kickoff = Some(now);
    later.kickoff = Some(now + Duration::hours(3));

    let source = Arc::new(ScriptedSource::default());
    // A has no scripted feed → provider error
    source.push_detail(FixtureFeed::bare(fixture("B", LifecycleState::Live, Some(1))));

    let notifier = Arc::new(RecordingNotifier::new());
    let mut orch = orchestrator(PollMode::Scheduled, source, notifier.clone());
    orch.seed_schedule(vec![a, b, later]);

    let report = orch.tick(now).await;
    assert_eq!(report.fixtures_polled, 2);
    assert_eq!(report.fixtures_failed, 1);
    assert_eq!(report.alerts_sent, 1);
}

#[tokio::test]
async fn digest_seeds_schedule() {
    let mut tbd = fixture("D2", LifecycleState::Scheduled, None);
    tbd.kickoff = None;
    let mut foreign = fixture("D3", LifecycleState::Scheduled, None);
    foreign.competition_id = 1;

    let source = ScriptedSource {
        daily: vec![tbd, fixture("D1", LifecycleState::Scheduled, None), foreign],
        ..ScriptedSource::default()
    };
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let cfg = config(PollMode::Scheduled);

    let digest = football_monitor::build_digest(&source, date, &cfg.competitions, cfg.digest_tz)
        .await
        .unwrap();

    let ids: Vec<_> = digest.fixtures.iter().map(|f| f.id.0.clone()).collect();
    assert_eq!(ids, vec!["D1", "D2"]);
    assert!(digest.text.contains("21:00"));
    assert!(digest.text.contains("--:--"));
}

#[tokio::test]
async fn shutdown_signal_stops_the_loop() {
    let source = Arc::new(ScriptedSource::default());
    let mut orch = orchestrator(PollMode::InPlay, source, Arc::new(RecordingNotifier::new()));
    let (tx, rx) = tokio::sync::watch::channel(false);

    let handle = tokio::spawn(async move {
        orch.run(rx).await;
    });
    tx.send(true).unwrap();

    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .expect("loop did not stop")
        .unwrap();
}
