//! Matchwatch — Match Engine
//!
//! Čistá doménová logika bez sítě a bez časovačů:
//! model, klasifikace událostí, prahy statistik, dedup ledger a stavový
//! automat zápasu. Everything here is deterministic and unit-testable with
//! fresh instances.

pub mod alert;
pub mod classifier;
pub mod key;
pub mod ledger;
pub mod model;
pub mod thresholds;
pub mod tracker;

pub use alert::{Alert, AlertKind, FixtureSummary};
pub use classifier::{AlertCategory, Classifier, ClassifierRule, KeywordPolicy, KindClass, RuleCategory, RuleTable};
pub use key::{AlertKey, KeyError};
pub use ledger::DedupLedger;
pub use model::{
    EventId, EventKind, Fixture, FixtureId, GoalStatus, LifecycleState, MatchEvent, StatMetric, StatisticSnapshot,
};
pub use thresholds::{StatThreshold, ThresholdHit, ThresholdPolicy};
pub use tracker::{is_due, FixtureTracker, LifecycleSignal, Transition};
