//! Numeric thresholds over statistic snapshots (tiry na bránu, xG)

use crate::model::{StatMetric, StatisticSnapshot};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SHOTS_ON_TARGET: f64 = 4.0;
pub const DEFAULT_XG: f64 = 1.5;
pub const DEFAULT_STATS_CUTOFF_MINUTE: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatThreshold {
    pub metric:    StatMetric,
    pub min_value: f64,
}

impl StatThreshold {
    pub fn new(metric: StatMetric, min_value: f64) -> Self {
        Self { metric, min_value }
    }

    /// Stable name, part of the dedup key
    pub fn name(&self) -> String {
        format!("{}>={}", self.metric.name(), self.min_value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdHit {
    pub threshold: StatThreshold,
    pub team:      String,
    pub value:     f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    pub thresholds: Vec<StatThreshold>,
    /// Inclusive; later in the match a high count is no longer notable
    pub max_minute: u32,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            thresholds: vec![
                StatThreshold::new(StatMetric::ShotsOnTarget, DEFAULT_SHOTS_ON_TARGET),
                StatThreshold::new(StatMetric::ExpectedGoals, DEFAULT_XG),
            ],
            max_minute: DEFAULT_STATS_CUTOFF_MINUTE,
        }
    }
}

impl ThresholdPolicy {
    /// Thresholds met by this snapshot at `minute`. A missing minute or a
    /// missing value never meets anything.
    pub fn evaluate(&self, snapshot: &StatisticSnapshot, minute: Option<u32>) -> Vec<ThresholdHit> {
        let Some(minute) = minute else {
            return Vec::new();
        };
        if minute > self.max_minute {
            return Vec::new();
        }

        self.thresholds
            .iter()
            .filter_map(|t| {
                let value = snapshot.value(t.metric)?;
                (value >= t.min_value).then(|| ThresholdHit {
                    threshold: t.clone(),
                    team:      snapshot.team.clone(),
                    value,
                })
            })
            .collect()
    }
}
