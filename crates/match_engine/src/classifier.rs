//! Event Classifier — z jedné události nejvýš jedna kategorie alertu
//!
//! Upstream detail taxonomies differ between providers and even between
//! leagues of one provider, so matching is keyword based: case- and
//! accent-insensitive substring search over `detail + comment`. All keyword
//! knowledge lives in one [`RuleTable`] injected at construction.

use crate::model::{EventKind, GoalStatus, MatchEvent};
use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// What an event turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertCategory {
    DisallowedGoal,
    WoodworkShot,
    EarlyCaution,
    GoalScored(GoalStatus),
}

impl AlertCategory {
    pub fn name(&self) -> &'static str {
        match self {
            AlertCategory::DisallowedGoal => "disallowed_goal",
            AlertCategory::WoodworkShot => "woodwork_shot",
            AlertCategory::EarlyCaution => "early_caution",
            AlertCategory::GoalScored(_) => "goal",
        }
    }
}

/// Categories that are decided by the rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleCategory {
    DisallowedGoal,
    WoodworkShot,
    EarlyCaution,
}

impl From<RuleCategory> for AlertCategory {
    fn from(c: RuleCategory) -> Self {
        match c {
            RuleCategory::DisallowedGoal => AlertCategory::DisallowedGoal,
            RuleCategory::WoodworkShot => AlertCategory::WoodworkShot,
            RuleCategory::EarlyCaution => AlertCategory::EarlyCaution,
        }
    }
}

/// Which event kinds a rule looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KindClass {
    GoalLike,
    ShotLike,
    Caution,
}

impl KindClass {
    fn admits(self, kind: &EventKind) -> bool {
        match self {
            KindClass::GoalLike => kind.is_goal_like(),
            KindClass::ShotLike => kind.is_shot_like(),
            KindClass::Caution => kind.is_card(),
        }
    }
}

/// How the keyword sets of one rule combine. The first set is always
/// required; later sets only qualify it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeywordPolicy {
    /// The first set has a hit; the others are ignored
    Primary,
    /// Every set has a hit
    AllSets,
}

impl KeywordPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "or" | "primary" => Some(KeywordPolicy::Primary),
            "all" | "and" | "all_sets" => Some(KeywordPolicy::AllSets),
            _ => None,
        }
    }
}

/// One row of the rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierRule {
    pub category:     RuleCategory,
    pub applies_to:   KindClass,
    pub policy:       KeywordPolicy,
    /// Each inner list is one keyword set; a set hits when any keyword is a
    /// substring of the folded text. No sets means the text is not checked.
    pub keyword_sets: Vec<Vec<String>>,
    /// Kinds whose label alone satisfies the keyword check
    pub label_kinds:  Vec<EventKind>,
    /// Inclusive ceiling on the event minute; events without minute fail it
    pub max_minute:   Option<u32>,
}

impl ClassifierRule {
    pub fn new(category: RuleCategory, applies_to: KindClass, policy: KeywordPolicy) -> Self {
        Self {
            category,
            applies_to,
            policy,
            keyword_sets: Vec::new(),
            label_kinds: Vec::new(),
            max_minute: None,
        }
    }

    pub fn keywords<I, S>(mut self, set: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let folded: Vec<String> = set
            .into_iter()
            .map(|k| fold_text(k.as_ref()))
            .filter(|k| !k.is_empty())
            .collect();
        self.keyword_sets.push(folded);
        self
    }

    pub fn label_kind(mut self, kind: EventKind) -> Self {
        self.label_kinds.push(kind);
        self
    }

    pub fn max_minute(mut self, minute: u32) -> Self {
        self.max_minute = Some(minute);
        self
    }

    fn matches(&self, event: &MatchEvent, folded_text: &str) -> bool {
        if !self.applies_to.admits(&event.kind) {
            return false;
        }
        if let Some(max) = self.max_minute {
            match event.minute {
                Some(m) if m <= max => {}
                _ => return false,
            }
        }
        if self.label_kinds.contains(&event.kind) || self.keyword_sets.is_empty() {
            return true;
        }

        let set_hits = |set: &Vec<String>| set.iter().any(|k| folded_text.contains(k.as_str()));
        match self.policy {
            KeywordPolicy::Primary => self.keyword_sets.first().is_some_and(set_hits),
            KeywordPolicy::AllSets => self.keyword_sets.iter().all(set_hits),
        }
    }
}

/// Ordered rule table; first matching rule wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    pub rules: Vec<ClassifierRule>,
}

pub const DEFAULT_DISALLOWED_KEYWORDS: &[&str] = &[
    "disallowed", "cancelled", "canceled", "annulled", "ruled out", "no goal", "overturned", "anulado",
];
pub const DEFAULT_VAR_REASON_KEYWORDS: &[&str] = &[
    "offside", "handball", "hand ball", "foul", "goalkeeper interference", "fuera de juego",
];
pub const DEFAULT_WOODWORK_KEYWORDS: &[&str] = &[
    "post", "crossbar", "woodwork", "hits the bar", "hit the bar", "off the bar", "larguero", "poste", "palo",
];
pub const DEFAULT_CAUTION_KEYWORDS: &[&str] = &["yellow", "amarilla"];
pub const DEFAULT_EARLY_CAUTION_MINUTE: u32 = 9;

impl RuleTable {
    /// Builds the standard three-rule table from keyword lists
    pub fn standard(
        disallowed: &[String],
        var_reasons: &[String],
        var_policy: KeywordPolicy,
        woodwork: &[String],
        early_caution_minute: u32,
    ) -> Self {
        let disallowed_rule = ClassifierRule::new(RuleCategory::DisallowedGoal, KindClass::GoalLike, var_policy)
            .keywords(disallowed)
            .keywords(var_reasons)
            .label_kind(EventKind::GoalCancelled);

        let woodwork_rule = ClassifierRule::new(RuleCategory::WoodworkShot, KindClass::ShotLike, KeywordPolicy::Primary)
            .keywords(woodwork)
            .label_kind(EventKind::Woodwork);

        let caution_rule = ClassifierRule::new(RuleCategory::EarlyCaution, KindClass::Caution, KeywordPolicy::Primary)
            .keywords(DEFAULT_CAUTION_KEYWORDS)
            .label_kind(EventKind::YellowCard)
            .max_minute(early_caution_minute);

        Self { rules: vec![disallowed_rule, woodwork_rule, caution_rule] }
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        RuleTable::standard(
            &owned(DEFAULT_DISALLOWED_KEYWORDS),
            &owned(DEFAULT_VAR_REASON_KEYWORDS),
            KeywordPolicy::Primary,
            &owned(DEFAULT_WOODWORK_KEYWORDS),
            DEFAULT_EARLY_CAUTION_MINUTE,
        )
    }
}

pub struct Classifier {
    table:       RuleTable,
    alert_goals: bool,
}

impl Classifier {
    pub fn new(table: RuleTable, alert_goals: bool) -> Self {
        Self { table, alert_goals }
    }

    /// Pure and total: the same event always gives the same answer, and no
    /// combination of missing fields panics.
    pub fn classify(&self, event: &MatchEvent) -> Option<AlertCategory> {
        let text = fold_text(&event.text());

        if let Some(rule) = self.table.rules.iter().find(|r| r.matches(event, &text)) {
            return Some(rule.category.into());
        }

        if self.alert_goals && event.kind.is_scoring() {
            let status = event.goal_status.unwrap_or(GoalStatus::Unconfirmed);
            return Some(AlertCategory::GoalScored(status));
        }

        debug!(
            fixture = %event.fixture_id,
            kind = event.kind.label(),
            minute = ?event.minute,
            "event not classified"
        );
        None
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(RuleTable::default(), true)
    }
}

/// Lowercase, strip diacritics, collapse whitespace
pub fn fold_text(s: &str) -> String {
    let stripped: String = s
        .nfkd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FixtureId;

    fn event(kind: EventKind, detail: Option<&str>, comment: Option<&str>, minute: Option<u32>) -> MatchEvent {
        MatchEvent {
            fixture_id: FixtureId::from("F1"),
            id: Some("e1".into()),
            kind,
            detail: detail.map(str::to_string),
            comment: comment.map(str::to_string),
            minute,
            team: Some("Home".to_string()),
            player: None,
            goal_status: None,
        }
    }

    fn strict_var_table() -> RuleTable {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        RuleTable::standard(
            &owned(DEFAULT_DISALLOWED_KEYWORDS),
            &owned(DEFAULT_VAR_REASON_KEYWORDS),
            KeywordPolicy::AllSets,
            &owned(DEFAULT_WOODWORK_KEYWORDS),
            9,
        )
    }

    #[test]
    fn var_offside_goal_is_disallowed() {
        let c = Classifier::default();
        let ev = event(EventKind::Goal, Some("Goal Disallowed"), Some("VAR Offside"), Some(41));
        assert_eq!(c.classify(&ev), Some(AlertCategory::DisallowedGoal));
    }

    #[test]
    fn var_policy_changes_outcome() {
        let any = Classifier::default();
        let all = Classifier::new(strict_var_table(), true);
        let ev = event(EventKind::Goal, Some("Goal cancelled"), None, Some(12));

        assert_eq!(any.classify(&ev), Some(AlertCategory::DisallowedGoal));
        // no reason keyword -> plain goal under the strict policy
        assert_eq!(all.classify(&ev), Some(AlertCategory::GoalScored(GoalStatus::Unconfirmed)));

        let both = event(EventKind::Var, Some("Goal cancelled"), Some("handball"), Some(12));
        assert_eq!(all.classify(&both), Some(AlertCategory::DisallowedGoal));
    }

    #[test]
    fn reason_keyword_alone_never_disallows() {
        let c = Classifier::default();
        let pen = event(EventKind::Penalty, Some("Penalty"), Some("Penalty awarded for handball"), Some(23));
        assert_eq!(c.classify(&pen), Some(AlertCategory::GoalScored(GoalStatus::Unconfirmed)));

        let goal = event(EventKind::Goal, None, Some("Scored after a foul on the keeper was not given"), Some(70));
        assert_eq!(c.classify(&goal), Some(AlertCategory::GoalScored(GoalStatus::Unconfirmed)));

        let strict = Classifier::new(strict_var_table(), true);
        assert_eq!(strict.classify(&pen), Some(AlertCategory::GoalScored(GoalStatus::Unconfirmed)));
    }

    #[test]
    fn goal_cancelled_label_needs_no_keywords() {
        let c = Classifier::new(strict_var_table(), true);
        let ev = event(EventKind::GoalCancelled, None, None, None);
        assert_eq!(c.classify(&ev), Some(AlertCategory::DisallowedGoal));
    }

    #[test]
    fn woodwork_by_keyword_or_label() {
        let c = Classifier::default();
        let shot = event(EventKind::Shot, Some("Shot hits the crossbar"), None, Some(30));
        assert_eq!(c.classify(&shot), Some(AlertCategory::WoodworkShot));

        let label = event(EventKind::Woodwork, None, None, Some(30));
        assert_eq!(c.classify(&label), Some(AlertCategory::WoodworkShot));

        let spanish = event(EventKind::ShotOffTarget, Some("Remate al LARGUERO"), None, Some(30));
        assert_eq!(c.classify(&spanish), Some(AlertCategory::WoodworkShot));

        let plain = event(EventKind::ShotOffTarget, Some("wide of the left side"), None, Some(30));
        assert_eq!(c.classify(&plain), None);
    }

    #[test]
    fn woodwork_text_on_substitution_is_ignored() {
        let c = Classifier::default();
        let ev = event(EventKind::Substitution, Some("post"), None, Some(60));
        assert_eq!(c.classify(&ev), None);
    }

    #[test]
    fn early_caution_respects_minute_threshold() {
        let c = Classifier::default();
        let late = event(EventKind::YellowCard, None, None, Some(11));
        assert_eq!(c.classify(&late), None);

        let early = event(EventKind::YellowCard, None, None, Some(7));
        assert_eq!(c.classify(&early), Some(AlertCategory::EarlyCaution));

        let boundary = event(EventKind::YellowCard, None, None, Some(9));
        assert_eq!(c.classify(&boundary), Some(AlertCategory::EarlyCaution));

        let no_minute = event(EventKind::YellowCard, None, None, None);
        assert_eq!(c.classify(&no_minute), None);
    }

    #[test]
    fn generic_card_needs_yellow_in_text() {
        let c = Classifier::default();
        let yellow = event(EventKind::Card, Some("Yellow Card"), None, Some(3));
        assert_eq!(c.classify(&yellow), Some(AlertCategory::EarlyCaution));

        let red = event(EventKind::Card, Some("Red Card"), None, Some(3));
        assert_eq!(c.classify(&red), None);
    }

    #[test]
    fn goal_status_flows_into_goal_category() {
        let c = Classifier::default();
        let mut ev = event(EventKind::Goal, Some("Normal Goal"), None, Some(55));
        ev.goal_status = Some(GoalStatus::UnderReview);
        assert_eq!(c.classify(&ev), Some(AlertCategory::GoalScored(GoalStatus::UnderReview)));

        let silent = Classifier::new(RuleTable::default(), false);
        assert_eq!(silent.classify(&ev), None);
    }

    #[test]
    fn classification_is_total_and_deterministic() {
        let c = Classifier::default();
        let kinds = [
            EventKind::Goal,
            EventKind::Var,
            EventKind::Card,
            EventKind::Shot,
            EventKind::Other(String::new()),
        ];
        let texts = [None, Some(""), Some("   "), Some("ÁÉÍ ñ 🥅"), Some("\u{0301}")];
        for kind in &kinds {
            for detail in texts {
                for comment in texts {
                    for minute in [None, Some(0), Some(u32::MAX)] {
                        let ev = event(kind.clone(), detail, comment, minute);
                        assert_eq!(c.classify(&ev), c.classify(&ev));
                    }
                }
            }
        }
    }

    #[test]
    fn folding_strips_accents_and_case() {
        assert_eq!(fold_text("  Gól  ANULADO\tpor VAR "), "gol anulado por var");
    }
}
