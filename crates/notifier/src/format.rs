//! Telegram HTML texty pro jednotlivé typy alertů

use match_engine::{Alert, AlertCategory, AlertKind, GoalStatus, LifecycleSignal, LifecycleState, StatMetric};

/// Escapes the three characters Telegram's HTML mode cares about
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn render_alert(alert: &Alert) -> String {
    let title = format!("{} vs {}", escape_html(&alert.fixture.home), escape_html(&alert.fixture.away));

    match &alert.kind {
        AlertKind::Lifecycle { signal, state, first_sight } => match signal {
            LifecycleSignal::Started => format!("🔴 <b>{title}</b> has kicked off."),
            LifecycleSignal::Finished => format!("✅ <b>{title}</b> has finished ({}).", state_label(*state)),
            LifecycleSignal::Cancelled if *first_sight => {
                format!("⚠️ <b>{title}</b> will not be played ({}).", state_label(*state))
            }
            LifecycleSignal::Cancelled => format!("⚠️ <b>{title}</b> was called off ({}).", state_label(*state)),
        },

        AlertKind::Event { category, minute, team, player, text } => {
            let team = escape_html(team.as_deref().unwrap_or("Unknown team"));
            let headline = match category {
                AlertCategory::DisallowedGoal => format!("❌ <b>GOAL DISALLOWED</b> for <b>{team}</b>"),
                AlertCategory::WoodworkShot => format!("🥅 <b>WOODWORK</b> - {team}"),
                AlertCategory::EarlyCaution => format!("🟨 <b>{team}</b> booked early"),
                AlertCategory::GoalScored(GoalStatus::Confirmed) => format!("✅ <b>GOAL CONFIRMED</b> for <b>{team}</b>"),
                AlertCategory::GoalScored(GoalStatus::UnderReview) => {
                    format!("🧐 Possible <b>GOAL</b> for <b>{team}</b> <i>(VAR check)</i>")
                }
                AlertCategory::GoalScored(GoalStatus::Cancelled) => format!("❌ <b>GOAL CANCELLED</b> for <b>{team}</b>"),
                AlertCategory::GoalScored(GoalStatus::Unconfirmed) => format!("⚽ <b>GOAL</b> for <b>{team}</b>"),
            };

            let mut out = headline;
            if let Some(p) = player.as_deref().filter(|p| !p.trim().is_empty()) {
                out.push_str(&format!("\n👤 {}", escape_html(p)));
            }
            out.push_str(&format!("\n⏱️ Minute {}", minute_label(*minute)));
            if !text.is_empty() {
                out.push_str(&format!("\n💬 {}", escape_html(text)));
            }
            out.push_str(&format!("\n🏟️ {title}"));
            out
        }

        AlertKind::Statistic { metric, team, value, threshold, minute } => {
            let team = escape_html(team);
            let body = match metric {
                StatMetric::ShotsOnTarget => {
                    format!("📊 <b>{team}</b> has {value:.0} shots on target (≥ {threshold:.0})")
                }
                StatMetric::ExpectedGoals => format!("🔢 <b>{team}</b> has reached {value:.2} xG (≥ {threshold:.2})"),
            };
            format!("{body} by minute {}\n🏟️ {title}", minute_label(*minute))
        }
    }
}

fn minute_label(minute: Option<u32>) -> String {
    minute.map(|m| format!("{m}'")).unwrap_or_else(|| "?".to_string())
}

fn state_label(state: LifecycleState) -> &'static str {
    match state {
        LifecycleState::Finished => "FT",
        LifecycleState::Cancelled => "cancelled",
        _ => "?",
    }
}
