//! Daily Digest Builder — ranní přehled zápasů dne

use crate::source::FixtureSource;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use match_engine::Fixture;
use notifier::escape_html;
use std::collections::HashSet;
use std::fmt::Write as _;
use tracing::info;

const NO_TIME: &str = "--:--";

#[derive(Debug, Clone)]
pub struct DailyDigest {
    pub date:     NaiveDate,
    pub text:     String,
    /// Filtered and sorted; seeds the scheduled poll mode
    pub fixtures: Vec<Fixture>,
}

/// Fetch the day's fixtures, keep the allowed competitions (empty set = all)
/// and render the message.
pub async fn build_digest(
    source: &dyn FixtureSource,
    date: NaiveDate,
    competitions: &HashSet<u64>,
    tz: Tz,
) -> Result<DailyDigest> {
    let all = source
        .fixtures_on(date)
        .await
        .with_context(|| format!("fetching fixtures for {date}"))?;
    let total = all.len();

    let mut fixtures: Vec<Fixture> = all
        .into_iter()
        .filter(|f| competitions.is_empty() || competitions.contains(&f.competition_id))
        .collect();
    sort_by_kickoff(&mut fixtures);

    info!(%date, total, kept = fixtures.len(), "daily fixtures fetched");

    Ok(DailyDigest { date, text: render_digest(date, &fixtures, tz), fixtures })
}

/// Kick-off ascending, unknown kick-off last
pub fn sort_by_kickoff(fixtures: &mut [Fixture]) {
    fixtures.sort_by_key(|f| (f.kickoff.is_none(), f.kickoff));
}

pub fn render_digest(date: NaiveDate, fixtures: &[Fixture], tz: Tz) -> String {
    let mut out = format!("📅 <b>Fixtures for {}</b> ({})\n", date.format("%A %d %B %Y"), tz.name());

    if fixtures.is_empty() {
        out.push_str("\nNo fixtures today in the followed competitions.");
        return out;
    }

    for f in fixtures {
        let time = f
            .kickoff
            .map(|k| k.with_timezone(&tz).format("%H:%M").to_string())
            .unwrap_or_else(|| NO_TIME.to_string());

        let _ = write!(out, "\n🕒 {time} | <b>{}</b>", escape_html(&f.title()));

        match (f.competition_name.as_deref(), f.country.as_deref()) {
            (Some(comp), Some(country)) => {
                let _ = write!(out, " · {} ({})", escape_html(comp), escape_html(country));
            }
            (Some(comp), None) => {
                let _ = write!(out, " · {}", escape_html(comp));
            }
            (None, Some(country)) => {
                let _ = write!(out, " · {}", escape_html(country));
            }
            (None, None) => {}
        }
    }

    let _ = write!(out, "\n\n{} fixtures", fixtures.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use match_engine::{FixtureId, LifecycleState};

    fn fixture(id: &str, competition_id: u64, kickoff_hour: Option<u32>) -> Fixture {
        Fixture {
            id: FixtureId::from(id),
            home: format!("{id} Home"),
            away: format!("{id} Away"),
            competition_id,
            competition_name: Some("La Liga".to_string()),
            country: Some("Spain".to_string()),
            kickoff: kickoff_hour.map(|h| Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap()),
            state: LifecycleState::Scheduled,
            minute: None,
        }
    }

    #[test]
    fn sorted_with_unknown_kickoff_last() {
        let mut list = vec![fixture("c", 1, None), fixture("b", 1, Some(19)), fixture("a", 1, Some(12))];
        sort_by_kickoff(&mut list);
        let ids: Vec<_> = list.iter().map(|f| f.id.0.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn renders_local_time_and_placeholder() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let list = vec![fixture("a", 564, Some(19)), fixture("b", 564, None)];
        let text = render_digest(date, &list, chrono_tz::Europe::Madrid);

        // 19:00 UTC = 21:00 CEST
        assert!(text.contains("🕒 21:00 | <b>a Home vs a Away</b> · La Liga (Spain)"));
        assert!(text.contains(&format!("🕒 {NO_TIME} | <b>b Home vs b Away</b>")));
        assert!(text.ends_with("2 fixtures"));
    }

    #[test]
    fn empty_day_message() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let text = render_digest(date, &[], chrono_tz::Europe::Madrid);
        assert!(text.contains("No fixtures today"));
    }
}
