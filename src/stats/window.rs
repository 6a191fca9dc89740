use serde::Serialize;
use time::{Duration, OffsetDateTime, UtcOffset};

/// Half-open `[start, end)` interval covering the week before the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecapWindow {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

impl RecapWindow {
    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        self.start <= ts && ts < self.end
    }
}

/// Monday 00:00 UTC of last week up to Monday 00:00 UTC of this week.
pub fn previous_week_bounds(now: OffsetDateTime) -> RecapWindow {
    let today = now.to_offset(UtcOffset::UTC).date();
    let days_since_monday = i64::from(today.weekday().number_days_from_monday());
    let current_week_start = (today - Duration::days(days_since_monday))
        .midnight()
        .assume_utc();
    RecapWindow {
        start: current_week_start - Duration::days(7),
        end: current_week_start,
    }
}
