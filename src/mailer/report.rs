use std::collections::BTreeMap;

use serde::Serialize;

use crate::stats::repo_types::{GlobalStats, User};
use crate::stats::services::WeeklyAggregate;

pub const DEFAULT_RECAP_NAME: &str = "User";
pub const DEFAULT_MEMBER_NAME: &str = "Member";
pub const NO_SESSION_YET: &str = "no session yet";

/// Field name to rendered value, consumed by template substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReportContext(BTreeMap<&'static str, String>);

impl ReportContext {
    pub fn insert(&mut self, field: &'static str, value: impl ToString) {
        self.0.insert(field, value.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }
}

fn display_name<'a>(user: &'a User, fallback: &'a str) -> &'a str {
    user.full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(fallback)
}

pub fn assemble_report(user: &User, global: &GlobalStats, weekly: &WeeklyAggregate) -> ReportContext {
    let mut ctx = ReportContext::default();
    ctx.insert("name", display_name(user, DEFAULT_RECAP_NAME));
    ctx.insert("seances", weekly.workout_count);
    ctx.insert(
        "last_workout_date",
        global.last_workout_date.as_deref().unwrap_or(NO_SESSION_YET),
    );
    ctx.insert("total_exercises", weekly.exercise_count);
    ctx.insert("repstotal", weekly.total_reps);
    ctx
}

pub fn apology_context(user: &User) -> ReportContext {
    let mut ctx = ReportContext::default();
    ctx.insert("name", display_name(user, DEFAULT_MEMBER_NAME));
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(name: Option<&str>) -> User {
        User {
            id: Some(Uuid::new_v4()),
            full_name: name.map(str::to_string),
            email: "amy@example.com".into(),
        }
    }

    #[test]
    fn report_has_exactly_five_fields() {
        let weekly = WeeklyAggregate {
            workout_count: 2,
            exercise_count: 3,
            total_reps: 18,
            ..WeeklyAggregate::default()
        };
        let global = GlobalStats {
            total_workouts: 40,
            total_exercises: 120,
            last_workout_date: Some("2024-05-12".into()),
        };
        let ctx = assemble_report(&user(Some("Amy Pond")), &global, &weekly);

        assert_eq!(
            ctx.0.keys().copied().collect::<Vec<_>>(),
            ["last_workout_date", "name", "repstotal", "seances", "total_exercises"]
        );
        assert_eq!(ctx.get("name"), Some("Amy Pond"));
        assert_eq!(ctx.get("seances"), Some("2"));
        assert_eq!(ctx.get("last_workout_date"), Some("2024-05-12"));
        assert_eq!(ctx.get("total_exercises"), Some("3"));
        assert_eq!(ctx.get("repstotal"), Some("18"));
    }

    #[test]
    fn defaults_fill_missing_values() {
        let ctx = assemble_report(&user(None), &GlobalStats::default(), &WeeklyAggregate::default());
        assert_eq!(ctx.get("name"), Some(DEFAULT_RECAP_NAME));
        assert_eq!(ctx.get("last_workout_date"), Some(NO_SESSION_YET));
        assert_eq!(ctx.get("repstotal"), Some("0"));
    }

    #[test]
    fn apology_only_binds_name() {
        let ctx = apology_context(&user(Some("  ")));
        assert_eq!(ctx.0.len(), 1);
        assert_eq!(ctx.get("name"), Some(DEFAULT_MEMBER_NAME));
    }
}
