use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::repo::RecapStore;
use super::repo_types::{ExerciseRecord, GlobalStats};
use super::window::RecapWindow;

/// Label for exercise records stored without a name.
pub const UNKNOWN_EXERCISE: &str = "unknown";

/// Result of a best-effort lookup. `Degraded` still carries a usable value
/// (the zero value) together with the reason the real one is missing.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Confirmed(T),
    Degraded { value: T, cause: String },
}

impl<T> Fetched<T> {
    pub fn degraded(value: T, cause: impl ToString) -> Self {
        Fetched::Degraded {
            value,
            cause: cause.to_string(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Fetched::Degraded { .. })
    }

    pub fn cause(&self) -> Option<&str> {
        match self {
            Fetched::Confirmed(_) => None,
            Fetched::Degraded { cause, .. } => Some(cause),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Fetched::Confirmed(v) | Fetched::Degraded { value: v, .. } => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Fetched::Confirmed(v) | Fetched::Degraded { value: v, .. } => v,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Confirmed(v) => Fetched::Confirmed(f(v)),
            Fetched::Degraded { value, cause } => Fetched::Degraded {
                value: f(value),
                cause,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WeeklyCounts {
    pub workout_count: usize,
    pub exercise_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeeklyReps {
    pub total_reps: i64,
    pub reps_by_exercise: HashMap<String, i64>,
}

/// Everything the recap needs about last week, from one pass over the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeeklyAggregate {
    pub workout_ids: Vec<Uuid>,
    pub workout_count: usize,
    pub exercise_count: usize,
    pub total_reps: i64,
    pub reps_by_exercise: HashMap<String, i64>,
}

impl WeeklyAggregate {
    fn from_rows(workout_ids: Vec<Uuid>, exercises: &[ExerciseRecord]) -> Self {
        let reps = sum_reps(exercises);
        Self {
            workout_count: workout_ids.len(),
            workout_ids,
            exercise_count: exercises.len(),
            total_reps: reps.total_reps,
            reps_by_exercise: reps.reps_by_exercise,
        }
    }

    pub fn counts(&self) -> WeeklyCounts {
        WeeklyCounts {
            workout_count: self.workout_count,
            exercise_count: self.exercise_count,
        }
    }
}

fn sum_reps(exercises: &[ExerciseRecord]) -> WeeklyReps {
    let mut out = WeeklyReps::default();
    for ex in exercises {
        let reps = i64::from(ex.reps.unwrap_or(0));
        out.total_reps += reps;
        let name = ex.name.as_deref().unwrap_or(UNKNOWN_EXERCISE);
        *out.reps_by_exercise.entry(name.to_string()).or_insert(0) += reps;
    }
    out
}

pub async fn workout_ids_in_window(
    store: &dyn RecapStore,
    user_id: Uuid,
    window: &RecapWindow,
) -> Fetched<Vec<Uuid>> {
    match store.find_workouts(user_id, window).await {
        Ok(ids) => {
            debug!(%user_id, count = ids.len(), start = %window.start, end = %window.end, "workouts in window");
            Fetched::Confirmed(ids)
        }
        Err(e) => {
            error!(error = %e, %user_id, "workout lookup failed");
            Fetched::degraded(Vec::new(), format!("{e:#}"))
        }
    }
}

/// Exercise rows for the given workouts; no query at all when there are none.
async fn exercises_for(
    store: &dyn RecapStore,
    user_id: Uuid,
    workout_ids: &[Uuid],
) -> Fetched<Vec<ExerciseRecord>> {
    if workout_ids.is_empty() {
        return Fetched::Confirmed(Vec::new());
    }
    match store.find_exercises(workout_ids).await {
        Ok(rows) => Fetched::Confirmed(rows),
        Err(e) => {
            error!(error = %e, %user_id, "exercise lookup failed");
            Fetched::degraded(Vec::new(), format!("{e:#}"))
        }
    }
}

pub async fn weekly_counts(
    store: &dyn RecapStore,
    user_id: Uuid,
    window: &RecapWindow,
) -> Fetched<WeeklyCounts> {
    weekly_aggregate(store, user_id, window)
        .await
        .map(|agg| agg.counts())
}

pub async fn weekly_reps(
    store: &dyn RecapStore,
    user_id: Uuid,
    window: &RecapWindow,
) -> Fetched<WeeklyReps> {
    weekly_aggregate(store, user_id, window).await.map(|agg| WeeklyReps {
        total_reps: agg.total_reps,
        reps_by_exercise: agg.reps_by_exercise,
    })
}

/// A failed exercise lookup keeps the confirmed workouts and zeroes only the
/// exercise and rep figures.
pub async fn weekly_aggregate(
    store: &dyn RecapStore,
    user_id: Uuid,
    window: &RecapWindow,
) -> Fetched<WeeklyAggregate> {
    let workout_ids = match workout_ids_in_window(store, user_id, window).await {
        Fetched::Confirmed(ids) => ids,
        Fetched::Degraded { value, cause } => {
            return Fetched::degraded(WeeklyAggregate::from_rows(value, &[]), cause)
        }
    };

    match exercises_for(store, user_id, &workout_ids).await {
        Fetched::Confirmed(rows) => {
            let agg = WeeklyAggregate::from_rows(workout_ids, &rows);
            debug!(
                %user_id,
                workouts = agg.workout_count,
                exercises = agg.exercise_count,
                total_reps = agg.total_reps,
                "weekly aggregate"
            );
            Fetched::Confirmed(agg)
        }
        Fetched::Degraded { cause, .. } => {
            Fetched::degraded(WeeklyAggregate::from_rows(workout_ids, &[]), cause)
        }
    }
}

pub async fn global_stats(store: &dyn RecapStore, user_id: Uuid) -> Fetched<GlobalStats> {
    match store.find_global_stats(user_id).await {
        Ok(Some(stats)) => Fetched::Confirmed(stats),
        Ok(None) => {
            warn!(%user_id, "no global stats row");
            Fetched::Confirmed(GlobalStats::default())
        }
        Err(e) => {
            error!(error = %e, %user_id, "global stats lookup failed");
            Fetched::degraded(GlobalStats::default(), format!("{e:#}"))
        }
    }
}

pub async fn all_recipient_emails(store: &dyn RecapStore) -> Fetched<Vec<String>> {
    match store.list_all_user_emails().await {
        Ok(emails) => {
            debug!(count = emails.len(), "recipient emails loaded");
            Fetched::Confirmed(emails)
        }
        Err(e) => {
            error!(error = %e, "listing recipient emails failed");
            Fetched::degraded(Vec::new(), format!("{e:#}"))
        }
    }
}
