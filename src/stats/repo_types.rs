use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Row of the `users` table, limited to what a recap needs.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Option<Uuid>,             // absent in malformed rows
    pub full_name: Option<String>,
    pub email: String,
}

/// Lifetime totals from `user_workout_stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct GlobalStats {
    pub total_workouts: i64,
    pub total_exercises: i64,
    pub last_workout_date: Option<String>,
}

/// Row of the `exercises` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExerciseRecord {
    pub name: Option<String>,
    pub reps: Option<i32>,
    pub workout_id: Uuid,
}
