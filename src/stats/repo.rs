use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{ExerciseRecord, GlobalStats, User};
use super::window::RecapWindow;

/// Read-only view of the fitness data store.
#[async_trait]
pub trait RecapStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_global_stats(&self, user_id: Uuid) -> anyhow::Result<Option<GlobalStats>>;
    async fn find_workouts(&self, user_id: Uuid, window: &RecapWindow) -> anyhow::Result<Vec<Uuid>>;
    async fn find_exercises(&self, workout_ids: &[Uuid]) -> anyhow::Result<Vec<ExerciseRecord>>;
    async fn list_all_user_emails(&self) -> anyhow::Result<Vec<String>>;
}

#[derive(Clone)]
pub struct PgRecapStore {
    db: PgPool,
}

impl PgRecapStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecapStore for PgRecapStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, email
            FROM users
            WHERE email = $1
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_global_stats(&self, user_id: Uuid) -> anyhow::Result<Option<GlobalStats>> {
        let stats = sqlx::query_as::<_, GlobalStats>(
            r#"
            SELECT COALESCE(total_workouts, 0)::bigint  AS total_workouts,
                   COALESCE(total_exercises, 0)::bigint AS total_exercises,
                   last_workout_date::text              AS last_workout_date
              FROM user_workout_stats
             WHERE user_id = $1
             LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("find global stats")?;
        Ok(stats)
    }

    async fn find_workouts(&self, user_id: Uuid, window: &RecapWindow) -> anyhow::Result<Vec<Uuid>> {
        let ids: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id
              FROM workouts
             WHERE user_id = $1
               AND created_at >= $2
               AND created_at <  $3
             ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.db)
        .await
        .context("list workouts in window")?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn find_exercises(&self, workout_ids: &[Uuid]) -> anyhow::Result<Vec<ExerciseRecord>> {
        let rows = sqlx::query_as::<_, ExerciseRecord>(
            r#"
            SELECT name, reps, workout_id
              FROM exercises
             WHERE workout_id = ANY($1)
            "#,
        )
        .bind(workout_ids.to_vec())
        .fetch_all(&self.db)
        .await
        .context("list exercises by workout")?;
        Ok(rows)
    }

    async fn list_all_user_emails(&self) -> anyhow::Result<Vec<String>> {
        let rows: Vec<(Option<String>,)> = sqlx::query_as(r#"SELECT email FROM users"#)
            .fetch_all(&self.db)
            .await
            .context("list user emails")?;
        Ok(rows
            .into_iter()
            .filter_map(|(email,)| email.filter(|e| !e.trim().is_empty()))
            .collect())
    }
}
