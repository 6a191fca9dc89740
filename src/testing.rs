//! In-memory collaborators for unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::RecapError;
use crate::mailer::smtp::{MailTransport, OutgoingMail};
use crate::stats::repo::RecapStore;
use crate::stats::repo_types::{ExerciseRecord, GlobalStats, User};
use crate::stats::window::RecapWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    None,
    Users,
    GlobalStats,
    Workouts,
    Exercises,
    Emails,
}

struct Workout {
    id: Uuid,
    user_id: Uuid,
    created_at: OffsetDateTime,
}

pub struct InMemoryStore {
    users: Mutex<Vec<User>>,
    stats: Mutex<Vec<(Uuid, GlobalStats)>>,
    workouts: Mutex<Vec<Workout>>,
    exercises: Mutex<Vec<ExerciseRecord>>,
    failure: Mutex<StoreFailure>,
    exercise_queries: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            stats: Mutex::new(Vec::new()),
            workouts: Mutex::new(Vec::new()),
            exercises: Mutex::new(Vec::new()),
            failure: Mutex::new(StoreFailure::None),
            exercise_queries: AtomicUsize::new(0),
        }
    }
}

impl InMemoryStore {
    pub fn add_user(&self, email: &str, full_name: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        self.users.lock().unwrap().push(User {
            id: Some(id),
            full_name: full_name.map(str::to_string),
            email: email.to_string(),
        });
        id
    }

    pub fn add_user_without_id(&self, email: &str) {
        self.users.lock().unwrap().push(User {
            id: None,
            full_name: None,
            email: email.to_string(),
        });
    }

    pub fn set_global_stats(&self, user_id: Uuid, stats: GlobalStats) {
        self.stats.lock().unwrap().push((user_id, stats));
    }

    pub fn add_workout(&self, user_id: Uuid, created_at: OffsetDateTime) -> Uuid {
        let id = Uuid::new_v4();
        self.workouts.lock().unwrap().push(Workout {
            id,
            user_id,
            created_at,
        });
        id
    }

    pub fn add_exercise(&self, workout_id: Uuid, name: Option<&str>, reps: Option<i32>) {
        self.exercises.lock().unwrap().push(ExerciseRecord {
            name: name.map(str::to_string),
            reps,
            workout_id,
        });
    }

    pub fn fail_on(&self, failure: StoreFailure) {
        *self.failure.lock().unwrap() = failure;
    }

    pub fn exercise_queries(&self) -> usize {
        self.exercise_queries.load(Ordering::SeqCst)
    }

    fn check(&self, which: StoreFailure, what: &str) -> anyhow::Result<()> {
        if *self.failure.lock().unwrap() == which {
            anyhow::bail!("{what} query failed: connection reset");
        }
        Ok(())
    }
}

#[async_trait]
impl RecapStore for InMemoryStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.check(StoreFailure::Users, "users")?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_global_stats(&self, user_id: Uuid) -> anyhow::Result<Option<GlobalStats>> {
        self.check(StoreFailure::GlobalStats, "user_workout_stats")?;
        Ok(self
            .stats
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| *id == user_id)
            .map(|(_, s)| s.clone()))
    }

    async fn find_workouts(&self, user_id: Uuid, window: &RecapWindow) -> anyhow::Result<Vec<Uuid>> {
        self.check(StoreFailure::Workouts, "workouts")?;
        Ok(self
            .workouts
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.user_id == user_id && window.contains(w.created_at))
            .map(|w| w.id)
            .collect())
    }

    async fn find_exercises(&self, workout_ids: &[Uuid]) -> anyhow::Result<Vec<ExerciseRecord>> {
        self.exercise_queries.fetch_add(1, Ordering::SeqCst);
        self.check(StoreFailure::Exercises, "exercises")?;
        let wanted: HashSet<&Uuid> = workout_ids.iter().collect();
        Ok(self
            .exercises
            .lock()
            .unwrap()
            .iter()
            .filter(|e| wanted.contains(&e.workout_id))
            .cloned()
            .collect())
    }

    async fn list_all_user_emails(&self) -> anyhow::Result<Vec<String>> {
        self.check(StoreFailure::Emails, "users")?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.email.clone())
            .collect())
    }
}

/// Records every attempted message; can be told to reject specific
/// recipients or to report itself unconfigured.
#[derive(Default)]
pub struct RecordingMailer {
    pub attempts: Mutex<Vec<OutgoingMail>>,
    reject: Mutex<Vec<(String, bool)>>,
    explode: Mutex<Vec<String>>,
    unconfigured: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unconfigured() -> Self {
        Self {
            unconfigured: true,
            ..Self::default()
        }
    }

    /// Fail sends to `email`; `auth` selects an authentication failure.
    pub fn reject(&self, email: &str, auth: bool) {
        self.reject.lock().unwrap().push((email.to_string(), auth));
    }

    /// Panic inside `send` for `email`.
    pub fn explode_on(&self, email: &str) {
        self.explode.lock().unwrap().push(email.to_string());
    }

    pub fn attempted(&self) -> Vec<String> {
        self.attempts.lock().unwrap().iter().map(|m| m.to.clone()).collect()
    }

    pub fn last(&self) -> Option<OutgoingMail> {
        self.attempts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    fn sender(&self) -> Result<String, RecapError> {
        if self.unconfigured {
            return Err(RecapError::Configuration(
                "incomplete smtp configuration, missing SMTP_PASSWORD".into(),
            ));
        }
        Ok("coach@serenity.test".into())
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<(), RecapError> {
        self.attempts.lock().unwrap().push(mail.clone());
        let explode = self.explode.lock().unwrap().iter().any(|e| *e == mail.to);
        if explode {
            panic!("transport blew up for {}", mail.to);
        }
        let rejected = self
            .reject
            .lock()
            .unwrap()
            .iter()
            .find(|(email, _)| *email == mail.to)
            .map(|(_, auth)| *auth);
        match rejected {
            Some(true) => Err(RecapError::TransportAuth("535 5.7.8 bad credentials".into())),
            Some(false) => Err(RecapError::Transport("connection refused".into())),
            None => Ok(()),
        }
    }
}
