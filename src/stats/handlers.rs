use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument};

use super::dto::{DebugQuery, DebugUser, DebugWeek, StatsProbe};
use super::repo::RecapStore;
use super::services::{all_recipient_emails, global_stats, weekly_aggregate};
use super::window::previous_week_bounds;
use crate::{auth::ApiKey, state::AppState};

const EMAIL_SAMPLE: usize = 10;

pub fn debug_routes() -> Router<AppState> {
    Router::new().route("/debug/stats", get(stats_probe))
}

#[instrument(skip(state, _key))]
pub async fn stats_probe(
    State(state): State<AppState>,
    _key: ApiKey,
    Query(q): Query<DebugQuery>,
) -> Json<StatsProbe> {
    Json(build_probe(state.store.as_ref(), q.email, OffsetDateTime::now_utc()).await)
}

pub(crate) async fn build_probe(
    store: &dyn RecapStore,
    email: Option<String>,
    now: OffsetDateTime,
) -> StatsProbe {
    let emails = all_recipient_emails(store).await;
    let mut probe = StatsProbe {
        store_connected: !emails.is_degraded(),
        total_users: emails.value().len(),
        emails_sample: emails.value().iter().take(EMAIL_SAMPLE).cloned().collect(),
        error: emails.cause().map(str::to_string),
        test_user: None,
        test_user_stats: None,
        test_user_last_week: None,
    };

    let Some(email) = email.or_else(|| emails.value().first().cloned()) else {
        return probe;
    };

    let user = match store.find_user_by_email(&email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            probe.error = Some(format!("no user for {email}"));
            return probe;
        }
        Err(e) => {
            error!(error = %e, %email, "probe user lookup failed");
            probe.store_connected = false;
            probe.error = Some(format!("{e:#}"));
            return probe;
        }
    };

    if let Some(user_id) = user.id {
        let window = previous_week_bounds(now);
        probe.test_user_stats = Some(global_stats(store, user_id).await.into_value());
        let week = weekly_aggregate(store, user_id, &window).await;
        probe.test_user_last_week = Some(DebugWeek {
            window,
            degraded: week.cause().map(str::to_string),
            aggregate: week.into_value(),
        });
    }
    probe.test_user = Some(DebugUser {
        email: user.email,
        id: user.id,
        full_name: user.full_name,
    });

    info!(users = probe.total_users, "stats probe done");
    probe
}
