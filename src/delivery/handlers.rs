use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use super::dto::{BatchSummary, RecipientState, SendOneRequest, SendOneResponse};
use super::services::Campaign;
use crate::{auth::ApiKey, state::AppState};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/send-weekly-email", post(send_weekly_batch))
        .route("/send-weekly-email/one", post(send_weekly_one))
        .route("/send-excuse-email", post(send_excuse_batch))
        .route("/send-excuse-email/one", post(send_excuse_one))
}

#[instrument(skip(state, _key))]
pub async fn send_weekly_batch(
    State(state): State<AppState>,
    _key: ApiKey,
) -> Result<Json<BatchSummary>, (StatusCode, String)> {
    run_batch(&state, Campaign::WeeklyRecap).await
}

#[instrument(skip(state, _key))]
pub async fn send_excuse_batch(
    State(state): State<AppState>,
    _key: ApiKey,
) -> Result<Json<BatchSummary>, (StatusCode, String)> {
    run_batch(&state, Campaign::Apology).await
}

#[instrument(skip(state, _key, payload))]
pub async fn send_weekly_one(
    State(state): State<AppState>,
    _key: ApiKey,
    Json(payload): Json<SendOneRequest>,
) -> Result<Json<SendOneResponse>, (StatusCode, String)> {
    send_one(&state, Campaign::WeeklyRecap, payload).await
}

#[instrument(skip(state, _key, payload))]
pub async fn send_excuse_one(
    State(state): State<AppState>,
    _key: ApiKey,
    Json(payload): Json<SendOneRequest>,
) -> Result<Json<SendOneResponse>, (StatusCode, String)> {
    send_one(&state, Campaign::Apology, payload).await
}

async fn run_batch(
    state: &AppState,
    campaign: Campaign,
) -> Result<Json<BatchSummary>, (StatusCode, String)> {
    info!(?campaign, "batch requested");
    match state.dispatcher.run_all(campaign).await {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => {
            error!(error = %e, ?campaign, "batch could not start");
            Err((e.status(), e.to_string()))
        }
    }
}

async fn send_one(
    state: &AppState,
    campaign: Campaign,
    payload: SendOneRequest,
) -> Result<Json<SendOneResponse>, (StatusCode, String)> {
    let email = payload.email.trim().to_string();
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let outcome = state
        .dispatcher
        .send_one(campaign, &email)
        .await
        .map_err(|e| (e.status(), e.to_string()))?;

    match outcome.state {
        RecipientState::Sent => Ok(Json(SendOneResponse {
            message: "sent".into(),
            email: outcome.email,
            user: outcome.recipient_name,
        })),
        RecipientState::LookupFailed(e) | RecipientState::SendFailed(e) => {
            Err((e.status(), e.to_string()))
        }
        RecipientState::Pending => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "recipient was not processed".into(),
        )),
    }
}
