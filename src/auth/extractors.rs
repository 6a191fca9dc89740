use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Guards operator routes: the `x-api-key` header must match `API_KEY`.
pub struct ApiKey;

#[async_trait]
impl FromRequestParts<AppState> for ApiKey {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Invalid API key".to_string()))?;

        let expected = state.config.api_key.as_str();
        if expected.is_empty() || !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
            warn!(path = %parts.uri.path(), "rejected api key");
            return Err((StatusCode::UNAUTHORIZED, "Invalid API key".to_string()));
        }

        Ok(ApiKey)
    }
}

/// Compares SHA-256 digests so neither the content nor the length of the
/// configured key shows up in timing.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    Sha256::digest(a).ct_eq(&Sha256::digest(b)).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_comparison() {
        assert!(constant_time_eq(b"s3cret", b"s3cret"));
        assert!(!constant_time_eq(b"s3cret", b"s3cres"));
        assert!(!constant_time_eq(b"s3cret", b"s3cret-longer"));
        assert!(!constant_time_eq(b"", b"s3cret"));
        assert!(constant_time_eq(b"", b""));
    }
}
