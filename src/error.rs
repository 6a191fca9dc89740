use axum::http::StatusCode;
use thiserror::Error;

/// Failures surfaced by the recap pipeline.
#[derive(Debug, Error)]
pub enum RecapError {
    #[error("user not found for email {0}")]
    UserNotFound(String),

    #[error("user record for {0} has no identifier")]
    MissingUserId(String),

    #[error("template {0} not found")]
    TemplateNotFound(String),

    #[error("template {template} references {{{field}}} but no value was bound")]
    MissingTemplateField { template: String, field: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("smtp authentication failed: {0}")]
    TransportAuth(String),

    #[error("smtp error: {0}")]
    Transport(String),

    #[error("data access error: {0}")]
    DataAccess(String),
}

impl RecapError {
    /// Errors that mean the recipient could not be resolved to a user.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            RecapError::UserNotFound(_) | RecapError::MissingUserId(_) | RecapError::DataAccess(_)
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RecapError::UserNotFound(_) => StatusCode::NOT_FOUND,
            RecapError::TransportAuth(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message_names_the_token() {
        let err = RecapError::MissingTemplateField {
            template: "score.html".into(),
            field: "repstotal".into(),
        };
        assert_eq!(
            err.to_string(),
            "template score.html references {repstotal} but no value was bound"
        );
    }

    #[test]
    fn status_mapping() {
        assert_eq!(RecapError::UserNotFound("a@b.c".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(RecapError::TransportAuth("535".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            RecapError::Transport("timeout".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
