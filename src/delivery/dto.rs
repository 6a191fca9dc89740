use serde::{Deserialize, Serialize};

use crate::error::RecapError;

/// Per-recipient lifecycle. Every recipient starts `Pending` and ends in
/// exactly one of the other states.
#[derive(Debug)]
pub enum RecipientState {
    Pending,
    LookupFailed(RecapError),
    Sent,
    SendFailed(RecapError),
}

#[derive(Debug)]
pub struct RecipientOutcome {
    pub email: String,
    pub recipient_name: Option<String>,
    pub state: RecipientState,
}

impl RecipientOutcome {
    pub fn pending(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            recipient_name: None,
            state: RecipientState::Pending,
        }
    }

    pub fn settle(&mut self, result: Result<(), RecapError>) {
        self.state = match result {
            Ok(()) => RecipientState::Sent,
            Err(e) if e.is_lookup_failure() => RecipientState::LookupFailed(e),
            Err(e) => RecipientState::SendFailed(e),
        };
    }

    pub fn is_sent(&self) -> bool {
        matches!(self.state, RecipientState::Sent)
    }

    pub fn error(&self) -> Option<&RecapError> {
        match &self.state {
            RecipientState::LookupFailed(e) | RecipientState::SendFailed(e) => Some(e),
            RecipientState::Pending | RecipientState::Sent => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRecipient {
    pub email: String,
    pub error: String,
}

/// Tally of one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub success: bool,
    pub message: String,
    pub sent: usize,
    pub failed: usize,
    pub total: usize,
    pub failed_emails: Vec<FailedRecipient>,
}

impl BatchSummary {
    pub fn no_recipients() -> Self {
        Self {
            success: false,
            message: "no recipients found".into(),
            sent: 0,
            failed: 0,
            total: 0,
            failed_emails: Vec::new(),
        }
    }

    pub fn from_outcomes(outcomes: &[RecipientOutcome]) -> Self {
        let sent = outcomes.iter().filter(|o| o.is_sent()).count();
        let failed_emails: Vec<FailedRecipient> = outcomes
            .iter()
            .filter(|o| !o.is_sent())
            .map(|o| FailedRecipient {
                email: o.email.clone(),
                error: o
                    .error()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "not processed".into()),
            })
            .collect();
        let failed = failed_emails.len();
        Self {
            success: true,
            message: format!("run finished: {sent} sent, {failed} failed"),
            sent,
            failed,
            total: outcomes.len(),
            failed_emails,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendOneRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SendOneResponse {
    pub message: String,
    pub email: String,
    pub user: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_routes_errors_to_the_right_terminal_state() {
        let mut a = RecipientOutcome::pending("a@example.com");
        a.settle(Ok(()));
        assert!(a.is_sent());

        let mut b = RecipientOutcome::pending("b@example.com");
        b.settle(Err(RecapError::UserNotFound("b@example.com".into())));
        assert!(matches!(b.state, RecipientState::LookupFailed(_)));

        let mut c = RecipientOutcome::pending("c@example.com");
        c.settle(Err(RecapError::TransportAuth("535".into())));
        assert!(matches!(c.state, RecipientState::SendFailed(_)));
    }

    #[test]
    fn summary_counts_and_details() {
        let mut ok = RecipientOutcome::pending("a@example.com");
        ok.settle(Ok(()));
        let mut missing = RecipientOutcome::pending("b@example.com");
        missing.settle(Err(RecapError::UserNotFound("b@example.com".into())));

        let summary = BatchSummary::from_outcomes(&[ok, missing]);
        assert!(summary.success);
        assert_eq!((summary.sent, summary.failed, summary.total), (1, 1, 2));
        assert_eq!(summary.failed_emails[0].email, "b@example.com");
        assert!(summary.failed_emails[0].error.contains("not found"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["failed_emails"][0]["email"], "b@example.com");
    }
}
