use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::{SmtpCredentials, SmtpSettings};
use crate::error::RecapError;

const IMPLICIT_TLS_PORT: u16 = 465;

/// A rendered message ready for the wire.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMail {
    pub subject: String,
    pub from: String,
    pub to: String,
    pub html_body: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Sender address, or a configuration error when nothing can be sent.
    fn sender(&self) -> Result<String, RecapError>;

    async fn send(&self, mail: &OutgoingMail) -> Result<(), RecapError>;
}

/// SMTP delivery through lettre. Built without the connection pool, so each
/// message opens its own session and lettre closes it when the send returns.
pub struct SmtpMailer {
    settings: SmtpSettings,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    fn transport(creds: &SmtpCredentials) -> Result<AsyncSmtpTransport<Tokio1Executor>, RecapError> {
        let builder = if creds.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&creds.server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&creds.server)
        }
        .map_err(|e| RecapError::Configuration(format!("smtp relay {}: {}", creds.server, e)))?;

        Ok(builder
            .port(creds.port)
            .credentials(Credentials::new(creds.user.clone(), creds.password.clone()))
            .build())
    }

    fn build_message(mail: &OutgoingMail) -> Result<Message, RecapError> {
        let from: Mailbox = mail
            .from
            .parse()
            .map_err(|e| RecapError::Configuration(format!("invalid sender address: {e}")))?;
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| RecapError::Transport(format!("invalid recipient address {}: {e}", mail.to)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(&mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html_body.clone())
            .map_err(|e| RecapError::Transport(format!("failed to build message: {e}")))
    }
}

/// 530 auth required, 534 mechanism too weak, 535 credentials rejected.
fn is_auth_rejection(code: &str) -> bool {
    matches!(code, "530" | "534" | "535")
}

fn classify(err: lettre::transport::smtp::Error) -> RecapError {
    let code = err.status().map(|c| c.to_string());
    match code.as_deref() {
        Some(c) if is_auth_rejection(c) => RecapError::TransportAuth(err.to_string()),
        _ => RecapError::Transport(err.to_string()),
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    fn sender(&self) -> Result<String, RecapError> {
        self.settings.credentials().map(|c| c.from)
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<(), RecapError> {
        let creds = self.settings.credentials()?;
        let message = Self::build_message(mail)?;
        let transport = Self::transport(&creds)?;

        debug!(to = %mail.to, subject = %mail.subject, host = %creds.server, port = creds.port, "sending via smtp");

        let response = transport.send(message).await.map_err(|e| {
            error!(to = %mail.to, error = %e, "smtp send failed");
            classify(e)
        })?;

        info!(to = %mail.to, code = %response.code(), "email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: &str) -> OutgoingMail {
        OutgoingMail {
            subject: "Your weekly recap".into(),
            from: "Serenity Fitness <coach@serenity.test>".into(),
            to: to.into(),
            html_body: "<p>Hi</p>".into(),
        }
    }

    #[test]
    fn auth_codes_are_recognised() {
        assert!(is_auth_rejection("535"));
        assert!(is_auth_rejection("530"));
        assert!(!is_auth_rejection("550"));
        assert!(!is_auth_rejection("421"));
    }

    #[test]
    fn message_is_html() {
        let msg = SmtpMailer::build_message(&mail("amy@example.com")).expect("valid message");
        let raw = String::from_utf8(msg.formatted()).unwrap();
        assert!(raw.contains("Content-Type: text/html"));
        assert!(raw.contains("To: amy@example.com"));
        assert!(raw.contains("Subject: Your weekly recap"));
    }

    #[test]
    fn bad_recipient_is_a_send_failure() {
        let err = SmtpMailer::build_message(&mail("not an address")).unwrap_err();
        assert!(matches!(err, RecapError::Transport(_)));
    }

    #[tokio::test]
    async fn unconfigured_mailer_refuses_before_connecting() {
        let mailer = SmtpMailer::new(SmtpSettings {
            port: 465,
            ..SmtpSettings::default()
        });
        assert!(matches!(mailer.sender(), Err(RecapError::Configuration(_))));
        let err = mailer.send(&mail("amy@example.com")).await.unwrap_err();
        assert!(matches!(err, RecapError::Configuration(_)));
    }
}
