use lettre::message::Mailbox;
use serde::Deserialize;
use tracing::warn;

use crate::error::RecapError;

const DEFAULT_SMTP_PORT: u16 = 465;

/// SMTP settings as read from the environment. Every field is optional at
/// start-up; [`SmtpSettings::credentials`] validates them when a run begins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmtpSettings {
    pub server: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
}

/// Validated SMTP settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpCredentials {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
}

impl SmtpSettings {
    pub fn from_env() -> Self {
        Self {
            server: non_empty_var("SMTP_SERVER"),
            port: parse_port(std::env::var("SMTP_PORT").ok().as_deref()),
            user: non_empty_var("SMTP_USER"),
            password: non_empty_var("SMTP_PASSWORD"),
            from: non_empty_var("SMTP_FROM"),
        }
    }

    pub fn credentials(&self) -> Result<SmtpCredentials, RecapError> {
        let missing: Vec<&str> = [
            ("SMTP_SERVER", self.server.is_none()),
            ("SMTP_USER", self.user.is_none()),
            ("SMTP_PASSWORD", self.password.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        match (&self.server, &self.user, &self.password) {
            (Some(server), Some(user), Some(password)) => {
                let from = self.from.clone().unwrap_or_else(|| user.clone());
                from.parse::<Mailbox>().map_err(|e| {
                    RecapError::Configuration(format!("invalid sender address {from:?}: {e}"))
                })?;
                Ok(SmtpCredentials {
                    server: server.clone(),
                    port: self.port,
                    user: user.clone(),
                    password: password.clone(),
                    from,
                })
            }
            _ => Err(RecapError::Configuration(format!(
                "incomplete smtp configuration, missing {}",
                missing.join(", ")
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub api_key: String,
    pub template_dir: String,
    pub delivery_concurrency: usize,
    pub smtp: SmtpSettings,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let api_key = std::env::var("API_KEY")?;
        let template_dir = std::env::var("TEMPLATE_DIR").unwrap_or_else(|_| "templates".into());
        let delivery_concurrency = std::env::var("DELIVERY_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(1);
        Ok(Self {
            database_url,
            api_key,
            template_dir,
            delivery_concurrency,
            smtp: SmtpSettings::from_env(),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_port(raw: Option<&str>) -> u16 {
    match raw {
        None => DEFAULT_SMTP_PORT,
        Some(v) => v.trim().parse::<u16>().unwrap_or_else(|_| {
            warn!(value = %v, "invalid SMTP_PORT, falling back to 465");
            DEFAULT_SMTP_PORT
        }),
    }
}
