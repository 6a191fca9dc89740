use std::collections::HashMap;
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{error, info, instrument, warn};

use super::dto::{BatchSummary, RecipientOutcome};
use crate::error::RecapError;
use crate::mailer::report::{apology_context, assemble_report};
use crate::mailer::smtp::{MailTransport, OutgoingMail};
use crate::mailer::templates::{TemplateRegistry, APOLOGY_TEMPLATE, WEEKLY_RECAP_TEMPLATE};
use crate::stats::repo::RecapStore;
use crate::stats::repo_types::User;
use crate::stats::services::{all_recipient_emails, global_stats, weekly_aggregate};
use crate::stats::window::{previous_week_bounds, RecapWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Campaign {
    WeeklyRecap,
    Apology,
}

impl Campaign {
    pub fn template(self) -> &'static str {
        match self {
            Campaign::WeeklyRecap => WEEKLY_RECAP_TEMPLATE,
            Campaign::Apology => APOLOGY_TEMPLATE,
        }
    }

    pub fn subject(self) -> &'static str {
        match self {
            Campaign::WeeklyRecap => "Your weekly recap",
            Campaign::Apology => "Important message - Serenity Fitness",
        }
    }
}

/// Drives lookup, report assembly, rendering and sending for each recipient.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn RecapStore>,
    mailer: Arc<dyn MailTransport>,
    templates: Arc<TemplateRegistry>,
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn RecapStore>,
        mailer: Arc<dyn MailTransport>,
        templates: Arc<TemplateRegistry>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            mailer,
            templates,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn send_one(&self, campaign: Campaign, email: &str) -> Result<RecipientOutcome, RecapError> {
        self.send_one_at(campaign, email, OffsetDateTime::now_utc()).await
    }

    #[instrument(skip(self, now))]
    pub async fn send_one_at(
        &self,
        campaign: Campaign,
        email: &str,
        now: OffsetDateTime,
    ) -> Result<RecipientOutcome, RecapError> {
        let from = self.mailer.sender()?;
        let window = previous_week_bounds(now);
        Ok(self.process(campaign, email.to_string(), &from, &window).await)
    }

    pub async fn run_all(&self, campaign: Campaign) -> Result<BatchSummary, RecapError> {
        self.run_all_at(campaign, OffsetDateTime::now_utc()).await
    }

    pub async fn run_all_at(&self, campaign: Campaign, now: OffsetDateTime) -> Result<BatchSummary, RecapError> {
        self.mailer.sender()?;
        let emails = all_recipient_emails(self.store.as_ref()).await;
        if let Some(cause) = emails.cause() {
            warn!(%cause, "recipient list unavailable, nothing to send");
        }
        self.run_at(campaign, emails.into_value(), now).await
    }

    pub async fn run(&self, campaign: Campaign, recipients: Vec<String>) -> Result<BatchSummary, RecapError> {
        self.run_at(campaign, recipients, OffsetDateTime::now_utc()).await
    }

    /// Fails only when the transport is unconfigured, before any send.
    #[instrument(skip(self, recipients, now), fields(total = recipients.len()))]
    pub async fn run_at(
        &self,
        campaign: Campaign,
        recipients: Vec<String>,
        now: OffsetDateTime,
    ) -> Result<BatchSummary, RecapError> {
        let from = match self.mailer.sender() {
            Ok(from) => from,
            Err(e) => {
                error!(error = %e, "batch aborted before sending");
                return Err(e);
            }
        };

        if recipients.is_empty() {
            warn!("no recipients");
            return Ok(BatchSummary::no_recipients());
        }

        let window = previous_week_bounds(now);
        info!(start = %window.start, end = %window.end, concurrency = self.concurrency, "batch started");

        let outcomes = if self.concurrency == 1 {
            let mut outcomes = Vec::with_capacity(recipients.len());
            for email in recipients {
                outcomes.push(self.process(campaign, email, &from, &window).await);
            }
            outcomes
        } else {
            self.process_bounded(campaign, recipients, from, window).await
        };

        let summary = BatchSummary::from_outcomes(&outcomes);
        info!(sent = summary.sent, failed = summary.failed, total = summary.total, "batch finished");
        Ok(summary)
    }

    async fn process_bounded(
        &self,
        campaign: Campaign,
        recipients: Vec<String>,
        from: String,
        window: RecapWindow,
    ) -> Vec<RecipientOutcome> {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut owners: HashMap<task::Id, String> = HashMap::with_capacity(recipients.len());
        for email in recipients {
            let this = self.clone();
            let from = from.clone();
            let permits = Arc::clone(&permits);
            let recipient = email.clone();
            let handle = tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                this.process(campaign, recipient, &from, &window).await
            });
            owners.insert(handle.id(), email);
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, outcome)) => outcomes.push(outcome),
                Err(e) => {
                    let email = owners.remove(&e.id()).unwrap_or_default();
                    error!(error = %e, %email, "delivery task died");
                    outcomes.push(lost_recipient(email, &e));
                }
            }
        }
        outcomes
    }

    async fn process(
        &self,
        campaign: Campaign,
        email: String,
        from: &str,
        window: &RecapWindow,
    ) -> RecipientOutcome {
        let mut outcome = RecipientOutcome::pending(email);
        let result = self.deliver(campaign, &mut outcome, from, window).await;
        match &result {
            Ok(()) => info!(email = %outcome.email, ?campaign, "recipient done"),
            Err(e) => error!(email = %outcome.email, ?campaign, error = %e, "recipient failed"),
        }
        outcome.settle(result);
        outcome
    }

    async fn deliver(
        &self,
        campaign: Campaign,
        outcome: &mut RecipientOutcome,
        from: &str,
        window: &RecapWindow,
    ) -> Result<(), RecapError> {
        let user = self.lookup(&outcome.email).await?;
        outcome.recipient_name = user.full_name.clone();

        let html = match campaign {
            Campaign::WeeklyRecap => self.weekly_recap_html(&user, window).await?,
            Campaign::Apology => self.templates.render(campaign.template(), &apology_context(&user))?,
        };

        let mail = OutgoingMail {
            subject: campaign.subject().to_string(),
            from: from.to_string(),
            to: outcome.email.clone(),
            html_body: html,
        };
        self.mailer.send(&mail).await
    }

    async fn lookup(&self, email: &str) -> Result<User, RecapError> {
        match self.store.find_user_by_email(email).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(RecapError::UserNotFound(email.to_string())),
            Err(e) => Err(RecapError::DataAccess(format!("{e:#}"))),
        }
    }

    async fn weekly_recap_html(&self, user: &User, window: &RecapWindow) -> Result<String, RecapError> {
        let user_id = user
            .id
            .ok_or_else(|| RecapError::MissingUserId(user.email.clone()))?;
        let store = self.store.as_ref();

        let global = global_stats(store, user_id).await;
        let weekly = weekly_aggregate(store, user_id, window).await;
        for cause in [global.cause(), weekly.cause()].into_iter().flatten() {
            warn!(%user_id, %cause, "recap built from degraded stats");
        }

        let ctx = assemble_report(user, global.value(), weekly.value());
        self.templates.render(Campaign::WeeklyRecap.template(), &ctx)
    }
}

fn lost_recipient(email: String, err: &JoinError) -> RecipientOutcome {
    let mut outcome = RecipientOutcome::pending(email);
    outcome.settle(Err(RecapError::Transport(format!("delivery task died: {err}"))));
    outcome
}
