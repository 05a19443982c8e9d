/// Scheduled email dispatcher
///
/// Polls the store for due scheduled emails and hands them to the delivery
/// provider.
///
/// # Architecture
///
/// ```text
/// Dispatcher
///   ├─> Store: claim due rows (marks them sent)
///   ├─> Store: look up the sender
///   ├─> EmailProvider: send from the sender's derived address
///   └─> Store / UsageRecorder: outcome, history row, resend counter
/// ```
///
/// Claiming flips `sent` before anything is handed to the provider, so a row
/// is attempted at most once. Failures are kept on the row as `error`.
///
/// # Example
///
/// ```no_run
/// use outreach_worker::dispatcher::{Dispatcher, DispatcherConfig};
/// use outreach_shared::provider::MockEmailProvider;
/// use outreach_shared::store::MemoryStore;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let dispatcher = Dispatcher::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(MockEmailProvider::new()),
///     DispatcherConfig {
///         poll_interval: Duration::from_secs(30),
///         batch_size: 25,
///         sending_domain: "mail.example.com".to_string(),
///     },
/// );
///
/// let shutdown = dispatcher.shutdown_token();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     shutdown.cancel();
/// });
///
/// dispatcher.run().await;
/// # Ok(())
/// # }
/// ```

use futures::future::join_all;
use outreach_shared::{
    models::{email_record::NewEmailRecord, scheduled_email::ScheduledEmail},
    provider::{format_from, sending_address, EmailProvider, OutgoingEmail},
    store::{Store, StoreError},
    usage_recorder::UsageRecorder,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Pause between polls when nothing was due
    pub poll_interval: Duration,

    /// Rows claimed per poll
    pub batch_size: i64,

    /// Domain outgoing addresses are rewritten onto
    pub sending_domain: String,
}

/// What happened to one claimed email
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent { provider_email_id: String },
    Failed { error: String },
}

/// Totals of one poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub claimed: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct Dispatcher {
    store: Arc<dyn Store>,
    email: Arc<dyn EmailProvider>,
    usage: UsageRecorder,
    config: DispatcherConfig,
    shutdown_token: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn Store>,
        email: Arc<dyn EmailProvider>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            usage: UsageRecorder::new(store.clone()),
            store,
            email,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Token that stops [`run`](Self::run) after the current batch
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Polls until shutdown
    ///
    /// A full batch is followed immediately by another poll; otherwise the
    /// loop sleeps for the poll interval. Claim errors are logged and retried
    /// on the next poll.
    pub async fn run(&self) {
        tracing::info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            batch_size = self.config.batch_size,
            "Dispatcher starting"
        );

        while !self.shutdown_token.is_cancelled() {
            let backlog = match self.run_once().await {
                Ok(summary) => summary.claimed as i64 >= self.config.batch_size,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to claim scheduled emails");
                    false
                }
            };

            if backlog {
                continue;
            }

            tokio::select! {
                _ = self.shutdown_token.cancelled() => {}
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        tracing::info!("Dispatcher shut down");
    }

    /// Claims one batch of due emails and dispatches them concurrently
    pub async fn run_once(&self) -> Result<DispatchSummary, StoreError> {
        let claimed = self.store.claim_due_scheduled(self.config.batch_size).await?;
        if claimed.is_empty() {
            return Ok(DispatchSummary::default());
        }

        tracing::debug!(count = claimed.len(), "Claimed due scheduled emails");

        let outcomes = join_all(claimed.into_iter().map(|email| self.dispatch(email))).await;

        let mut summary = DispatchSummary {
            claimed: outcomes.len(),
            ..Default::default()
        };
        for outcome in &outcomes {
            match outcome {
                DispatchOutcome::Sent { .. } => summary.sent += 1,
                DispatchOutcome::Failed { .. } => summary.failed += 1,
            }
        }

        tracing::info!(
            claimed = summary.claimed,
            sent = summary.sent,
            failed = summary.failed,
            "Dispatch batch finished"
        );
        Ok(summary)
    }

    async fn dispatch(&self, scheduled: ScheduledEmail) -> DispatchOutcome {
        let outcome = self.deliver(&scheduled).await;

        let (provider_email_id, error) = match &outcome {
            DispatchOutcome::Sent { provider_email_id } => (Some(provider_email_id.as_str()), None),
            DispatchOutcome::Failed { error } => (None, Some(error.as_str())),
        };
        if let Err(e) = self
            .store
            .record_dispatch_outcome(scheduled.id, provider_email_id, error)
            .await
        {
            tracing::error!(
                scheduled_email_id = %scheduled.id,
                error = %e,
                "Failed to record dispatch outcome"
            );
        }

        outcome
    }

    async fn deliver(&self, scheduled: &ScheduledEmail) -> DispatchOutcome {
        let sender = match self.store.find_sender(scheduled.sender_id).await {
            Ok(Some(sender)) => sender,
            Ok(None) => {
                return DispatchOutcome::Failed {
                    error: "Sender not found".to_string(),
                }
            }
            Err(e) => {
                return DispatchOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let address = sending_address(&sender.email, &self.config.sending_domain);
        let email = OutgoingEmail {
            from: format_from(&sender.display_name(), &address),
            to: vec![scheduled.recipient.clone()],
            cc: Vec::new(),
            subject: scheduled.subject.clone(),
            html: scheduled.body.clone(),
            attachments: Vec::new(),
        };

        let receipt = match self.email.send(&email).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(
                    scheduled_email_id = %scheduled.id,
                    error = %e,
                    "Scheduled email rejected by provider"
                );
                return DispatchOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        tracing::info!(
            scheduled_email_id = %scheduled.id,
            provider_email_id = %receipt.id,
            priority = %scheduled.priority,
            "Scheduled email sent"
        );

        self.usage.record_resend_request(sender.id).await;

        let history = NewEmailRecord {
            sender_id: sender.id,
            provider_email_id: receipt.id.clone(),
            recipient: scheduled.recipient.clone(),
            subject: scheduled.subject.clone(),
            template_id: None,
        };
        if let Err(e) = self.store.insert_email_record(history).await {
            tracing::error!(
                scheduled_email_id = %scheduled.id,
                error = %e,
                "Failed to record email history"
            );
        }

        DispatchOutcome::Sent {
            provider_email_id: receipt.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use outreach_shared::models::plan::PlanType;
    use outreach_shared::models::scheduled_email::{NewScheduledEmail, Priority};
    use outreach_shared::models::sender::NewSender;
    use outreach_shared::provider::MockEmailProvider;
    use outreach_shared::store::MemoryStore;
    use uuid::Uuid;

    fn config(batch_size: i64) -> DispatcherConfig {
        DispatcherConfig {
            poll_interval: Duration::from_millis(10),
            batch_size,
            sending_domain: "mail.example.com".to_string(),
        }
    }

    async fn sender(store: &MemoryStore) -> Uuid {
        store
            .create_account(NewSender {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@gmail.com".to_string(),
                password_hash: "hash".to_string(),
                avatar_url: None,
                is_anonymous: false,
                plan_type: PlanType::Free,
            })
            .await
            .unwrap()
            .id
    }

    async fn schedule(
        store: &MemoryStore,
        sender_id: Uuid,
        recipient: &str,
        offset_minutes: i64,
        priority: Priority,
    ) {
        store
            .insert_scheduled_email(NewScheduledEmail {
                sender_id,
                recipient: recipient.to_string(),
                subject: "Reminder".to_string(),
                body: "<p>Hi</p>".to_string(),
                scheduled_at: Utc::now() + ChronoDuration::minutes(offset_minutes),
                priority,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sends_due_emails_only() {
        let store = Arc::new(MemoryStore::new());
        let email = Arc::new(MockEmailProvider::new());
        let sender_id = sender(&store).await;
        schedule(&store, sender_id, "due@x.io", -5, Priority::Normal).await;
        schedule(&store, sender_id, "later@x.io", 60, Priority::High).await;

        let dispatcher = Dispatcher::new(store.clone(), email.clone(), config(10));
        let summary = dispatcher.run_once().await.unwrap();

        assert_eq!(
            summary,
            DispatchSummary {
                claimed: 1,
                sent: 1,
                failed: 0
            }
        );

        let sent = email.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["due@x.io"]);
        assert_eq!(sent[0].from, "Ada Lovelace <ada@mail.example.com>");

        let rows = store.scheduled_emails().await;
        let due = rows.iter().find(|r| r.recipient == "due@x.io").unwrap();
        assert!(due.sent);
        assert!(due.provider_email_id.as_deref().unwrap().starts_with("mock_"));
        assert!(rows.iter().any(|r| r.recipient == "later@x.io" && !r.sent));

        let records = store.email_records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].recipient, "due@x.io");

        let usage = store.find_usage(sender_id).await.unwrap().unwrap();
        assert_eq!(usage.resend_requests, 1);
    }

    #[tokio::test]
    async fn test_claims_each_email_once() {
        let store = Arc::new(MemoryStore::new());
        let email = Arc::new(MockEmailProvider::new());
        let sender_id = sender(&store).await;
        schedule(&store, sender_id, "a@x.io", -1, Priority::Normal).await;

        let dispatcher = Dispatcher::new(store.clone(), email.clone(), config(10));
        dispatcher.run_once().await.unwrap();
        let second = dispatcher.run_once().await.unwrap();

        assert_eq!(second, DispatchSummary::default());
        assert_eq!(email.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_high_priority_claimed_first() {
        let store = Arc::new(MemoryStore::new());
        let email = Arc::new(MockEmailProvider::new());
        let sender_id = sender(&store).await;
        schedule(&store, sender_id, "low@x.io", -30, Priority::Low).await;
        schedule(&store, sender_id, "high@x.io", -1, Priority::High).await;

        let dispatcher = Dispatcher::new(store.clone(), email.clone(), config(1));
        dispatcher.run_once().await.unwrap();

        assert_eq!(email.sent().await[0].to, vec!["high@x.io"]);
    }

    #[tokio::test]
    async fn test_provider_failure_is_kept_on_row() {
        let store = Arc::new(MemoryStore::new());
        let email = Arc::new(MockEmailProvider::failing("Invalid recipient"));
        let sender_id = sender(&store).await;
        schedule(&store, sender_id, "a@x.io", -1, Priority::Normal).await;

        let dispatcher = Dispatcher::new(store.clone(), email, config(10));
        let summary = dispatcher.run_once().await.unwrap();

        assert_eq!(summary.failed, 1);
        let row = &store.scheduled_emails().await[0];
        assert!(row.sent);
        assert_eq!(row.error.as_deref(), Some("Invalid recipient"));
        assert!(store.email_records().await.is_empty());

        let usage = store.find_usage(sender_id).await.unwrap().unwrap();
        assert_eq!(usage.resend_requests, 0);
    }

    #[tokio::test]
    async fn test_missing_sender_fails_row() {
        let store = Arc::new(MemoryStore::new());
        let email = Arc::new(MockEmailProvider::new());
        schedule(&store, Uuid::new_v4(), "a@x.io", -1, Priority::Normal).await;

        let dispatcher = Dispatcher::new(store.clone(), email.clone(), config(10));
        dispatcher.run_once().await.unwrap();

        assert!(email.sent().await.is_empty());
        assert_eq!(
            store.scheduled_emails().await[0].error.as_deref(),
            Some("Sender not found")
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let email = Arc::new(MockEmailProvider::new());
        let sender_id = sender(&store).await;
        schedule(&store, sender_id, "a@x.io", -1, Priority::Normal).await;

        let dispatcher = Arc::new(Dispatcher::new(store.clone(), email.clone(), config(10)));
        let shutdown = dispatcher.shutdown_token();
        let handle = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.run().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(email.sent().await.len(), 1);
    }
}
