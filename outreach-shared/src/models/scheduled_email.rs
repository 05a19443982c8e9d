/// Scheduled email model and database operations
///
/// One row per recipient per scheduling request. Rows are claimed by the
/// dispatcher once `scheduled_at` has passed.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE scheduled_emails (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     sender_id UUID NOT NULL REFERENCES senders(id) ON DELETE CASCADE,
///     recipient VARCHAR(320) NOT NULL,
///     subject TEXT NOT NULL,
///     body TEXT NOT NULL,
///     scheduled_at TIMESTAMPTZ NOT NULL,
///     priority VARCHAR(16) NOT NULL DEFAULT 'normal',
///     sent BOOLEAN NOT NULL DEFAULT FALSE,
///     sent_at TIMESTAMPTZ,
///     provider_email_id VARCHAR(255),
///     error TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Send priority of a scheduled email
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    /// Converts priority to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }

    /// Parses priority from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "normal" => Some(Priority::Normal),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Scheduled email row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEmail {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub scheduled_at: DateTime<Utc>,
    pub priority: String,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub provider_email_id: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a scheduled email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewScheduledEmail {
    pub sender_id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub scheduled_at: DateTime<Utc>,
    pub priority: Priority,
}

const COLUMNS: &str = "id, sender_id, recipient, subject, body, scheduled_at, priority, sent, \
                       sent_at, provider_email_id, error, created_at";

impl ScheduledEmail {
    /// Gets the parsed priority, falling back to normal
    pub fn get_priority(&self) -> Priority {
        Priority::from_str(&self.priority).unwrap_or_default()
    }

    /// Builds an unsent row from insert data
    pub fn from_new(data: NewScheduledEmail) -> Self {
        ScheduledEmail {
            id: Uuid::new_v4(),
            sender_id: data.sender_id,
            recipient: data.recipient,
            subject: data.subject,
            body: data.body,
            scheduled_at: data.scheduled_at,
            priority: data.priority.as_str().to_string(),
            sent: false,
            sent_at: None,
            provider_email_id: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Inserts a single scheduled email
    pub async fn create(pool: &PgPool, data: NewScheduledEmail) -> Result<Self, sqlx::Error> {
        let email = sqlx::query_as::<_, ScheduledEmail>(&format!(
            r#"
            INSERT INTO scheduled_emails (sender_id, recipient, subject, body, scheduled_at, priority)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(data.sender_id)
        .bind(data.recipient)
        .bind(data.subject)
        .bind(data.body)
        .bind(data.scheduled_at)
        .bind(data.priority.as_str())
        .fetch_one(pool)
        .await?;

        Ok(email)
    }

    /// Lists a sender's unsent emails, soonest first
    pub async fn list_pending_by_sender(
        pool: &PgPool,
        sender_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let emails = sqlx::query_as::<_, ScheduledEmail>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM scheduled_emails
            WHERE sender_id = $1 AND sent = FALSE
            ORDER BY scheduled_at ASC
            "#
        ))
        .bind(sender_id)
        .fetch_all(pool)
        .await?;

        Ok(emails)
    }

    /// Deletes a scheduled email owned by the sender
    pub async fn delete_by_sender(pool: &PgPool, sender_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM scheduled_emails WHERE id = $1 AND sender_id = $2")
            .bind(id)
            .bind(sender_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Claims due emails for sending
    ///
    /// Flips `sent` in the same statement that selects the rows, so a row is
    /// handed out at most once even with several dispatchers running.
    pub async fn claim_due(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let emails = sqlx::query_as::<_, ScheduledEmail>(
            r#"
            WITH due AS (
                SELECT id
                FROM scheduled_emails
                WHERE sent = FALSE AND scheduled_at <= NOW()
                ORDER BY CASE priority WHEN 'high' THEN 0 WHEN 'normal' THEN 1 ELSE 2 END,
                         scheduled_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE scheduled_emails
            SET sent = TRUE, sent_at = NOW()
            FROM due
            WHERE scheduled_emails.id = due.id
            RETURNING scheduled_emails.id, scheduled_emails.sender_id, scheduled_emails.recipient,
                      scheduled_emails.subject, scheduled_emails.body, scheduled_emails.scheduled_at,
                      scheduled_emails.priority, scheduled_emails.sent, scheduled_emails.sent_at,
                      scheduled_emails.provider_email_id, scheduled_emails.error,
                      scheduled_emails.created_at
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(emails)
    }

    /// Stores the outcome of a dispatch attempt
    pub async fn record_outcome(
        pool: &PgPool,
        id: Uuid,
        provider_email_id: Option<&str>,
        error: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE scheduled_emails SET provider_email_id = $2, error = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(provider_email_id)
        .bind(error)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
