/// Email history records
///
/// One row per message handed to the delivery provider, keyed by the
/// provider's email id. Delivery webhooks overwrite `status` and stamp the
/// matching timestamp column; there is no ordering between events, the last
/// write wins.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE email_records (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     sender_id UUID NOT NULL REFERENCES senders(id) ON DELETE CASCADE,
///     provider_email_id VARCHAR(255) NOT NULL UNIQUE,
///     recipient TEXT NOT NULL,
///     subject TEXT NOT NULL,
///     template_id UUID,
///     status VARCHAR(32) NOT NULL DEFAULT 'sent',
///     sent_at TIMESTAMPTZ,
///     delivered_at TIMESTAMPTZ,
///     opened_at TIMESTAMPTZ,
///     clicked_at TIMESTAMPTZ,
///     bounced_at TIMESTAMPTZ,
///     complained_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Delivery status of a sent email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    DeliveryDelayed,
    Opened,
    Clicked,
    Bounced,
    Complained,
}

impl DeliveryStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::DeliveryDelayed => "delivery_delayed",
            DeliveryStatus::Opened => "opened",
            DeliveryStatus::Clicked => "clicked",
            DeliveryStatus::Bounced => "bounced",
            DeliveryStatus::Complained => "complained",
        }
    }

    /// Parses status from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(DeliveryStatus::Sent),
            "delivered" => Some(DeliveryStatus::Delivered),
            "delivery_delayed" => Some(DeliveryStatus::DeliveryDelayed),
            "opened" => Some(DeliveryStatus::Opened),
            "clicked" => Some(DeliveryStatus::Clicked),
            "bounced" => Some(DeliveryStatus::Bounced),
            "complained" => Some(DeliveryStatus::Complained),
            _ => None,
        }
    }

    /// Timestamp column stamped when this status is reported
    pub fn timestamp_column(&self) -> Option<&'static str> {
        match self {
            DeliveryStatus::Sent => Some("sent_at"),
            DeliveryStatus::Delivered => Some("delivered_at"),
            DeliveryStatus::DeliveryDelayed => None,
            DeliveryStatus::Opened => Some("opened_at"),
            DeliveryStatus::Clicked => Some("clicked_at"),
            DeliveryStatus::Bounced => Some("bounced_at"),
            DeliveryStatus::Complained => Some("complained_at"),
        }
    }
}

/// History row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub provider_email_id: String,
    pub recipient: String,
    pub subject: String,
    pub template_id: Option<Uuid>,
    pub status: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub bounced_at: Option<DateTime<Utc>>,
    pub complained_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a sent email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmailRecord {
    pub sender_id: Uuid,
    pub provider_email_id: String,
    pub recipient: String,
    pub subject: String,
    pub template_id: Option<Uuid>,
}

/// Status change reported by the delivery provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryUpdate {
    pub status: DeliveryStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregated delivery counts for the analytics dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmailStats {
    pub total: i64,
    pub sent: i64,
    pub delivered: i64,
    pub delivery_delayed: i64,
    pub opened: i64,
    pub clicked: i64,
    pub bounced: i64,
    pub complained: i64,
}

impl EmailStats {
    /// Counts one record's status
    pub fn count(&mut self, status: &str) {
        self.total += 1;
        match DeliveryStatus::from_str(status) {
            Some(DeliveryStatus::Sent) => self.sent += 1,
            Some(DeliveryStatus::Delivered) => self.delivered += 1,
            Some(DeliveryStatus::DeliveryDelayed) => self.delivery_delayed += 1,
            Some(DeliveryStatus::Opened) => self.opened += 1,
            Some(DeliveryStatus::Clicked) => self.clicked += 1,
            Some(DeliveryStatus::Bounced) => self.bounced += 1,
            Some(DeliveryStatus::Complained) => self.complained += 1,
            None => {}
        }
    }
}

const COLUMNS: &str = "id, sender_id, provider_email_id, recipient, subject, template_id, status, \
                       sent_at, delivered_at, opened_at, clicked_at, bounced_at, complained_at, \
                       created_at, updated_at";

impl EmailRecord {
    /// Builds a freshly sent record from insert data
    pub fn from_new(data: NewEmailRecord) -> Self {
        let now = Utc::now();
        EmailRecord {
            id: Uuid::new_v4(),
            sender_id: data.sender_id,
            provider_email_id: data.provider_email_id,
            recipient: data.recipient,
            subject: data.subject,
            template_id: data.template_id,
            status: DeliveryStatus::Sent.as_str().to_string(),
            sent_at: Some(now),
            delivered_at: None,
            opened_at: None,
            clicked_at: None,
            bounced_at: None,
            complained_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a delivery update in memory
    pub fn apply(&mut self, update: &DeliveryUpdate) {
        self.status = update.status.as_str().to_string();
        let at = Some(update.occurred_at);
        match update.status {
            DeliveryStatus::Sent => self.sent_at = at,
            DeliveryStatus::Delivered => self.delivered_at = at,
            DeliveryStatus::DeliveryDelayed => {}
            DeliveryStatus::Opened => self.opened_at = at,
            DeliveryStatus::Clicked => self.clicked_at = at,
            DeliveryStatus::Bounced => self.bounced_at = at,
            DeliveryStatus::Complained => self.complained_at = at,
        }
        self.updated_at = Utc::now();
    }

    /// Inserts a history row with status `sent`
    pub async fn create(pool: &PgPool, data: NewEmailRecord) -> Result<Self, sqlx::Error> {
        let record = sqlx::query_as::<_, EmailRecord>(&format!(
            r#"
            INSERT INTO email_records (sender_id, provider_email_id, recipient, subject, template_id, status, sent_at)
            VALUES ($1, $2, $3, $4, $5, 'sent', NOW())
            RETURNING {COLUMNS}
            "#
        ))
        .bind(data.sender_id)
        .bind(data.provider_email_id)
        .bind(data.recipient)
        .bind(data.subject)
        .bind(data.template_id)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    /// Overwrites status (and its timestamp) of the row with this provider id
    ///
    /// Returns the number of rows updated.
    pub async fn update_delivery(
        pool: &PgPool,
        provider_email_id: &str,
        update: DeliveryUpdate,
    ) -> Result<u64, sqlx::Error> {
        // Column names come from a closed enum, never from input.
        let query = match update.status.timestamp_column() {
            Some(column) => format!(
                "UPDATE email_records SET status = $2, {column} = $3, updated_at = NOW() \
                 WHERE provider_email_id = $1"
            ),
            None => "UPDATE email_records SET status = $2, updated_at = NOW() \
                     WHERE provider_email_id = $1"
                .to_string(),
        };

        let mut q = sqlx::query(&query)
            .bind(provider_email_id)
            .bind(update.status.as_str());
        if update.status.timestamp_column().is_some() {
            q = q.bind(update.occurred_at);
        }

        let result = q.execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Lists a sender's most recent records
    pub async fn list_by_sender(
        pool: &PgPool,
        sender_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let records = sqlx::query_as::<_, EmailRecord>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM email_records
            WHERE sender_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(sender_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    /// Aggregates status counts for a sender
    pub async fn stats_by_sender(pool: &PgPool, sender_id: Uuid) -> Result<EmailStats, sqlx::Error> {
        let stats = sqlx::query_as::<_, EmailStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'sent') AS sent,
                COUNT(*) FILTER (WHERE status = 'delivered') AS delivered,
                COUNT(*) FILTER (WHERE status = 'delivery_delayed') AS delivery_delayed,
                COUNT(*) FILTER (WHERE status = 'opened') AS opened,
                COUNT(*) FILTER (WHERE status = 'clicked') AS clicked,
                COUNT(*) FILTER (WHERE status = 'bounced') AS bounced,
                COUNT(*) FILTER (WHERE status = 'complained') AS complained
            FROM email_records
            WHERE sender_id = $1
            "#,
        )
        .bind(sender_id)
        .fetch_one(pool)
        .await?;

        Ok(stats)
    }
}
