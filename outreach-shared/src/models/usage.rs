/// Usage model: live counters tracked against a sender's plan ceilings
///
/// Counters mirror the plan maximums. They only grow, except the template
/// counter which shrinks when a template is deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE usage (
///     sender_id UUID PRIMARY KEY REFERENCES senders(id) ON DELETE CASCADE,
///     ai_requests INTEGER NOT NULL DEFAULT 0,
///     resend_requests INTEGER NOT NULL DEFAULT 0,
///     contacts INTEGER NOT NULL DEFAULT 0,
///     templates INTEGER NOT NULL DEFAULT 0,
///     storage_bytes BIGINT NOT NULL DEFAULT 0,
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use outreach_shared::models::usage::{Usage, UsageCounter};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, sender_id: Uuid) -> Result<(), sqlx::Error> {
/// Usage::adjust(&pool, sender_id, UsageCounter::AiRequests, 1).await?;
///
/// if let Some(usage) = Usage::find_by_sender(&pool, sender_id).await? {
///     println!("AI requests used: {}", usage.ai_requests);
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Usage counters of one sender
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    /// Owning sender
    pub sender_id: Uuid,

    /// AI generation requests made
    pub ai_requests: i32,

    /// Delivery-provider send requests made
    pub resend_requests: i32,

    /// Contacts stored
    pub contacts: i32,

    /// Templates currently owned
    pub templates: i32,

    /// Bytes stored
    pub storage_bytes: i64,

    /// Last counter change
    pub updated_at: DateTime<Utc>,
}

/// Identifies a single usage counter column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageCounter {
    AiRequests,
    ResendRequests,
    Contacts,
    Templates,
    StorageBytes,
}

impl UsageCounter {
    /// Column name in the `usage` table
    pub fn column(&self) -> &'static str {
        match self {
            UsageCounter::AiRequests => "ai_requests",
            UsageCounter::ResendRequests => "resend_requests",
            UsageCounter::Contacts => "contacts",
            UsageCounter::Templates => "templates",
            UsageCounter::StorageBytes => "storage_bytes",
        }
    }
}

impl Usage {
    /// Zeroed counters for a sender
    pub fn empty(sender_id: Uuid) -> Self {
        Usage {
            sender_id,
            ai_requests: 0,
            resend_requests: 0,
            contacts: 0,
            templates: 0,
            storage_bytes: 0,
            updated_at: Utc::now(),
        }
    }

    /// Reads a counter as i64
    pub fn get(&self, counter: UsageCounter) -> i64 {
        match counter {
            UsageCounter::AiRequests => self.ai_requests as i64,
            UsageCounter::ResendRequests => self.resend_requests as i64,
            UsageCounter::Contacts => self.contacts as i64,
            UsageCounter::Templates => self.templates as i64,
            UsageCounter::StorageBytes => self.storage_bytes,
        }
    }

    /// Applies a delta in memory, flooring at zero
    pub fn apply(&mut self, counter: UsageCounter, delta: i64) {
        let next = (self.get(counter) + delta).max(0);
        match counter {
            UsageCounter::AiRequests => self.ai_requests = next as i32,
            UsageCounter::ResendRequests => self.resend_requests = next as i32,
            UsageCounter::Contacts => self.contacts = next as i32,
            UsageCounter::Templates => self.templates = next as i32,
            UsageCounter::StorageBytes => self.storage_bytes = next,
        }
        self.updated_at = Utc::now();
    }

    /// Finds the usage row of a sender
    pub async fn find_by_sender(pool: &PgPool, sender_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let usage = sqlx::query_as::<_, Usage>(
            r#"
            SELECT sender_id, ai_requests, resend_requests, contacts, templates,
                   storage_bytes, updated_at
            FROM usage
            WHERE sender_id = $1
            "#,
        )
        .bind(sender_id)
        .fetch_optional(pool)
        .await?;

        Ok(usage)
    }

    /// Adjusts one counter by `delta` in a single statement
    ///
    /// The result is floored at zero. Returns false when the sender has no
    /// usage row.
    pub async fn adjust(
        pool: &PgPool,
        sender_id: Uuid,
        counter: UsageCounter,
        delta: i64,
    ) -> Result<bool, sqlx::Error> {
        // Column names come from a closed enum, never from input.
        let query = format!(
            "UPDATE usage SET {col} = GREATEST({col} + $2, 0), updated_at = NOW() WHERE sender_id = $1",
            col = counter.column()
        );

        let result = match counter {
            UsageCounter::StorageBytes => {
                sqlx::query(&query).bind(sender_id).bind(delta).execute(pool).await?
            }
            _ => {
                sqlx::query(&query)
                    .bind(sender_id)
                    .bind(delta as i32)
                    .execute(pool)
                    .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }
}
