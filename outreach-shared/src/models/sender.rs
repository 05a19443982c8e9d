/// Sender model and database operations
///
/// A sender is the authenticated account that sends outreach emails. Each
/// sender owns exactly one plan row and one usage row, created together with
/// the sender in [`Sender::create_account`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE senders (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     first_name VARCHAR(100) NOT NULL,
///     last_name VARCHAR(100) NOT NULL,
///     email VARCHAR(320) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     avatar_url VARCHAR(512),
///     is_anonymous BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use outreach_shared::models::sender::{NewSender, Sender};
/// use outreach_shared::models::plan::PlanType;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let sender = Sender::create_account(&pool, NewSender {
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     avatar_url: None,
///     is_anonymous: false,
///     plan_type: PlanType::Free,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use crate::models::plan::{PlanLimits, PlanType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Sender account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
    /// Unique sender ID
    pub id: Uuid,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Login and reply-to address, stored lowercase
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Optional avatar URL
    pub avatar_url: Option<String>,

    /// Whether the sender hides their name from recipients
    pub is_anonymous: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a sender together with its plan and usage rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSender {
    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Email address (already normalized by the caller)
    pub email: String,

    /// Argon2id hash (NOT the plaintext password)
    pub password_hash: String,

    /// Optional avatar URL
    pub avatar_url: Option<String>,

    /// Anonymity flag
    pub is_anonymous: bool,

    /// Initial plan tier
    pub plan_type: PlanType,
}

impl Sender {
    /// Display name used in outgoing `From` headers
    pub fn display_name(&self) -> String {
        if self.is_anonymous {
            return self.first_name.clone();
        }
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Creates a sender, its plan and a zeroed usage row in one transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists (unique violation on
    /// `senders_email_key`) or the database is unreachable.
    pub async fn create_account(pool: &PgPool, data: NewSender) -> Result<Self, sqlx::Error> {
        let limits = PlanLimits::for_plan(data.plan_type);
        let mut tx = pool.begin().await?;

        let sender = sqlx::query_as::<_, Sender>(
            r#"
            INSERT INTO senders (first_name, last_name, email, password_hash, avatar_url, is_anonymous)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, first_name, last_name, email, password_hash, avatar_url,
                      is_anonymous, created_at, updated_at
            "#,
        )
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(&data.avatar_url)
        .bind(data.is_anonymous)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO plans (sender_id, plan_type, max_ai_requests, max_resend_requests,
                               max_contacts, max_templates, max_storage_bytes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(sender.id)
        .bind(data.plan_type.as_str())
        .bind(limits.max_ai_requests)
        .bind(limits.max_resend_requests)
        .bind(limits.max_contacts)
        .bind(limits.max_templates)
        .bind(limits.max_storage_bytes)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO usage (sender_id) VALUES ($1)")
            .bind(sender.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(sender)
    }

    /// Finds a sender by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sender = sqlx::query_as::<_, Sender>(
            r#"
            SELECT id, first_name, last_name, email, password_hash, avatar_url,
                   is_anonymous, created_at, updated_at
            FROM senders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(sender)
    }

    /// Finds a sender by (lowercase) email address
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let sender = sqlx::query_as::<_, Sender>(
            r#"
            SELECT id, first_name, last_name, email, password_hash, avatar_url,
                   is_anonymous, created_at, updated_at
            FROM senders
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(sender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(is_anonymous: bool) -> Sender {
        Sender {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "hash".to_string(),
            avatar_url: None,
            is_anonymous,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(sender(false).display_name(), "Ada Lovelace");
        assert_eq!(sender(true).display_name(), "Ada");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(sender(false)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["isAnonymous"], false);
    }
}
