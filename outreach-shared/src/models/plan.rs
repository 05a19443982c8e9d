/// Plan model: the subscription tier defining a sender's resource ceilings
///
/// # Schema
///
/// ```sql
/// CREATE TABLE plans (
///     sender_id UUID PRIMARY KEY REFERENCES senders(id) ON DELETE CASCADE,
///     plan_type VARCHAR(16) NOT NULL DEFAULT 'free',
///     max_ai_requests INTEGER NOT NULL,
///     max_resend_requests INTEGER NOT NULL,
///     max_contacts INTEGER NOT NULL,
///     max_templates INTEGER NOT NULL,
///     max_storage_bytes BIGINT NOT NULL,
///     valid_from TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     valid_until TIMESTAMPTZ
/// );
/// ```
///
/// # Default ceilings
///
/// | plan | ai   | resend | contacts | templates | storage |
/// |------|------|--------|----------|-----------|---------|
/// | free | 50   | 100    | 100      | 10        | 50 MiB  |
/// | paid | 1000 | 5000   | 5000     | 200       | 1 GiB   |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const MIB: i64 = 1024 * 1024;

/// Subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// Free tier
    Free,

    /// Paid tier
    Paid,
}

impl PlanType {
    /// Converts plan type to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Free => "free",
            PlanType::Paid => "paid",
        }
    }

    /// Parses plan type from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(PlanType::Free),
            "paid" => Some(PlanType::Paid),
            _ => None,
        }
    }
}

/// Per-resource maximums of a plan tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub max_ai_requests: i32,
    pub max_resend_requests: i32,
    pub max_contacts: i32,
    pub max_templates: i32,
    pub max_storage_bytes: i64,
}

impl PlanLimits {
    /// Default ceilings for a plan tier
    pub fn for_plan(plan: PlanType) -> Self {
        match plan {
            PlanType::Free => PlanLimits {
                max_ai_requests: 50,
                max_resend_requests: 100,
                max_contacts: 100,
                max_templates: 10,
                max_storage_bytes: 50 * MIB,
            },
            PlanType::Paid => PlanLimits {
                max_ai_requests: 1_000,
                max_resend_requests: 5_000,
                max_contacts: 5_000,
                max_templates: 200,
                max_storage_bytes: 1024 * MIB,
            },
        }
    }
}

/// A sender's plan row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Owning sender
    pub sender_id: Uuid,

    /// Plan tier ("free" or "paid")
    pub plan_type: String,

    /// Maximum AI generation requests
    pub max_ai_requests: i32,

    /// Maximum delivery-provider send requests
    pub max_resend_requests: i32,

    /// Maximum stored contacts
    pub max_contacts: i32,

    /// Maximum templates
    pub max_templates: i32,

    /// Maximum stored bytes
    pub max_storage_bytes: i64,

    /// Start of the validity window
    pub valid_from: DateTime<Utc>,

    /// End of the validity window (None = open ended)
    pub valid_until: Option<DateTime<Utc>>,
}

impl Plan {
    /// Builds an in-memory plan with the tier's default ceilings
    pub fn with_defaults(sender_id: Uuid, plan_type: PlanType) -> Self {
        let limits = PlanLimits::for_plan(plan_type);
        Plan {
            sender_id,
            plan_type: plan_type.as_str().to_string(),
            max_ai_requests: limits.max_ai_requests,
            max_resend_requests: limits.max_resend_requests,
            max_contacts: limits.max_contacts,
            max_templates: limits.max_templates,
            max_storage_bytes: limits.max_storage_bytes,
            valid_from: Utc::now(),
            valid_until: None,
        }
    }

    /// Gets the parsed plan tier
    pub fn get_plan_type(&self) -> Option<PlanType> {
        PlanType::from_str(&self.plan_type)
    }

    /// Whether the validity window has ended at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.map(|until| until < now).unwrap_or(false)
    }

    /// Finds the plan of a sender
    pub async fn find_by_sender(pool: &PgPool, sender_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let plan = sqlx::query_as::<_, Plan>(
            r#"
            SELECT sender_id, plan_type, max_ai_requests, max_resend_requests, max_contacts,
                   max_templates, max_storage_bytes, valid_from, valid_until
            FROM plans
            WHERE sender_id = $1
            "#,
        )
        .bind(sender_id)
        .fetch_optional(pool)
        .await?;

        Ok(plan)
    }
}
