/// Quota gate: checks a sender's usage against plan ceilings
///
/// The gate is advisory and side-effect free. Callers check before acting
/// and record usage afterwards; the two steps are not atomic, so concurrent
/// requests may overshoot a ceiling slightly.
///
/// # Actions
///
/// | action     | counter           | denied when                  |
/// |------------|-------------------|------------------------------|
/// | `ai`       | `ai_requests`     | `current >= max`             |
/// | `resend`   | `resend_requests` | `current >= max`             |
/// | `contact`  | `contacts`        | `current >= max`             |
/// | `template` | `templates`       | `current >= max`             |
/// | `storage`  | `storage_bytes`   | `current + value > max`      |
///
/// # Example
///
/// ```no_run
/// use outreach_shared::quota::QuotaGate;
/// use outreach_shared::store::{MemoryStore, Store};
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// # async fn example(sender_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// let gate = QuotaGate::new(store);
///
/// let decision = gate.check(sender_id, "resend", None).await?;
/// if !decision.can_proceed {
///     println!("Denied: {:?}", decision.message);
/// }
/// # Ok(())
/// # }
/// ```

use crate::models::plan::Plan;
use crate::models::usage::{Usage, UsageCounter};
use crate::store::{Store, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub const INVALID_ACTION: &str = "Invalid action type";
pub const RECORD_NOT_FOUND: &str = "Plan or usage record not found";
pub const PLAN_EXPIRED: &str = "Your plan has expired";
pub const INVALID_VALUE: &str = "Invalid value";

/// Quota gate error
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    #[error("Quota lookup failed: {0}")]
    Store(#[from] StoreError),
}

/// Metered action kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Ai,
    Resend,
    Contact,
    Template,
    Storage,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Ai => "ai",
            ActionKind::Resend => "resend",
            ActionKind::Contact => "contact",
            ActionKind::Template => "template",
            ActionKind::Storage => "storage",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ai" => Some(ActionKind::Ai),
            "resend" => Some(ActionKind::Resend),
            "contact" => Some(ActionKind::Contact),
            "template" => Some(ActionKind::Template),
            "storage" => Some(ActionKind::Storage),
            _ => None,
        }
    }

    /// Usage counter this action is metered on
    pub fn counter(&self) -> UsageCounter {
        match self {
            ActionKind::Ai => UsageCounter::AiRequests,
            ActionKind::Resend => UsageCounter::ResendRequests,
            ActionKind::Contact => UsageCounter::Contacts,
            ActionKind::Template => UsageCounter::Templates,
            ActionKind::Storage => UsageCounter::StorageBytes,
        }
    }

    /// Plan ceiling for this action
    pub fn limit(&self, plan: &Plan) -> i64 {
        match self {
            ActionKind::Ai => plan.max_ai_requests as i64,
            ActionKind::Resend => plan.max_resend_requests as i64,
            ActionKind::Contact => plan.max_contacts as i64,
            ActionKind::Template => plan.max_templates as i64,
            ActionKind::Storage => plan.max_storage_bytes,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ActionKind::Ai => "AI request",
            ActionKind::Resend => "Email sending",
            ActionKind::Contact => "Contact",
            ActionKind::Template => "Template",
            ActionKind::Storage => "Storage",
        }
    }
}

/// Outcome of a quota check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaDecision {
    pub can_proceed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl QuotaDecision {
    pub fn allow() -> Self {
        QuotaDecision {
            can_proceed: true,
            message: None,
        }
    }

    pub fn deny(message: impl Into<String>) -> Self {
        QuotaDecision {
            can_proceed: false,
            message: Some(message.into()),
        }
    }
}

/// Decides an action against a plan and usage snapshot
///
/// `value` is only consulted for storage, where it is the number of bytes
/// about to be added. Negative values are denied.
pub fn evaluate(
    kind: ActionKind,
    plan: &Plan,
    usage: &Usage,
    value: i64,
    now: DateTime<Utc>,
) -> QuotaDecision {
    if plan.is_expired_at(now) {
        return QuotaDecision::deny(PLAN_EXPIRED);
    }

    if kind == ActionKind::Storage && value < 0 {
        return QuotaDecision::deny(INVALID_VALUE);
    }

    let limit = kind.limit(plan);
    let current = usage.get(kind.counter());

    let exceeded = match kind {
        ActionKind::Storage => current.checked_add(value).map_or(true, |total| total > limit),
        _ => current >= limit,
    };

    if exceeded {
        QuotaDecision::deny(format!("{} limit reached ({}/{})", kind.label(), current, limit))
    } else {
        QuotaDecision::allow()
    }
}

/// Store-backed quota gate
#[derive(Clone)]
pub struct QuotaGate {
    store: Arc<dyn Store>,
}

impl QuotaGate {
    pub fn new(store: Arc<dyn Store>) -> Self {
        QuotaGate { store }
    }

    /// Checks whether `sender_id` may perform `action`
    ///
    /// Unknown actions and missing records are reported as denials, not
    /// errors. Only store failures return `Err`.
    pub async fn check(
        &self,
        sender_id: Uuid,
        action: &str,
        value: Option<i64>,
    ) -> Result<QuotaDecision, QuotaError> {
        let Some(kind) = ActionKind::from_str(action) else {
            return Ok(QuotaDecision::deny(INVALID_ACTION));
        };
        self.check_kind(sender_id, kind, value).await
    }

    pub async fn check_kind(
        &self,
        sender_id: Uuid,
        kind: ActionKind,
        value: Option<i64>,
    ) -> Result<QuotaDecision, QuotaError> {
        let plan = self.store.find_plan(sender_id).await?;
        let usage = self.store.find_usage(sender_id).await?;

        let (Some(plan), Some(usage)) = (plan, usage) else {
            tracing::debug!(sender_id = %sender_id, "Quota check without plan or usage");
            return Ok(QuotaDecision::deny(RECORD_NOT_FOUND));
        };

        let decision = evaluate(kind, &plan, &usage, value.unwrap_or(0), Utc::now());
        if !decision.can_proceed {
            tracing::info!(
                sender_id = %sender_id,
                action = kind.as_str(),
                "Quota denied"
            );
        }
        Ok(decision)
    }
}
