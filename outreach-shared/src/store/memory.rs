/// In-process store
///
/// Keeps every table in a map behind one async mutex. Besides the [`Store`]
/// operations it offers seeding and inspection helpers, plus failure
/// injection for exercising error paths without a database.
///
/// # Example
///
/// ```
/// use outreach_shared::models::plan::PlanType;
/// use outreach_shared::models::sender::NewSender;
/// use outreach_shared::store::{MemoryStore, Store};
///
/// # async fn example() -> Result<(), outreach_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// let sender = store
///     .create_account(NewSender {
///         first_name: "Ada".to_string(),
///         last_name: "Lovelace".to_string(),
///         email: "ada@example.com".to_string(),
///         password_hash: "hash".to_string(),
///         avatar_url: None,
///         is_anonymous: false,
///         plan_type: PlanType::Free,
///     })
///     .await?;
///
/// assert!(store.find_usage(sender.id).await?.is_some());
/// # Ok(())
/// # }
/// ```

use super::{Store, StoreError};
use crate::models::email_record::{DeliveryUpdate, EmailRecord, EmailStats, NewEmailRecord};
use crate::models::plan::Plan;
use crate::models::scheduled_email::{NewScheduledEmail, ScheduledEmail};
use crate::models::sender::{NewSender, Sender};
use crate::models::template::{Category, NewTemplate, Template};
use crate::models::usage::{Usage, UsageCounter};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    senders: HashMap<Uuid, Sender>,
    plans: HashMap<Uuid, Plan>,
    usage: HashMap<Uuid, Usage>,
    scheduled: Vec<ScheduledEmail>,
    records: Vec<EmailRecord>,
    templates: Vec<Template>,
    categories: Vec<Category>,

    // Every successful create_account payload, in order
    signups: Vec<NewSender>,
    delivery_updates: usize,

    // Failure injection
    failing_recipients: HashSet<String>,
    fail_delivery_updates: bool,
}

/// Process-local [`Store`] implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `insert_scheduled_email` fail for this recipient
    pub async fn fail_scheduled_insert_for(&self, recipient: &str) {
        self.tables
            .lock()
            .await
            .failing_recipients
            .insert(recipient.to_string());
    }

    /// Makes `update_delivery` fail
    pub async fn fail_delivery_updates(&self) {
        self.tables.lock().await.fail_delivery_updates = true;
    }

    /// Replaces a sender's plan
    pub async fn put_plan(&self, plan: Plan) {
        self.tables.lock().await.plans.insert(plan.sender_id, plan);
    }

    /// Replaces a sender's usage row
    pub async fn put_usage(&self, usage: Usage) {
        self.tables.lock().await.usage.insert(usage.sender_id, usage);
    }

    pub async fn remove_usage(&self, sender_id: Uuid) {
        self.tables.lock().await.usage.remove(&sender_id);
    }

    /// Payloads accepted by `create_account`
    pub async fn signups(&self) -> Vec<NewSender> {
        self.tables.lock().await.signups.clone()
    }

    /// All scheduled rows, in insertion order
    pub async fn scheduled_emails(&self) -> Vec<ScheduledEmail> {
        self.tables.lock().await.scheduled.clone()
    }

    /// All history rows, in insertion order
    pub async fn email_records(&self) -> Vec<EmailRecord> {
        self.tables.lock().await.records.clone()
    }

    /// Number of `update_delivery` calls that reached the tables
    pub async fn delivery_update_count(&self) -> usize {
        self.tables.lock().await.delivery_updates
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_account(&self, data: NewSender) -> Result<Sender, StoreError> {
        let mut tables = self.tables.lock().await;

        if tables.senders.values().any(|s| s.email == data.email) {
            return Err(StoreError::Conflict("Email already exists".to_string()));
        }

        let now = Utc::now();
        let sender = Sender {
            id: Uuid::new_v4(),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            email: data.email.clone(),
            password_hash: data.password_hash.clone(),
            avatar_url: data.avatar_url.clone(),
            is_anonymous: data.is_anonymous,
            created_at: now,
            updated_at: now,
        };

        tables
            .plans
            .insert(sender.id, Plan::with_defaults(sender.id, data.plan_type));
        tables.usage.insert(sender.id, Usage::empty(sender.id));
        tables.senders.insert(sender.id, sender.clone());
        tables.signups.push(data);

        Ok(sender)
    }

    async fn find_sender(&self, id: Uuid) -> Result<Option<Sender>, StoreError> {
        Ok(self.tables.lock().await.senders.get(&id).cloned())
    }

    async fn find_sender_by_email(&self, email: &str) -> Result<Option<Sender>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.senders.values().find(|s| s.email == email).cloned())
    }

    async fn find_plan(&self, sender_id: Uuid) -> Result<Option<Plan>, StoreError> {
        Ok(self.tables.lock().await.plans.get(&sender_id).cloned())
    }

    async fn find_usage(&self, sender_id: Uuid) -> Result<Option<Usage>, StoreError> {
        Ok(self.tables.lock().await.usage.get(&sender_id).cloned())
    }

    async fn adjust_usage(
        &self,
        sender_id: Uuid,
        counter: UsageCounter,
        delta: i64,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.usage.get_mut(&sender_id) {
            Some(usage) => {
                usage.apply(counter, delta);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_scheduled_email(
        &self,
        data: NewScheduledEmail,
    ) -> Result<ScheduledEmail, StoreError> {
        let mut tables = self.tables.lock().await;

        if tables.failing_recipients.contains(&data.recipient) {
            return Err(StoreError::Unavailable(format!(
                "insert rejected for {}",
                data.recipient
            )));
        }

        let email = ScheduledEmail::from_new(data);
        tables.scheduled.push(email.clone());
        Ok(email)
    }

    async fn list_pending_scheduled(
        &self,
        sender_id: Uuid,
    ) -> Result<Vec<ScheduledEmail>, StoreError> {
        let tables = self.tables.lock().await;
        let mut pending: Vec<ScheduledEmail> = tables
            .scheduled
            .iter()
            .filter(|e| e.sender_id == sender_id && !e.sent)
            .cloned()
            .collect();
        pending.sort_by_key(|e| e.scheduled_at);
        Ok(pending)
    }

    async fn delete_scheduled(&self, sender_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let before = tables.scheduled.len();
        tables
            .scheduled
            .retain(|e| !(e.id == id && e.sender_id == sender_id));
        Ok(tables.scheduled.len() < before)
    }

    async fn claim_due_scheduled(&self, limit: i64) -> Result<Vec<ScheduledEmail>, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();

        let mut due: Vec<&mut ScheduledEmail> = tables
            .scheduled
            .iter_mut()
            .filter(|e| !e.sent && e.scheduled_at <= now)
            .collect();
        due.sort_by_key(|e| (Reverse(e.get_priority()), e.scheduled_at));

        let claimed = due
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|e| {
                e.sent = true;
                e.sent_at = Some(now);
                e.clone()
            })
            .collect();

        Ok(claimed)
    }

    async fn record_dispatch_outcome(
        &self,
        id: Uuid,
        provider_email_id: Option<&str>,
        error: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.scheduled.iter_mut().find(|e| e.id == id) {
            Some(email) => {
                email.provider_email_id = provider_email_id.map(str::to_string);
                email.error = error.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_email_record(&self, data: NewEmailRecord) -> Result<EmailRecord, StoreError> {
        let mut tables = self.tables.lock().await;

        if tables
            .records
            .iter()
            .any(|r| r.provider_email_id == data.provider_email_id)
        {
            return Err(StoreError::Conflict(
                "Email record already exists".to_string(),
            ));
        }

        let record = EmailRecord::from_new(data);
        tables.records.push(record.clone());
        Ok(record)
    }

    async fn update_delivery(
        &self,
        provider_email_id: &str,
        update: DeliveryUpdate,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;

        if tables.fail_delivery_updates {
            return Err(StoreError::Unavailable(
                "delivery updates rejected".to_string(),
            ));
        }

        tables.delivery_updates += 1;
        let mut changed = 0;
        for record in tables
            .records
            .iter_mut()
            .filter(|r| r.provider_email_id == provider_email_id)
        {
            record.apply(&update);
            changed += 1;
        }
        Ok(changed)
    }

    async fn list_email_records(
        &self,
        sender_id: Uuid,
        limit: i64,
    ) -> Result<Vec<EmailRecord>, StoreError> {
        let tables = self.tables.lock().await;
        let mut records: Vec<EmailRecord> = tables
            .records
            .iter()
            .filter(|r| r.sender_id == sender_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| Reverse(r.created_at));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }

    async fn email_stats(&self, sender_id: Uuid) -> Result<EmailStats, StoreError> {
        let tables = self.tables.lock().await;
        let mut stats = EmailStats::default();
        for record in tables.records.iter().filter(|r| r.sender_id == sender_id) {
            stats.count(&record.status);
        }
        Ok(stats)
    }

    async fn create_template(&self, data: NewTemplate) -> Result<Template, StoreError> {
        let template = Template::from_new(data);
        self.tables.lock().await.templates.push(template.clone());
        Ok(template)
    }

    async fn list_templates(&self, sender_id: Uuid) -> Result<Vec<Template>, StoreError> {
        let tables = self.tables.lock().await;
        let mut templates: Vec<Template> = tables
            .templates
            .iter()
            .filter(|t| t.sender_id == sender_id)
            .cloned()
            .collect();
        templates.sort_by_key(|t| Reverse(t.created_at));
        Ok(templates)
    }

    async fn delete_template(&self, sender_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let before = tables.templates.len();
        tables
            .templates
            .retain(|t| !(t.id == id && t.sender_id == sender_id));
        Ok(tables.templates.len() < before)
    }

    async fn create_category(&self, sender_id: Uuid, name: &str) -> Result<Category, StoreError> {
        let mut tables = self.tables.lock().await;

        if tables
            .categories
            .iter()
            .any(|c| c.sender_id == sender_id && c.name == name)
        {
            return Err(StoreError::Conflict("Category already exists".to_string()));
        }

        let category = Category {
            id: Uuid::new_v4(),
            sender_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn find_category(
        &self,
        sender_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Category>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .categories
            .iter()
            .find(|c| c.id == id && c.sender_id == sender_id)
            .cloned())
    }

    async fn list_categories(&self, sender_id: Uuid) -> Result<Vec<Category>, StoreError> {
        let tables = self.tables.lock().await;
        let mut categories: Vec<Category> = tables
            .categories
            .iter()
            .filter(|c| c.sender_id == sender_id)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::email_record::DeliveryStatus;
    use crate::models::plan::PlanType;
    use crate::models::scheduled_email::Priority;
    use chrono::Duration;

    fn new_sender(email: &str) -> NewSender {
        NewSender {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            avatar_url: None,
            is_anonymous: false,
            plan_type: PlanType::Free,
        }
    }

    fn scheduled(sender_id: Uuid, recipient: &str, offset: Duration, priority: Priority) -> NewScheduledEmail {
        NewScheduledEmail {
            sender_id,
            recipient: recipient.to_string(),
            subject: "Hi".to_string(),
            body: "Hello".to_string(),
            scheduled_at: Utc::now() + offset,
            priority,
        }
    }

    #[tokio::test]
    async fn test_create_account_seeds_plan_and_usage() {
        let store = MemoryStore::new();
        let sender = store.create_account(new_sender("a@example.com")).await.unwrap();

        let plan = store.find_plan(sender.id).await.unwrap().unwrap();
        assert_eq!(plan.get_plan_type(), Some(PlanType::Free));

        let usage = store.find_usage(sender.id).await.unwrap().unwrap();
        assert_eq!(usage.resend_requests, 0);
        assert_eq!(store.signups().await.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_account(new_sender("a@example.com")).await.unwrap();

        let err = store.create_account(new_sender("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.signups().await.len(), 1);
    }

    #[tokio::test]
    async fn test_claim_due_orders_by_priority_then_time() {
        let store = MemoryStore::new();
        let sender_id = Uuid::new_v4();

        store
            .insert_scheduled_email(scheduled(sender_id, "low@x.io", Duration::minutes(-10), Priority::Low))
            .await
            .unwrap();
        store
            .insert_scheduled_email(scheduled(sender_id, "high@x.io", Duration::minutes(-1), Priority::High))
            .await
            .unwrap();
        store
            .insert_scheduled_email(scheduled(sender_id, "later@x.io", Duration::hours(1), Priority::High))
            .await
            .unwrap();

        let claimed = store.claim_due_scheduled(10).await.unwrap();
        let recipients: Vec<&str> = claimed.iter().map(|e| e.recipient.as_str()).collect();
        assert_eq!(recipients, vec!["high@x.io", "low@x.io"]);

        // Claimed rows are never handed out twice
        assert!(store.claim_due_scheduled(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_recipient_injection() {
        let store = MemoryStore::new();
        store.fail_scheduled_insert_for("bad@x.io").await;

        let result = store
            .insert_scheduled_email(scheduled(Uuid::new_v4(), "bad@x.io", Duration::hours(1), Priority::Normal))
            .await;
        assert!(result.is_err());
        assert!(store.scheduled_emails().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_delivery_counts_matches() {
        let store = MemoryStore::new();
        let sender_id = Uuid::new_v4();
        store
            .insert_email_record(NewEmailRecord {
                sender_id,
                provider_email_id: "re_1".to_string(),
                recipient: "a@x.io".to_string(),
                subject: "Hi".to_string(),
                template_id: None,
            })
            .await
            .unwrap();

        let update = DeliveryUpdate {
            status: DeliveryStatus::Opened,
            occurred_at: Utc::now(),
        };
        assert_eq!(store.update_delivery("re_1", update).await.unwrap(), 1);
        assert_eq!(store.update_delivery("re_missing", update).await.unwrap(), 0);

        let stats = store.email_stats(sender_id).await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.opened, 1);
    }

    #[tokio::test]
    async fn test_adjust_usage_without_row() {
        let store = MemoryStore::new();
        let changed = store
            .adjust_usage(Uuid::new_v4(), UsageCounter::AiRequests, 1)
            .await
            .unwrap();
        assert!(!changed);
    }

    #[tokio::test]
    async fn test_category_names_unique_per_sender() {
        let store = MemoryStore::new();
        let sender_id = Uuid::new_v4();
        store.create_category(sender_id, "Sales").await.unwrap();

        let err = store.create_category(sender_id, "Sales").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let other = store.create_category(Uuid::new_v4(), "Sales").await.unwrap();
        assert!(store.find_category(sender_id, other.id).await.unwrap().is_none());
        assert!(store
            .find_category(other.sender_id, other.id)
            .await
            .unwrap()
            .is_some());
    }
}
