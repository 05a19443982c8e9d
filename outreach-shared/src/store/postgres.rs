use super::{Store, StoreError};
use crate::db::pool::health_check;
use crate::models::email_record::{DeliveryUpdate, EmailRecord, EmailStats, NewEmailRecord};
use crate::models::plan::Plan;
use crate::models::scheduled_email::{NewScheduledEmail, ScheduledEmail};
use crate::models::sender::{NewSender, Sender};
use crate::models::template::{Category, NewTemplate, Template};
use crate::models::usage::{Usage, UsageCounter};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps unique violations to [`StoreError::Conflict`]
fn conflict_or(e: sqlx::Error, what: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("{} already exists", what))
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_account(&self, data: NewSender) -> Result<Sender, StoreError> {
        Sender::create_account(&self.pool, data)
            .await
            .map_err(|e| conflict_or(e, "Email"))
    }

    async fn find_sender(&self, id: Uuid) -> Result<Option<Sender>, StoreError> {
        Ok(Sender::find_by_id(&self.pool, id).await?)
    }

    async fn find_sender_by_email(&self, email: &str) -> Result<Option<Sender>, StoreError> {
        Ok(Sender::find_by_email(&self.pool, email).await?)
    }

    async fn find_plan(&self, sender_id: Uuid) -> Result<Option<Plan>, StoreError> {
        Ok(Plan::find_by_sender(&self.pool, sender_id).await?)
    }

    async fn find_usage(&self, sender_id: Uuid) -> Result<Option<Usage>, StoreError> {
        Ok(Usage::find_by_sender(&self.pool, sender_id).await?)
    }

    async fn adjust_usage(
        &self,
        sender_id: Uuid,
        counter: UsageCounter,
        delta: i64,
    ) -> Result<bool, StoreError> {
        Ok(Usage::adjust(&self.pool, sender_id, counter, delta).await?)
    }

    async fn insert_scheduled_email(
        &self,
        data: NewScheduledEmail,
    ) -> Result<ScheduledEmail, StoreError> {
        Ok(ScheduledEmail::create(&self.pool, data).await?)
    }

    async fn list_pending_scheduled(
        &self,
        sender_id: Uuid,
    ) -> Result<Vec<ScheduledEmail>, StoreError> {
        Ok(ScheduledEmail::list_pending_by_sender(&self.pool, sender_id).await?)
    }

    async fn delete_scheduled(&self, sender_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        Ok(ScheduledEmail::delete_by_sender(&self.pool, sender_id, id).await?)
    }

    async fn claim_due_scheduled(&self, limit: i64) -> Result<Vec<ScheduledEmail>, StoreError> {
        Ok(ScheduledEmail::claim_due(&self.pool, limit).await?)
    }

    async fn record_dispatch_outcome(
        &self,
        id: Uuid,
        provider_email_id: Option<&str>,
        error: Option<&str>,
    ) -> Result<bool, StoreError> {
        Ok(ScheduledEmail::record_outcome(&self.pool, id, provider_email_id, error).await?)
    }

    async fn insert_email_record(&self, data: NewEmailRecord) -> Result<EmailRecord, StoreError> {
        EmailRecord::create(&self.pool, data)
            .await
            .map_err(|e| conflict_or(e, "Email record"))
    }

    async fn update_delivery(
        &self,
        provider_email_id: &str,
        update: DeliveryUpdate,
    ) -> Result<u64, StoreError> {
        Ok(EmailRecord::update_delivery(&self.pool, provider_email_id, update).await?)
    }

    async fn list_email_records(
        &self,
        sender_id: Uuid,
        limit: i64,
    ) -> Result<Vec<EmailRecord>, StoreError> {
        Ok(EmailRecord::list_by_sender(&self.pool, sender_id, limit).await?)
    }

    async fn email_stats(&self, sender_id: Uuid) -> Result<EmailStats, StoreError> {
        Ok(EmailRecord::stats_by_sender(&self.pool, sender_id).await?)
    }

    async fn create_template(&self, data: NewTemplate) -> Result<Template, StoreError> {
        Ok(Template::create(&self.pool, data).await?)
    }

    async fn list_templates(&self, sender_id: Uuid) -> Result<Vec<Template>, StoreError> {
        Ok(Template::list_by_sender(&self.pool, sender_id).await?)
    }

    async fn delete_template(&self, sender_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        Ok(Template::delete_by_sender(&self.pool, sender_id, id).await?)
    }

    async fn create_category(&self, sender_id: Uuid, name: &str) -> Result<Category, StoreError> {
        Category::create(&self.pool, sender_id, name)
            .await
            .map_err(|e| conflict_or(e, "Category"))
    }

    async fn find_category(
        &self,
        sender_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Category>, StoreError> {
        Ok(Category::find_by_sender(&self.pool, sender_id, id).await?)
    }

    async fn list_categories(&self, sender_id: Uuid) -> Result<Vec<Category>, StoreError> {
        Ok(Category::list_by_sender(&self.pool, sender_id).await?)
    }
}
