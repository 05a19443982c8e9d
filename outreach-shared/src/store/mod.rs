/// Persistence seam between request handlers and storage
///
/// Handlers, the quota gate, the usage recorders and the dispatcher depend on
/// [`Store`] only. Two backends implement it:
///
/// - [`PgStore`]: PostgreSQL through the `models` module
/// - [`MemoryStore`]: process-local maps, used for local development and tests
///
/// # Example
///
/// ```no_run
/// use outreach_shared::store::{MemoryStore, Store};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), outreach_shared::store::StoreError> {
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// store.ping().await?;
/// # Ok(())
/// # }
/// ```

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::email_record::{DeliveryUpdate, EmailRecord, EmailStats, NewEmailRecord};
use crate::models::plan::Plan;
use crate::models::scheduled_email::{NewScheduledEmail, ScheduledEmail};
use crate::models::sender::{NewSender, Sender};
use crate::models::template::{Category, NewTemplate, Template};
use crate::models::usage::{Usage, UsageCounter};
use async_trait::async_trait;
use uuid::Uuid;

/// Storage error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique constraint violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence operations used by the API and the dispatcher
#[async_trait]
pub trait Store: Send + Sync {
    /// Checks that the backend is reachable
    async fn ping(&self) -> Result<(), StoreError>;

    /// Creates a sender with its plan and zeroed usage
    ///
    /// Returns [`StoreError::Conflict`] when the email is taken.
    async fn create_account(&self, data: NewSender) -> Result<Sender, StoreError>;

    async fn find_sender(&self, id: Uuid) -> Result<Option<Sender>, StoreError>;

    async fn find_sender_by_email(&self, email: &str) -> Result<Option<Sender>, StoreError>;

    async fn find_plan(&self, sender_id: Uuid) -> Result<Option<Plan>, StoreError>;

    async fn find_usage(&self, sender_id: Uuid) -> Result<Option<Usage>, StoreError>;

    /// Adds `delta` to one usage counter, flooring at zero
    ///
    /// Returns false when the sender has no usage row.
    async fn adjust_usage(
        &self,
        sender_id: Uuid,
        counter: UsageCounter,
        delta: i64,
    ) -> Result<bool, StoreError>;

    async fn insert_scheduled_email(
        &self,
        data: NewScheduledEmail,
    ) -> Result<ScheduledEmail, StoreError>;

    async fn list_pending_scheduled(&self, sender_id: Uuid)
        -> Result<Vec<ScheduledEmail>, StoreError>;

    async fn delete_scheduled(&self, sender_id: Uuid, id: Uuid) -> Result<bool, StoreError>;

    /// Claims up to `limit` due rows, marking them sent
    async fn claim_due_scheduled(&self, limit: i64) -> Result<Vec<ScheduledEmail>, StoreError>;

    async fn record_dispatch_outcome(
        &self,
        id: Uuid,
        provider_email_id: Option<&str>,
        error: Option<&str>,
    ) -> Result<bool, StoreError>;

    async fn insert_email_record(&self, data: NewEmailRecord) -> Result<EmailRecord, StoreError>;

    /// Applies a delivery update to the record with this provider id
    ///
    /// Returns the number of records changed.
    async fn update_delivery(
        &self,
        provider_email_id: &str,
        update: DeliveryUpdate,
    ) -> Result<u64, StoreError>;

    async fn list_email_records(
        &self,
        sender_id: Uuid,
        limit: i64,
    ) -> Result<Vec<EmailRecord>, StoreError>;

    async fn email_stats(&self, sender_id: Uuid) -> Result<EmailStats, StoreError>;

    async fn create_template(&self, data: NewTemplate) -> Result<Template, StoreError>;

    async fn list_templates(&self, sender_id: Uuid) -> Result<Vec<Template>, StoreError>;

    async fn delete_template(&self, sender_id: Uuid, id: Uuid) -> Result<bool, StoreError>;

    /// Returns [`StoreError::Conflict`] when the sender already has a
    /// category with this name.
    async fn create_category(&self, sender_id: Uuid, name: &str) -> Result<Category, StoreError>;

    /// Finds a category, `None` when absent or owned by another sender
    async fn find_category(&self, sender_id: Uuid, id: Uuid)
        -> Result<Option<Category>, StoreError>;

    async fn list_categories(&self, sender_id: Uuid) -> Result<Vec<Category>, StoreError>;
}
