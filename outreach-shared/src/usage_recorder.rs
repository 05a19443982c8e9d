/// Usage recorders
///
/// Each recorder performs one counter adjustment after the metered action has
/// happened. Failures are logged and swallowed: a lost increment must never
/// fail a send that already went out.

use crate::models::usage::UsageCounter;
use crate::store::Store;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct UsageRecorder {
    store: Arc<dyn Store>,
}

impl UsageRecorder {
    pub fn new(store: Arc<dyn Store>) -> Self {
        UsageRecorder { store }
    }

    pub async fn record_ai_request(&self, sender_id: Uuid) {
        self.adjust(sender_id, UsageCounter::AiRequests, 1).await;
    }

    pub async fn record_resend_request(&self, sender_id: Uuid) {
        self.adjust(sender_id, UsageCounter::ResendRequests, 1).await;
    }

    pub async fn record_contact_added(&self, sender_id: Uuid) {
        self.adjust(sender_id, UsageCounter::Contacts, 1).await;
    }

    pub async fn record_storage(&self, sender_id: Uuid, bytes: i64) {
        self.adjust(sender_id, UsageCounter::StorageBytes, bytes).await;
    }

    pub async fn record_template_created(&self, sender_id: Uuid) {
        self.adjust(sender_id, UsageCounter::Templates, 1).await;
    }

    /// Decrements the template counter, flooring at zero
    pub async fn record_template_deleted(&self, sender_id: Uuid) {
        self.adjust(sender_id, UsageCounter::Templates, -1).await;
    }

    async fn adjust(&self, sender_id: Uuid, counter: UsageCounter, delta: i64) {
        match self.store.adjust_usage(sender_id, counter, delta).await {
            Ok(true) => {
                tracing::debug!(
                    sender_id = %sender_id,
                    counter = counter.column(),
                    delta,
                    "Usage recorded"
                );
            }
            Ok(false) => {
                tracing::error!(
                    sender_id = %sender_id,
                    counter = counter.column(),
                    "Usage record not found"
                );
            }
            Err(e) => {
                tracing::error!(
                    sender_id = %sender_id,
                    counter = counter.column(),
                    error = %e,
                    "Failed to record usage"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plan::PlanType;
    use crate::models::sender::NewSender;
    use crate::store::MemoryStore;

    async fn account(store: &MemoryStore) -> Uuid {
        store
            .create_account(NewSender {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "hash".to_string(),
                avatar_url: None,
                is_anonymous: false,
                plan_type: PlanType::Free,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_records_each_counter() {
        let store = Arc::new(MemoryStore::new());
        let sender_id = account(&store).await;
        let recorder = UsageRecorder::new(store.clone());

        recorder.record_ai_request(sender_id).await;
        recorder.record_resend_request(sender_id).await;
        recorder.record_resend_request(sender_id).await;
        recorder.record_storage(sender_id, 2048).await;
        recorder.record_template_created(sender_id).await;

        let usage = store.find_usage(sender_id).await.unwrap().unwrap();
        assert_eq!(usage.ai_requests, 1);
        assert_eq!(usage.resend_requests, 2);
        assert_eq!(usage.storage_bytes, 2048);
        assert_eq!(usage.templates, 1);
    }

    #[tokio::test]
    async fn test_template_decrement_floors_at_zero() {
        let store = Arc::new(MemoryStore::new());
        let sender_id = account(&store).await;
        let recorder = UsageRecorder::new(store.clone());

        recorder.record_template_deleted(sender_id).await;

        let usage = store.find_usage(sender_id).await.unwrap().unwrap();
        assert_eq!(usage.templates, 0);
    }

    #[tokio::test]
    async fn test_missing_row_is_swallowed() {
        let store = Arc::new(MemoryStore::new());
        let recorder = UsageRecorder::new(store);

        // Must not panic or surface an error
        recorder.record_ai_request(Uuid::new_v4()).await;
    }
}
