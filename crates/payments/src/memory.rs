//! In-memory payment processor for tests and local runs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{PaymentError, Result};
use crate::processor::{IntentPage, IntentRequest, IntentStatus, PaymentIntent, PaymentProcessor};

#[derive(Debug)]
struct InMemoryProcessorState {
    /// Newest first, like the processor's listing order.
    intents: Vec<PaymentIntent>,
    next_id: u32,
    fail_on_create: bool,
    page_size: Option<u32>,
}

impl Default for InMemoryProcessorState {
    fn default() -> Self {
        Self {
            intents: Vec::new(),
            next_id: 1,
            fail_on_create: false,
            page_size: None,
        }
    }
}

/// In-memory payment processor for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentProcessor {
    state: Arc<Mutex<InMemoryProcessorState>>,
}

impl InMemoryPaymentProcessor {
    /// Creates a new in-memory processor with no intents.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryProcessorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configures the processor to decline every create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state().fail_on_create = fail;
    }

    /// Caps listing pages below the requested limit to exercise pagination.
    pub fn set_page_size(&self, page_size: u32) {
        self.state().page_size = Some(page_size.max(1));
    }

    /// Adds an intent as if it had been created and confirmed elsewhere.
    pub fn seed_intent(&self, intent: PaymentIntent) {
        self.state().intents.insert(0, intent);
    }

    /// Returns every intent, newest first.
    pub fn intents(&self) -> Vec<PaymentIntent> {
        self.state().intents.clone()
    }

    /// Returns the most recently created intent.
    pub fn last_intent(&self) -> Option<PaymentIntent> {
        self.state().intents.first().cloned()
    }

    /// Returns the number of intents held.
    pub fn intent_count(&self) -> usize {
        self.state().intents.len()
    }
}

#[async_trait]
impl PaymentProcessor for InMemoryPaymentProcessor {
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent> {
        let mut state = self.state();

        if state.fail_on_create {
            return Err(PaymentError::Declined("Payment declined".to_string()));
        }

        let id = format!("pi_mem_{:06}", state.next_id);
        state.next_id += 1;

        let intent = PaymentIntent {
            client_secret: Some(format!("{id}_secret_test")),
            id,
            amount: request.amount.cents(),
            currency: request.currency,
            status: IntentStatus::RequiresPaymentMethod,
            description: request.description,
            receipt_email: request.receipt_email,
            metadata: request.metadata,
            created: Utc::now().timestamp(),
        };
        state.intents.insert(0, intent.clone());

        Ok(intent)
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent> {
        self.state()
            .intents
            .iter()
            .find(|intent| intent.id == id)
            .cloned()
            .ok_or_else(|| PaymentError::NotFound(id.to_string()))
    }

    async fn list_intents(&self, starting_after: Option<&str>, limit: u32) -> Result<IntentPage> {
        let state = self.state();
        let limit = state.page_size.map_or(limit, |size| size.min(limit)) as usize;

        let start = match starting_after {
            Some(cursor) => state
                .intents
                .iter()
                .position(|intent| intent.id == cursor)
                .map(|index| index + 1)
                .ok_or_else(|| PaymentError::NotFound(cursor.to_string()))?,
            None => 0,
        };

        let data: Vec<PaymentIntent> = state.intents.iter().skip(start).take(limit).cloned().collect();
        let has_more = start + data.len() < state.intents.len();

        Ok(IntentPage { data, has_more })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use common::Money;

    use super::*;

    fn succeeded(id: &str) -> PaymentIntent {
        PaymentIntent {
            id: id.to_string(),
            amount: 2_000,
            currency: "usd".to_string(),
            status: IntentStatus::Succeeded,
            client_secret: None,
            description: None,
            receipt_email: None,
            metadata: BTreeMap::new(),
            created: 1_735_689_600,
        }
    }

    #[tokio::test]
    async fn test_create_records_request_fields() {
        let processor = InMemoryPaymentProcessor::new();
        let intent = processor
            .create_intent(
                IntentRequest::new(Money::from_cents(15_000), "usd").receipt_email("a@b.c"),
            )
            .await
            .unwrap();

        assert_eq!(intent.amount, 15_000);
        assert!(intent.client_secret.is_some());
        assert_eq!(processor.last_intent().unwrap().id, intent.id);
        assert_eq!(
            processor.retrieve_intent(&intent.id).await.unwrap(),
            intent
        );
    }

    #[tokio::test]
    async fn test_fail_on_create_declines() {
        let processor = InMemoryPaymentProcessor::new();
        processor.set_fail_on_create(true);

        let result = processor
            .create_intent(IntentRequest::new(Money::from_cents(100), "usd"))
            .await;
        assert!(matches!(result, Err(PaymentError::Declined(_))));
        assert_eq!(processor.intent_count(), 0);
    }

    #[tokio::test]
    async fn test_list_succeeded_walks_every_page() {
        let processor = InMemoryPaymentProcessor::new();
        processor.set_page_size(2);
        for i in 0..5 {
            processor.seed_intent(succeeded(&format!("pi_{i}")));
        }
        processor
            .create_intent(IntentRequest::new(Money::from_cents(100), "usd"))
            .await
            .unwrap();

        let first = processor.list_intents(None, 100).await.unwrap();
        assert_eq!(first.data.len(), 2);
        assert!(first.has_more);

        let all = processor.list_succeeded_intents().await.unwrap();
        let ids: Vec<&str> = all.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["pi_4", "pi_3", "pi_2", "pi_1", "pi_0"]);
    }

    #[tokio::test]
    async fn test_retrieve_unknown_is_not_found() {
        let processor = InMemoryPaymentProcessor::new();
        assert!(matches!(
            processor.retrieve_intent("pi_missing").await,
            Err(PaymentError::NotFound(_))
        ));
    }
}
