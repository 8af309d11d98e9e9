//! Outbound contract with the payment processor.

use std::collections::BTreeMap;

use async_trait::async_trait;
use common::Money;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Page size used when walking every intent.
pub const LIST_PAGE_SIZE: u32 = 100;

/// Lifecycle state of a payment intent, as reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
}

/// A payment intent as returned by the processor.
///
/// Field names follow the processor's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    pub status: IntentStatus,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub receipt_email: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Unix timestamp in seconds.
    pub created: i64,
}

impl PaymentIntent {
    /// Returns a metadata value, treating empty strings as absent.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == IntentStatus::Succeeded
    }
}

/// Parameters for creating a payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    pub amount: Money,
    pub currency: String,
    pub receipt_email: Option<String>,
    pub description: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl IntentRequest {
    /// Creates a request for the given amount with no optional fields set.
    pub fn new(amount: Money, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
            receipt_email: None,
            description: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn receipt_email(mut self, email: impl Into<String>) -> Self {
        self.receipt_email = Some(email.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One page of a cursor-paginated intent listing, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IntentPage {
    pub data: Vec<PaymentIntent>,
    pub has_more: bool,
}

/// Trait for payment processor operations.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Creates a payment intent with automatic payment methods enabled.
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent>;

    /// Retrieves a single payment intent.
    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent>;

    /// Lists intents after the `starting_after` cursor.
    async fn list_intents(&self, starting_after: Option<&str>, limit: u32) -> Result<IntentPage>;

    /// Walks every page and returns the succeeded intents, newest first.
    async fn list_succeeded_intents(&self) -> Result<Vec<PaymentIntent>> {
        let mut succeeded = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.list_intents(cursor.as_deref(), LIST_PAGE_SIZE).await?;
            cursor = page.data.last().map(|intent| intent.id.clone());
            succeeded.extend(page.data.into_iter().filter(PaymentIntent::is_succeeded));

            if !page.has_more || cursor.is_none() {
                break;
            }
        }

        Ok(succeeded)
    }
}
