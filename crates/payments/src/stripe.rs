//! Stripe REST API client (no SDK dependency).

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{PaymentError, Result};
use crate::processor::{IntentPage, IntentRequest, PaymentIntent, PaymentProcessor};

/// Public Stripe API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Payment processor backed by the Stripe REST API.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Creates a client for the public Stripe API.
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_api_base(secret_key, DEFAULT_API_BASE)
    }

    /// Creates a client against another base URL (e.g. a local mock).
    pub fn with_api_base(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path)
    }

    async fn decode<T: DeserializeOwned>(response: Response, id: Option<&str>) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body).ok().map(|b| b.error);
        let message = detail
            .as_ref()
            .and_then(|d| d.message.clone())
            .unwrap_or_else(|| status.to_string());

        match (status, id) {
            (StatusCode::NOT_FOUND, Some(id)) => Err(PaymentError::NotFound(id.to_string())),
            (StatusCode::BAD_REQUEST | StatusCode::PAYMENT_REQUIRED, _) => {
                tracing::warn!(
                    error_type = ?detail.and_then(|d| d.kind),
                    %message,
                    "Stripe rejected request"
                );
                Err(PaymentError::Declined(message))
            }
            _ => Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            }),
        }
    }
}

/// Flattens a request into Stripe's bracketed form encoding.
fn intent_form(request: &IntentRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), request.amount.cents().to_string()),
        ("currency".to_string(), request.currency.clone()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
    ];
    if let Some(email) = &request.receipt_email {
        form.push(("receipt_email".to_string(), email.clone()));
    }
    if let Some(description) = &request.description {
        form.push(("description".to_string(), description.clone()));
    }
    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
    form
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    #[tracing::instrument(skip(self, request), fields(amount = request.amount.cents()))]
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent> {
        let response = self
            .http
            .post(self.url("payment_intents"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&intent_form(&request))
            .send()
            .await?;

        let intent: PaymentIntent = Self::decode(response, None).await?;
        tracing::debug!(intent_id = %intent.id, "Created payment intent");
        Ok(intent)
    }

    #[tracing::instrument(skip(self))]
    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent> {
        let response = self
            .http
            .get(self.url(&format!("payment_intents/{id}")))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;

        Self::decode(response, Some(id)).await
    }

    #[tracing::instrument(skip(self))]
    async fn list_intents(&self, starting_after: Option<&str>, limit: u32) -> Result<IntentPage> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(cursor) = starting_after {
            query.push(("starting_after", cursor.to_string()));
        }

        let response = self
            .http
            .get(self.url("payment_intents"))
            .basic_auth(&self.secret_key, None::<&str>)
            .query(&query)
            .send()
            .await?;

        Self::decode(response, None).await
    }
}
