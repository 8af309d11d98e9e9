//! Payment processor webhook endpoint.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use payments::webhook::SIGNATURE_HEADER;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::{AppState, Backend, Processor};

#[derive(Serialize)]
pub struct ReceivedResponse {
    pub received: bool,
}

/// POST /webhooks/stripe: verify and apply a payment event.
///
/// Signature failures answer 400; storage failures answer 500 so the
/// processor redelivers. Everything else is acknowledged.
#[tracing::instrument(skip_all)]
pub async fn stripe<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ReceivedResponse>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state.reconciler.handle(&body, signature).await?;
    tracing::debug!(outcome = outcome.label(), "Webhook processed");

    Ok(Json(ReceivedResponse { received: true }))
}
