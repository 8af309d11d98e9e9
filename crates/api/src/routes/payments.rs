//! Standalone payment intents for donations, lottery tickets and auction
//! lots.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use booking::PaymentRequest;
use serde::Serialize;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::{AppState, Backend, Processor};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSecretResponse {
    pub client_secret: String,
}

/// POST /payment-intents
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
    JsonBody(req): JsonBody<PaymentRequest>,
) -> Result<Json<ClientSecretResponse>, ApiError> {
    let client_secret = state.booking.request_payment(req).await?;
    Ok(Json(ClientSecretResponse { client_secret }))
}
