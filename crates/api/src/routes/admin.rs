//! Admin reports.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use booking::{PaymentRecord, ReservationSummary};
use payments::PaymentIntent;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::{AppState, Backend, Processor};

#[derive(Serialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

/// GET /admin/reservations: every reservation, newest first.
#[tracing::instrument(skip(state))]
pub async fn reservations<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
) -> Result<Json<ItemsResponse<ReservationSummary>>, ApiError> {
    let items = state.booking.reservation_summaries().await?;
    Ok(Json(ItemsResponse { items }))
}

/// GET /admin/payments: every succeeded charge.
#[tracing::instrument(skip(state))]
pub async fn payments<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
) -> Result<Json<ItemsResponse<PaymentRecord>>, ApiError> {
    let items = state.booking.payment_report().await?;
    Ok(Json(ItemsResponse { items }))
}

/// GET /admin/payment-intents/{id}
#[tracing::instrument(skip(state))]
pub async fn payment_intent<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentIntent>, ApiError> {
    Ok(Json(state.booking.payment_intent(&id).await?))
}
