//! Reservation booking and host management endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use booking::{BookingRequest, ReservationConfirmation, ReservationUpdate};
use common::ReservationId;
use serde::Serialize;
use store::ReservationDetails;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::{AppState, Backend, Processor};

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// POST /reservations: book seats and return the first charge's client
/// secret.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
    JsonBody(req): JsonBody<BookingRequest>,
) -> Result<(StatusCode, Json<ReservationConfirmation>), ApiError> {
    let confirmation = state.booking.create_reservation(req).await?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}

/// GET /reservations/manage/{token}: the reservation behind a host's
/// management link.
#[tracing::instrument(skip_all)]
pub async fn manage<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(token): Path<String>,
) -> Result<Json<ReservationDetails>, ApiError> {
    Ok(Json(state.booking.reservation_by_token(&token).await?))
}

/// PATCH /reservations/{reservation_id}: update host details and guest
/// names.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(reservation_id): Path<String>,
    JsonBody(req): JsonBody<ReservationUpdate>,
) -> Result<Json<MessageResponse>, ApiError> {
    let reservation_id = ReservationId::parse(&reservation_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid reservation ID: {e}")))?;

    state
        .booking
        .update_reservation(reservation_id, req)
        .await?;

    Ok(Json(MessageResponse {
        message: "Reservation updated successfully",
    }))
}
