//! Event lookup and seat availability.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use booking::SeatAvailability;
use store::Event;

use crate::error::ApiError;
use crate::state::{AppState, Backend, Processor};

/// GET /events/next: the upcoming event.
#[tracing::instrument(skip(state))]
pub async fn next<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
) -> Result<Json<Event>, ApiError> {
    Ok(Json(state.booking.next_event().await?))
}

/// GET /events/{slug}/availability: reserved and available seats.
#[tracing::instrument(skip(state))]
pub async fn availability<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(slug): Path<String>,
) -> Result<Json<SeatAvailability>, ApiError> {
    Ok(Json(state.booking.availability(&slug).await?))
}
