use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::GuestId;
use store::TableGuest;

use crate::error::ApiError;
use crate::state::{AppState, Backend, Processor};

/// PATCH /guests/{guest_id}/toggle-payment: admin override of a seat's
/// payment status.
#[tracing::instrument(skip(state))]
pub async fn toggle_payment<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(guest_id): Path<String>,
) -> Result<Json<TableGuest>, ApiError> {
    let guest_id = GuestId::parse(&guest_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid guest ID: {e}")))?;

    Ok(Json(state.booking.toggle_guest_payment(guest_id).await?))
}
