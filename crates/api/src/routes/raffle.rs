//! Raffle entries, winners and draws.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use booking::{DrawOutcome, RaffleEntry};
use serde::{Deserialize, Serialize};
use store::RaffleWinner;

use crate::error::ApiError;
use crate::state::{AppState, Backend, Processor};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntriesQuery {
    pub lot_id: Option<i32>,
}

#[derive(Serialize)]
pub struct DrawResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<RaffleWinner>,
}

impl From<DrawOutcome> for DrawResponse {
    fn from(outcome: DrawOutcome) -> Self {
        Self {
            outcome: outcome.label(),
            winner: outcome.winner().cloned(),
        }
    }
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub cleared: bool,
}

/// GET /raffle/entries: lottery tickets, optionally for one lot.
#[tracing::instrument(skip(state))]
pub async fn entries<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
    Query(query): Query<EntriesQuery>,
) -> Result<Json<Vec<RaffleEntry>>, ApiError> {
    Ok(Json(state.raffle.entries(query.lot_id).await?))
}

/// GET /raffle/winners
#[tracing::instrument(skip(state))]
pub async fn winners<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
) -> Result<Json<Vec<RaffleWinner>>, ApiError> {
    Ok(Json(state.raffle.winners().await?))
}

/// POST /raffle/lots/{lot_id}/draw: draw a winner unless one exists.
#[tracing::instrument(skip(state))]
pub async fn draw<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(lot_id): Path<i32>,
) -> Result<Json<DrawResponse>, ApiError> {
    Ok(Json(state.raffle.draw(lot_id).await?.into()))
}

/// DELETE /raffle/lots/{lot_id}/draw: clear the winner so the lot can be
/// drawn again.
#[tracing::instrument(skip(state))]
pub async fn reset<S: Backend, P: Processor>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(lot_id): Path<i32>,
) -> Result<Json<ResetResponse>, ApiError> {
    let cleared = state.raffle.reset(lot_id).await?;
    Ok(Json(ResetResponse { cleared }))
}
