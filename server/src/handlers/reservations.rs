use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Deserialize;
use uuid::Uuid;

use crate::services::{Actor, CivilTime};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    /// Hypothetical release time; now when absent. Naive values are civil
    /// local time.
    pub at: Option<String>,
}

pub async fn history(State(state): State<AppState>, actor: Actor) -> Result<Response, AppError> {
    let rows = state.ledger.history(actor.user_id).await?;
    Ok(success(rows, "Reservation history retrieved"))
}

pub async fn active(State(state): State<AppState>, actor: Actor) -> Result<Response, AppError> {
    let reservation = state.ledger.active_for(actor.user_id).await?;
    Ok(success(reservation, "Active reservation retrieved"))
}

pub async fn preview(
    State(state): State<AppState>,
    actor: Actor,
    Path(reservation_id): Path<Uuid>,
    Query(query): Query<PreviewQuery>,
) -> Result<Response, AppError> {
    let at = query
        .at
        .as_deref()
        .map(str::parse::<CivilTime>)
        .transpose()?;
    let quote = state.ledger.preview_for(&actor, reservation_id, at).await?;
    Ok(success(quote, "Cost preview calculated"))
}

pub async fn release(
    State(state): State<AppState>,
    actor: Actor,
    Path(reservation_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let reservation = state.ledger.release(&actor, reservation_id).await?;
    Ok(success(reservation, "Parking spot released"))
}
