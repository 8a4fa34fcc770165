use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{LotChanges, LotSummary, NewLot, Spot};
use crate::services::Actor;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Serialize)]
struct LotDetail {
    #[serde(flatten)]
    summary: LotSummary,
    spots: Vec<Spot>,
}

#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    pub vehicle_number: String,
}

pub async fn list_lots(State(state): State<AppState>, _actor: Actor) -> Result<Response, AppError> {
    let lots = state.lots.list().await?;
    Ok(success(lots, "Parking lots retrieved"))
}

pub async fn create_lot(
    State(state): State<AppState>,
    actor: Actor,
    Json(new): Json<NewLot>,
) -> Result<Response, AppError> {
    let summary = state.lots.create(&actor, new).await?;
    Ok(created(summary, "Parking lot created"))
}

pub async fn get_lot(
    State(state): State<AppState>,
    _actor: Actor,
    Path(lot_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let summary = state.lots.summary(lot_id).await?;
    let spots = state.registry.spots_in_lot(lot_id).await?;
    Ok(success(LotDetail { summary, spots }, "Parking lot retrieved"))
}

pub async fn update_lot(
    State(state): State<AppState>,
    actor: Actor,
    Path(lot_id): Path<Uuid>,
    Json(changes): Json<LotChanges>,
) -> Result<Response, AppError> {
    let summary = state.lots.update(&actor, lot_id, changes).await?;
    Ok(success(summary, "Parking lot updated"))
}

pub async fn delete_lot(
    State(state): State<AppState>,
    actor: Actor,
    Path(lot_id): Path<Uuid>,
) -> Result<Response, AppError> {
    state.lots.delete(&actor, lot_id).await?;
    Ok(empty_success("Parking lot deleted"))
}

/// Books the first free spot in the lot for the caller.
pub async fn book_spot(
    State(state): State<AppState>,
    actor: Actor,
    Path(lot_id): Path<Uuid>,
    Json(req): Json<BookingRequest>,
) -> Result<Response, AppError> {
    let reservation = state
        .ledger
        .book(&actor, lot_id, &req.vehicle_number)
        .await?;
    Ok(created(reservation, "Parking spot booked"))
}
