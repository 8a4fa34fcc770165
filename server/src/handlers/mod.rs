use axum::extract::State;
use axum::response::Response;
use serde::Serialize;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod auth;
pub mod lots;
pub mod reservations;
pub mod spots;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
    storage: &'static str,
    lots: i64,
}

pub async fn health_check(State(state): State<AppState>) -> Result<Response, AppError> {
    let lots = state.store.count_lots().await?;
    let payload = HealthPayload {
        status: "ok",
        service: "parking-api",
        storage: state.store.backend(),
        lots,
    };

    Ok(success(payload, "Health check successful"))
}
