use axum::extract::{Path, State};
use axum::response::Response;
use uuid::Uuid;

use crate::services::Actor;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn get_spot(
    State(state): State<AppState>,
    actor: Actor,
    Path(spot_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let detail = state.registry.spot_detail(&actor, spot_id).await?;
    Ok(success(detail, "Parking spot retrieved"))
}
