use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::{Reservation, Spot, SpotStatus};
use crate::services::actor::Actor;
use crate::services::error::{ParkingError, ParkingResult};
use crate::store::ParkingStore;

/// Moves `spot` into `target`, refusing no-op transitions.
pub fn transition(spot: &Spot, target: SpotStatus) -> ParkingResult<Spot> {
    if spot.status == target {
        return Err(ParkingError::InvalidStateTransition {
            spot_id: spot.id,
            status: target,
        });
    }
    Ok(Spot {
        status: target,
        ..spot.clone()
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct SpotDetail {
    #[serde(flatten)]
    pub spot: Spot,
    pub current_reservation: Option<Reservation>,
}

#[derive(Clone)]
pub struct SpotRegistry {
    store: Arc<dyn ParkingStore>,
}

impl SpotRegistry {
    pub fn new(store: Arc<dyn ParkingStore>) -> Self {
        Self { store }
    }

    /// Lowest-positioned available spot of the lot.
    pub async fn find_available(&self, lot_id: Uuid) -> ParkingResult<Spot> {
        if self.store.get_lot(lot_id).await?.is_none() {
            return Err(ParkingError::LotNotFound(lot_id));
        }
        self.store
            .first_available_spot(lot_id)
            .await?
            .ok_or(ParkingError::NoAvailableSpot(lot_id))
    }

    /// Raw state flip. Bookings go through the ledger, which flips the spot
    /// in the same unit as the reservation write.
    pub async fn mark_occupied(&self, spot_id: Uuid) -> ParkingResult<Spot> {
        let spot = self
            .store
            .set_spot_status(spot_id, SpotStatus::Occupied)
            .await?;
        info!(spot_id = %spot.id, lot_id = %spot.lot_id, "Spot marked occupied");
        Ok(spot)
    }

    pub async fn mark_available(&self, spot_id: Uuid) -> ParkingResult<Spot> {
        let spot = self
            .store
            .set_spot_status(spot_id, SpotStatus::Available)
            .await?;
        info!(spot_id = %spot.id, lot_id = %spot.lot_id, "Spot marked available");
        Ok(spot)
    }

    pub async fn spots_in_lot(&self, lot_id: Uuid) -> ParkingResult<Vec<Spot>> {
        if self.store.get_lot(lot_id).await?.is_none() {
            return Err(ParkingError::LotNotFound(lot_id));
        }
        self.store.list_spots(lot_id).await
    }

    pub async fn spot_detail(&self, actor: &Actor, spot_id: Uuid) -> ParkingResult<SpotDetail> {
        actor.require_admin()?;
        let spot = self
            .store
            .get_spot(spot_id)
            .await?
            .ok_or(ParkingError::SpotNotFound(spot_id))?;
        let current_reservation = self.store.open_reservation_for_spot(spot_id).await?;
        Ok(SpotDetail {
            spot,
            current_reservation,
        })
    }
}
