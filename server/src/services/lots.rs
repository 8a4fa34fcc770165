//! Lot administration and occupancy aggregates.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::models::{Lot, LotChanges, LotSummary, NewLot, Spot, MAX_SPOTS_PER_LOT};
use crate::services::actor::Actor;
use crate::services::billing;
use crate::services::clock::Clock;
use crate::services::error::{ParkingError, ParkingResult};
use crate::store::ParkingStore;

const NAME_LEN: (usize, usize) = (3, 120);
const ADDRESS_LEN: (usize, usize) = (5, 200);
const POSTAL_CODE_LEN: (usize, usize) = (4, 10);

/// Trims the free-text fields of `lot` and checks every field's range.
pub fn validate(mut lot: Lot) -> ParkingResult<Lot> {
    lot.name = lot.name.trim().to_string();
    lot.address = lot.address.trim().to_string();
    lot.postal_code = lot.postal_code.trim().to_string();

    check_len("name", &lot.name, NAME_LEN)?;
    check_len("address", &lot.address, ADDRESS_LEN)?;
    check_len("postal code", &lot.postal_code, POSTAL_CODE_LEN)?;
    if !lot.postal_code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParkingError::validation("postal code must contain only digits"));
    }
    billing::check_hourly_rate(lot.hourly_rate)?;
    if !(1..=MAX_SPOTS_PER_LOT).contains(&lot.capacity) {
        return Err(ParkingError::validation(format!(
            "capacity must be between 1 and {}",
            MAX_SPOTS_PER_LOT
        )));
    }
    Ok(lot)
}

fn check_len(field: &str, value: &str, (min, max): (usize, usize)) -> ParkingResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ParkingError::validation(format!(
            "{} must be {} to {} characters",
            field, min, max
        )));
    }
    Ok(())
}

/// Spot changes needed to bring a lot to a new capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResizePlan {
    /// Positions of spots to create.
    pub add: Vec<i32>,
    /// Spots to remove, all currently available.
    pub remove: Vec<Uuid>,
}

/// Growing appends positions after the current highest one; shrinking
/// drops the highest positions and is refused if any of them is occupied.
pub fn plan_resize(lot_id: Uuid, spots: &[Spot], capacity: i32) -> ParkingResult<ResizePlan> {
    let current = spots.len() as i32;
    let mut plan = ResizePlan::default();
    if capacity > current {
        let last = spots.iter().map(|s| s.position).max().unwrap_or(0);
        plan.add = (last + 1..=last + capacity - current).collect();
    } else if capacity < current {
        let mut by_position: Vec<&Spot> = spots.iter().collect();
        by_position.sort_by_key(|s| s.position);
        let dropped = &by_position[capacity.max(0) as usize..];
        if dropped.iter().any(|s| !s.is_available()) {
            return Err(ParkingError::LotHasOccupiedSpots(lot_id));
        }
        plan.remove = dropped.iter().map(|s| s.id).collect();
    }
    Ok(plan)
}

pub fn ensure_deletable(lot_id: Uuid, spots: &[Spot]) -> ParkingResult<()> {
    if spots.iter().any(|s| !s.is_available()) {
        return Err(ParkingError::LotHasOccupiedSpots(lot_id));
    }
    Ok(())
}

#[derive(Clone)]
pub struct LotManager {
    store: Arc<dyn ParkingStore>,
    clock: Arc<dyn Clock>,
}

impl LotManager {
    pub fn new(store: Arc<dyn ParkingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create(&self, actor: &Actor, new: NewLot) -> ParkingResult<LotSummary> {
        actor.require_admin()?;
        let now = self.clock.now();
        let lot = validate(Lot {
            id: Uuid::new_v4(),
            name: new.name,
            address: new.address,
            postal_code: new.postal_code,
            hourly_rate: new.hourly_rate,
            capacity: new.capacity,
            created_at: now,
        })?;
        let spots: Vec<Spot> = (1..=lot.capacity)
            .map(|position| Spot::new(lot.id, position, now))
            .collect();

        self.store.insert_lot(lot.clone(), spots).await?;
        info!(lot_id = %lot.id, name = %lot.name, capacity = lot.capacity, "Parking lot created");
        let total = i64::from(lot.capacity);
        Ok(LotSummary::new(lot, total, 0))
    }

    pub async fn update(
        &self,
        actor: &Actor,
        lot_id: Uuid,
        changes: LotChanges,
    ) -> ParkingResult<LotSummary> {
        actor.require_admin()?;
        let current = self.get(lot_id).await?;
        let lot = validate(changes.apply_to(current))?;
        self.store.update_lot(lot, self.clock.now()).await?;
        info!(lot_id = %lot_id, "Parking lot updated");
        self.summary(lot_id).await
    }

    pub async fn delete(&self, actor: &Actor, lot_id: Uuid) -> ParkingResult<()> {
        actor.require_admin()?;
        self.store.delete_lot(lot_id).await?;
        info!(lot_id = %lot_id, "Parking lot deleted");
        Ok(())
    }

    pub async fn get(&self, lot_id: Uuid) -> ParkingResult<Lot> {
        self.store
            .get_lot(lot_id)
            .await?
            .ok_or(ParkingError::LotNotFound(lot_id))
    }

    pub async fn summary(&self, lot_id: Uuid) -> ParkingResult<LotSummary> {
        let lot = self.get(lot_id).await?;
        let counts = self.store.spot_counts(lot_id).await?;
        Ok(LotSummary::new(lot, counts.total, counts.occupied))
    }

    pub async fn list(&self) -> ParkingResult<Vec<LotSummary>> {
        let mut summaries = Vec::new();
        for lot in self.store.list_lots().await? {
            let counts = self.store.spot_counts(lot.id).await?;
            summaries.push(LotSummary::new(lot, counts.total, counts.occupied));
        }
        Ok(summaries)
    }
}
