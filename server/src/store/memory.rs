use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    Lot, NewReservation, Reservation, ReservationDetails, Spot, SpotStatus,
};
use crate::services::clock::CivilZone;
use crate::services::error::{ParkingError, ParkingResult};
use crate::services::{ledger, lots, registry};
use crate::store::{ParkingStore, SpotCounts};

#[derive(Default)]
struct Tables {
    lots: HashMap<Uuid, Lot>,
    spots: HashMap<Uuid, Spot>,
    reservations: HashMap<Uuid, Reservation>,
}

impl Tables {
    fn spots_of(&self, lot_id: Uuid) -> Vec<Spot> {
        let mut spots: Vec<Spot> = self
            .spots
            .values()
            .filter(|s| s.lot_id == lot_id)
            .cloned()
            .collect();
        spots.sort_by_key(|s| s.position);
        spots
    }

    fn open_for_spot(&self, spot_id: Uuid) -> Option<&Reservation> {
        self.reservations
            .values()
            .find(|r| r.spot_id == spot_id && r.is_open())
    }

    fn open_for_user(&self, user_id: Uuid) -> Option<&Reservation> {
        self.reservations
            .values()
            .find(|r| r.user_id == user_id && r.is_open())
    }

    fn name_taken(&self, name: &str, except: Uuid) -> bool {
        self.lots.values().any(|l| l.id != except && l.name == name)
    }

    fn drop_spots(&mut self, spot_ids: &[Uuid]) {
        self.reservations.retain(|_, r| !spot_ids.contains(&r.spot_id));
        for id in spot_ids {
            self.spots.remove(id);
        }
    }
}

/// Process-local store. Every operation runs under one lock, so each is
/// serializable against all others.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ParkingStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert_lot(&self, lot: Lot, spots: Vec<Spot>) -> ParkingResult<()> {
        let mut t = self.tables.lock().await;
        if t.name_taken(&lot.name, lot.id) {
            return Err(ParkingError::DuplicateLotName(lot.name));
        }
        for spot in spots {
            t.spots.insert(spot.id, spot);
        }
        t.lots.insert(lot.id, lot);
        Ok(())
    }

    async fn update_lot(&self, lot: Lot, now: DateTime<Utc>) -> ParkingResult<()> {
        let mut t = self.tables.lock().await;
        if !t.lots.contains_key(&lot.id) {
            return Err(ParkingError::LotNotFound(lot.id));
        }
        if t.name_taken(&lot.name, lot.id) {
            return Err(ParkingError::DuplicateLotName(lot.name));
        }
        let plan = lots::plan_resize(lot.id, &t.spots_of(lot.id), lot.capacity)?;

        t.drop_spots(&plan.remove);
        for position in plan.add {
            let spot = Spot::new(lot.id, position, now);
            t.spots.insert(spot.id, spot);
        }
        t.lots.insert(lot.id, lot);
        Ok(())
    }

    async fn delete_lot(&self, lot_id: Uuid) -> ParkingResult<()> {
        let mut t = self.tables.lock().await;
        if !t.lots.contains_key(&lot_id) {
            return Err(ParkingError::LotNotFound(lot_id));
        }
        let spots = t.spots_of(lot_id);
        lots::ensure_deletable(lot_id, &spots)?;

        let ids: Vec<Uuid> = spots.iter().map(|s| s.id).collect();
        t.drop_spots(&ids);
        t.lots.remove(&lot_id);
        Ok(())
    }

    async fn get_lot(&self, lot_id: Uuid) -> ParkingResult<Option<Lot>> {
        Ok(self.tables.lock().await.lots.get(&lot_id).cloned())
    }

    async fn list_lots(&self) -> ParkingResult<Vec<Lot>> {
        let t = self.tables.lock().await;
        let mut lots: Vec<Lot> = t.lots.values().cloned().collect();
        lots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(lots)
    }

    async fn count_lots(&self) -> ParkingResult<i64> {
        Ok(self.tables.lock().await.lots.len() as i64)
    }

    async fn spot_counts(&self, lot_id: Uuid) -> ParkingResult<SpotCounts> {
        let t = self.tables.lock().await;
        let mut counts = SpotCounts::default();
        for spot in t.spots.values().filter(|s| s.lot_id == lot_id) {
            counts.total += 1;
            if spot.status == SpotStatus::Occupied {
                counts.occupied += 1;
            }
        }
        Ok(counts)
    }

    async fn get_spot(&self, spot_id: Uuid) -> ParkingResult<Option<Spot>> {
        Ok(self.tables.lock().await.spots.get(&spot_id).cloned())
    }

    async fn list_spots(&self, lot_id: Uuid) -> ParkingResult<Vec<Spot>> {
        Ok(self.tables.lock().await.spots_of(lot_id))
    }

    async fn first_available_spot(&self, lot_id: Uuid) -> ParkingResult<Option<Spot>> {
        let t = self.tables.lock().await;
        Ok(t.spots_of(lot_id).into_iter().find(Spot::is_available))
    }

    async fn set_spot_status(&self, spot_id: Uuid, target: SpotStatus) -> ParkingResult<Spot> {
        let mut t = self.tables.lock().await;
        let spot = t
            .spots
            .get(&spot_id)
            .ok_or(ParkingError::SpotNotFound(spot_id))?;
        let updated = registry::transition(spot, target)?;
        t.spots.insert(spot_id, updated.clone());
        Ok(updated)
    }

    async fn open_reservation(
        &self,
        new: NewReservation,
        created_at: DateTime<Utc>,
    ) -> ParkingResult<Reservation> {
        let mut t = self.tables.lock().await;
        let spot = t
            .spots
            .get(&new.spot_id)
            .ok_or(ParkingError::SpotNotFound(new.spot_id))?;
        ledger::admit(&new, spot, t.open_for_user(new.user_id))?;
        let occupied = registry::transition(spot, SpotStatus::Occupied)?;

        let reservation = new.into_reservation(created_at);
        t.spots.insert(occupied.id, occupied);
        t.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn close_reservation(
        &self,
        reservation_id: Uuid,
        end_time: DateTime<Utc>,
        zone: CivilZone,
    ) -> ParkingResult<Reservation> {
        let mut t = self.tables.lock().await;
        let reservation = t
            .reservations
            .get(&reservation_id)
            .ok_or(ParkingError::ReservationNotFound(reservation_id))?;
        let closed = ledger::settle(reservation, end_time, zone)?;
        let spot = t
            .spots
            .get(&closed.spot_id)
            .ok_or(ParkingError::SpotNotFound(closed.spot_id))?;
        let available = registry::transition(spot, SpotStatus::Available)?;

        t.spots.insert(available.id, available);
        t.reservations.insert(closed.id, closed.clone());
        Ok(closed)
    }

    async fn get_reservation(&self, reservation_id: Uuid) -> ParkingResult<Option<Reservation>> {
        Ok(self
            .tables
            .lock()
            .await
            .reservations
            .get(&reservation_id)
            .cloned())
    }

    async fn open_reservation_for_spot(
        &self,
        spot_id: Uuid,
    ) -> ParkingResult<Option<Reservation>> {
        Ok(self.tables.lock().await.open_for_spot(spot_id).cloned())
    }

    async fn open_reservation_for_user(
        &self,
        user_id: Uuid,
    ) -> ParkingResult<Option<Reservation>> {
        Ok(self.tables.lock().await.open_for_user(user_id).cloned())
    }

    async fn reservations_for_user(
        &self,
        user_id: Uuid,
    ) -> ParkingResult<Vec<ReservationDetails>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<ReservationDetails> = t
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                let spot = t.spots.get(&r.spot_id)?;
                let lot = t.lots.get(&spot.lot_id)?;
                Some(ReservationDetails {
                    reservation: r.clone(),
                    spot_label: spot.label.clone(),
                    lot_id: lot.id,
                    lot_name: lot.name.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.reservation
                .start_time
                .cmp(&a.reservation.start_time)
                .then_with(|| b.reservation.created_at.cmp(&a.reservation.created_at))
        });
        Ok(rows)
    }
}
