//! Persistence for lots, spots and reservations.
//!
//! Every method is one atomic unit: either all of its writes commit or none
//! do. Precondition checks are delegated to the pure functions in
//! `services` and run inside the unit, after the rows involved are locked.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Lot, NewReservation, Reservation, ReservationDetails, Spot, SpotStatus};
use crate::services::clock::CivilZone;
use crate::services::error::ParkingResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpotCounts {
    pub total: i64,
    pub occupied: i64,
}

#[async_trait]
pub trait ParkingStore: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Inserts a lot and all of its spots.
    async fn insert_lot(&self, lot: Lot, spots: Vec<Spot>) -> ParkingResult<()>;
    /// Replaces a lot's fields and grows or shrinks its spots to
    /// `lot.capacity`. Added spots are stamped `now`.
    async fn update_lot(&self, lot: Lot, now: DateTime<Utc>) -> ParkingResult<()>;
    /// Removes a lot with its spots and their reservation history, unless a
    /// spot is occupied.
    async fn delete_lot(&self, lot_id: Uuid) -> ParkingResult<()>;
    async fn get_lot(&self, lot_id: Uuid) -> ParkingResult<Option<Lot>>;
    async fn list_lots(&self) -> ParkingResult<Vec<Lot>>;
    async fn count_lots(&self) -> ParkingResult<i64>;
    async fn spot_counts(&self, lot_id: Uuid) -> ParkingResult<SpotCounts>;

    async fn get_spot(&self, spot_id: Uuid) -> ParkingResult<Option<Spot>>;
    /// Spots of a lot ordered by position.
    async fn list_spots(&self, lot_id: Uuid) -> ParkingResult<Vec<Spot>>;
    /// The available spot with the lowest position.
    async fn first_available_spot(&self, lot_id: Uuid) -> ParkingResult<Option<Spot>>;
    async fn set_spot_status(&self, spot_id: Uuid, target: SpotStatus) -> ParkingResult<Spot>;

    /// Creates an open reservation and marks its spot occupied.
    async fn open_reservation(
        &self,
        new: NewReservation,
        created_at: DateTime<Utc>,
    ) -> ParkingResult<Reservation>;
    /// Closes a reservation at `end_time`, stores its cost and frees its
    /// spot.
    async fn close_reservation(
        &self,
        reservation_id: Uuid,
        end_time: DateTime<Utc>,
        zone: CivilZone,
    ) -> ParkingResult<Reservation>;
    async fn get_reservation(&self, reservation_id: Uuid) -> ParkingResult<Option<Reservation>>;
    async fn open_reservation_for_spot(&self, spot_id: Uuid)
        -> ParkingResult<Option<Reservation>>;
    async fn open_reservation_for_user(&self, user_id: Uuid)
        -> ParkingResult<Option<Reservation>>;
    /// A user's reservations, newest first.
    async fn reservations_for_user(&self, user_id: Uuid)
        -> ParkingResult<Vec<ReservationDetails>>;
}
