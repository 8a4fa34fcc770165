//! Reservation lifecycle: open, close, preview and history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{NewReservation, Reservation, ReservationDetails, Spot};
use crate::services::actor::Actor;
use crate::services::billing::{self, CostQuote};
use crate::services::clock::{CivilTime, CivilZone, Clock};
use crate::services::error::{ParkingError, ParkingResult};
use crate::services::registry::SpotRegistry;
use crate::store::ParkingStore;

const MAX_VEHICLE_NUMBER_LEN: usize = 20;

/// Checks that `new` may be opened against `spot` given the user's current
/// open reservation, if any.
pub fn admit(
    new: &NewReservation,
    spot: &Spot,
    user_open: Option<&Reservation>,
) -> ParkingResult<()> {
    if user_open.is_some() {
        return Err(ParkingError::UserAlreadyActive(new.user_id));
    }
    if !spot.is_available() {
        return Err(ParkingError::SpotUnavailable(spot.id));
    }
    Ok(())
}

/// Returns `reservation` closed at `end_time`, with its cost filled in.
pub fn settle(
    reservation: &Reservation,
    end_time: DateTime<Utc>,
    zone: CivilZone,
) -> ParkingResult<Reservation> {
    if !reservation.is_open() {
        return Err(ParkingError::ReservationAlreadyClosed(reservation.id));
    }
    let quote = billing::quote(
        zone,
        reservation.start_time,
        end_time,
        reservation.hourly_rate,
    )?;
    Ok(Reservation {
        end_time: Some(end_time),
        total_cost: Some(quote.cost),
        ..reservation.clone()
    })
}

/// Trims and upper-cases a vehicle registration number.
pub fn normalize_vehicle_number(raw: &str) -> ParkingResult<String> {
    let number = raw.trim().to_uppercase();
    if number.is_empty() || number.chars().count() > MAX_VEHICLE_NUMBER_LEN {
        return Err(ParkingError::validation(format!(
            "vehicle number must be 1 to {} characters",
            MAX_VEHICLE_NUMBER_LEN
        )));
    }
    if !number
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
    {
        return Err(ParkingError::validation(
            "vehicle number may only contain letters, digits, spaces and hyphens",
        ));
    }
    Ok(number)
}

/// History row as shown to a user.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationView {
    #[serde(flatten)]
    pub details: ReservationDetails,
    pub duration: String,
}

impl From<ReservationDetails> for ReservationView {
    fn from(details: ReservationDetails) -> Self {
        let duration = match details.reservation.end_time {
            Some(end) => {
                billing::format_duration((end - details.reservation.start_time).num_seconds())
            }
            None => "Ongoing".to_string(),
        };
        Self { details, duration }
    }
}

#[derive(Clone)]
pub struct ReservationLedger {
    store: Arc<dyn ParkingStore>,
    registry: SpotRegistry,
    zone: CivilZone,
    clock: Arc<dyn Clock>,
}

impl ReservationLedger {
    pub fn new(store: Arc<dyn ParkingStore>, zone: CivilZone, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: SpotRegistry::new(store.clone()),
            store,
            zone,
            clock,
        }
    }

    pub fn zone(&self) -> CivilZone {
        self.zone
    }

    /// Opens a reservation on a specific spot and marks the spot occupied,
    /// as one unit.
    pub async fn open(&self, mut new: NewReservation) -> ParkingResult<Reservation> {
        billing::check_hourly_rate(new.hourly_rate)?;
        new.vehicle_number = normalize_vehicle_number(&new.vehicle_number)?;

        let created_at = self.clock.now();
        let reservation = self.store.open_reservation(new, created_at).await.map_err(|e| {
            warn!(error = %e, "Reservation was not opened");
            e
        })?;
        info!(
            reservation_id = %reservation.id,
            spot_id = %reservation.spot_id,
            user_id = %reservation.user_id,
            hourly_rate = %reservation.hourly_rate,
            "Reservation opened"
        );
        Ok(reservation)
    }

    /// Books the first free spot of a lot for `actor`, starting now, at the
    /// lot's current rate.
    ///
    /// A spot taken by a concurrent booker between lookup and open is
    /// skipped; each retry means some other spot got occupied, so at most
    /// `capacity` attempts are made.
    pub async fn book(
        &self,
        actor: &Actor,
        lot_id: Uuid,
        vehicle_number: &str,
    ) -> ParkingResult<Reservation> {
        let lot = self
            .store
            .get_lot(lot_id)
            .await?
            .ok_or(ParkingError::LotNotFound(lot_id))?;
        if self
            .store
            .open_reservation_for_user(actor.user_id)
            .await?
            .is_some()
        {
            return Err(ParkingError::UserAlreadyActive(actor.user_id));
        }
        let mut attempts = lot.capacity.max(1);
        loop {
            let spot = self.registry.find_available(lot.id).await?;
            let result = self
                .open(NewReservation {
                    user_id: actor.user_id,
                    spot_id: spot.id,
                    hourly_rate: lot.hourly_rate,
                    vehicle_number: vehicle_number.to_string(),
                    start_time: self.clock.now(),
                })
                .await;
            attempts -= 1;
            match result {
                Err(ParkingError::SpotUnavailable(_)) if attempts > 0 => {
                    debug!(lot_id = %lot.id, spot_id = %spot.id, "Spot taken concurrently, retrying");
                }
                other => return other,
            }
        }
    }

    /// What closing the reservation at `end_time` would cost. Writes nothing.
    pub async fn preview_cost(
        &self,
        reservation_id: Uuid,
        end_time: CivilTime,
    ) -> ParkingResult<CostQuote> {
        let reservation = self.get(reservation_id).await?;
        billing::quote(
            self.zone,
            reservation.start_time,
            end_time,
            reservation.hourly_rate,
        )
    }

    /// `preview_cost` on behalf of `actor`, defaulting the end to now.
    pub async fn preview_for(
        &self,
        actor: &Actor,
        reservation_id: Uuid,
        end_time: Option<CivilTime>,
    ) -> ParkingResult<CostQuote> {
        let reservation = self.get(reservation_id).await?;
        actor.require_owner_or_admin(reservation.user_id)?;
        let end_time = end_time.unwrap_or_else(|| self.clock.now().into());
        self.preview_cost(reservation_id, end_time).await
    }

    /// Closes the reservation at `end_time`, stores its cost and frees the
    /// spot, as one unit.
    pub async fn close(
        &self,
        reservation_id: Uuid,
        end_time: CivilTime,
    ) -> ParkingResult<Reservation> {
        let end_time = self.zone.normalize(end_time)?.with_timezone(&Utc);
        let reservation = self
            .store
            .close_reservation(reservation_id, end_time, self.zone)
            .await
            .map_err(|e| {
                warn!(reservation_id = %reservation_id, error = %e, "Reservation was not closed");
                e
            })?;
        info!(
            reservation_id = %reservation.id,
            spot_id = %reservation.spot_id,
            user_id = %reservation.user_id,
            total_cost = ?reservation.total_cost,
            "Reservation closed"
        );
        Ok(reservation)
    }

    /// Closes `actor`'s reservation now.
    pub async fn release(&self, actor: &Actor, reservation_id: Uuid) -> ParkingResult<Reservation> {
        let reservation = self.get(reservation_id).await?;
        actor.require_owner_or_admin(reservation.user_id)?;
        self.close(reservation_id, self.clock.now().into()).await
    }

    pub async fn get(&self, reservation_id: Uuid) -> ParkingResult<Reservation> {
        self.store
            .get_reservation(reservation_id)
            .await?
            .ok_or(ParkingError::ReservationNotFound(reservation_id))
    }

    pub async fn active_for(&self, user_id: Uuid) -> ParkingResult<Option<Reservation>> {
        self.store.open_reservation_for_user(user_id).await
    }

    /// The user's reservations, newest first.
    pub async fn history(&self, user_id: Uuid) -> ParkingResult<Vec<ReservationView>> {
        let rows = self.store.reservations_for_user(user_id).await?;
        Ok(rows.into_iter().map(ReservationView::from).collect())
    }
}
