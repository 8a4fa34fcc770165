use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: Uuid,
    pub spot_id: Uuid,
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    /// `None` while the reservation is open.
    pub end_time: Option<DateTime<Utc>>,
    /// Rate captured when the reservation was opened.
    pub hourly_rate: Decimal,
    pub total_cost: Option<Decimal>,
    pub vehicle_number: String,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// Everything needed to open a reservation on a specific spot.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub user_id: Uuid,
    pub spot_id: Uuid,
    pub hourly_rate: Decimal,
    pub vehicle_number: String,
    pub start_time: DateTime<Utc>,
}

impl NewReservation {
    pub fn into_reservation(self, created_at: DateTime<Utc>) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            spot_id: self.spot_id,
            user_id: self.user_id,
            start_time: self.start_time,
            end_time: None,
            hourly_rate: self.hourly_rate,
            total_cost: None,
            vehicle_number: self.vehicle_number,
            created_at,
        }
    }
}

/// Reservation joined with the spot and lot it refers to.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReservationDetails {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub reservation: Reservation,
    pub spot_label: String,
    pub lot_id: Uuid,
    pub lot_name: String,
}
