use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lot {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub postal_code: String,
    pub hourly_rate: Decimal,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a lot.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLot {
    pub name: String,
    pub address: String,
    pub postal_code: String,
    pub hourly_rate: Decimal,
    pub capacity: i32,
}

/// Partial edit of a lot. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LotChanges {
    pub name: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub hourly_rate: Option<Decimal>,
    pub capacity: Option<i32>,
}

impl LotChanges {
    pub fn apply_to(self, mut lot: Lot) -> Lot {
        if let Some(name) = self.name {
            lot.name = name;
        }
        if let Some(address) = self.address {
            lot.address = address;
        }
        if let Some(postal_code) = self.postal_code {
            lot.postal_code = postal_code;
        }
        if let Some(rate) = self.hourly_rate {
            lot.hourly_rate = rate;
        }
        if let Some(capacity) = self.capacity {
            lot.capacity = capacity;
        }
        lot
    }
}

/// A lot together with its occupancy aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct LotSummary {
    #[serde(flatten)]
    pub lot: Lot,
    pub total_spots: i64,
    pub available_spots: i64,
    pub occupied_spots: i64,
    pub occupancy_percentage: f64,
}

impl LotSummary {
    pub fn new(lot: Lot, total_spots: i64, occupied_spots: i64) -> Self {
        Self {
            lot,
            total_spots,
            available_spots: total_spots - occupied_spots,
            occupied_spots,
            occupancy_percentage: occupancy_percentage(occupied_spots, total_spots),
        }
    }
}

/// `occupied / total * 100`, one decimal place. Zero for an empty lot.
pub fn occupancy_percentage(occupied: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let pct = occupied as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot() -> Lot {
        Lot {
            id: Uuid::new_v4(),
            name: "City Center Garage".to_string(),
            address: "456 Park Avenue".to_string(),
            postal_code: "654321".to_string(),
            hourly_rate: Decimal::new(2000, 2),
            capacity: 12,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_lot_has_zero_occupancy() {
        assert_eq!(occupancy_percentage(0, 0), 0.0);
    }

    #[test]
    fn occupancy_rounds_to_one_decimal() {
        assert_eq!(occupancy_percentage(1, 3), 33.3);
        assert_eq!(occupancy_percentage(2, 3), 66.7);
        assert_eq!(occupancy_percentage(12, 12), 100.0);
    }

    #[test]
    fn summary_derives_available_count() {
        let summary = LotSummary::new(lot(), 12, 5);
        assert_eq!(summary.available_spots, 7);
        assert_eq!(summary.occupancy_percentage, 41.7);
    }

    #[test]
    fn changes_only_touch_present_fields() {
        let before = lot();
        let after = LotChanges {
            hourly_rate: Some(Decimal::new(3000, 2)),
            ..Default::default()
        }
        .apply_to(before.clone());
        assert_eq!(after.hourly_rate, Decimal::new(3000, 2));
        assert_eq!(after.name, before.name);
        assert_eq!(after.capacity, before.capacity);
    }
}
