use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Upper bound on spots per lot. Labels A1..J10 fill it exactly.
pub const MAX_SPOTS_PER_LOT: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "spot_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SpotStatus {
    Available,
    Occupied,
}

impl SpotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SpotStatus::Available => "available",
            SpotStatus::Occupied => "occupied",
        }
    }
}

impl std::fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Spot {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub label: String,
    pub position: i32,
    pub status: SpotStatus,
    pub created_at: DateTime<Utc>,
}

impl Spot {
    pub fn new(lot_id: Uuid, position: i32, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            lot_id,
            label: spot_label(position),
            position,
            status: SpotStatus::Available,
            created_at,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == SpotStatus::Available
    }
}

/// Label for the spot at 1-based `position`: A1..A10, B1..B10, ...
pub fn spot_label(position: i32) -> String {
    let index = (position - 1).max(0) as u32;
    let section = char::from_u32('A' as u32 + index / 10).unwrap_or('?');
    format!("{}{}", section, index % 10 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_wrap_every_ten_spots() {
        let labels: Vec<String> = (1..=12).map(spot_label).collect();
        assert_eq!(
            labels,
            vec!["A1", "A2", "A3", "A4", "A5", "A6", "A7", "A8", "A9", "A10", "B1", "B2"]
        );
    }

    #[test]
    fn last_label_at_capacity_bound() {
        assert_eq!(spot_label(MAX_SPOTS_PER_LOT), "J10");
        assert_eq!(spot_label(91), "J1");
    }

    #[test]
    fn new_spot_starts_available() {
        let lot_id = Uuid::new_v4();
        let spot = Spot::new(lot_id, 11, Utc::now());
        assert_eq!(spot.label, "B1");
        assert!(spot.is_available());
        assert_eq!(spot.lot_id, lot_id);
    }
}
