//! Demo lots for development databases.

use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::models::NewLot;
use crate::services::actor::Actor;
use crate::services::error::ParkingResult;
use crate::services::lots::LotManager;

fn demo_lots() -> Vec<NewLot> {
    [
        ("Central Mall Parking", "123 Main Street, Downtown Area", "123456", 25, 15),
        ("City Center Garage", "456 Park Avenue, Midtown District", "654321", 20, 12),
        ("Airport Parking Zone", "789 Airport Road, Terminal 1", "789012", 30, 20),
        ("Shopping Complex Parking", "321 Market Street, Commercial Area", "456789", 18, 10),
    ]
    .into_iter()
    .map(|(name, address, postal_code, rate, capacity)| NewLot {
        name: name.to_string(),
        address: address.to_string(),
        postal_code: postal_code.to_string(),
        hourly_rate: Decimal::from(rate),
        capacity,
    })
    .collect()
}

/// Creates the demo lots unless some lot already exists. Returns how many
/// were created.
pub async fn seed_demo_data(lots: &LotManager) -> ParkingResult<usize> {
    if !lots.list().await?.is_empty() {
        info!("Demo data already present");
        return Ok(0);
    }
    let system = Actor::admin(Uuid::nil());
    let mut created = 0;
    for lot in demo_lots() {
        lots.create(&system, lot).await?;
        created += 1;
    }
    info!(lots = created, "Demo parking lots created");
    Ok(created)
}
