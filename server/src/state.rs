use std::sync::Arc;

use crate::services::{CivilZone, Clock, LotManager, ReservationLedger, SpotRegistry};
use crate::store::ParkingStore;

/// Shared handles every request handler works through.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ParkingStore>,
    pub lots: LotManager,
    pub registry: SpotRegistry,
    pub ledger: ReservationLedger,
}

impl AppState {
    pub fn new(store: Arc<dyn ParkingStore>, zone: CivilZone, clock: Arc<dyn Clock>) -> Self {
        Self {
            lots: LotManager::new(store.clone(), clock.clone()),
            registry: SpotRegistry::new(store.clone()),
            ledger: ReservationLedger::new(store.clone(), zone, clock),
            store,
        }
    }
}
