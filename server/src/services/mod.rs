pub mod actor;
pub mod billing;
pub mod clock;
pub mod error;
pub mod ledger;
pub mod lots;
pub mod registry;
pub mod seed;

pub use actor::Actor;
pub use clock::{CivilTime, CivilZone, Clock, FixedClock, SystemClock};
pub use error::{ErrorKind, ParkingError, ParkingResult};
pub use ledger::ReservationLedger;
pub use lots::LotManager;
pub use registry::SpotRegistry;
