pub mod lot;
pub mod reservation;
pub mod spot;

pub use lot::{Lot, LotChanges, LotSummary, NewLot};
pub use reservation::{NewReservation, Reservation, ReservationDetails};
pub use spot::{spot_label, Spot, SpotStatus, MAX_SPOTS_PER_LOT};
