use thiserror::Error;
use uuid::Uuid;

use crate::models::SpotStatus;

/// Broad classification used at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    StateConflict,
    PermissionDenied,
    Internal,
}

#[derive(Debug, Error)]
pub enum ParkingError {
    #[error("parking lot {0} was not found")]
    LotNotFound(Uuid),

    #[error("parking spot {0} was not found")]
    SpotNotFound(Uuid),

    #[error("reservation {0} was not found")]
    ReservationNotFound(Uuid),

    #[error("{0}")]
    Validation(String),

    #[error("a parking lot named '{0}' already exists")]
    DuplicateLotName(String),

    #[error("no available spot in parking lot {0}")]
    NoAvailableSpot(Uuid),

    #[error("parking spot {0} is not available")]
    SpotUnavailable(Uuid),

    #[error("user {0} already holds an active reservation")]
    UserAlreadyActive(Uuid),

    #[error("reservation {0} is already closed")]
    ReservationAlreadyClosed(Uuid),

    #[error("end time is before the reservation start")]
    InvalidTimeRange,

    #[error("parking spot {spot_id} is already {status}")]
    InvalidStateTransition { spot_id: Uuid, status: SpotStatus },

    #[error("parking lot {0} has occupied spots")]
    LotHasOccupiedSpots(Uuid),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("storage error")]
    Storage(#[from] sqlx::Error),
}

impl ParkingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParkingError::LotNotFound(_)
            | ParkingError::SpotNotFound(_)
            | ParkingError::ReservationNotFound(_) => ErrorKind::NotFound,
            ParkingError::Validation(_) | ParkingError::DuplicateLotName(_) => {
                ErrorKind::Validation
            }
            ParkingError::NoAvailableSpot(_)
            | ParkingError::SpotUnavailable(_)
            | ParkingError::UserAlreadyActive(_)
            | ParkingError::ReservationAlreadyClosed(_)
            | ParkingError::InvalidTimeRange
            | ParkingError::InvalidStateTransition { .. }
            | ParkingError::LotHasOccupiedSpots(_) => ErrorKind::StateConflict,
            ParkingError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ParkingError::Storage(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        ParkingError::Validation(msg.into())
    }
}

pub type ParkingResult<T> = Result<T, ParkingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_are_classified_together() {
        let id = Uuid::new_v4();
        for err in [
            ParkingError::SpotUnavailable(id),
            ParkingError::UserAlreadyActive(id),
            ParkingError::ReservationAlreadyClosed(id),
            ParkingError::InvalidTimeRange,
            ParkingError::LotHasOccupiedSpots(id),
        ] {
            assert_eq!(err.kind(), ErrorKind::StateConflict, "{err}");
        }
    }

    #[test]
    fn storage_errors_are_internal() {
        let err = ParkingError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.to_string(), "storage error");
    }
}
