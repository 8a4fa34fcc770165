use uuid::Uuid;

use crate::services::error::{ParkingError, ParkingResult};

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl Actor {
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    pub fn require_admin(&self) -> ParkingResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ParkingError::PermissionDenied(
                "administrator privileges required".to_string(),
            ))
        }
    }

    /// Owners may act on their own records; administrators on any.
    pub fn require_owner_or_admin(&self, owner: Uuid) -> ParkingResult<()> {
        if self.is_admin || self.user_id == owner {
            Ok(())
        } else {
            Err(ParkingError::PermissionDenied(
                "reservation belongs to another user".to_string(),
            ))
        }
    }
}
