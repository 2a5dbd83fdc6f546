pub mod expiry;

pub use expiry::{CancellationHandle, ExpiryScheduler, SchedulerStats};

/// Coarse classification used by transport layers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Forbidden,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Seat not found: {0}")]
    SeatNotFound(u32),
    #[error("Seat {label} is already booked by '{booked_by}'.")]
    AlreadyBooked { label: String, booked_by: String },
    #[error("Seat {label} is already locked by another user.")]
    LockedByOther { label: String, holder: String },
    #[error("Seat {label} is already locked by '{holder}'; lock extension is disabled.")]
    ExtensionDisabled { label: String, holder: String },
    #[error("Seat {label} is not locked.")]
    NotLocked { label: String },
    #[error("Seat {label} is not locked. Please lock the seat before confirming.")]
    LockRequired { label: String },
    #[error("You ('{caller}') do not hold the lock for seat {label}. Locked by '{holder}'.")]
    NotLockHolder {
        label: String,
        caller: String,
        holder: String,
    },
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ValidationError(_) => ErrorKind::Validation,
            CoreError::SeatNotFound(_) => ErrorKind::NotFound,
            CoreError::NotLockHolder { .. } => ErrorKind::Forbidden,
            CoreError::AlreadyBooked { .. }
            | CoreError::LockedByOther { .. }
            | CoreError::ExtensionDisabled { .. }
            | CoreError::NotLocked { .. }
            | CoreError::LockRequired { .. } => ErrorKind::Conflict,
        }
    }

    /// Current lock holder or booking owner, where the error involves one
    pub fn holder(&self) -> Option<&str> {
        match self {
            CoreError::LockedByOther { holder, .. }
            | CoreError::ExtensionDisabled { holder, .. }
            | CoreError::NotLockHolder { holder, .. } => Some(holder),
            CoreError::AlreadyBooked { booked_by, .. } => Some(booked_by),
            _ => None,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let forbidden = CoreError::NotLockHolder {
            label: "A1".to_string(),
            caller: "bob".to_string(),
            holder: "alice".to_string(),
        };
        assert_eq!(forbidden.kind(), ErrorKind::Forbidden);
        assert_eq!(forbidden.holder(), Some("alice"));
        assert_eq!(
            forbidden.to_string(),
            "You ('bob') do not hold the lock for seat A1. Locked by 'alice'."
        );

        let booked = CoreError::AlreadyBooked {
            label: "A1".to_string(),
            booked_by: "alice".to_string(),
        };
        assert_eq!(booked.kind(), ErrorKind::Conflict);
        assert!(booked.to_string().contains("already booked"));

        assert_eq!(CoreError::SeatNotFound(99).kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::ValidationError("userId is required".into()).kind(),
            ErrorKind::Validation
        );
    }
}
