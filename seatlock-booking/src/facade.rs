use crate::manager::LockManager;
use futures_util::StreamExt;
use seatlock_core::{CoreError, ErrorKind};
use seatlock_shared::{BookingSummary, LockSummary, SeatSnapshot};
use serde::Serialize;
use std::sync::Arc;

/// Transport-neutral failures. Each maps onto exactly one response class.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FacadeError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
}

impl From<CoreError> for FacadeError {
    fn from(err: CoreError) -> Self {
        match err.kind() {
            ErrorKind::Validation => match err {
                CoreError::ValidationError(msg) => FacadeError::ValidationError(msg),
                other => FacadeError::ValidationError(other.to_string()),
            },
            ErrorKind::NotFound => FacadeError::NotFound("Seat not found.".to_string()),
            ErrorKind::Conflict => FacadeError::Conflict(err.to_string()),
            ErrorKind::Forbidden => FacadeError::Forbidden(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LockReceipt {
    pub message: String,
    pub extended: bool,
    pub lock: LockSummary,
    pub seat: SeatSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    pub message: String,
    pub booking: BookingSummary,
    pub seat: SeatSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseReceipt {
    pub message: String,
    pub seat: SeatSnapshot,
}

/// Coarse seat operations for a transport layer. Only checks that required
/// input is present; every business rule lives in [`LockManager`].
#[derive(Clone)]
pub struct BookingFacade {
    manager: Arc<LockManager>,
}

impl BookingFacade {
    pub fn new(manager: Arc<LockManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<LockManager> {
        &self.manager
    }

    pub async fn list_seats(&self) -> Vec<SeatSnapshot> {
        self.manager.registry().list().collect().await
    }

    pub async fn get_seat(&self, seat_id: u32) -> Result<SeatSnapshot, FacadeError> {
        Ok(self.manager.registry().snapshot(seat_id).await?)
    }

    pub async fn lock_seat(&self, seat_id: u32, user_id: Option<&str>) -> Result<LockReceipt, FacadeError> {
        let user_id = require_user(user_id)?;
        let grant = self.manager.lock(seat_id, user_id).await?;

        let message = if grant.extended {
            format!("Lock extended for seat {} by '{}'.", grant.seat.label, user_id)
        } else {
            format!(
                "Seat {} locked for user '{}' for {} seconds.",
                grant.seat.label,
                user_id,
                self.manager.policy().ttl.as_secs()
            )
        };

        Ok(LockReceipt {
            message,
            extended: grant.extended,
            lock: grant.lock,
            seat: grant.seat,
        })
    }

    pub async fn confirm_seat(&self, seat_id: u32, user_id: Option<&str>) -> Result<BookingReceipt, FacadeError> {
        let user_id = require_user(user_id)?;
        let seat = self.manager.confirm(seat_id, user_id).await?;

        Ok(BookingReceipt {
            message: format!("Seat {} successfully booked by '{}'.", seat.label, user_id),
            booking: BookingSummary {
                booked_by: user_id.to_string(),
            },
            seat,
        })
    }

    pub async fn release_seat(&self, seat_id: u32, user_id: Option<&str>) -> Result<ReleaseReceipt, FacadeError> {
        let user_id = require_user(user_id)?;
        let seat = self.manager.release(seat_id, user_id).await?;

        Ok(ReleaseReceipt {
            message: format!("Lock released for seat {} by '{}'.", seat.label, user_id),
            seat,
        })
    }
}

fn require_user(user_id: Option<&str>) -> Result<&str, FacadeError> {
    match user_id.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(FacadeError::ValidationError("userId is required in body.".to_string())),
    }
}
