use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a seat as seen by callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    Available,
    Locked,
    Booked,
}

impl std::fmt::Display for SeatState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeatState::Available => write!(f, "available"),
            SeatState::Locked => write!(f, "locked"),
            SeatState::Booked => write!(f, "booked"),
        }
    }
}

/// Public view of an active lock. Expiry is reported in epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LockSummary {
    pub user_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub booked_by: String,
}

/// Immutable copy of a seat. Never carries the internal timer handle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatSnapshot {
    pub id: u32,
    pub label: String,
    pub state: SeatState,
    pub lock: Option<LockSummary>,
    pub booked_by: Option<String>,
}

impl SeatSnapshot {
    pub fn is_available(&self) -> bool {
        self.state == SeatState::Available
    }

    /// Current lock holder, if the seat is locked
    pub fn holder(&self) -> Option<&str> {
        self.lock.as_ref().map(|l| l.user_id.as_str())
    }
}
