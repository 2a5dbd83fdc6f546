use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeatEventKind {
    Locked,
    Extended,
    Confirmed,
    Released,
    Expired,
}

impl SeatEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatEventKind::Locked => "seat_locked",
            SeatEventKind::Extended => "seat_lock_extended",
            SeatEventKind::Confirmed => "seat_confirmed",
            SeatEventKind::Released => "seat_released",
            SeatEventKind::Expired => "seat_expired",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatEvent {
    pub seat_id: u32,
    pub label: String,
    pub kind: SeatEventKind,
    pub user_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub occurred_at: DateTime<Utc>,
}

impl SeatEvent {
    pub fn new(seat_id: u32, label: &str, kind: SeatEventKind, user_id: &str) -> Self {
        Self {
            seat_id,
            label: label.to_string(),
            kind,
            user_id: user_id.to_string(),
            occurred_at: Utc::now(),
        }
    }
}
