pub mod models;

pub use models::events::{SeatEvent, SeatEventKind};
pub use models::seat::{BookingSummary, LockSummary, SeatSnapshot, SeatState};
