pub mod events;
pub mod seat;
