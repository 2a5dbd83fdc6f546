pub mod facade;
pub mod manager;

pub use facade::{BookingFacade, BookingReceipt, FacadeError, LockReceipt, ReleaseReceipt};
pub use manager::{LockGrant, LockManager, LockPolicy};
