use seatlock_booking::{BookingFacade, LockManager, LockPolicy};
use seatlock_core::{CoreResult, ExpiryScheduler};
use seatlock_store::app_config::Config;
use seatlock_store::{EventProducer, SeatRegistry};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub facade: BookingFacade,
    pub events: EventProducer,
}

impl AppState {
    /// Build the seat grid and lock engine once for the life of the process.
    pub fn new(config: &Config) -> CoreResult<Self> {
        let registry = Arc::new(SeatRegistry::initialize(config.venue.rows, config.venue.cols)?);
        let events = EventProducer::new(config.server.event_buffer);
        let manager = LockManager::new(
            registry,
            ExpiryScheduler::new(),
            events.clone(),
            LockPolicy::from(&config.business_rules),
        );

        Ok(Self {
            facade: BookingFacade::new(Arc::new(manager)),
            events,
        })
    }
}
