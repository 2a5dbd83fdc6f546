use seatlock_core::{CoreError, CoreResult, ExpiryScheduler};
use seatlock_shared::{LockSummary, SeatEvent, SeatEventKind, SeatSnapshot};
use seatlock_store::{ActiveLock, EventProducer, Seat, SeatRegistry, SeatSlot, SeatStatus};
use seatlock_store::app_config::BusinessRules;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// TTL applied to every lock, plus whether holders may refresh it.
#[derive(Debug, Clone)]
pub struct LockPolicy {
    pub ttl: Duration,
    pub allow_extension: bool,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            allow_extension: true,
        }
    }
}

impl From<&BusinessRules> for LockPolicy {
    fn from(rules: &BusinessRules) -> Self {
        Self {
            ttl: rules.seat_hold(),
            allow_extension: rules.allow_lock_extension,
        }
    }
}

/// Result of a successful lock request
#[derive(Debug, Clone)]
pub struct LockGrant {
    pub lock: LockSummary,
    pub seat: SeatSnapshot,
    pub extended: bool,
}

/// Drives the seat state machine. Every transition runs while holding the
/// target seat's mutex, so the state check and the write that depends on it
/// cannot interleave with another request for the same seat.
pub struct LockManager {
    registry: Arc<SeatRegistry>,
    scheduler: ExpiryScheduler,
    events: EventProducer,
    policy: LockPolicy,
}

impl LockManager {
    pub fn new(
        registry: Arc<SeatRegistry>,
        scheduler: ExpiryScheduler,
        events: EventProducer,
        policy: LockPolicy,
    ) -> Self {
        Self {
            registry,
            scheduler,
            events,
            policy,
        }
    }

    pub fn registry(&self) -> &Arc<SeatRegistry> {
        &self.registry
    }

    pub fn scheduler(&self) -> &ExpiryScheduler {
        &self.scheduler
    }

    pub fn events(&self) -> &EventProducer {
        &self.events
    }

    pub fn policy(&self) -> &LockPolicy {
        &self.policy
    }

    /// Transition: Available → Locked, or refresh a lock the caller already holds.
    ///
    /// A refresh installs a new lock instance with the full TTL measured from
    /// now and cancels the previous expiry timer.
    pub async fn lock(&self, seat_id: u32, owner: &str) -> CoreResult<LockGrant> {
        let slot = self.registry.get(seat_id)?;
        let mut seat = slot.acquire().await;
        let reaped = reap_if_expired(&mut seat);

        let extended = match &seat.status {
            SeatStatus::Available => false,
            SeatStatus::Locked(current) if current.is_held_by(owner) && self.policy.allow_extension => true,
            SeatStatus::Locked(current) if current.is_held_by(owner) => {
                return Err(CoreError::ExtensionDisabled {
                    label: seat.label().to_string(),
                    holder: current.owner().to_string(),
                });
            }
            SeatStatus::Locked(current) => {
                return Err(CoreError::LockedByOther {
                    label: seat.label().to_string(),
                    holder: current.owner().to_string(),
                });
            }
            SeatStatus::Booked { by } => {
                return Err(CoreError::AlreadyBooked {
                    label: seat.label().to_string(),
                    booked_by: by.clone(),
                });
            }
        };

        let mut lock = match ActiveLock::new(owner, self.policy.ttl) {
            Ok(lock) => lock,
            Err(err) => {
                self.publish_expired(&slot, reaped);
                return Err(err);
            }
        };
        if let SeatStatus::Locked(previous) = &mut seat.status {
            previous.cancel_expiry();
        }

        let target = Arc::clone(&slot);
        let lock_id = lock.id();
        let events = self.events.clone();
        let handle = self
            .scheduler
            .schedule(self.policy.ttl, move || expire_lock(target, lock_id, events));
        lock.attach_expiry(handle);

        let summary = lock.summary();
        // Dropping the previous instance here; its timer is already canceled.
        let _previous = seat.replace_status(SeatStatus::Locked(lock));
        let snapshot = seat.snapshot();

        self.publish_expired(&slot, reaped);
        let kind = if extended {
            info!("Lock extended for seat {} by '{}'", slot.label(), owner);
            SeatEventKind::Extended
        } else {
            info!("Seat {} locked for '{}' ({:?})", slot.label(), owner, self.policy.ttl);
            SeatEventKind::Locked
        };
        self.events.publish(SeatEvent::new(slot.id(), slot.label(), kind, owner));
        drop(seat);

        Ok(LockGrant {
            lock: summary,
            seat: snapshot,
            extended,
        })
    }

    /// Transition: Locked(owner) → Booked(owner)
    pub async fn confirm(&self, seat_id: u32, owner: &str) -> CoreResult<SeatSnapshot> {
        let slot = self.registry.get(seat_id)?;
        let mut seat = slot.acquire().await;
        let reaped = reap_if_expired(&mut seat);

        let denied = match &seat.status {
            SeatStatus::Available => Some(CoreError::LockRequired {
                label: seat.label().to_string(),
            }),
            SeatStatus::Booked { by } => Some(CoreError::AlreadyBooked {
                label: seat.label().to_string(),
                booked_by: by.clone(),
            }),
            SeatStatus::Locked(current) if !current.is_held_by(owner) => Some(CoreError::NotLockHolder {
                label: seat.label().to_string(),
                caller: owner.to_string(),
                holder: current.owner().to_string(),
            }),
            SeatStatus::Locked(_) => None,
        };
        if let Some(err) = denied {
            self.publish_expired(&slot, reaped);
            return Err(err);
        }

        let previous = seat.replace_status(SeatStatus::Booked {
            by: owner.to_string(),
        });
        if let SeatStatus::Locked(mut lock) = previous {
            lock.cancel_expiry();
        }
        let snapshot = seat.snapshot();

        info!("Seat {} booked by '{}'", slot.label(), owner);
        self.events
            .publish(SeatEvent::new(slot.id(), slot.label(), SeatEventKind::Confirmed, owner));
        drop(seat);
        Ok(snapshot)
    }

    /// Transition: Locked(owner) → Available
    pub async fn release(&self, seat_id: u32, owner: &str) -> CoreResult<SeatSnapshot> {
        let slot = self.registry.get(seat_id)?;
        let mut seat = slot.acquire().await;
        let reaped = reap_if_expired(&mut seat);

        let denied = match &seat.status {
            SeatStatus::Available | SeatStatus::Booked { .. } => Some(CoreError::NotLocked {
                label: seat.label().to_string(),
            }),
            SeatStatus::Locked(current) if !current.is_held_by(owner) => Some(CoreError::NotLockHolder {
                label: seat.label().to_string(),
                caller: owner.to_string(),
                holder: current.owner().to_string(),
            }),
            SeatStatus::Locked(_) => None,
        };
        if let Some(err) = denied {
            self.publish_expired(&slot, reaped);
            return Err(err);
        }

        if let SeatStatus::Locked(mut lock) = seat.replace_status(SeatStatus::Available) {
            lock.cancel_expiry();
        }
        let snapshot = seat.snapshot();

        info!("Lock released for seat {} by '{}'", slot.label(), owner);
        self.events
            .publish(SeatEvent::new(slot.id(), slot.label(), SeatEventKind::Released, owner));
        drop(seat);
        Ok(snapshot)
    }

    /// Call with the seat guard still held so the event lands in transition order.
    fn publish_expired(&self, slot: &SeatSlot, reaped: Option<String>) {
        if let Some(owner) = reaped {
            info!("Lock expired for seat {} (held by '{}')", slot.label(), owner);
            self.events
                .publish(SeatEvent::new(slot.id(), slot.label(), SeatEventKind::Expired, &owner));
        }
    }
}

/// Drop a lock whose deadline has already passed but whose timer has not run
/// yet. Returns the former holder.
fn reap_if_expired(seat: &mut Seat) -> Option<String> {
    let expired = seat.active_lock().is_some_and(ActiveLock::is_expired);
    if !expired {
        return None;
    }
    match seat.replace_status(SeatStatus::Available) {
        SeatStatus::Locked(mut lock) => {
            lock.cancel_expiry();
            Some(lock.owner().to_string())
        }
        _ => None,
    }
}

/// Expiry callback. Only acts if the seat still carries the exact lock
/// instance the timer was scheduled for and its deadline has passed.
async fn expire_lock(slot: Arc<SeatSlot>, lock_id: Uuid, events: EventProducer) {
    let mut seat = slot.acquire().await;

    let owner = match seat.active_lock() {
        Some(lock) if lock.id() == lock_id && lock.is_expired() => lock.owner().to_string(),
        _ => {
            debug!("Ignoring stale expiry for seat {} (lock {})", slot.label(), lock_id);
            return;
        }
    };

    let _expired = seat.replace_status(SeatStatus::Available);

    info!("Lock expired (auto) for seat {}", slot.label());
    events.publish(SeatEvent::new(slot.id(), slot.label(), SeatEventKind::Expired, &owner));
}
