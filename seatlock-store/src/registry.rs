use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream, StreamExt};
use seatlock_core::{CancellationHandle, CoreError, CoreResult};
use seatlock_shared::{LockSummary, SeatSnapshot, SeatState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use uuid::Uuid;

/// A temporary, owner-scoped claim on a seat.
///
/// Each lock or extension creates a new instance with its own id, which the
/// expiry callback uses to tell whether it still applies. The expiry handle
/// is owned here and canceled when the lock is dropped.
#[derive(Debug)]
pub struct ActiveLock {
    id: Uuid,
    owner: String,
    expires_at: DateTime<Utc>,
    deadline: Instant,
    expiry: Option<CancellationHandle>,
}

impl ActiveLock {
    /// Fails if `ttl` puts the deadline past what either clock can represent.
    pub fn new(owner: &str, ttl: Duration) -> CoreResult<Self> {
        let out_of_range = || CoreError::ValidationError(format!("lock duration {:?} is out of range", ttl));
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|wall_ttl| Utc::now().checked_add_signed(wall_ttl))
            .ok_or_else(out_of_range)?;
        let deadline = Instant::now().checked_add(ttl).ok_or_else(out_of_range)?;

        Ok(Self {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            expires_at,
            deadline,
            expiry: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_held_by(&self, owner: &str) -> bool {
        self.owner == owner
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn attach_expiry(&mut self, handle: CancellationHandle) {
        if let Some(previous) = self.expiry.replace(handle) {
            previous.cancel();
        }
    }

    /// Cancel the pending expiry callback, if any. Idempotent.
    pub fn cancel_expiry(&mut self) {
        if let Some(handle) = self.expiry.take() {
            handle.cancel();
        }
    }

    pub fn summary(&self) -> LockSummary {
        LockSummary {
            user_id: self.owner.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// The three mutually exclusive seat states. Lock data only exists while
/// locked and an owner only exists once booked.
#[derive(Debug)]
pub enum SeatStatus {
    Available,
    Locked(ActiveLock),
    Booked { by: String },
}

impl SeatStatus {
    pub fn state(&self) -> SeatState {
        match self {
            SeatStatus::Available => SeatState::Available,
            SeatStatus::Locked(_) => SeatState::Locked,
            SeatStatus::Booked { .. } => SeatState::Booked,
        }
    }
}

#[derive(Debug)]
pub struct Seat {
    id: u32,
    label: String,
    pub status: SeatStatus,
}

impl Seat {
    fn new(id: u32, label: String) -> Self {
        Self {
            id,
            label,
            status: SeatStatus::Available,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> SeatState {
        self.status.state()
    }

    pub fn active_lock(&self) -> Option<&ActiveLock> {
        match &self.status {
            SeatStatus::Locked(lock) => Some(lock),
            _ => None,
        }
    }

    pub fn booked_by(&self) -> Option<&str> {
        match &self.status {
            SeatStatus::Booked { by } => Some(by),
            _ => None,
        }
    }

    /// Swap in a new status, handing back the previous one so the caller
    /// decides when its lock (and timer) goes away.
    pub fn replace_status(&mut self, status: SeatStatus) -> SeatStatus {
        std::mem::replace(&mut self.status, status)
    }

    pub fn snapshot(&self) -> SeatSnapshot {
        SeatSnapshot {
            id: self.id,
            label: self.label.clone(),
            state: self.state(),
            lock: self.active_lock().map(ActiveLock::summary),
            booked_by: self.booked_by().map(str::to_string),
        }
    }
}

/// One seat behind its own mutex. Identity is readable without locking.
#[derive(Debug)]
pub struct SeatSlot {
    id: u32,
    label: String,
    seat: Mutex<Seat>,
}

impl SeatSlot {
    fn new(id: u32, label: String) -> Self {
        Self {
            id,
            seat: Mutex::new(Seat::new(id, label.clone())),
            label,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Exclusive access to this seat's state. Hold it across the whole
    /// read-decide-write sequence and never across I/O.
    pub async fn acquire(&self) -> MutexGuard<'_, Seat> {
        self.seat.lock().await
    }

    pub async fn snapshot(&self) -> SeatSnapshot {
        self.acquire().await.snapshot()
    }
}

/// Fixed grid of seats created at startup.
#[derive(Debug)]
pub struct SeatRegistry {
    seats: Vec<Arc<SeatSlot>>,
}

impl SeatRegistry {
    pub const MAX_ROWS: u32 = 26;

    /// Build a `rows` x `cols` grid. Labels are a row letter followed by a
    /// 1-indexed column; ids run from 1 in row-major order.
    pub fn initialize(rows: u32, cols: u32) -> CoreResult<Self> {
        if rows == 0 || rows > Self::MAX_ROWS {
            return Err(CoreError::ValidationError(format!(
                "rows must be between 1 and {}, got {}",
                Self::MAX_ROWS,
                rows
            )));
        }
        if cols == 0 {
            return Err(CoreError::ValidationError("cols must be at least 1".to_string()));
        }

        let mut seats = Vec::with_capacity((rows * cols) as usize);
        let mut next_id = 1;
        for r in 0..rows {
            let row_letter = (b'A' + r as u8) as char;
            for c in 0..cols {
                let label = format!("{}{}", row_letter, c + 1);
                seats.push(Arc::new(SeatSlot::new(next_id, label)));
                next_id += 1;
            }
        }

        tracing::info!("Seat registry initialized with {} seats ({}x{})", seats.len(), rows, cols);
        Ok(Self { seats })
    }

    pub fn get(&self, id: u32) -> CoreResult<Arc<SeatSlot>> {
        id.checked_sub(1)
            .and_then(|idx| self.seats.get(idx as usize))
            .cloned()
            .ok_or(CoreError::SeatNotFound(id))
    }

    pub async fn snapshot(&self, id: u32) -> CoreResult<SeatSnapshot> {
        Ok(self.get(id)?.snapshot().await)
    }

    /// Snapshots in seat order, taken one seat at a time as the stream is polled.
    pub fn list(&self) -> impl Stream<Item = SeatSnapshot> + '_ {
        stream::iter(self.seats.iter()).then(|slot| slot.snapshot())
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_grid_labels_and_ids() {
        let registry = SeatRegistry::initialize(3, 6).unwrap();
        assert_eq!(registry.len(), 18);

        let snapshots: Vec<SeatSnapshot> = registry.list().collect().await;
        assert_eq!(snapshots[0].id, 1);
        assert_eq!(snapshots[0].label, "A1");
        assert_eq!(snapshots[5].label, "A6");
        assert_eq!(snapshots[6].label, "B1");
        assert_eq!(snapshots[17].id, 18);
        assert_eq!(snapshots[17].label, "C6");
        assert!(snapshots.iter().all(|s| s.is_available() && s.lock.is_none() && s.booked_by.is_none()));
    }

    #[test]
    fn test_rejects_invalid_dimensions() {
        assert!(matches!(SeatRegistry::initialize(0, 6), Err(CoreError::ValidationError(_))));
        assert!(matches!(SeatRegistry::initialize(27, 6), Err(CoreError::ValidationError(_))));
        assert!(matches!(SeatRegistry::initialize(3, 0), Err(CoreError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_get_unknown_seat() {
        let registry = SeatRegistry::initialize(1, 2).unwrap();
        assert_eq!(registry.get(0).unwrap_err(), CoreError::SeatNotFound(0));
        assert_eq!(registry.get(3).unwrap_err(), CoreError::SeatNotFound(3));
        assert_eq!(registry.get(2).unwrap().label(), "A2");
        assert!(registry.snapshot(9).await.is_err());
    }

    #[tokio::test]
    async fn test_lock_duration_out_of_range() {
        let err = ActiveLock::new("alice", Duration::from_secs(u64::MAX / 2)).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
        assert!(ActiveLock::new("alice", Duration::from_secs(86_400)).is_ok());
    }

    #[tokio::test]
    async fn test_snapshot_reflects_status() {
        let registry = SeatRegistry::initialize(1, 1).unwrap();
        let slot = registry.get(1).unwrap();

        {
            let mut seat = slot.acquire().await;
            seat.replace_status(SeatStatus::Locked(ActiveLock::new("alice", Duration::from_secs(60)).unwrap()));
        }
        let locked = slot.snapshot().await;
        assert_eq!(locked.state, SeatState::Locked);
        assert_eq!(locked.holder(), Some("alice"));
        assert!(locked.lock.unwrap().expires_at > Utc::now());

        {
            let mut seat = slot.acquire().await;
            seat.replace_status(SeatStatus::Booked { by: "alice".to_string() });
        }
        let booked = registry.snapshot(1).await.unwrap();
        assert_eq!(booked.state, SeatState::Booked);
        assert!(booked.lock.is_none());
        assert_eq!(booked.booked_by.as_deref(), Some("alice"));
    }
}
