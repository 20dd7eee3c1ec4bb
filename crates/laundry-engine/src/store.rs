//! Reservation storage.
//!
//! [`ReservationStore`] is the boundary to whatever persists reservations.
//! Its one mutating create operation, [`ReservationStore::insert_if_free`],
//! must re-check overlap and insert as a single atomic step per resource, so
//! two concurrent requests for the same slot cannot both succeed.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::conflict::find_conflicts;
use crate::error::{BookingError, Result};
use crate::model::{NewReservation, Reservation, ReservationId, Resource, TimeRange, UserId};

pub trait ReservationStore: Send + Sync {
    /// Reservations on `resource` with `start < range.end && end > range.start`.
    fn find_overlapping(&self, resource: Resource, range: &TimeRange) -> Result<Vec<Reservation>>;

    /// Insert `new` unless it overlaps an existing reservation on the same
    /// resource. The check and the insert are atomic.
    ///
    /// # Errors
    /// Returns `BookingError::SlotUnavailable` on overlap.
    fn insert_if_free(&self, new: NewReservation) -> Result<Reservation>;

    /// # Errors
    /// Returns `BookingError::NotFound` if no reservation has this id.
    fn delete(&self, id: ReservationId) -> Result<()>;

    fn find_by_id(&self, id: ReservationId) -> Result<Option<Reservation>>;

    fn find_by_owner(&self, owner: UserId) -> Result<Vec<Reservation>>;

    /// Reservations on any resource lying entirely inside `range`.
    fn find_in_range(&self, range: &TimeRange) -> Result<Vec<Reservation>>;

    /// Reservations on any resource whose start lies in `[range.start, range.end)`.
    fn find_starting_between(&self, range: &TimeRange) -> Result<Vec<Reservation>>;
}

/// In-memory store. Each resource has its own ledger, locked independently,
/// kept sorted by start time.
#[derive(Debug)]
pub struct InMemoryStore {
    ledgers: DashMap<Resource, Vec<Reservation>>,
    id_counter: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let ledgers = DashMap::new();
        for resource in Resource::ALL {
            ledgers.insert(resource, Vec::new());
        }
        Self {
            ledgers,
            id_counter: AtomicU64::new(1),
        }
    }

    /// Rebuild a store from previously persisted reservations.
    ///
    /// # Errors
    /// Returns `BookingError::SlotUnavailable` if two reservations on the same
    /// resource overlap.
    pub fn restore(reservations: Vec<Reservation>) -> Result<Self> {
        let store = Self::new();
        let mut max_id = 0;
        for reservation in reservations {
            max_id = max_id.max(reservation.id.0);
            let mut ledger = store.ledgers.entry(reservation.resource).or_default();
            if ledger.iter().any(|r| r.range.overlaps(&reservation.range)) {
                return Err(BookingError::SlotUnavailable);
            }
            insert_sorted(&mut ledger, reservation);
        }
        store.id_counter.store(max_id + 1, Ordering::SeqCst);
        Ok(store)
    }

    /// Every reservation, ordered by start time then resource.
    pub fn snapshot(&self) -> Vec<Reservation> {
        let mut all = self.collect(|_| true);
        all.sort_by_key(|r| (r.start(), r.resource, r.id));
        all
    }

    pub fn len(&self) -> usize {
        self.ledgers.iter().map(|ledger| ledger.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collect(&self, keep: impl Fn(&Reservation) -> bool) -> Vec<Reservation> {
        let mut out: Vec<Reservation> = self
            .ledgers
            .iter()
            .flat_map(|ledger| {
                ledger
                    .iter()
                    .filter(|r| keep(r))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        out.sort_by_key(|r| (r.start(), r.resource));
        out
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_sorted(ledger: &mut Vec<Reservation>, reservation: Reservation) {
    let at = ledger.partition_point(|r| r.start() < reservation.start());
    ledger.insert(at, reservation);
}

impl ReservationStore for InMemoryStore {
    fn find_overlapping(&self, resource: Resource, range: &TimeRange) -> Result<Vec<Reservation>> {
        let Some(ledger) = self.ledgers.get(&resource) else {
            return Ok(Vec::new());
        };
        Ok(find_conflicts(ledger.iter(), range)
            .into_iter()
            .map(|c| c.existing)
            .collect())
    }

    fn insert_if_free(&self, new: NewReservation) -> Result<Reservation> {
        // The entry guard holds this resource's shard lock until it drops.
        let mut ledger = self.ledgers.entry(new.resource).or_default();
        if ledger.iter().any(|r| r.range.overlaps(&new.range)) {
            return Err(BookingError::SlotUnavailable);
        }
        let id = ReservationId(self.id_counter.fetch_add(1, Ordering::SeqCst));
        let reservation = Reservation::from_new(id, new);
        insert_sorted(&mut ledger, reservation.clone());
        Ok(reservation)
    }

    fn delete(&self, id: ReservationId) -> Result<()> {
        for mut ledger in self.ledgers.iter_mut() {
            if let Some(pos) = ledger.iter().position(|r| r.id == id) {
                ledger.remove(pos);
                return Ok(());
            }
        }
        Err(BookingError::NotFound(id))
    }

    fn find_by_id(&self, id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self.collect(|r| r.id == id).into_iter().next())
    }

    fn find_by_owner(&self, owner: UserId) -> Result<Vec<Reservation>> {
        Ok(self.collect(|r| r.owner == owner))
    }

    fn find_in_range(&self, range: &TimeRange) -> Result<Vec<Reservation>> {
        Ok(self.collect(|r| range.contains(&r.range)))
    }

    fn find_starting_between(&self, range: &TimeRange) -> Result<Vec<Reservation>> {
        Ok(self.collect(|r| range.contains_instant(r.start())))
    }
}
