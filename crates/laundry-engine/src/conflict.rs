//! Detect reservations that overlap a proposed interval.
//!
//! Intervals are half-open. Adjacent reservations (where one ends exactly when
//! another starts) are NOT conflicts.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Reservation, Resource, TimeRange};
use crate::store::ReservationStore;

/// An existing reservation that overlaps a proposed interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub existing: Reservation,
    pub overlap_minutes: i64,
}

/// Find every reservation in `existing` that overlaps `proposed`.
///
/// A reservation overlaps when `existing.start < proposed.end && existing.end > proposed.start`.
/// The overlap duration is `min(ends) - max(starts)`.
pub fn find_conflicts<'a, I>(existing: I, proposed: &TimeRange) -> Vec<Conflict>
where
    I: IntoIterator<Item = &'a Reservation>,
{
    existing
        .into_iter()
        .filter(|r| r.range.overlaps(proposed))
        .map(|r| {
            let overlap_start = r.start().max(proposed.start());
            let overlap_end = r.end().min(proposed.end());
            Conflict {
                existing: r.clone(),
                overlap_minutes: (overlap_end - overlap_start).num_minutes(),
            }
        })
        .collect()
}

/// Answers "is this interval free?" for one store.
pub struct ConflictChecker<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: ReservationStore + ?Sized> ConflictChecker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// True iff any reservation on `resource` overlaps `[start, end)`.
    ///
    /// # Errors
    /// Returns `BookingError::InvalidInterval` if `start >= end`, or the
    /// store's error if the query fails.
    pub fn has_conflict(
        &self,
        resource: Resource,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool> {
        let range = TimeRange::new(start, end)?;
        self.range_has_conflict(resource, &range)
    }

    /// Same as [`has_conflict`](Self::has_conflict) for an already-validated range.
    pub fn range_has_conflict(&self, resource: Resource, range: &TimeRange) -> Result<bool> {
        Ok(!self.store.find_overlapping(resource, range)?.is_empty())
    }

    /// Every reservation on `resource` overlapping `range`, with overlap minutes.
    pub fn conflicts(&self, resource: Resource, range: &TimeRange) -> Result<Vec<Conflict>> {
        let overlapping = self.store.find_overlapping(resource, range)?;
        Ok(find_conflicts(&overlapping, range))
    }
}
