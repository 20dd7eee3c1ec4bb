//! Next-available slot search.
//!
//! Candidates start on the first local hour boundary at least `lead_time`
//! after "now" and advance one step at a time until the horizon. A candidate
//! is only tested for conflicts when it starts inside the operating window and
//! ends no later than that day's closing time. A candidate that would run past
//! closing sends the search straight to the next day's opening hour.

use chrono::{DateTime, Duration, Utc};

use crate::config::{OperatingWindow, SearchPolicy};
use crate::conflict::ConflictChecker;
use crate::error::{BookingError, Result};
use crate::model::{NewReservation, Reservation, Resource, TimeRange, UserId};
use crate::store::ReservationStore;

/// Iterator over the candidate ranges worth testing, in search order.
#[derive(Debug, Clone)]
pub struct Candidates {
    window: OperatingWindow,
    step: Duration,
    duration: Duration,
    cursor: DateTime<Utc>,
    horizon: DateTime<Utc>,
}

impl Candidates {
    /// Candidates for a search started at `now` under `policy`.
    ///
    /// # Errors
    /// Returns `BookingError::InvalidConfig` if `policy` is out of bounds and
    /// `BookingError::InvalidInterval` if `duration_minutes` is not positive
    /// or too large to add to an instant.
    pub fn new(
        window: OperatingWindow,
        policy: SearchPolicy,
        duration_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        policy.validate()?;
        let horizon = now
            .checked_add_signed(policy.horizon())
            .ok_or(BookingError::InvalidInterval { start: now, end: now })?;
        Self::spanning(
            window,
            policy.step(),
            duration_minutes,
            first_candidate(&window, &policy, now),
            horizon,
        )
    }

    /// Candidates from `first` (taken as-is, not aligned) until `horizon`.
    pub fn spanning(
        window: OperatingWindow,
        step: Duration,
        duration_minutes: i64,
        first: DateTime<Utc>,
        horizon: DateTime<Utc>,
    ) -> Result<Self> {
        let invalid = BookingError::InvalidInterval {
            start: first,
            end: first,
        };
        if duration_minutes <= 0 || step <= Duration::zero() {
            return Err(invalid);
        }
        let Some(duration) = Duration::try_minutes(duration_minutes) else {
            return Err(invalid);
        };
        if first.checked_add_signed(duration).is_none() {
            return Err(invalid);
        }
        Ok(Self {
            window,
            step,
            duration,
            cursor: first,
            horizon,
        })
    }

    pub fn horizon(&self) -> DateTime<Utc> {
        self.horizon
    }
}

/// The first hour-aligned instant at or after `now + lead_time`.
///
/// `policy` is expected to have passed [`SearchPolicy::validate`].
pub fn first_candidate(
    window: &OperatingWindow,
    policy: &SearchPolicy,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let earliest = now + policy.lead_time();
    let floored = window.floor_to_hour(earliest);
    if floored < earliest {
        floored + Duration::hours(1)
    } else {
        floored
    }
}

impl Iterator for Candidates {
    type Item = TimeRange;

    fn next(&mut self) -> Option<TimeRange> {
        while self.cursor < self.horizon {
            let start = self.cursor;

            if !self.window.is_open_at(start) {
                self.cursor = start.checked_add_signed(self.step)?;
                continue;
            }

            let end = start.checked_add_signed(self.duration)?;
            let day = self.window.local_date(start);
            if end > self.window.closes_on(day) {
                tracing::debug!(%start, %end, "candidate runs past closing, jumping to next opening");
                self.cursor = self.window.opens_on(day.succ_opt()?);
                continue;
            }

            self.cursor = start.checked_add_signed(self.step)?;
            return Some(TimeRange::from_ordered(start, end));
        }
        None
    }
}

/// Searches one store for the earliest free candidate.
pub struct SlotFinder<'a, S: ?Sized> {
    store: &'a S,
    window: OperatingWindow,
    policy: SearchPolicy,
}

impl<'a, S: ReservationStore + ?Sized> SlotFinder<'a, S> {
    pub fn new(store: &'a S, window: OperatingWindow, policy: SearchPolicy) -> Self {
        Self {
            store,
            window,
            policy,
        }
    }

    /// The first candidate on `resource` with no conflict, without booking it.
    pub fn find_free(
        &self,
        resource: Resource,
        duration_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<TimeRange>> {
        let checker = ConflictChecker::new(self.store);
        for candidate in Candidates::new(self.window, self.policy, duration_minutes, now)? {
            if !checker.range_has_conflict(resource, &candidate)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Book the first free candidate on `resource` for `owner`.
    ///
    /// Each free candidate goes through the store's atomic conditional insert.
    /// If a concurrent booking claims it first, the search moves on to the
    /// next candidate.
    ///
    /// # Errors
    /// Returns `BookingError::NoSlotAvailable` if the horizon is exhausted.
    pub fn book_first_free(
        &self,
        owner: UserId,
        resource: Resource,
        duration_minutes: i64,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Reservation> {
        let checker = ConflictChecker::new(self.store);
        let mut tested = 0usize;

        for candidate in Candidates::new(self.window, self.policy, duration_minutes, now)? {
            tested += 1;
            if checker.range_has_conflict(resource, &candidate)? {
                tracing::debug!(start = %candidate.start(), %resource, "candidate conflicts");
                continue;
            }

            let new = NewReservation {
                owner,
                resource,
                range: candidate,
                note: note.clone(),
                created_at: now,
            };
            match self.store.insert_if_free(new) {
                Ok(reservation) => {
                    tracing::debug!(tested, "slot search succeeded");
                    return Ok(reservation);
                }
                Err(BookingError::SlotUnavailable) => {
                    tracing::warn!(
                        start = %candidate.start(),
                        %resource,
                        "candidate taken concurrently, continuing search"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!(tested, %resource, "slot search exhausted horizon");
        Err(BookingError::NoSlotAvailable)
    }
}
