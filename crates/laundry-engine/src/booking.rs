//! Booking orchestration: access policy, the two creation paths, deletion and
//! schedule queries.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::access::UserAccessOracle;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::conflict::ConflictChecker;
use crate::error::{BookingError, Result};
use crate::freebusy::{self, FreeWindow};
use crate::model::{NewReservation, Reservation, ReservationId, Resource, TimeRange, UserId};
use crate::slot_finder::SlotFinder;
use crate::store::ReservationStore;

/// A request for an explicit interval.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub user: UserId,
    pub resource: Resource,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub note: Option<String>,
}

/// A request for the next free interval of a given length.
#[derive(Debug, Clone, PartialEq)]
pub struct NextAvailableRequest {
    pub user: UserId,
    pub resource: Resource,
    pub duration_minutes: i64,
    pub note: Option<String>,
}

/// Entry point for every booking operation.
///
/// Reads the clock once per operation.
pub struct BookingService<S, A, C = SystemClock> {
    store: S,
    access: A,
    clock: C,
    config: EngineConfig,
}

impl<S, A> BookingService<S, A, SystemClock>
where
    S: ReservationStore,
    A: UserAccessOracle,
{
    pub fn new(store: S, access: A, config: EngineConfig) -> Result<Self> {
        Self::with_clock(store, access, SystemClock, config)
    }
}

impl<S, A, C> BookingService<S, A, C>
where
    S: ReservationStore,
    A: UserAccessOracle,
    C: Clock,
{
    /// # Errors
    /// Returns `BookingError::InvalidConfig` if `config` does not validate.
    pub fn with_clock(store: S, access: A, clock: C, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            access,
            clock,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_parts(self) -> (S, A) {
        (self.store, self.access)
    }

    fn ensure_may_book(&self, user: UserId, now: DateTime<Utc>) -> Result<()> {
        let status = self.access.access_status(user)?;
        status.ensure_may_book(now).inspect_err(|e| {
            tracing::info!(%user, error = %e, "booking refused");
        })
    }

    /// Book exactly `[request.start, request.end)`.
    ///
    /// # Errors
    /// - `UserBlocked` / `UserBlockedPermanently` if the user may not book.
    /// - `InvalidInterval` if `start >= end`.
    /// - `SlotUnavailable` if the interval overlaps an existing reservation.
    pub fn create_booking(&self, request: BookingRequest) -> Result<Reservation> {
        let now = self.clock.now();
        self.ensure_may_book(request.user, now)?;

        let range = TimeRange::new(request.start, request.end)?;

        if ConflictChecker::new(&self.store).range_has_conflict(request.resource, &range)? {
            return Err(BookingError::SlotUnavailable);
        }

        let reservation = self.store.insert_if_free(NewReservation {
            owner: request.user,
            resource: request.resource,
            range,
            note: request.note,
            created_at: now,
        })?;
        log_created(&reservation);
        Ok(reservation)
    }

    /// Book the earliest free slot of `request.duration_minutes`.
    ///
    /// # Errors
    /// - `UserBlocked` / `UserBlockedPermanently` if the user may not book.
    /// - `InvalidInterval` if the duration is not positive.
    /// - `NoSlotAvailable` if nothing is free before the search horizon.
    pub fn book_next_available(&self, request: NextAvailableRequest) -> Result<Reservation> {
        let now = self.clock.now();
        self.ensure_may_book(request.user, now)?;

        let reservation = SlotFinder::new(&self.store, self.config.window, self.config.policy)
            .book_first_free(
                request.user,
                request.resource,
                request.duration_minutes,
                request.note,
                now,
            )?;
        log_created(&reservation);
        Ok(reservation)
    }

    /// Delete a reservation on behalf of its owner.
    ///
    /// # Errors
    /// - `NotFound` if no reservation has this id.
    /// - `NotAuthorized` if `requester` does not own it.
    pub fn delete_booking(&self, id: ReservationId, requester: UserId) -> Result<()> {
        let reservation = self
            .store
            .find_by_id(id)?
            .ok_or(BookingError::NotFound(id))?;

        if reservation.owner != requester {
            return Err(BookingError::NotAuthorized);
        }

        self.store.delete(id)?;
        tracing::info!(%id, owner = %requester, "reservation deleted");
        Ok(())
    }

    /// True iff `[start, end)` overlaps a reservation on `resource`.
    pub fn has_conflict(
        &self,
        resource: Resource,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool> {
        ConflictChecker::new(&self.store).has_conflict(resource, start, end)
    }

    /// Reservations lying entirely inside `range`, on any machine.
    pub fn bookings_in_range(&self, range: &TimeRange) -> Result<Vec<Reservation>> {
        self.store.find_in_range(range)
    }

    /// Reservations owned by `user`.
    ///
    /// # Errors
    /// Returns `UnknownUser` if the access oracle does not know the user.
    pub fn user_bookings(&self, user: UserId) -> Result<Vec<Reservation>> {
        self.access.access_status(user)?;
        self.store.find_by_owner(user)
    }

    /// Reservations starting between now and the next local midnight.
    pub fn today_bookings(&self) -> Result<Vec<Reservation>> {
        let now = self.clock.now();
        let window = &self.config.window;
        let tomorrow = window
            .local_date(now)
            .succ_opt()
            .ok_or(BookingError::InvalidInterval { start: now, end: now })?;
        let range = TimeRange::new(now, window.midnight_on(tomorrow))?;
        self.store.find_starting_between(&range)
    }

    /// Reservations starting in the seven days from today's local midnight.
    pub fn week_bookings(&self) -> Result<Vec<Reservation>> {
        let now = self.clock.now();
        let window = &self.config.window;
        let week_start = window.midnight_on(window.local_date(now));
        let range = TimeRange::new(week_start, week_start + Duration::weeks(1))?;
        self.store.find_starting_between(&range)
    }

    /// Free stretches of `resource`'s operating window on local `date`.
    pub fn free_windows(&self, resource: Resource, date: NaiveDate) -> Result<Vec<FreeWindow>> {
        let bounds = freebusy::operating_range(&self.config.window, date)?;
        let busy = self.store.find_overlapping(resource, &bounds)?;
        Ok(freebusy::find_free_windows(&busy, &bounds))
    }
}

fn log_created(reservation: &Reservation) {
    tracing::info!(
        id = %reservation.id,
        owner = %reservation.owner,
        resource = %reservation.resource,
        start = %reservation.start(),
        end = %reservation.end(),
        "reservation created"
    );
}
