//! Property-based tests for conflict checking and the next-available search.
//!
//! These verify invariants that should hold for *any* arrangement of existing
//! reservations, not just the scenarios in the other test files.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use laundry_engine::model::NewReservation;
use laundry_engine::{
    AccessRegistry, BookingError, BookingService, ConflictChecker, EngineConfig, FixedClock,
    InMemoryStore, NextAvailableRequest, ReservationStore, Resource, TimeRange, UserId,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
}

/// An interval as (start offset, length) in minutes from Monday midnight.
fn arb_interval() -> impl Strategy<Value = (i64, i64)> {
    (0i64..=3 * 24 * 60, 1i64..=6 * 60)
}

fn arb_duration() -> impl Strategy<Value = i64> {
    prop_oneof![Just(60i64), Just(90), Just(120), Just(150), Just(180), Just(240)]
}

/// "Now" anywhere in the first week, to the minute.
fn arb_now() -> impl Strategy<Value = i64> {
    0i64..7 * 24 * 60
}

/// Existing bookings as (start hour offset, length in hours) across two weeks.
fn arb_existing() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((0i64..14 * 24, 1i64..=4), 0..60)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn range_of((offset, length): (i64, i64)) -> TimeRange {
    let start = base() + Duration::minutes(offset);
    TimeRange::new(start, start + Duration::minutes(length)).unwrap()
}

/// Insert what fits; overlapping draws are simply dropped.
fn populate(store: &InMemoryStore, existing: &[(i64, i64)]) {
    for &(hour, length) in existing {
        let start = base() + Duration::hours(hour);
        let _ = store.insert_if_free(NewReservation {
            owner: UserId(99),
            resource: Resource::Washer,
            range: TimeRange::new(start, start + Duration::hours(length)).unwrap(),
            note: None,
            created_at: base(),
        });
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// The checker agrees with `existing.start < proposed.end && existing.end > proposed.start`.
    #[test]
    fn conflict_matches_half_open_rule(existing in arb_interval(), proposed in arb_interval()) {
        let existing = range_of(existing);
        let proposed = range_of(proposed);
        let store = InMemoryStore::new();
        store.insert_if_free(NewReservation {
            owner: UserId(1),
            resource: Resource::Washer,
            range: existing,
            note: None,
            created_at: base(),
        }).unwrap();

        let expected = existing.start() < proposed.end() && existing.end() > proposed.start();
        let actual = ConflictChecker::new(&store)
            .has_conflict(Resource::Washer, proposed.start(), proposed.end())
            .unwrap();

        prop_assert_eq!(actual, expected);
    }

    /// An interval starting exactly where another ends never conflicts with it.
    #[test]
    fn touching_intervals_never_conflict(existing in arb_interval(), length in 1i64..=360) {
        let existing = range_of(existing);
        let store = InMemoryStore::new();
        store.insert_if_free(NewReservation {
            owner: UserId(1),
            resource: Resource::Dryer,
            range: existing,
            note: None,
            created_at: base(),
        }).unwrap();
        let checker = ConflictChecker::new(&store);

        let after = checker
            .has_conflict(Resource::Dryer, existing.end(), existing.end() + Duration::minutes(length))
            .unwrap();
        let before = checker
            .has_conflict(Resource::Dryer, existing.start() - Duration::minutes(length), existing.start())
            .unwrap();

        prop_assert!(!after);
        prop_assert!(!before);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A next-available booking always lands hour-aligned inside the operating
    /// window, at or after the lead time, before the horizon, ending by closing
    /// and clear of every existing booking.
    #[test]
    fn next_available_respects_window_and_horizon(
        now in arb_now(),
        duration in arb_duration(),
        existing in arb_existing(),
    ) {
        let now = base() + Duration::minutes(now);
        let store = InMemoryStore::new();
        populate(&store, &existing);
        let before = store.snapshot();

        let access = AccessRegistry::new();
        access.register(UserId(1));
        let config = EngineConfig::default();
        let window = config.window;
        let service = BookingService::with_clock(store, access, FixedClock(now), config).unwrap();

        match service.book_next_available(NextAvailableRequest {
            user: UserId(1),
            resource: Resource::Washer,
            duration_minutes: duration,
            note: None,
        }) {
            Ok(reservation) => {
                let start = reservation.start();
                prop_assert!(start >= now + Duration::minutes(30));
                prop_assert!(start < now + Duration::days(7));
                prop_assert_eq!(start.minute(), 0);
                prop_assert!(window.is_open_at(start));
                prop_assert!(reservation.end() <= window.closes_on(window.local_date(start)));
                prop_assert_eq!(reservation.range.duration_minutes(), duration);
                prop_assert!(before.iter().all(|r| !r.range.overlaps(&reservation.range)));
                prop_assert_eq!(service.store().len(), before.len() + 1);
            }
            Err(e) => {
                prop_assert_eq!(e, BookingError::NoSlotAvailable);
                prop_assert_eq!(service.store().len(), before.len());
            }
        }
    }

    /// The search returns the earliest valid candidate: every earlier valid
    /// candidate conflicts with an existing booking.
    #[test]
    fn next_available_is_earliest(
        now in arb_now(),
        duration in arb_duration(),
        existing in arb_existing(),
    ) {
        let now = base() + Duration::minutes(now);
        let store = InMemoryStore::new();
        populate(&store, &existing);
        let config = EngineConfig::default();

        let candidates: Vec<TimeRange> =
            laundry_engine::Candidates::new(config.window, config.policy, duration, now)
                .unwrap()
                .collect();
        let finder = laundry_engine::SlotFinder::new(&store, config.window, config.policy);
        let found = finder.find_free(Resource::Washer, duration, now).unwrap();

        let checker = ConflictChecker::new(&store);
        let first_free = candidates
            .iter()
            .find(|c| !checker.range_has_conflict(Resource::Washer, c).unwrap())
            .copied();
        prop_assert_eq!(found, first_free);
    }
}
