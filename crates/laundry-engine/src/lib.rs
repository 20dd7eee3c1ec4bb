//! # laundry-engine
//!
//! Conflict-free booking of the shared washer and dryer.
//!
//! Guarantees that no two reservations on the same machine overlap, finds the
//! next free slot of a requested length inside the daily operating window, and
//! refuses bookings from blocked users.
//!
//! ## Modules
//!
//! - [`model`] — Machines, identifiers, half-open time ranges, reservations
//! - [`conflict`] — Overlap detection against the store
//! - [`slot_finder`] — Hour-stepped next-available search
//! - [`booking`] — The orchestrator tying access policy, checker and finder together
//! - [`store`] — Store boundary with atomic conditional insert, plus an in-memory store
//! - [`access`] — User block status and the oracle that reports it
//! - [`freebusy`] — Free windows within a day's operating hours
//! - [`config`] — Operating window and search policy, loadable from TOML
//! - [`clock`] — Injected time sources
//! - [`error`] — Error types

pub mod access;
pub mod booking;
pub mod clock;
pub mod config;
pub mod conflict;
pub mod error;
pub mod freebusy;
pub mod model;
pub mod slot_finder;
pub mod store;

pub use access::{AccessRegistry, AccessStatus, UserAccessOracle};
pub use booking::{BookingRequest, BookingService, NextAvailableRequest};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{EngineConfig, OperatingWindow, SearchPolicy};
pub use conflict::{find_conflicts, Conflict, ConflictChecker};
pub use error::BookingError;
pub use model::{NewReservation, Reservation, ReservationId, Resource, TimeRange, UserId};
pub use slot_finder::{Candidates, SlotFinder};
pub use store::{InMemoryStore, ReservationStore};
