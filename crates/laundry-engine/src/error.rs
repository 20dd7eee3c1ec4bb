//! Error types for booking operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{ReservationId, UserId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error("Invalid interval: start {start} is not before end {end}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("User is blocked until {until}")]
    UserBlocked { until: DateTime<Utc> },

    #[error("User is permanently blocked")]
    UserBlockedPermanently,

    #[error("Time slot is already booked")]
    SlotUnavailable,

    #[error("No available slot found within the search horizon")]
    NoSlotAvailable,

    #[error("Booking not found: {0}")]
    NotFound(ReservationId),

    #[error("Not authorized to delete this booking")]
    NotAuthorized,

    #[error("User not found: {0}")]
    UnknownUser(UserId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, BookingError>;
