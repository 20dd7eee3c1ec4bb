//! User access status and the oracle that reports it.
//!
//! Block status is owned by an administrative collaborator. The engine only
//! reads it, once per booking attempt, through [`UserAccessOracle`].

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};
use crate::model::UserId;

/// Whether a user may currently book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AccessStatus {
    #[default]
    Active,
    TemporarilyBlocked { until: DateTime<Utc> },
    PermanentlyBlocked,
}

impl AccessStatus {
    /// Build a status from the `(blocked, blocked_until)` flag pair used by
    /// account records. A block with no expiry is permanent.
    pub fn from_flags(blocked: bool, blocked_until: Option<DateTime<Utc>>) -> Self {
        match (blocked, blocked_until) {
            (false, _) => Self::Active,
            (true, Some(until)) => Self::TemporarilyBlocked { until },
            (true, None) => Self::PermanentlyBlocked,
        }
    }

    pub fn is_blocked(&self) -> bool {
        !matches!(self, Self::Active)
    }

    pub fn blocked_until(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::TemporarilyBlocked { until } => Some(*until),
            _ => None,
        }
    }

    /// Reject the attempt if the status forbids booking at `now`.
    ///
    /// A temporary block that has already expired lets the user through.
    pub fn ensure_may_book(&self, now: DateTime<Utc>) -> Result<()> {
        match *self {
            Self::Active => Ok(()),
            Self::TemporarilyBlocked { until } if now < until => {
                Err(BookingError::UserBlocked { until })
            }
            Self::TemporarilyBlocked { .. } => Ok(()),
            Self::PermanentlyBlocked => Err(BookingError::UserBlockedPermanently),
        }
    }
}

/// Authoritative source of per-user block status.
pub trait UserAccessOracle: Send + Sync {
    /// # Errors
    /// Returns `BookingError::UnknownUser` if the user does not exist.
    fn access_status(&self, user: UserId) -> Result<AccessStatus>;
}

/// In-memory registry of known users and their block status.
#[derive(Debug, Default)]
pub struct AccessRegistry {
    users: DashMap<UserId, AccessStatus>,
}

impl AccessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user as active. Existing entries keep their status.
    pub fn register(&self, user: UserId) {
        self.users.entry(user).or_insert(AccessStatus::Active);
    }

    pub fn set_status(&self, user: UserId, status: AccessStatus) {
        self.users.insert(user, status);
    }

    /// Block a user until `until`, or permanently when `until` is `None`.
    pub fn block(&self, user: UserId, until: Option<DateTime<Utc>>) -> Result<()> {
        let mut entry = self
            .users
            .get_mut(&user)
            .ok_or(BookingError::UnknownUser(user))?;
        *entry = AccessStatus::from_flags(true, until);
        tracing::info!(%user, ?until, "user blocked");
        Ok(())
    }

    pub fn unblock(&self, user: UserId) -> Result<()> {
        let mut entry = self
            .users
            .get_mut(&user)
            .ok_or(BookingError::UnknownUser(user))?;
        *entry = AccessStatus::Active;
        tracing::info!(%user, "user unblocked");
        Ok(())
    }

    /// All users and statuses, ordered by user id.
    pub fn snapshot(&self) -> Vec<(UserId, AccessStatus)> {
        let mut users: Vec<(UserId, AccessStatus)> = self
            .users
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        users.sort_by_key(|(user, _)| *user);
        users
    }
}

impl UserAccessOracle for AccessRegistry {
    fn access_status(&self, user: UserId) -> Result<AccessStatus> {
        self.users
            .get(&user)
            .map(|entry| *entry.value())
            .ok_or(BookingError::UnknownUser(user))
    }
}
