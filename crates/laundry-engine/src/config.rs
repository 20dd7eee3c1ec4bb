//! Engine configuration: the daily operating window and the slot search policy.
//!
//! Loaded from TOML:
//!
//! ```toml
//! [window]
//! start_hour = 6
//! end_hour = 23
//! timezone = "America/New_York"
//!
//! [policy]
//! lead_time_minutes = 30
//! horizon_days = 7
//! step_minutes = 60
//! ```
//!
//! Every field is optional and falls back to the defaults shown above, except
//! `timezone`, which defaults to UTC.

use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// Daily hours during which reservations may start and must end, evaluated in
/// `timezone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatingWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    pub timezone: Tz,
}

impl Default for OperatingWindow {
    fn default() -> Self {
        Self {
            start_hour: 6,
            end_hour: 23,
            timezone: Tz::UTC,
        }
    }
}

impl OperatingWindow {
    pub fn new(start_hour: u32, end_hour: u32, timezone: Tz) -> Result<Self> {
        let window = Self {
            start_hour,
            end_hour,
            timezone,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_hour >= 24 || self.end_hour >= 24 {
            return Err(BookingError::InvalidConfig(format!(
                "operating hours must be in [0, 24), got {}..{}",
                self.start_hour, self.end_hour
            )));
        }
        if self.start_hour >= self.end_hour {
            return Err(BookingError::InvalidConfig(format!(
                "operating window must open before it closes, got {}..{}",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    pub fn local_hour(&self, instant: DateTime<Utc>) -> u32 {
        instant.with_timezone(&self.timezone).hour()
    }

    /// True when `instant`'s local hour lies in `[start_hour, end_hour)`.
    pub fn is_open_at(&self, instant: DateTime<Utc>) -> bool {
        let hour = self.local_hour(instant);
        hour >= self.start_hour && hour < self.end_hour
    }

    /// Opening instant on a local date.
    pub fn opens_on(&self, date: NaiveDate) -> DateTime<Utc> {
        self.at_local_hour(date, self.start_hour)
    }

    /// Closing instant on a local date.
    pub fn closes_on(&self, date: NaiveDate) -> DateTime<Utc> {
        self.at_local_hour(date, self.end_hour)
    }

    /// Local midnight at the start of `date`.
    pub fn midnight_on(&self, date: NaiveDate) -> DateTime<Utc> {
        self.resolve_local(date.and_time(NaiveTime::MIN))
    }

    /// Floor `instant` to the top of its local hour.
    pub fn floor_to_hour(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let local = instant.with_timezone(&self.timezone);
        let into_hour = Duration::minutes(i64::from(local.minute()))
            + Duration::seconds(i64::from(local.second()))
            + Duration::nanoseconds(i64::from(local.nanosecond()));
        instant - into_hour
    }

    fn at_local_hour(&self, date: NaiveDate, hour: u32) -> DateTime<Utc> {
        let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
        self.resolve_local(date.and_time(time))
    }

    /// Map a local wall-clock time to an instant. Ambiguous times take the
    /// earlier instant; times inside a DST gap move forward past the gap.
    fn resolve_local(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        let mut candidate = naive;
        loop {
            if let Some(dt) = self.timezone.from_local_datetime(&candidate).earliest() {
                return dt.with_timezone(&Utc);
            }
            // No zone has a gap longer than a few hours.
            candidate += Duration::minutes(30);
        }
    }
}

/// Parameters of the next-available search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchPolicy {
    /// Minimum distance between "now" and the earliest candidate.
    pub lead_time_minutes: i64,
    /// How far ahead of "now" candidates may start.
    pub horizon_days: i64,
    /// Distance between consecutive candidates.
    pub step_minutes: i64,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            lead_time_minutes: 30,
            horizon_days: 7,
            step_minutes: 60,
        }
    }
}

impl SearchPolicy {
    pub fn validate(&self) -> Result<()> {
        check_bounds("lead_time_minutes", self.lead_time_minutes, 0, MAX_LEAD_TIME_MINUTES)?;
        check_bounds("horizon_days", self.horizon_days, 1, MAX_HORIZON_DAYS)?;
        check_bounds("step_minutes", self.step_minutes, 1, MAX_STEP_MINUTES)?;
        Ok(())
    }

    /// Only meaningful on a policy that passed [`SearchPolicy::validate`].
    pub fn lead_time(&self) -> Duration {
        Duration::minutes(self.lead_time_minutes)
    }

    pub fn horizon(&self) -> Duration {
        Duration::days(self.horizon_days)
    }

    pub fn step(&self) -> Duration {
        Duration::minutes(self.step_minutes)
    }
}

// Upper bounds enforced by `SearchPolicy::validate`.
pub const MAX_LEAD_TIME_MINUTES: i64 = 366 * 24 * 60;
pub const MAX_HORIZON_DAYS: i64 = 366;
pub const MAX_STEP_MINUTES: i64 = 24 * 60;

fn check_bounds(name: &str, value: i64, min: i64, max: i64) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(BookingError::InvalidConfig(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )))
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window: OperatingWindow,
    pub policy: SearchPolicy,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(source).map_err(|e| BookingError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            BookingError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        self.window.validate()?;
        self.policy.validate()
    }
}
