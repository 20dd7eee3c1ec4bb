//! Compute free windows for a machine on a given day.
//!
//! Sorts reservations by start time, merges overlapping or adjacent busy
//! periods, then returns the gaps between them inside the operating window.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::config::OperatingWindow;
use crate::error::Result;
use crate::model::{Reservation, TimeRange};

/// A free stretch of time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl FreeWindow {
    fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            duration_minutes: (end - start).num_minutes(),
        }
    }
}

/// Merge overlapping or adjacent busy periods, clipped to `bounds`.
///
/// Returns a sorted, non-overlapping list of (start, end) intervals.
pub fn merge_busy_periods(
    reservations: &[Reservation],
    bounds: &TimeRange,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut intervals: Vec<(DateTime<Utc>, DateTime<Utc>)> = reservations
        .iter()
        .filter(|r| r.range.overlaps(bounds))
        .map(|r| (r.start().max(bounds.start()), r.end().min(bounds.end())))
        .collect();

    intervals.sort_by_key(|&(start, end)| (start, end));

    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
    for (start, end) in intervals {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }

    merged
}

/// Free windows inside `bounds`, sorted by start time.
pub fn find_free_windows(reservations: &[Reservation], bounds: &TimeRange) -> Vec<FreeWindow> {
    let mut free = Vec::new();
    let mut cursor = bounds.start();

    for (busy_start, busy_end) in merge_busy_periods(reservations, bounds) {
        if cursor < busy_start {
            free.push(FreeWindow::between(cursor, busy_start));
        }
        cursor = cursor.max(busy_end);
    }

    if cursor < bounds.end() {
        free.push(FreeWindow::between(cursor, bounds.end()));
    }

    free
}

/// The operating window of `date` as a range.
///
/// # Errors
/// Returns `BookingError::InvalidInterval` if a DST transition swallows the
/// whole window on that date.
pub fn operating_range(window: &OperatingWindow, date: NaiveDate) -> Result<TimeRange> {
    TimeRange::new(window.opens_on(date), window.closes_on(date))
}
