use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use tracing::warn;

use super::types::{DailyRecord, StayInterval};

/// Builds the per-date check-in and check-out lists for the window
/// `[start_date, start_date + horizon_days]`, both ends inclusive.
///
/// Interval order is kept inside each date: it is the priority order the
/// allocator later works through. Dates with no activity are left out.
/// Malformed intervals are logged and skipped.
pub fn index(
    intervals: &[StayInterval],
    start_date: NaiveDate,
    horizon_days: u32,
) -> BTreeMap<NaiveDate, DailyRecord> {
    let end_date = start_date
        .checked_add_days(Days::new(u64::from(horizon_days)))
        .unwrap_or(NaiveDate::MAX);
    let in_window = |date: NaiveDate| date >= start_date && date <= end_date;

    let mut days: BTreeMap<NaiveDate, DailyRecord> = BTreeMap::new();

    for interval in intervals {
        if let Err(e) = interval.validate() {
            warn!(error = %e, "skipping stay");
            continue;
        }

        if in_window(interval.arrival) {
            days.entry(interval.arrival)
                .or_insert_with(|| DailyRecord::new(interval.arrival))
                .checkins
                .push(interval.apartment_id.clone());
        }

        if in_window(interval.departure) {
            days.entry(interval.departure)
                .or_insert_with(|| DailyRecord::new(interval.departure))
                .checkouts
                .push(interval.apartment_id.clone());
        }
    }

    days
}
