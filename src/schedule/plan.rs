use chrono::NaiveDate;
use tracing::debug;

use super::allocator::allocate;
use super::indexer::index;
use super::types::{DayPlan, MailboxPoolConfig, StayInterval};

/// Indexes the stays for the window and allocates mailboxes for every
/// active date, returning the days in ascending date order.
pub fn plan_window(
    intervals: &[StayInterval],
    pool: &MailboxPoolConfig,
    start_date: NaiveDate,
    horizon_days: u32,
) -> Vec<DayPlan> {
    index(intervals, start_date, horizon_days)
        .into_iter()
        .map(|(date, record)| {
            let allocation = allocate(date, &record.checkins, pool);
            debug!(
                %date,
                checkins = record.checkins.len(),
                checkouts = record.checkouts.len(),
                unassigned = allocation.unassigned(),
                "planned day"
            );
            DayPlan {
                date,
                record,
                allocation,
            }
        })
        .collect()
}
