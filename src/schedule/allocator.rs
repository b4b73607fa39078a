use std::collections::{BTreeSet, VecDeque};

use chrono::NaiveDate;

use super::types::{AllocationResult, Assignment, Mailbox, MailboxPoolConfig};

/// Assigns one mailbox per check-in for a single day.
///
/// Works on fresh copies of the pool, so nothing carries over between days.
/// Runs two passes over `checkins`:
/// 1. apartments with a dedicated box get it, wherever they sit in the list
/// 2. everyone else, in order, takes the front of the general queue, then the
///    lowest-labelled dedicated box nobody claimed today, then [`Mailbox::Unavailable`]
///
/// Every occurrence in `checkins` gets exactly one entry, in the same order.
pub fn allocate(date: NaiveDate, checkins: &[String], pool: &MailboxPoolConfig) -> AllocationResult {
    let mut general: VecDeque<&str> = pool.general().iter().map(String::as_str).collect();
    let mut spare_dedicated: BTreeSet<&str> = pool.dedicated().values().map(String::as_str).collect();

    let mut slots: Vec<Option<Mailbox>> = vec![None; checkins.len()];

    // Pass 1: dedicated holders
    for (slot, apartment) in slots.iter_mut().zip(checkins) {
        if let Some(label) = pool.dedicated().get(apartment) {
            if spare_dedicated.remove(label.as_str()) {
                *slot = Some(Mailbox::Assigned(label.clone()));
            }
        }
    }

    // Pass 2: general queue, then leftover dedicated boxes
    for slot in slots.iter_mut().filter(|s| s.is_none()) {
        let mailbox = if let Some(label) = general.pop_front() {
            Mailbox::Assigned(label.to_string())
        } else if let Some(label) = spare_dedicated.pop_first() {
            Mailbox::Assigned(label.to_string())
        } else {
            Mailbox::Unavailable
        };
        *slot = Some(mailbox);
    }

    let assignments = checkins
        .iter()
        .zip(slots)
        .map(|(apartment, mailbox)| Assignment {
            apartment_id: apartment.clone(),
            mailbox: mailbox.unwrap_or(Mailbox::Unavailable),
        })
        .collect();

    AllocationResult { date, assignments }
}
