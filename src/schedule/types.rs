use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{IntervalError, PoolError};

/// Label shown for an arrival when every mailbox of the day is taken
pub const NO_MAILBOX: &str = "no mailbox available";

/// One stay of a guest in an apartment, arrival and departure inclusive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayInterval {
    pub apartment_id: String,
    pub arrival: NaiveDate,
    pub departure: NaiveDate,
}

impl StayInterval {
    pub fn new(apartment_id: impl Into<String>, arrival: NaiveDate, departure: NaiveDate) -> Self {
        Self {
            apartment_id: apartment_id.into(),
            arrival,
            departure,
        }
    }

    /// Checks the interval can be indexed
    pub fn validate(&self) -> Result<(), IntervalError> {
        if self.apartment_id.trim().is_empty() {
            return Err(IntervalError::MissingApartment);
        }
        if self.departure < self.arrival {
            return Err(IntervalError::DepartureBeforeArrival {
                apartment: self.apartment_id.clone(),
                arrival: self.arrival,
                departure: self.departure,
            });
        }
        Ok(())
    }
}

/// Arrivals and departures for a single date, in interval order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub checkins: Vec<String>,
    pub checkouts: Vec<String>,
}

impl DailyRecord {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            checkins: Vec::new(),
            checkouts: Vec::new(),
        }
    }
}

/// Mailboxes available each day: a shared FIFO pool plus per-apartment boxes.
///
/// Only constructible through [`MailboxPoolConfig::new`], so a value in hand
/// always satisfies the label uniqueness rules the allocator depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailboxPoolConfig {
    general: Vec<String>,
    dedicated: BTreeMap<String, String>,
}

impl MailboxPoolConfig {
    pub fn new(
        general: Vec<String>,
        dedicated: BTreeMap<String, String>,
    ) -> Result<Self, PoolError> {
        let mut seen = HashSet::new();
        for label in &general {
            if label.trim().is_empty() {
                return Err(PoolError::BlankLabel);
            }
            if !seen.insert(label.as_str()) {
                return Err(PoolError::DuplicateGeneral(label.clone()));
            }
        }

        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
        for (apartment, label) in &dedicated {
            if label.trim().is_empty() {
                return Err(PoolError::BlankLabel);
            }
            if seen.contains(label.as_str()) {
                return Err(PoolError::SharedWithGeneral {
                    label: label.clone(),
                    apartment: apartment.clone(),
                });
            }
            if let Some(other) = owners.insert(label.as_str(), apartment.as_str()) {
                return Err(PoolError::DuplicateDedicated {
                    label: label.clone(),
                    first: other.to_string(),
                    second: apartment.clone(),
                });
            }
        }

        Ok(Self { general, dedicated })
    }

    pub fn general(&self) -> &[String] {
        &self.general
    }

    pub fn dedicated(&self) -> &BTreeMap<String, String> {
        &self.dedicated
    }

    /// Total number of distinct mailboxes in the pool
    pub fn capacity(&self) -> usize {
        self.general.len() + self.dedicated.len()
    }
}

/// Outcome for one arrival
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mailbox {
    Assigned(String),
    Unavailable,
}

impl Mailbox {
    pub fn label(&self) -> &str {
        match self {
            Mailbox::Assigned(label) => label,
            Mailbox::Unavailable => NO_MAILBOX,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, Mailbox::Assigned(_))
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub apartment_id: String,
    pub mailbox: Mailbox,
}

/// Mailbox assignments for one date, one entry per check-in in check-in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub date: NaiveDate,
    pub assignments: Vec<Assignment>,
}

impl AllocationResult {
    /// Mailbox given to the first check-in of `apartment_id` that day
    pub fn get(&self, apartment_id: &str) -> Option<&Mailbox> {
        self.assignments
            .iter()
            .find(|a| a.apartment_id == apartment_id)
            .map(|a| &a.mailbox)
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Number of arrivals left without a mailbox
    pub fn unassigned(&self) -> usize {
        self.assignments
            .iter()
            .filter(|a| !a.mailbox.is_assigned())
            .count()
    }
}

/// Everything known about one date of the window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    pub record: DailyRecord,
    pub allocation: AllocationResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn dedicated(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(a, l)| (a.to_string(), l.to_string()))
            .collect()
    }

    #[test]
    fn rejects_duplicate_general_label() {
        let err = MailboxPoolConfig::new(labels(&["Box1", "Box2", "Box1"]), BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, PoolError::DuplicateGeneral(ref l) if l == "Box1"));
    }

    #[test]
    fn rejects_label_in_both_pools() {
        let err = MailboxPoolConfig::new(
            labels(&["Box1", "Box2"]),
            dedicated(&[("411", "Box2")]),
        )
        .unwrap_err();
        assert!(matches!(err, PoolError::SharedWithGeneral { .. }));
    }

    #[test]
    fn rejects_dedicated_label_owned_twice() {
        let err = MailboxPoolConfig::new(
            labels(&["Box1"]),
            dedicated(&[("411", "Box4"), ("611", "Box4")]),
        )
        .unwrap_err();
        assert!(matches!(err, PoolError::DuplicateDedicated { .. }));
    }

    #[test]
    fn rejects_blank_label() {
        assert!(matches!(
            MailboxPoolConfig::new(labels(&["Box1", " "]), BTreeMap::new()),
            Err(PoolError::BlankLabel)
        ));
    }

    #[test]
    fn accepts_valid_pool() {
        let pool = MailboxPoolConfig::new(
            labels(&["Box1", "Box2", "Box3"]),
            dedicated(&[("411", "Box411"), ("611", "Box611")]),
        )
        .unwrap();
        assert_eq!(pool.capacity(), 5);
        assert_eq!(pool.general()[0], "Box1");
    }

    #[test]
    fn interval_validation() {
        let d = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let next = d.succ_opt().unwrap();
        assert!(StayInterval::new("411", d, next).validate().is_ok());
        assert!(StayInterval::new("411", d, d).validate().is_ok());
        assert!(matches!(
            StayInterval::new("411", next, d).validate(),
            Err(IntervalError::DepartureBeforeArrival { .. })
        ));
        assert!(matches!(
            StayInterval::new("", d, next).validate(),
            Err(IntervalError::MissingApartment)
        ));
    }

    #[test]
    fn sentinel_renders_as_no_mailbox() {
        assert_eq!(Mailbox::Unavailable.to_string(), NO_MAILBOX);
        assert_eq!(Mailbox::Assigned("Box1".into()).to_string(), "Box1");
    }
}
