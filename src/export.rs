use std::io;
use std::path::Path;

use csv::WriterBuilder;
use serde::Serialize;

use crate::schedule::DayPlan;

/// One line of the exported plan
#[derive(Debug, Serialize)]
struct PlanRow<'a> {
    date: String,
    kind: &'static str,
    apartment: &'a str,
    time: &'a str,
    mailbox: &'a str,
}

/// Exports planned days to CSV, one row per check-out and per check-in.
/// Check-outs come first within a day, mirroring the report; check-in rows
/// carry the mailbox given to that arrival.
pub fn export_plan_to_csv<W: io::Write>(
    days: &[DayPlan],
    checkin_time: &str,
    checkout_time: &str,
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(writer);

    for day in days {
        let date = day.date.format("%Y-%m-%d").to_string();

        for apartment in &day.record.checkouts {
            wtr.serialize(PlanRow {
                date: date.clone(),
                kind: "checkout",
                apartment,
                time: checkout_time,
                mailbox: "",
            })?;
        }

        // Assignments line up one-to-one with the day's check-ins
        for assignment in &day.allocation.assignments {
            wtr.serialize(PlanRow {
                date: date.clone(),
                kind: "checkin",
                apartment: &assignment.apartment_id,
                time: checkin_time,
                mailbox: assignment.mailbox.label(),
            })?;
        }
    }

    wtr.flush()?;
    Ok(())
}

pub fn export_plan_to_file(
    days: &[DayPlan],
    checkin_time: &str,
    checkout_time: &str,
    csv_path: &Path,
) -> Result<(), csv::Error> {
    let file = std::fs::File::create(csv_path)?;
    export_plan_to_csv(days, checkin_time, checkout_time, file)
}
