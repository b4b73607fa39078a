use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use clap::ValueEnum;

use crate::schedule::DayPlan;

/// How much of each day goes into the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    /// Check-in and check-out counts per date
    Basic,
    /// Apartments arriving and leaving per date
    Detailed,
    /// Detailed, plus times and the mailbox of every arrival
    #[default]
    Mailboxes,
}

/// A rendered view over planned days, ready to print or send
pub struct Report<'a> {
    pub days: &'a [DayPlan],
    pub format: ReportFormat,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub checkin_time: &'a str,
    pub checkout_time: &'a str,
    /// Render for Telegram's legacy Markdown: emphasis on dates, and
    /// `_ * [ `` ` in apartment ids, labels and times escaped
    pub markdown: bool,
}

/// Backslash-escapes the characters legacy Markdown treats as entities
pub fn escape_markdown(value: &str) -> Cow<'_, str> {
    if !value.contains(['_', '*', '[', '`']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        if matches!(c, '_' | '*' | '[' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.days.is_empty() {
            return writeln!(
                f,
                "No check-ins or check-outs between {} and {}.",
                self.start.format("%Y-%m-%d"),
                self.end.format("%Y-%m-%d")
            );
        }

        match self.format {
            ReportFormat::Basic => {
                writeln!(f, "Reservations summary:")?;
                for day in self.days {
                    writeln!(
                        f,
                        "{} - Check-ins: {}, Check-outs: {}",
                        day.date.format("%Y-%m-%d"),
                        day.record.checkins.len(),
                        day.record.checkouts.len()
                    )?;
                }
            }
            ReportFormat::Detailed => {
                for day in self.days {
                    writeln!(f, "📅 {}", day.date.format("%A, %d %B %Y"))?;
                    writeln!(f, "🔑 Check-ins: {}", day.record.checkins.len())?;
                    for apartment in &day.record.checkins {
                        writeln!(f, "  - Apt {}", self.text(apartment))?;
                    }
                    writeln!(f, "🚪 Check-outs: {}", day.record.checkouts.len())?;
                    for apartment in &day.record.checkouts {
                        writeln!(f, "  - Apt {}", self.text(apartment))?;
                    }
                    writeln!(f, "----------")?;
                }
            }
            ReportFormat::Mailboxes => {
                for day in self.days {
                    self.write_mailbox_day(f, day)?;
                }
            }
        }
        Ok(())
    }
}

impl Report<'_> {
    fn text<'s>(&self, value: &'s str) -> Cow<'s, str> {
        if self.markdown {
            escape_markdown(value)
        } else {
            Cow::Borrowed(value)
        }
    }

    fn write_mailbox_day(&self, f: &mut fmt::Formatter<'_>, day: &DayPlan) -> fmt::Result {
        writeln!(f, "{}", "➖".repeat(12))?;
        let heading = day.date.format("%A %d %B");
        if self.markdown {
            writeln!(f, "🚨🚨 *{}*", heading)?;
        } else {
            writeln!(f, "🚨🚨 {}", heading)?;
        }
        writeln!(f)?;

        let checkout_time = self.text(self.checkout_time);
        writeln!(f, "🔚🔚  {} CHECKOUTS", day.record.checkouts.len())?;
        for apartment in &day.record.checkouts {
            writeln!(f, "{} checkout {}", self.text(apartment), checkout_time)?;
        }
        writeln!(f)?;

        let checkin_time = self.text(self.checkin_time);
        writeln!(f, "🔜🔜  {} CHECK-INS", day.record.checkins.len())?;
        for apartment in &day.record.checkins {
            writeln!(f, "{} check-in {}", self.text(apartment), checkin_time)?;
        }

        if !day.allocation.is_empty() {
            writeln!(f)?;
            for assignment in &day.allocation.assignments {
                writeln!(
                    f,
                    "📫 {}: {}",
                    self.text(assignment.mailbox.label()),
                    self.text(&assignment.apartment_id)
                )?;
            }
        }

        let missing = day.allocation.unassigned();
        if missing > 0 {
            writeln!(f, "⚠️ {} arrival(s) without a mailbox", missing)?;
        }
        writeln!(f)
    }
}

/// Writes a rendered report to a file
pub fn write_report_to_file(report: &Report<'_>, filename: &Path) -> std::io::Result<()> {
    let mut file = File::create(filename)?;
    write!(file, "{}", report)?;
    file.flush()
}
