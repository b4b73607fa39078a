use std::path::Path;

use chrono::NaiveDate;
use reqwest::{Client, Url};
use tracing::{info, warn};

use crate::config::CalendarSources;
use crate::error::CalendarError;
use crate::schedule::StayInterval;

/// Undoes iCalendar line folding: a line starting with a space or tab
/// continues the previous one
fn unfold_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        let raw = raw.trim_end_matches('\r');
        if let Some(rest) = raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t')) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        lines.push(raw.to_string());
    }
    lines
}

/// Splits `DTSTART;VALUE=DATE:20250510` into its property name and value
fn split_property(line: &str) -> Option<(&str, &str)> {
    let (head, value) = line.split_once(':')?;
    let name = head.split(';').next().unwrap_or(head);
    Some((name, value))
}

/// Reads the calendar date of a DATE or DATE-TIME value (`20250510`,
/// `20250510T150000`, `20250510T150000Z`). Time of day is ignored
fn parse_ics_date(value: &str) -> Option<NaiveDate> {
    let digits = value.trim().get(..8)?;
    NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

/// Turns every VEVENT of an iCalendar document into a stay for `apartment_id`.
/// Events without a readable DTSTART/DTEND are skipped.
pub fn parse_ics(apartment_id: &str, text: &str) -> Vec<StayInterval> {
    let mut stays = Vec::new();
    let mut in_event = false;
    let mut start: Option<NaiveDate> = None;
    let mut end: Option<NaiveDate> = None;
    let mut uid: Option<String> = None;

    for line in unfold_lines(text) {
        let Some((name, value)) = split_property(&line) else {
            continue;
        };
        match (name.to_ascii_uppercase().as_str(), value.trim()) {
            ("BEGIN", "VEVENT") => {
                in_event = true;
                start = None;
                end = None;
                uid = None;
            }
            ("END", "VEVENT") if in_event => {
                in_event = false;
                match (start, end) {
                    (Some(arrival), Some(departure)) => {
                        stays.push(StayInterval::new(apartment_id, arrival, departure));
                    }
                    _ => warn!(
                        apartment = apartment_id,
                        uid = uid.as_deref().unwrap_or("-"),
                        "skipping event without start/end date"
                    ),
                }
            }
            ("DTSTART", v) if in_event => start = parse_ics_date(v),
            ("DTEND", v) if in_event => end = parse_ics_date(v),
            ("UID", v) if in_event => uid = Some(v.to_string()),
            _ => {}
        }
    }

    stays
}

pub fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Names a feed for logs and errors without its query string, which for
/// Airbnb carries the calendar's secret token
pub fn describe_source(source: &str) -> String {
    if !is_remote(source) {
        return source.to_string();
    }
    match Url::parse(source.trim()) {
        Ok(url) => match url.host_str() {
            Some(host) => format!("{}://{}", url.scheme(), host),
            None => url.scheme().to_string(),
        },
        Err(_) => "<invalid url>".to_string(),
    }
}

/// Fetches a feed over HTTP or reads it from disk
pub async fn load_source(client: &Client, source: &str) -> Result<String, CalendarError> {
    if is_remote(source) {
        let response = client
            .get(source.trim())
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CalendarError::Status {
                feed: describe_source(source),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await.map_err(reqwest::Error::without_url)?)
    } else {
        let path = Path::new(source);
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CalendarError::Read {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Loads the stays of every apartment, in the order the sources are listed.
///
/// A feed that cannot be loaded contributes no stays; the others still count.
pub async fn load_reservations(
    client: &Client,
    sources: &CalendarSources,
) -> Vec<StayInterval> {
    let mut stays = Vec::new();

    for (apartment, source) in sources {
        match load_source(client, source).await {
            Ok(text) => {
                let parsed = parse_ics(apartment, &text);
                info!(apartment = %apartment, stays = parsed.len(), "loaded calendar");
                stays.extend(parsed);
            }
            Err(e) => {
                warn!(
                    apartment = %apartment,
                    source = %describe_source(source),
                    error = %e,
                    "calendar unavailable, skipping apartment"
                );
            }
        }
    }

    stays
}
