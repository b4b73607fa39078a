//! Error types, one enum per concern.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Mailbox pool definitions the allocator refuses to run with.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("duplicate_general_label: {0}")]
    DuplicateGeneral(String),

    #[error("label_shared_with_general: {label} (dedicated to apartment {apartment})")]
    SharedWithGeneral { label: String, apartment: String },

    #[error("duplicate_dedicated_label: {label} claimed by apartments {first} and {second}")]
    DuplicateDedicated {
        label: String,
        first: String,
        second: String,
    },

    #[error("blank_label: mailbox labels must not be empty")]
    BlankLabel,
}

/// A stay that cannot be placed on the calendar.
#[derive(Debug, Error)]
pub enum IntervalError {
    #[error("missing_apartment: stay has no apartment id")]
    MissingApartment,

    #[error("departure_before_arrival: apartment {apartment} arrives {arrival} but leaves {departure}")]
    DepartureBeforeArrival {
        apartment: String,
        arrival: NaiveDate,
        departure: NaiveDate,
    },
}

/// Failures while loading or locating the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config_not_found: no config.json in the working directory, its parents or the home directory")]
    NotFound,

    #[error("config_read_failed: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config_parse_failed: {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config_write_failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("invalid_mailbox_pool: {0}")]
    Pool(#[from] PoolError),

    #[error("mock_data_missing: --mock needs `{0}` in the config")]
    MockMissing(&'static str),

    #[error("invalid_time: {field} = {value:?}, expected HH:MM")]
    InvalidTime { field: &'static str, value: String },
}

/// Failures of one calendar source. These only ever drop that source.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar_fetch_failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("calendar_read_failed: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `feed` is the scheme and host only, never the tokenized URL
    #[error("calendar_http_status: {feed} returned {status}")]
    Status { feed: String, status: u16 },
}

/// Failures while delivering the report.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram_request_failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("telegram_rejected: status {status}: {description}")]
    Rejected { status: u16, description: String },
}
