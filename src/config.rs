//! Configuration file: discovery, loading, validation and interactive setup.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use directories::BaseDirs;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, PoolError};
use crate::parser::is_remote;
use crate::schedule::MailboxPoolConfig;

pub const CONFIG_FILE_NAME: &str = "config.json";

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Feeds keyed by apartment id. Order is file order: earlier apartments
/// are served first when mailboxes run short.
pub type CalendarSources = IndexMap<String, String>;

/// Contents of `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub telegram: TelegramConfig,

    /// Apartment id -> iCalendar feed (URL or local path), in priority order.
    #[serde(default)]
    pub airbnb_urls: CalendarSources,

    /// General mailbox labels, handed out first to last.
    #[serde(default)]
    pub mailboxes: Vec<String>,

    /// Apartment id -> its own mailbox label.
    #[serde(default)]
    pub special_mailboxes: BTreeMap<String, String>,

    /// Days after today included in the report.
    #[serde(default = "default_days_ahead")]
    pub days_ahead: u32,

    #[serde(default = "default_checkin_time")]
    pub checkin_time: String,

    #[serde(default = "default_checkout_time")]
    pub checkout_time: String,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_airbnb_urls: Option<CalendarSources>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_mailboxes: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_special_mailboxes: Option<BTreeMap<String, String>>,
}

/// Telegram bot credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub api_token: String,
    pub chat_id: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_days_ahead() -> u32 {
    2
}

fn default_checkin_time() -> String {
    "15:00".to_string()
}

fn default_checkout_time() -> String {
    "11:00".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_api_base() -> String {
    TELEGRAM_API_BASE.to_string()
}

impl AppConfig {
    /// Reads and validates a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        let base = path.parent().unwrap_or(Path::new(""));
        Ok(config.with_sources_relative_to(base))
    }

    /// Makes relative feed paths relative to `base` (the config's directory)
    /// instead of the working directory.
    pub fn with_sources_relative_to(mut self, base: &Path) -> Self {
        resolve_sources(&mut self.airbnb_urls, base);
        if let Some(mock) = self.mock_airbnb_urls.as_mut() {
            resolve_sources(mock, base);
        }
        self
    }

    /// Loads `explicit` if given, otherwise the first `config.json` found by
    /// [`find_config_path`].
    pub fn locate_and_load(explicit: Option<&Path>) -> Result<(PathBuf, Self), ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => find_config_path().ok_or(ConfigError::NotFound)?,
        };
        debug!(path = %path.display(), "loading config");
        let config = Self::load(&path)?;
        Ok((path, config))
    }

    /// Checks everything that would otherwise only fail halfway through a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_time("checkin_time", &self.checkin_time)?;
        parse_time("checkout_time", &self.checkout_time)?;
        self.pool()?;
        Ok(())
    }

    /// The mailbox pool described by this config.
    pub fn pool(&self) -> Result<MailboxPoolConfig, PoolError> {
        MailboxPoolConfig::new(self.mailboxes.clone(), self.special_mailboxes.clone())
    }

    /// Replaces feeds and mailboxes with their `mock_*` counterparts.
    pub fn into_mock(mut self) -> Result<Self, ConfigError> {
        self.airbnb_urls = self
            .mock_airbnb_urls
            .clone()
            .ok_or(ConfigError::MockMissing("mock_airbnb_urls"))?;
        self.mailboxes = self
            .mock_mailboxes
            .clone()
            .ok_or(ConfigError::MockMissing("mock_mailboxes"))?;
        self.special_mailboxes = self.mock_special_mailboxes.clone().unwrap_or_default();
        self.validate()?;
        Ok(self)
    }

    /// Copy safe to print: the bot token is hidden.
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        copy.telegram.api_token = mask_token(&copy.telegram.api_token);
        copy
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::from)?;
        fs::write(path, json + "\n")?;
        Ok(())
    }
}

fn resolve_sources(sources: &mut CalendarSources, base: &Path) {
    for source in sources.values_mut() {
        if is_remote(source) || Path::new(source.as_str()).is_absolute() {
            continue;
        }
        *source = base.join(source.as_str()).display().to_string();
    }
}

/// Parses an `HH:MM` config value.
pub fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ConfigError::InvalidTime {
        field,
        value: value.to_string(),
    })
}

fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

/// Looks for `config.json` in the working directory, its parent, its
/// grandparent and finally the user's home directory.
pub fn find_config_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    find_config_path_from(&cwd, home.as_deref())
}

pub fn find_config_path_from(start: &Path, home: Option<&Path>) -> Option<PathBuf> {
    start
        .ancestors()
        .take(3)
        .chain(home)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Asks for every config value on `output` and reads answers from `input`.
/// List prompts end when the user types `done`.
pub fn prompt_config<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<AppConfig> {
    let api_token = ask(input, output, "Enter your Telegram API token: ")?;
    let chat_id = ask(input, output, "Enter your Telegram chat ID: ")?;

    let mut airbnb_urls = CalendarSources::new();
    loop {
        let apartment = ask(input, output, "Enter the apartment number (or 'done' to finish): ")?;
        if is_done(&apartment) {
            break;
        }
        let url = ask(
            input,
            output,
            &format!("Enter the iCal URL for apartment {}: ", apartment),
        )?;
        airbnb_urls.insert(apartment, url);
    }

    let mut mailboxes = Vec::new();
    loop {
        let mailbox = ask(input, output, "Enter a mailbox (or 'done' to finish): ")?;
        if is_done(&mailbox) {
            break;
        }
        mailboxes.push(mailbox);
    }

    let mut special_mailboxes = BTreeMap::new();
    loop {
        let apartment = ask(
            input,
            output,
            "Enter the apartment number for special mailbox (or 'done' to finish): ",
        )?;
        if is_done(&apartment) {
            break;
        }
        let mailbox = ask(
            input,
            output,
            &format!("Enter the special mailbox for apartment {}: ", apartment),
        )?;
        special_mailboxes.insert(apartment, mailbox);
    }

    Ok(AppConfig {
        telegram: TelegramConfig {
            api_token,
            chat_id,
            api_base: default_api_base(),
        },
        airbnb_urls,
        mailboxes,
        special_mailboxes,
        days_ahead: default_days_ahead(),
        checkin_time: default_checkin_time(),
        checkout_time: default_checkout_time(),
        http_timeout_secs: default_http_timeout_secs(),
        mock_airbnb_urls: Some(CalendarSources::from([
            ("1".to_string(), "data/apartment_1.ics".to_string()),
            ("2".to_string(), "data/apartment_2.ics".to_string()),
        ])),
        mock_mailboxes: Some(vec!["M1".to_string(), "M2".to_string()]),
        mock_special_mailboxes: Some(BTreeMap::from([("1".to_string(), "M-1".to_string())])),
    })
}

fn is_done(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("done")
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> io::Result<String> {
    write!(output, "{}", prompt)?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        // EOF ends any list prompt
        return Ok("done".to_string());
    }
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
        "telegram": {"api_token": "123456:ABCDEF", "chat_id": "-100200"},
        "airbnb_urls": {"411": "https://example.com/411.ics", "205": "data/205.ics"},
        "mailboxes": ["Box1", "Box2", "Box3"],
        "special_mailboxes": {"411": "Box411", "611": "Box611"},
        "mock_airbnb_urls": {"1": "data/apartment_1.ics"},
        "mock_mailboxes": ["1", "2", "3"],
        "mock_special_mailboxes": {"1": "M1"}
    }"#;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_with_defaults() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), SAMPLE);

        let config = AppConfig::load(&path).unwrap();

        assert_eq!(config.days_ahead, 2);
        assert_eq!(config.checkin_time, "15:00");
        assert_eq!(config.checkout_time, "11:00");
        assert_eq!(config.telegram.api_base, TELEGRAM_API_BASE);
        assert_eq!(config.airbnb_urls.len(), 2);
        let pool = config.pool().unwrap();
        assert_eq!(pool.general(), ["Box1", "Box2", "Box3"]);
        assert_eq!(pool.dedicated()["611"], "Box611");
    }

    #[test]
    fn rejects_misconfigured_pool_at_load() {
        let dir = tempdir().unwrap();
        let body = SAMPLE.replace(r#""Box1", "Box2", "Box3""#, r#""Box1", "Box411""#);
        let path = write_config(dir.path(), &body);

        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Pool(PoolError::SharedWithGeneral { .. })));
    }

    #[test]
    fn rejects_bad_time() {
        let dir = tempdir().unwrap();
        let body = SAMPLE.replace(
            r#""mailboxes""#,
            r#""checkin_time": "3pm", "mailboxes""#,
        );
        let path = write_config(dir.path(), &body);

        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::InvalidTime { field: "checkin_time", .. })
        ));
    }

    #[test]
    fn reports_parse_errors_with_path() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "{ not json");

        match AppConfig::load(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn mock_swaps_sources_and_pool() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), SAMPLE);

        let config = AppConfig::load(&path).unwrap().into_mock().unwrap();

        assert_eq!(config.airbnb_urls.len(), 1);
        assert_eq!(config.mailboxes, vec!["1", "2", "3"]);
        assert_eq!(config.pool().unwrap().dedicated()["1"], "M1");
    }

    #[test]
    fn mock_pool_is_validated_too() {
        let dir = tempdir().unwrap();
        let body = SAMPLE.replace(r#"{"1": "M1"}"#, r#"{"1": "3", "2": "1"}"#);
        let path = write_config(dir.path(), &body);

        let err = AppConfig::load(&path).unwrap().into_mock().unwrap_err();
        assert!(matches!(err, ConfigError::Pool(PoolError::SharedWithGeneral { .. })));
    }

    #[test]
    fn mock_requires_mock_sources() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{"telegram": {"api_token": "t", "chat_id": "c"}}"#,
        );

        let err = AppConfig::load(&path).unwrap().into_mock().unwrap_err();
        assert!(matches!(err, ConfigError::MockMissing("mock_airbnb_urls")));
    }

    #[test]
    fn finds_config_in_grandparent_before_home() {
        let root = tempdir().unwrap();
        let home = tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        write_config(root.path(), SAMPLE);
        write_config(home.path(), SAMPLE);

        let found = find_config_path_from(&nested, Some(home.path())).unwrap();
        assert_eq!(found, root.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn falls_back_to_home() {
        let root = tempdir().unwrap();
        let home = tempdir().unwrap();
        let nested = root.path().join("a").join("b").join("c");
        fs::create_dir_all(&nested).unwrap();
        // Three levels up is out of reach
        write_config(root.path(), SAMPLE);
        write_config(home.path(), SAMPLE);

        let found = find_config_path_from(&nested, Some(home.path())).unwrap();
        assert_eq!(found, home.path().join(CONFIG_FILE_NAME));

        assert!(find_config_path_from(&nested, None).is_none());
    }

    #[test]
    fn masks_token() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), SAMPLE);
        let config = AppConfig::load(&path).unwrap();

        assert_eq!(config.masked().telegram.api_token, "1234****");
        assert_eq!(mask_token("abc"), "****");
    }

    #[test]
    fn prompt_builds_config_and_round_trips_to_disk() {
        let answers = "tok\n42\n411\nhttps://x/411.ics\ndone\nBox1\nBox2\ndone\n411\nBox411\ndone\n";
        let mut input = Cursor::new(answers);
        let mut output = Vec::new();

        let config = prompt_config(&mut input, &mut output).unwrap();

        assert_eq!(config.telegram.api_token, "tok");
        assert_eq!(config.telegram.chat_id, "42");
        assert_eq!(config.airbnb_urls["411"], "https://x/411.ics");
        assert_eq!(config.mailboxes, vec!["Box1", "Box2"]);
        assert_eq!(config.special_mailboxes["411"], "Box411");
        let prompts = String::from_utf8(output).unwrap();
        assert!(prompts.contains("Enter your Telegram API token"));

        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        config.save(&path).unwrap();
        let reloaded = AppConfig::load(&path).unwrap();
        assert_eq!(reloaded.mailboxes, config.mailboxes);
        assert!(fs::read_to_string(&path).unwrap().contains("mock_airbnb_urls"));

        let mock = reloaded.into_mock().unwrap();
        assert_eq!(mock.mailboxes, vec!["M1", "M2"]);
        assert_eq!(
            mock.airbnb_urls["1"],
            dir.path().join("data/apartment_1.ics").display().to_string()
        );
    }

    #[tokio::test]
    async fn apartments_keep_file_order() {
        let dir = tempdir().unwrap();
        let stay = "BEGIN:VEVENT\nDTSTART;VALUE=DATE:20250510\nDTEND;VALUE=DATE:20250512\nEND:VEVENT\n";
        fs::write(dir.path().join("99.ics"), stay).unwrap();
        fs::write(dir.path().join("100.ics"), stay).unwrap();
        let body = r#"{
            "telegram": {"api_token": "t", "chat_id": "c"},
            "airbnb_urls": {"99": "99.ics", "100": "100.ics"},
            "mailboxes": ["Box1"]
        }"#;
        let path = write_config(dir.path(), body);

        let config = AppConfig::load(&path).unwrap();
        let order: Vec<&str> = config.airbnb_urls.keys().map(String::as_str).collect();
        assert_eq!(order, ["99", "100"]);

        let stays =
            crate::parser::load_reservations(&reqwest::Client::new(), &config.airbnb_urls).await;
        let day = chrono::NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let days = crate::schedule::plan_window(&stays, &config.pool().unwrap(), day, 0);

        assert_eq!(days[0].record.checkins, vec!["99", "100"]);
        assert_eq!(days[0].allocation.get("99").unwrap().label(), "Box1");
        assert!(!days[0].allocation.get("100").unwrap().is_assigned());
    }

    #[tokio::test]
    async fn relative_mock_paths_follow_the_config_file() {
        let root = tempdir().unwrap();
        let data = root.path().join("data");
        fs::create_dir_all(&data).unwrap();
        fs::copy(
            Path::new(env!("CARGO_MANIFEST_DIR")).join("data/apartment_1.ics"),
            data.join("apartment_1.ics"),
        )
        .unwrap();
        write_config(root.path(), SAMPLE);
        let nested = root.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let found = find_config_path_from(&nested, None).unwrap();
        let config = AppConfig::load(&found).unwrap().into_mock().unwrap();

        assert_eq!(
            config.airbnb_urls["1"],
            data.join("apartment_1.ics").display().to_string()
        );
        let stays =
            crate::parser::load_reservations(&reqwest::Client::new(), &config.airbnb_urls).await;
        assert!(!stays.is_empty());
        assert!(stays.iter().all(|s| s.apartment_id == "1"));
    }

    #[test]
    fn remote_and_absolute_sources_are_left_alone() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), SAMPLE);

        let config = AppConfig::load(&path).unwrap();

        assert_eq!(config.airbnb_urls["411"], "https://example.com/411.ics");
        assert_eq!(
            config.airbnb_urls["205"],
            dir.path().join("data/205.ics").display().to_string()
        );
    }

    #[test]
    fn prompt_stops_at_end_of_input() {
        let mut input = Cursor::new("tok\n42\n");
        let config = prompt_config(&mut input, &mut Vec::new()).unwrap();
        assert!(config.airbnb_urls.is_empty());
        assert!(config.mailboxes.is_empty());
    }
}
