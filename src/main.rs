use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{Days, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use reqwest::Client;
use tracing::{error, info, warn};

use mailbox_dispatch::config::{self, prompt_config, AppConfig};
use mailbox_dispatch::display::{write_report_to_file, Report, ReportFormat};
use mailbox_dispatch::export::export_plan_to_file;
use mailbox_dispatch::parser::load_reservations;
use mailbox_dispatch::schedule::{plan_window, DayPlan, MailboxPoolConfig};
use mailbox_dispatch::{logging, telegram};

/// Tells the property manager who arrives and leaves, and which mailbox
/// holds each arriving guest's keys.
#[derive(Debug, Parser)]
#[command(name = "mailbox-dispatch", version, about)]
struct Cli {
    /// Config file to use instead of searching for config.json
    #[arg(long, global = true, env = "MAILBOX_DISPATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Use the mock_* calendars and mailboxes from the config
    #[arg(long, global = true)]
    mock: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the report and send it to Telegram (default)
    Run {
        /// Print the report instead of sending it
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Print the report to stdout
    Preview {
        #[arg(long, value_enum, default_value_t = ReportFormat::Mailboxes)]
        format: ReportFormat,

        /// Also write the report to this file
        #[arg(long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Write the planned days as CSV
    Export {
        #[arg(long)]
        out: PathBuf,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Create a config file interactively
    Setup {
        #[arg(long, default_value = config::CONFIG_FILE_NAME)]
        out: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Locate, validate and print the config (token masked)
    CheckConfig,
}

#[derive(Debug, Clone, Default, Args)]
struct WindowArgs {
    /// First day of the window, YYYY-MM-DD (default: today)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Days after the first one to include (default: days_ahead from config)
    #[arg(long)]
    days: Option<u32>,
}

/// Everything a planning command needs, loaded once
struct Session {
    config: AppConfig,
    pool: MailboxPoolConfig,
    client: Client,
}

impl Session {
    fn open(config_path: Option<&Path>, mock: bool) -> Result<Self> {
        let (path, config) = AppConfig::locate_and_load(config_path)?;
        let config = if mock { config.into_mock()? } else { config };
        info!(
            path = %path.display(),
            apartments = config.airbnb_urls.len(),
            mock,
            "config loaded"
        );

        let pool = config.pool()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            config,
            pool,
            client,
        })
    }

    /// Fetches every calendar and plans the window
    async fn plan(&self, window: &WindowArgs) -> (Vec<DayPlan>, NaiveDate, NaiveDate) {
        let start = window.start.unwrap_or_else(|| Local::now().date_naive());
        let horizon = window.days.unwrap_or(self.config.days_ahead);
        let end = start
            .checked_add_days(Days::new(u64::from(horizon)))
            .unwrap_or(NaiveDate::MAX);

        let stays = load_reservations(&self.client, &self.config.airbnb_urls).await;
        let days = plan_window(&stays, &self.pool, start, horizon);

        let short: usize = days.iter().map(|d| d.allocation.unassigned()).sum();
        if short > 0 {
            warn!(arrivals = short, "some arrivals have no mailbox");
        }
        info!(%start, %end, stays = stays.len(), active_days = days.len(), "window planned");

        (days, start, end)
    }

    fn report<'a>(
        &'a self,
        days: &'a [DayPlan],
        format: ReportFormat,
        start: NaiveDate,
        end: NaiveDate,
        markdown: bool,
    ) -> Report<'a> {
        Report {
            days,
            format,
            start,
            end,
            checkin_time: &self.config.checkin_time,
            checkout_time: &self.config.checkout_time,
            markdown,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "mailbox-dispatch failed");
            for cause in e.chain().skip(1) {
                error!(cause = %cause, "caused by");
            }
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Cli {
        config: config_path,
        mock,
        command,
        ..
    } = cli;
    let command = command.unwrap_or(Command::Run {
        dry_run: false,
        window: WindowArgs::default(),
    });

    match command {
        Command::Run { dry_run, window } => {
            let session = Session::open(config_path.as_deref(), mock)?;
            let (days, start, end) = session.plan(&window).await;
            // A dry run prints exactly what Telegram would receive
            let text = session
                .report(&days, ReportFormat::Mailboxes, start, end, true)
                .to_string();

            if dry_run {
                print!("{}", text);
            } else {
                telegram::send_report(&session.client, &session.config.telegram, &text)
                    .await
                    .context("sending report to Telegram")?;
            }
        }
        Command::Preview {
            format,
            out,
            window,
        } => {
            let session = Session::open(config_path.as_deref(), mock)?;
            let (days, start, end) = session.plan(&window).await;
            let report = session.report(&days, format, start, end, false);
            print!("{}", report);

            if let Some(path) = out {
                write_report_to_file(&report, &path)
                    .with_context(|| format!("writing report to {}", path.display()))?;
                info!(path = %path.display(), "report saved");
            }
        }
        Command::Export { out, window } => {
            let session = Session::open(config_path.as_deref(), mock)?;
            let (days, _, _) = session.plan(&window).await;
            export_plan_to_file(
                &days,
                &session.config.checkin_time,
                &session.config.checkout_time,
                &out,
            )
            .with_context(|| format!("writing {}", out.display()))?;
            info!(path = %out.display(), days = days.len(), "plan exported");
        }
        Command::Setup { out, force } => {
            if out.exists() && !force {
                bail!("{} already exists, pass --force to overwrite", out.display());
            }
            let stdin = io::stdin();
            let config = prompt_config(&mut stdin.lock(), &mut io::stdout())?;
            config.validate()?;
            config.save(&out)?;
            println!("Configuration saved to {}", out.display());
        }
        Command::CheckConfig => {
            let (path, config) = AppConfig::locate_and_load(config_path.as_deref())?;
            println!("Configuration file found at: {}", path.display());
            println!("{}", serde_json::to_string_pretty(&config.masked())?);
            let pool = config.pool()?;
            println!(
                "{} mailbox(es): {} general, {} dedicated; {} calendar source(s)",
                pool.capacity(),
                pool.general().len(),
                pool.dedicated().len(),
                config.airbnb_urls.len()
            );
        }
    }

    Ok(())
}
