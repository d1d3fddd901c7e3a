mod config;
mod output;
mod telemetry;

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Parser;
use lapse_core::{PurgeError, PurgeLoop, PurgeResult, PurgeService};
use lapse_sqlite::{SqliteRecordStore, TableName};
use tracing::{error, info};

use crate::config::{ConfigError, HarnessConfig, LogFormat};
use crate::output::{RunReport, summary_line};

/// Purge expired records from a SQLite table.
///
/// Configuration is read from the environment (and `.env`); flags override it.
#[derive(Parser, Debug)]
#[command(name = "lapse", version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Retention in days (overrides LAPSE_RETENTION_DAYS)
    #[arg(long, global = true)]
    retention_days: Option<u32>,

    /// Database URL (overrides LAPSE_DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Table holding the records (overrides LAPSE_TABLE)
    #[arg(long, global = true)]
    table: Option<String>,

    /// Count expired records without deleting them
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run one purge and exit (non-zero on storage failure)
    Run {
        /// Reference time (RFC 3339); defaults to the database clock
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,

        /// Print the result as JSON instead of a summary line
        #[arg(long)]
        json: bool,
    },
    /// Purge on a fixed interval until interrupted
    Watch {
        /// Seconds between runs (overrides LAPSE_INTERVAL_SECONDS)
        #[arg(long)]
        interval_seconds: Option<u64>,
    },
    /// Create the records table if it does not exist
    Init,
}

fn load_config(
    args: &Args,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<HarnessConfig, ConfigError> {
    let mut config = HarnessConfig::from_lookup(|key| match (key, &args.database_url) {
        ("LAPSE_DATABASE_URL", Some(url)) => Some(url.clone()),
        _ => lookup(key),
    })?;
    if let Some(days) = args.retention_days {
        config.retention_days = days;
    }
    if let Some(table) = &args.table {
        config.table = TableName::parse(table)?;
    }
    if args.dry_run {
        config.dry_run = true;
    }
    if let Command::Watch {
        interval_seconds: Some(secs),
    } = &args.command
    {
        if *secs == 0 {
            return Err(ConfigError::Zero("--interval-seconds".to_string()));
        }
        config.interval_seconds = *secs;
    }
    Ok(config)
}

/// Process exit status.
///
/// 0: run completed (zero deletions included), 1: storage / connect failure, 2: bad configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Success,
    PurgeFailed,
    Config,
}

impl Exit {
    fn code(self) -> u8 {
        match self {
            Exit::Success => 0,
            Exit::PurgeFailed => 1,
            Exit::Config => 2,
        }
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit.code())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    telemetry::init(LogFormat::from_env());

    let mut stdout = std::io::stdout();
    execute(args, |key| std::env::var(key).ok(), &mut stdout)
        .await
        .into()
}

async fn execute(
    args: Args,
    lookup: impl Fn(&str) -> Option<String>,
    out: &mut impl Write,
) -> Exit {
    let config = match load_config(&args, lookup) {
        Ok(config) => config,
        Err(err) => {
            error!("invalid configuration: {err}");
            return Exit::Config;
        }
    };

    let store = match SqliteRecordStore::connect(
        &config.database_url,
        config.database_max_connections,
        config.table.clone(),
    )
    .await
    {
        Ok(store) => store,
        Err(err) => {
            error!("failed to connect to database: {err}");
            return Exit::PurgeFailed;
        }
    };

    match args.command {
        Command::Init => init(&store).await,
        Command::Run { as_of, json } => run_once(store, &config, as_of, json, out).await,
        Command::Watch { .. } => watch(store, &config).await,
    }
}

async fn init(store: &SqliteRecordStore) -> Exit {
    match store.ensure_schema().await {
        Ok(()) => {
            info!(table = %store.table(), "table ready");
            Exit::Success
        }
        Err(err) => {
            error!(table = %store.table(), "failed to create table: {err}");
            Exit::PurgeFailed
        }
    }
}

async fn run_once(
    store: SqliteRecordStore,
    config: &HarnessConfig,
    as_of: Option<DateTime<Utc>>,
    json: bool,
    out: &mut impl Write,
) -> Exit {
    let service = PurgeService::new(store, config.purge_config());
    let outcome = match as_of {
        Some(now) => service.run(now).await,
        None => service.run_at_store_time().await,
    };
    report(outcome, config, as_of, json, out)
}

/// Print a finished run to `out` and pick the exit status.
fn report(
    outcome: Result<PurgeResult, PurgeError>,
    config: &HarnessConfig,
    as_of: Option<DateTime<Utc>>,
    json: bool,
    out: &mut impl Write,
) -> Exit {
    let result = match outcome {
        Ok(result) => result,
        Err(err) => {
            error!(
                table = %config.table,
                deleted = err.deleted_before_failure(),
                "purge did not complete: {err}"
            );
            return Exit::PurgeFailed;
        }
    };

    let line = if json {
        let report = RunReport {
            result,
            label: &config.record_label,
            as_of,
        };
        match serde_json::to_string(&report) {
            Ok(line) => line,
            Err(err) => {
                error!("failed to encode result: {err}");
                return Exit::PurgeFailed;
            }
        }
    } else {
        summary_line(&result, &config.record_label)
    };

    match writeln!(out, "{line}") {
        Ok(()) => Exit::Success,
        Err(err) => {
            error!("failed to write result: {err}");
            Exit::PurgeFailed
        }
    }
}

async fn watch(store: SqliteRecordStore, config: &HarnessConfig) -> Exit {
    let service = PurgeService::new(store, config.purge_config());
    let purge_loop = PurgeLoop::new(service, Duration::from_secs(config.interval_seconds));

    let stats = purge_loop
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("failed to listen for shutdown signal: {err}");
            }
        })
        .await;

    info!(
        ticks = stats.ticks,
        failures = stats.failures,
        deleted = stats.deleted,
        "{} records purged while watching",
        config.record_label
    );
    Exit::Success
}
