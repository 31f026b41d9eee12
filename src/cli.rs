use crate::audit::{EventFields, EventKind};
use crate::config_loader::{config_figment, LoggerConfig};
use crate::directory::{InMemoryDirectory, UserRecord};
use crate::errors::SafeLock;
use crate::hooks::{ActivityLogger, LifecycleEvent};
use crate::log_sink::FileSink;
use crate::recorder::EventRecorder;
use crate::session_context::{RequestSource, StaticRequest};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use figment::providers::Serialized;
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Top-level CLI interface
#[derive(Parser, Debug)]
#[command(
    name = "activity-log",
    version,
    about = "Append-only audit log of user account activity"
)]
pub struct Cli {
    /// TOML config file (defaults to activity-log.toml or $ACTIVITY_LOG_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Override the configured storage directory
    #[arg(long, global = true)]
    pub storage_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the resolved activity log path
    Path,

    /// Feed recorded host notifications (JSON lines) through the lifecycle hooks
    Replay {
        #[arg(short, long)]
        input: String,
        /// JSON array of user records backing lookups
        #[arg(short, long)]
        users: Option<String>,
    },

    /// Record a single event from the command line
    Record {
        /// Event kind, e.g. LOGIN_FAILED
        #[arg(short, long)]
        kind: String,
        /// Field as Name=Value, repeatable, kept in order
        #[arg(short = 'f', long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        user_agent: Option<String>,
        #[arg(long)]
        uri: Option<String>,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected Name=Value, got '{raw}'"))?;
    if name.trim().is_empty() {
        return Err(format!("field name missing in '{raw}'"));
    }
    Ok((name.trim().to_string(), value.to_string()))
}

/// One replay line: a lifecycle notification plus the ambient state the
/// host would have had when it fired
#[derive(Debug, Deserialize)]
pub struct ReplayEntry {
    #[serde(flatten)]
    pub event: LifecycleEvent,
    #[serde(default)]
    pub request: StaticRequest,
    #[serde(default)]
    pub actor_id: u64,
    /// Directory state to apply before dispatch (e.g. the post-update user)
    #[serde(default)]
    pub directory_update: Option<UserRecord>,
}

/// Request metadata swapped in per replayed entry
#[derive(Debug, Default)]
pub struct ReplayRequest {
    current: Mutex<StaticRequest>,
}

impl ReplayRequest {
    pub fn set(&self, request: StaticRequest) {
        if let Ok(mut current) = self.current.safe_lock() {
            *current = request;
        }
    }

    fn read(&self) -> StaticRequest {
        self.current
            .safe_lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl RequestSource for ReplayRequest {
    fn client_address(&self) -> Option<String> {
        self.read().client_address
    }

    fn user_agent(&self) -> Option<String> {
        self.read().user_agent
    }

    fn request_uri(&self) -> Option<String> {
        self.read().request_uri
    }
}

/// Counts reported after a replay
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub dispatched: usize,
    pub skipped: usize,
}

/// Dispatch every well-formed line of `input` in order
pub fn replay<R: BufRead>(
    input: R,
    logger: &ActivityLogger,
    directory: &InMemoryDirectory,
    request: &ReplayRequest,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, line) in input.lines().enumerate() {
        let line = line.context("reading replay input")?;
        if line.trim().is_empty() {
            continue;
        }

        let entry: ReplayEntry = match serde_json::from_str(&line) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping replay line {}: {}", index + 1, e);
                summary.skipped += 1;
                continue;
            }
        };

        if let Some(user) = entry.directory_update {
            directory.upsert(user)?;
        }
        directory.set_current_user(entry.actor_id);
        request.set(entry.request);

        entry.event.dispatch(logger);
        summary.dispatched += 1;
    }

    Ok(summary)
}

fn resolve_config(cli: &Cli) -> Result<LoggerConfig> {
    let mut figment = config_figment(cli.config.as_deref());
    if let Some(dir) = &cli.storage_dir {
        figment = figment.merge(Serialized::default("storage_dir", dir));
    }
    LoggerConfig::from_figment(figment).context("loading configuration")
}

fn open_sink(config: &LoggerConfig) -> Result<FileSink> {
    std::fs::create_dir_all(&config.storage_dir)
        .with_context(|| format!("creating storage dir {}", config.storage_dir))?;
    Ok(FileSink::new(config.log_path()))
}

/// Load configuration, install diagnostics and run the selected command
pub fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level()?)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Path => {
            println!("{}", config.log_path().display());
        }
        Commands::Replay { input, users } => {
            let directory = match users {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading users file {path}"))?;
                    InMemoryDirectory::from_json(&json)?
                }
                None => InMemoryDirectory::new(),
            };
            let directory = Arc::new(directory);
            let request = Arc::new(ReplayRequest::default());

            let recorder = EventRecorder::new(open_sink(&config)?)
                .with_request_source(request.clone());
            let logger = ActivityLogger::new(recorder, directory.clone());

            let file = std::fs::File::open(&input)
                .with_context(|| format!("opening replay input {input}"))?;
            let summary = replay(BufReader::new(file), &logger, &directory, &request)?;

            info!(
                dispatched = summary.dispatched,
                skipped = summary.skipped,
                "replay complete"
            );
            println!(
                "replayed {} events ({} skipped) into {}",
                summary.dispatched,
                summary.skipped,
                config.log_path().display()
            );
        }
        Commands::Record {
            kind,
            fields,
            ip,
            user_agent,
            uri,
        } => {
            let kind: EventKind = kind.parse()?;
            let fields: EventFields = fields.into_iter().collect();
            let request = StaticRequest {
                client_address: ip,
                user_agent,
                request_uri: uri,
            };

            let recorder = EventRecorder::new(open_sink(&config)?)
                .with_request_source(Arc::new(request));
            recorder
                .try_record(kind, fields)
                .context("appending activity record")?;
        }
    }

    Ok(())
}
