use crate::errors::{ActivityLogError, ActivityLogResult};
use crate::log_sink::{resolve_log_path, DEFAULT_LOG_FILE_NAME};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "activity-log.toml";

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "ACTIVITY_LOG_CONFIG";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggerConfig {
    /// Host storage directory the log file lives in
    pub storage_dir: String,
    #[serde(default = "default_log_file_name")]
    pub log_file_name: String,
    /// Diagnostic verbosity for the tool itself, not the activity log
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_file_name() -> String {
    DEFAULT_LOG_FILE_NAME.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Serialize)]
struct LoggerConfigDefaults {
    log_file_name: String,
    log_level: String,
}

impl Default for LoggerConfigDefaults {
    fn default() -> Self {
        Self {
            log_file_name: default_log_file_name(),
            log_level: default_log_level(),
        }
    }
}

impl LoggerConfig {
    pub fn new(storage_dir: &str) -> Self {
        Self {
            storage_dir: storage_dir.to_string(),
            log_file_name: default_log_file_name(),
            log_level: default_log_level(),
        }
    }

    /// Extract and validate a config from an assembled figment
    pub fn from_figment(figment: Figment) -> ActivityLogResult<Self> {
        let config: LoggerConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ActivityLogResult<()> {
        if self.storage_dir.trim().is_empty() {
            return Err(ActivityLogError::config("storage_dir must be set"));
        }

        let name = self.log_file_name.trim();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(ActivityLogError::config(format!(
                "log_file_name must be a bare file name, got '{}'",
                self.log_file_name
            )));
        }

        self.tracing_level()?;
        Ok(())
    }

    /// Normalized path of the activity log, fixed for the process lifetime
    pub fn log_path(&self) -> PathBuf {
        resolve_log_path(&self.storage_dir, self.log_file_name.trim())
    }

    pub fn tracing_level(&self) -> ActivityLogResult<tracing::Level> {
        tracing::Level::from_str(self.log_level.trim()).map_err(|_| {
            ActivityLogError::config(format!("unknown log_level '{}'", self.log_level))
        })
    }
}

/// Layered figment: defaults, then the TOML file, then `ACTIVITY_LOG_*` env
pub fn config_figment(path: Option<&str>) -> Figment {
    let file = path
        .map(str::to_string)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    Figment::from(Serialized::defaults(LoggerConfigDefaults::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed("ACTIVITY_LOG_"))
}

pub fn load_config(path: Option<&str>) -> ActivityLogResult<LoggerConfig> {
    LoggerConfig::from_figment(config_figment(path))
}
