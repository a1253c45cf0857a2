use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_info, LogDestination};
use serde::{Deserialize, Serialize};
use sorter_core::{Mode, UnknownMode};
use sorter_engine::{ConnectionSettings, EngineSettings, FetchSettings, UploadSettings};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILENAME: &str = "sorter.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error(transparent)]
    Mode(#[from] UnknownMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    #[default]
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server_url: String,
    pub image_base_url: String,
    /// One of `automatic`, `semi-automatic`, `manual`.
    pub mode: String,
    pub output_dir: PathBuf,
    pub connect_timeout_ms: u64,
    pub max_concurrent_reads: Option<usize>,
    pub fetch_previews: bool,
    pub log_destination: LogTarget,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:4200/ws".to_string(),
            image_base_url: "http://localhost:4200/uploads/".to_string(),
            mode: Mode::default().as_str().to_string(),
            output_dir: PathBuf::from("./output"),
            connect_timeout_ms: 10_000,
            max_concurrent_reads: None,
            fetch_previews: false,
            log_destination: LogTarget::default(),
        }
    }
}

/// Values given on the command line; `None` keeps the file's value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub server_url: Option<String>,
    pub image_base_url: Option<String>,
    pub mode: Option<Mode>,
    pub output_dir: Option<PathBuf>,
    pub max_concurrent_reads: Option<usize>,
    pub fetch_previews: bool,
    pub log_destination: Option<LogTarget>,
}

impl AppConfig {
    /// Loads `path`. A missing file yields the defaults unless `required` is set.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        config.mode()?;
        engine_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self, String> {
        ron::from_str(content).map_err(|err| err.to_string())
    }

    pub fn apply(&mut self, overrides: CliOverrides) {
        if let Some(url) = overrides.server_url {
            self.server_url = url;
        }
        if let Some(url) = overrides.image_base_url {
            self.image_base_url = url;
        }
        if let Some(mode) = overrides.mode {
            self.mode = mode.as_str().to_string();
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        if overrides.max_concurrent_reads.is_some() {
            self.max_concurrent_reads = overrides.max_concurrent_reads;
        }
        if overrides.fetch_previews {
            self.fetch_previews = true;
        }
        if let Some(target) = overrides.log_destination {
            self.log_destination = target;
        }
    }

    pub fn mode(&self) -> Result<Mode, UnknownMode> {
        self.mode.parse()
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            connection: ConnectionSettings {
                url: self.server_url.clone(),
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            },
            upload: UploadSettings {
                max_concurrent_reads: self.max_concurrent_reads,
            },
            fetch: FetchSettings {
                base_url: self.image_base_url.clone(),
                ..FetchSettings::default()
            },
        }
    }
}
