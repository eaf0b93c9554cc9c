use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable that switches the folder resolver between the full
/// strategy chain and the folder-name-only baseline.
pub const PARSE_MODE_VAR: &str = "PARSE_MODE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root directory holding one folder per received email.
    pub save_dir: PathBuf,
    /// Directory the CSV report sheets are written to.
    pub output_dir: PathBuf,
    /// Mailbox keyword used by the download pipeline to pick a folder.
    pub target_folder: String,
    /// Glob patterns of submission folder names skipped during scanning.
    pub ignore_patterns: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("downloaded_attachments"),
            output_dir: PathBuf::from("reports"),
            target_folder: String::new(),
            ignore_patterns: Vec::new(),
        }
    }
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::default())
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Resolver behaviour: the full strategy chain, or the naive folder-name parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    #[default]
    Smart,
    Traditional,
}

impl ParseMode {
    /// Read `PARSE_MODE` from the environment. Unknown or missing values mean `Smart`.
    pub fn from_env() -> Self {
        env::var(PARSE_MODE_VAR)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smart" => Ok(ParseMode::Smart),
            "traditional" => Ok(ParseMode::Traditional),
            other => Err(format!("unknown parse mode '{}'", other)),
        }
    }
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMode::Smart => write!(f, "smart"),
            ParseMode::Traditional => write!(f, "traditional"),
        }
    }
}

/// Where a resolution call gets its mode from.
///
/// `Environment` is consulted on every call, so flipping `PARSE_MODE` between
/// two analyses in the same process takes effect immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeSelector {
    Fixed(ParseMode),
    #[default]
    Environment,
}

impl ModeSelector {
    pub fn current(&self) -> ParseMode {
        match self {
            ModeSelector::Fixed(mode) => *mode,
            ModeSelector::Environment => ParseMode::from_env(),
        }
    }
}
