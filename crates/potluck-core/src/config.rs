use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings read from `<config_dir>/potluck/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL share links are rendered against.
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Days a new event stays open before it expires.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_publish_interval_secs")]
    pub publish_interval_secs: u64,
    /// Store file; defaults to `<data_dir>/potluck/events.json`.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            retention_days: default_retention_days(),
            publish_interval_secs: default_publish_interval_secs(),
            store_path: None,
            output: None,
        }
    }
}

impl Config {
    #[must_use]
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    #[must_use]
    pub const fn publish_interval(&self) -> Duration {
        Duration::from_secs(self.publish_interval_secs)
    }
}

/// Environment overrides, captured once so resolution stays pure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// `POTLUCK_CONFIG`: config file to read instead of the default.
    pub config: Option<PathBuf>,
    /// `POTLUCK_STORE`
    pub store: Option<PathBuf>,
    /// `POTLUCK_ORIGIN`
    pub origin: Option<String>,
    /// `FORMAT`
    pub format: Option<String>,
}

impl EnvOverrides {
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            config: var("POTLUCK_CONFIG").map(PathBuf::from),
            store: var("POTLUCK_STORE").map(PathBuf::from),
            origin: var("POTLUCK_ORIGIN"),
            format: var("FORMAT"),
        }
    }
}

/// Flags a front end passes in; they beat every other source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub json: bool,
    pub format: Option<String>,
    pub store: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub config: Config,
    pub origin: String,
    pub store_path: PathBuf,
    pub resolved_output: String,
}

/// Default location of the config file.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("potluck/config.toml"))
}

/// Default location of the store file.
#[must_use]
pub fn default_store_path() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from("potluck-events.json"),
        |dir| dir.join("potluck/events.json"),
    )
}

/// Load the config at `path`. A missing file yields defaults.
///
/// # Errors
///
/// Returns an error naming the path if the file cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge file, environment and command-line settings.
///
/// Precedence, highest first: command line, environment, config file,
/// built-in defaults.
///
/// # Errors
///
/// Returns an error if the config file is malformed.
pub fn resolve_config(cli: &CliOverrides, env: &EnvOverrides) -> Result<EffectiveConfig> {
    let config = match env.config.clone().or_else(default_config_path) {
        Some(path) => load_config_from(&path)?,
        None => Config::default(),
    };

    let origin = env.origin.clone().unwrap_or_else(|| config.origin.clone());
    let store_path = cli
        .store
        .clone()
        .or_else(|| env.store.clone())
        .or_else(|| config.store_path.clone())
        .unwrap_or_else(default_store_path);
    let resolved_output = resolve_output(
        cli.json,
        cli.format.as_deref(),
        config.output.as_deref(),
        env.format.as_deref(),
    );

    Ok(EffectiveConfig {
        config,
        origin,
        store_path,
        resolved_output,
    })
}

fn resolve_output(
    cli_json: bool,
    cli_format: Option<&str>,
    user_output: Option<&str>,
    env_format: Option<&str>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "plain" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    [cli_format, env_format, user_output]
        .into_iter()
        .flatten()
        .find_map(normalize_output_mode)
        .map_or_else(
            || {
                if std::io::stdout().is_terminal() {
                    "pretty".to_string()
                } else {
                    "text".to_string()
                }
            },
            str::to_string,
        )
}

fn default_origin() -> String {
    "http://localhost:5173".to_string()
}

const fn default_retention_days() -> u32 {
    365
}

const fn default_publish_interval_secs() -> u64 {
    30
}
