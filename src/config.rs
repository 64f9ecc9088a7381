//! Configuration for orchestra paths.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ORCHESTRA_HOME, ORCHESTRA_SCRIPTS)
//! 2. Config file (.orchestra/config.yaml)
//! 3. Defaults (~/.orchestra)
//!
//! Config file discovery:
//! - Searches current directory and parents for .orchestra/config.yaml
//! - Paths in config file are relative to the directory containing .orchestra/
//!
//! The resolved [`OrchestraConfig`] is passed explicitly to
//! [`crate::Orchestra`]; nothing is cached globally.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::DEFAULT_HISTORY_CAPACITY;
use crate::error::OrchestraError;

/// Number of messages returned by the status query
pub const DEFAULT_RECENT_MESSAGES: usize = 10;

/// File name patterns listed as available scripts
pub const DEFAULT_SCRIPT_PATTERNS: &[&str] = &["*.sh", "*.py"];

const CONFIG_DIR: &str = ".orchestra";
const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub limits: Option<LimitsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Orchestra home directory (state and message log)
    pub home: Option<String>,
    /// Script directory
    pub scripts: Option<String>,
    /// State file (defaults to <home>/state.json)
    pub state: Option<String>,
    /// Message log (defaults to <home>/messages.log)
    pub messages: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    pub history_capacity: Option<usize>,
    pub recent_messages: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct OrchestraConfig {
    /// Directory holding state and message log
    pub home: PathBuf,
    /// Directory holding the dispatched scripts
    pub scripts_dir: PathBuf,
    /// Coordination state document
    pub state_path: PathBuf,
    /// Newline-delimited broadcast log
    pub messages_path: PathBuf,
    /// Maximum history entries retained in the state document
    pub history_capacity: usize,
    /// Messages included in a status report
    pub recent_messages: usize,
    /// Upper bound for synchronous runs (none by default)
    pub script_timeout: Option<Duration>,
    /// Glob patterns listed as available scripts
    pub script_patterns: Vec<String>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl OrchestraConfig {
    /// Config rooted at `home`, with scripts in `<home>/scripts`
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            scripts_dir: home.join("scripts"),
            state_path: home.join("state.json"),
            messages_path: home.join("messages.log"),
            home,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            recent_messages: DEFAULT_RECENT_MESSAGES,
            script_timeout: None,
            script_patterns: DEFAULT_SCRIPT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            config_file: None,
        }
    }

    /// Override the scripts directory
    pub fn scripts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scripts_dir = dir.into();
        self
    }

    /// Bound synchronous runs
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.script_timeout = Some(timeout);
        self
    }

    /// Load configuration from environment, config file and defaults
    pub fn load() -> Result<Self> {
        load_config()
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn default_home() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR))
}

/// Load configuration from all sources
fn load_config() -> Result<OrchestraConfig> {
    let config_file = find_config_file();
    let parsed = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    resolve_config(
        parsed.as_ref(),
        config_file.as_deref(),
        std::env::var("ORCHESTRA_HOME").ok(),
        std::env::var("ORCHESTRA_SCRIPTS").ok(),
    )
}

/// Merge env overrides, the parsed config file and defaults
fn resolve_config(
    file: Option<&ConfigFile>,
    file_path: Option<&Path>,
    env_home: Option<String>,
    env_scripts: Option<String>,
) -> Result<OrchestraConfig> {
    // Project root is the parent of .orchestra/
    let base_dir = file_path
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .unwrap_or(Path::new("."));
    let paths = file.map(|f| f.paths.clone()).unwrap_or_default();

    let home = match (env_home, &paths.home) {
        (Some(env), _) => PathBuf::from(env),
        (None, Some(home)) => resolve_path(base_dir, home),
        (None, None) => default_home()?,
    };

    let mut config = OrchestraConfig::with_home(&home);
    config.config_file = file_path.map(Path::to_path_buf);

    config.scripts_dir = match (env_scripts, &paths.scripts) {
        (Some(env), _) => PathBuf::from(env),
        (None, Some(scripts)) => resolve_path(base_dir, scripts),
        (None, None) => home.join("scripts"),
    };
    if let Some(ref state) = paths.state {
        config.state_path = resolve_path(base_dir, state);
    }
    if let Some(ref messages) = paths.messages {
        config.messages_path = resolve_path(base_dir, messages);
    }

    if let Some(limits) = file.and_then(|f| f.limits.as_ref()) {
        if let Some(capacity) = limits.history_capacity {
            if capacity == 0 {
                return Err(OrchestraError::Config(
                    "limits.history_capacity must be at least 1".to_string(),
                )
                .into());
            }
            config.history_capacity = capacity;
        }
        if let Some(recent) = limits.recent_messages {
            config.recent_messages = recent;
        }
        if let Some(seconds) = limits.timeout_seconds {
            if seconds == 0 {
                return Err(OrchestraError::Config(
                    "limits.timeout_seconds must be at least 1".to_string(),
                )
                .into());
            }
            config.script_timeout = Some(Duration::from_secs(seconds));
        }
    }

    Ok(config)
}
