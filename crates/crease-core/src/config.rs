// Configuration loading and parsing (crease.toml plus the API key from the
// process environment).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::context::DEFAULT_MAX_CONTEXT_ENTRIES;
use crate::filter::TeamMatch;
use crate::stats::{Qualification, DEFAULT_MIN_CONSISTENCY_MATCHES, DEFAULT_MIN_QUALIFYING_BALLS};
use crate::teams::TeamRegistry;

/// Environment variable holding the text-generation API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const CONFIG_FILE: &str = "crease.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub data: DataConfig,
    pub teams: TeamsConfig,
    pub analysis: AnalysisConfig,
    pub llm: LlmConfig,
    pub credentials: CredentialsConfig,
}

/// Raw deserialization target for crease.toml.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    data: DataConfig,
    teams: TeamsConfig,
    #[serde(default)]
    analysis: AnalysisConfig,
    llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Location of the matchup document, relative to the working directory.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamsConfig {
    #[serde(default)]
    pub match_mode: TeamMatch,
    /// Team code to display name. Defines the set of known codes.
    pub names: BTreeMap<String, String>,
}

impl TeamsConfig {
    pub fn registry(&self) -> TeamRegistry {
        TeamRegistry::new(self.names.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub min_qualifying_balls: u32,
    pub min_consistency_matches: u32,
    pub top_n: usize,
    pub context_max_entries: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_qualifying_balls: DEFAULT_MIN_QUALIFYING_BALLS,
            min_consistency_matches: DEFAULT_MIN_CONSISTENCY_MATCHES,
            top_n: 5,
            context_max_entries: DEFAULT_MAX_CONTEXT_ENTRIES,
        }
    }
}

impl AnalysisConfig {
    pub fn qualification(&self) -> Qualification {
        Qualification {
            min_balls: self.min_qualifying_balls,
            min_matches: self.min_consistency_matches,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CredentialsConfig {
    pub anthropic_api_key: Option<String>,
}

impl CredentialsConfig {
    /// Read the API key from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the API key through `lookup`. Blank values count as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            anthropic_api_key: lookup(API_KEY_ENV)
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/crease.toml` relative to `base_dir`, taking
/// credentials from `credentials`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(
    base_dir: &Path,
    credentials: CredentialsConfig,
) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let config = Config {
        data: file.data,
        teams: file.teams,
        analysis: file.analysis,
        llm: file.llm,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Create `config/crease.toml` from `defaults/crease.toml` when it is missing.
///
/// Returns the path written, or `None` when a config file already exists.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.is_file() {
        return Ok(None);
    }

    let default = base_dir.join("defaults").join(CONFIG_FILE);
    if !default.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "neither config/{CONFIG_FILE} nor defaults/{CONFIG_FILE} found in {}; \
                 run from the project root",
                base_dir.display()
            ),
        });
    }

    let copy_error = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to create {}: {e}", target.display()),
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(copy_error)?;
    }
    std::fs::copy(&default, &target).map_err(copy_error)?;
    info!("created {} from defaults", target.display());
    Ok(Some(target))
}

/// Convenience wrapper: loads config relative to the current working
/// directory with credentials from the environment, creating the config
/// file from defaults first if needed.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd, CredentialsConfig::from_env())
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.data.path.trim().is_empty() {
        return Err(invalid("data.path", "must not be empty"));
    }

    if config.teams.names.is_empty() {
        return Err(invalid("teams.names", "at least one team code is required"));
    }
    for code in config.teams.names.keys() {
        if code.is_empty() || code.contains('_') {
            return Err(invalid(
                "teams.names",
                format!("team code `{code}` must be non-empty and contain no `_`"),
            ));
        }
    }

    let analysis = &config.analysis;
    let limits: &[(&str, usize)] = &[
        ("analysis.top_n", analysis.top_n),
        ("analysis.context_max_entries", analysis.context_max_entries),
    ];
    for (name, val) in limits {
        if *val == 0 {
            return Err(invalid(name, "must be > 0"));
        }
    }

    if config.llm.model.trim().is_empty() {
        return Err(invalid("llm.model", "must not be empty"));
    }
    if config.llm.max_tokens == 0 {
        return Err(invalid("llm.max_tokens", "must be > 0"));
    }
    if config.llm.timeout_secs == 0 {
        return Err(invalid("llm.timeout_secs", "must be > 0"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
