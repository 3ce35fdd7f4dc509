//! Engine configuration: limits, timeouts, scratch space and tool overrides

use codeops_common::Action;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maximum inline content size in characters
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 100_000;

/// Maximum accepted length of a target path
pub const DEFAULT_MAX_PATH_LEN: usize = 4096;

/// Per-stream cap on captured output
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration loading/validation failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Per-action timeout overrides; unset actions use `default_timeout`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionTimeouts {
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub run: Option<Duration>,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub lint: Option<Duration>,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub test: Option<Duration>,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub fix: Option<Duration>,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub format: Option<Duration>,
}

impl ActionTimeouts {
    fn get(&self, action: Action) -> Option<Duration> {
        match action {
            Action::Run => self.run,
            Action::Lint => self.lint,
            Action::Test => self.test,
            Action::Fix => self.fix,
            Action::Format => self.format,
            Action::Explain => None,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest accepted inline content, in characters
    pub max_content_chars: usize,

    /// Longest accepted target path
    pub max_path_len: usize,

    /// Wall-clock limit applied when no per-action override exists
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,

    pub timeouts: ActionTimeouts,

    /// Directory for temporary files holding inline content
    pub scratch_dir: Option<PathBuf>,

    /// Per-stream cap on captured stdout/stderr
    pub max_output_bytes: usize,

    /// Tool name → executable overrides (e.g. `python3 = "/opt/py/bin/python3"`)
    pub executables: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            max_path_len: DEFAULT_MAX_PATH_LEN,
            default_timeout: DEFAULT_TIMEOUT,
            timeouts: ActionTimeouts::default(),
            scratch_dir: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            executables: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration the way binaries do: an explicit path wins, then
    /// `CODEOPS_CONFIG`, then `~/.config/codeops/config.toml` if it exists,
    /// else defaults. Environment overrides are applied last.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let candidate = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("CODEOPS_CONFIG").map(PathBuf::from));

        let config = match candidate {
            Some(path) => Self::load(path)?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::load(path)?,
                _ => Self::default(),
            },
        };

        let config = config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// `~/.config/codeops/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("codeops").join("config.toml"))
    }

    /// Apply `CODEOPS_*` environment overrides
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(value) = std::env::var("CODEOPS_MAX_CONTENT_CHARS") {
            self.max_content_chars =
                value
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                        key: "CODEOPS_MAX_CONTENT_CHARS",
                        reason: e.to_string(),
                    })?;
        }

        if let Ok(value) = std::env::var("CODEOPS_DEFAULT_TIMEOUT") {
            self.default_timeout = humantime_serde::re::humantime::parse_duration(value.trim())
                .map_err(|e| ConfigError::Invalid {
                    key: "CODEOPS_DEFAULT_TIMEOUT",
                    reason: e.to_string(),
                })?;
        }

        if let Some(value) = std::env::var_os("CODEOPS_SCRATCH_DIR") {
            self.scratch_dir = Some(PathBuf::from(value));
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_content_chars == 0 {
            return Err(ConfigError::Invalid {
                key: "max_content_chars",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_path_len == 0 {
            return Err(ConfigError::Invalid {
                key: "max_path_len",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_output_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "max_output_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.default_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "default_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        for action in Action::ALL {
            if self.timeouts.get(action).is_some_and(|t| t.is_zero()) {
                return Err(ConfigError::Invalid {
                    key: "timeouts",
                    reason: format!("timeout for '{}' must be greater than zero", action),
                });
            }
        }
        Ok(())
    }

    /// Effective wall-clock limit for an action
    pub fn timeout_for(&self, action: Action) -> Duration {
        self.timeouts.get(action).unwrap_or(self.default_timeout)
    }

    /// Directory where inline content is materialized
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("codeops"))
    }

    /// Executable to launch for a tool, honouring overrides
    pub fn executable_for<'a>(&'a self, tool: &'a str) -> &'a str {
        self.executables
            .get(tool)
            .map(String::as_str)
            .unwrap_or(tool)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn with_executable(mut self, tool: impl Into<String>, executable: impl Into<String>) -> Self {
        self.executables.insert(tool.into(), executable.into());
        self
    }
}
