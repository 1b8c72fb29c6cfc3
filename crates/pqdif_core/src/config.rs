//! Core configuration.
//!
//! # Responsibility
//! - Describe logging settings and the tag definition source to load.
//! - Read settings from a JSON file with environment overrides.
//!
//! # Invariants
//! - Every field has a default; an absent file section never fails.
//! - Environment overrides win over file values.

use crate::logging::{default_log_level, init_logging, LogTarget, LoggingError};
use crate::registry::definitions::{TagDefinitionError, TagDefinitions};
use crate::registry::lookup::TagRegistry;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_LOG_LEVEL: &str = "PQDIF_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "PQDIF_LOG_DIR";
pub const ENV_TAG_DEFINITIONS: &str = "PQDIF_TAG_DEFINITIONS";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: String, source: std::io::Error },
    Parse(serde_json::Error),
    TagDefinitions(TagDefinitionError),
    Logging(LoggingError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "failed to read config `{path}`: {source}"),
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::TagDefinitions(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::TagDefinitions(err) => Some(err),
            Self::Logging(err) => Some(err),
        }
    }
}

impl From<TagDefinitionError> for ConfigError {
    fn from(value: TagDefinitionError) -> Self {
        Self::TagDefinitions(value)
    }
}

impl From<LoggingError> for ConfigError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: String,
    /// Rotating log files go here; stderr when unset.
    pub log_dir: Option<PathBuf>,
    /// JSON tag definitions replacing the embedded set.
    pub tag_definitions: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            tag_definitions: None,
        }
    }
}

impl CoreConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Applies `PQDIF_*` variables from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, keyed by the `PQDIF_*` names.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(level) = non_blank(lookup(ENV_LOG_LEVEL)) {
            self.log_level = level;
        }
        if let Some(dir) = non_blank(lookup(ENV_LOG_DIR)) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = non_blank(lookup(ENV_TAG_DEFINITIONS)) {
            self.tag_definitions = Some(PathBuf::from(path));
        }
        self
    }

    pub fn log_target(&self) -> LogTarget {
        match &self.log_dir {
            Some(dir) => LogTarget::Directory(dir.clone()),
            None => LogTarget::Stderr,
        }
    }

    pub fn init_logging(&self) -> Result<(), ConfigError> {
        init_logging(&self.log_level, self.log_target())?;
        Ok(())
    }

    /// Registry over the configured definitions file, or the embedded set.
    pub fn tag_registry(&self) -> Result<TagRegistry, ConfigError> {
        let definitions = match &self.tag_definitions {
            Some(path) => TagDefinitions::from_file(path)?,
            None => TagDefinitions::builtin()?,
        };
        Ok(TagRegistry::new(definitions))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
