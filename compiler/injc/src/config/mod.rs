//! Session configuration.

use inj_resolve::DEFAULT_MAX_DEPTH;

/// Knobs of one injection session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Bound on the depth of one resolution chain.
    pub max_resolution_depth: usize,
    /// Write persisted metadata onto local declarations after rewriting.
    pub emit_metadata: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            max_resolution_depth: DEFAULT_MAX_DEPTH,
            emit_metadata: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {name}: expected a positive integer")]
    InvalidDepth { name: &'static str, value: String },
    #[error("invalid value `{value}` for {name}: expected true/false, 1/0 or yes/no")]
    InvalidFlag { name: &'static str, value: String },
}

pub const MAX_DEPTH_VAR: &str = "INJ_MAX_DEPTH";
pub const EMIT_METADATA_VAR: &str = "INJ_EMIT_METADATA";

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    #[must_use]
    pub fn with_emit_metadata(mut self, emit: bool) -> Self {
        self.emit_metadata = emit;
        self
    }

    /// Defaults overlaid with `INJ_MAX_DEPTH` and `INJ_EMIT_METADATA`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`SessionConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = SessionConfig::default();
        if let Some(value) = lookup(MAX_DEPTH_VAR) {
            config.max_resolution_depth = parse_depth(MAX_DEPTH_VAR, &value)?;
        }
        if let Some(value) = lookup(EMIT_METADATA_VAR) {
            config.emit_metadata = parse_flag(EMIT_METADATA_VAR, &value)?;
        }
        Ok(config)
    }
}

/// Parse a resolution depth; zero would reject every injection.
pub fn parse_depth(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(depth) if depth > 0 => Ok(depth),
        _ => Err(ConfigError::InvalidDepth {
            name,
            value: value.to_owned(),
        }),
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_owned(),
        }),
    }
}
