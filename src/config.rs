// Resolver Configuration - Thresholds and sentinel naming
//
// Loaded from TOML when the operator provides a file, otherwise defaults
// apply. Two thresholds gate fuzzy matching:
// - search_threshold: names scoring above this are never considered at all
// - accept_threshold: a best score must fall strictly below this to be
//   treated as the same customer
// Acceptance is deliberately stricter than search: the wide cutoff keeps the
// candidate pool cheap to reason about, the narrow one guards against merging
// genuinely different customers.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Default upper bound for fuzzy candidates (0.0 = identical, 1.0 = unrelated).
pub const DEFAULT_SEARCH_THRESHOLD: f64 = 0.3;

/// Default acceptance cutoff: only near-identical names reuse an existing id.
pub const DEFAULT_ACCEPT_THRESHOLD: f64 = 0.2;

/// Name of the sentinel customer that absorbs blank names.
pub const DEFAULT_UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for customer identity resolution.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Fuzzy candidates scoring above this are discarded before acceptance.
    pub search_threshold: f64,

    /// A best score must be strictly below this to count as a match.
    pub accept_threshold: f64,

    /// Display name of the sentinel customer for blank imports.
    pub unknown_name: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            search_threshold: DEFAULT_SEARCH_THRESHOLD,
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
            unknown_name: DEFAULT_UNKNOWN_NAME.to_string(),
        }
    }
}

impl ResolverConfig {
    /// Parse from a TOML string and validate.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: ResolverConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.search_threshold) {
            return Err(ConfigError::Invalid(format!(
                "search_threshold must be in [0.0, 1.0], got {}",
                self.search_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.accept_threshold) {
            return Err(ConfigError::Invalid(format!(
                "accept_threshold must be in [0.0, 1.0], got {}",
                self.accept_threshold
            )));
        }
        if self.accept_threshold > self.search_threshold {
            return Err(ConfigError::Invalid(format!(
                "accept_threshold ({}) cannot exceed search_threshold ({})",
                self.accept_threshold, self.search_threshold
            )));
        }
        if self.unknown_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "unknown_name cannot be blank".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.search_threshold, 0.3);
        assert_eq!(config.accept_threshold, 0.2);
        assert_eq!(config.unknown_name, "Unknown");
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = ResolverConfig::from_toml_str("accept_threshold = 0.1").unwrap();
        assert_eq!(config.accept_threshold, 0.1);
        assert_eq!(config.search_threshold, 0.3);
        assert_eq!(config.unknown_name, "Unknown");
    }

    #[test]
    fn test_rejects_accept_above_search() {
        let result = ResolverConfig::from_toml_str(
            "search_threshold = 0.2\naccept_threshold = 0.5",
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let result = ResolverConfig::from_toml_str("search_threshold = 1.5");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_blank_unknown_name() {
        let result = ResolverConfig::from_toml_str("unknown_name = \"  \"");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let result = ResolverConfig::from_toml_str("fuzzy_power = 9000");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
