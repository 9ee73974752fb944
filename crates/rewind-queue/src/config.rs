//! Engine configuration loaded from RON
//!
//! ```ron
//! (
//!     result_cache: (max_entries: 64, idle_secs: 300),
//!     ruleset: (overwrite: false, remove_drops: true, block_blacklist: ["fire", "tnt"]),
//!     channel_capacity: 16,
//! )
//! ```
//!
//! Every field has a default, so an empty `()` is a valid configuration.

use crate::error::{Error, Result};
use crate::ruleset::ModificationRuleset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-owner result cache
    pub result_cache: ResultCacheConfig,
    /// Defaults every ruleset starts from
    pub ruleset: ModificationRuleset,
    /// Bound of the job channel feeding the mutation context
    pub channel_capacity: usize,
}

impl EngineConfig {
    /// Load configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&content)
    }

    /// Parse configuration from a RON string
    pub fn from_ron_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            ron::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.result_cache.max_entries == 0 {
            return Err(Error::Config(
                "result_cache.max_entries must be at least 1".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(Error::Config("channel_capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            result_cache: ResultCacheConfig::default(),
            ruleset: ModificationRuleset::default(),
            channel_capacity: 16,
        }
    }
}

/// Bounds for the per-owner result cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultCacheConfig {
    /// Maximum number of cached results
    pub max_entries: u64,
    /// Results not read for this long are evicted
    pub idle_secs: u64,
}

impl ResultCacheConfig {
    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 64,
            idle_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_core::Material;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_ron_str("()").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.result_cache.idle(), Duration::from_secs(300));
    }

    #[test]
    fn test_partial_config() {
        let config = EngineConfig::from_ron_str(
            r#"(
                result_cache: (idle_secs: 30),
                ruleset: (overwrite: true, block_blacklist: ["bedrock"]),
            )"#,
        )
        .unwrap();

        assert_eq!(config.result_cache.max_entries, 64);
        assert_eq!(config.result_cache.idle_secs, 30);
        assert!(config.ruleset.overwrite());
        assert_eq!(config.ruleset.block_blacklist(), &[Material::new("bedrock")]);
        assert_eq!(config.channel_capacity, 16);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            EngineConfig::from_ron_str("(result_cache: (max_entries: 0))"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_ron_str("(unknown: true"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            EngineConfig::load("/nonexistent/rewind.ron"),
            Err(Error::Io(_))
        ));
    }
}
