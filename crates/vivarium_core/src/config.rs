//! Interpreter limits configuration.
//!
//! The query layer is driven by user-written expressions, so its few knobs
//! are guards against runaway configuration rather than tuning parameters.
//! Values map to an optional `[interpreter]` table in the run's TOML config.
//!
//! ```toml
//! [interpreter]
//! preprocess_depth_limit = 16
//! max_expression_len = 4096
//! max_archive_len = 1024
//! ```

use serde::{Deserialize, Serialize};

/// Guard rails for expression compilation and template expansion.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct InterpreterConfig {
    /// How many times template expansion may re-enter the host engine
    /// before it is treated as a self-referential configuration error.
    pub preprocess_depth_limit: usize,
    /// Longest accepted expression text, in characters.
    pub max_expression_len: usize,
    /// Cap on grow-forever archive records per organism; 0 means unbounded.
    pub max_archive_len: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            preprocess_depth_limit: 16,
            max_expression_len: 4096,
            max_archive_len: 1024,
        }
    }
}

impl InterpreterConfig {
    /// Validates all limits.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.preprocess_depth_limit > 0,
            "Preprocess depth limit must be positive"
        );
        anyhow::ensure!(
            self.preprocess_depth_limit <= 1024,
            "Preprocess depth limit too large (max 1024)"
        );
        anyhow::ensure!(
            self.max_expression_len >= 16,
            "Max expression length too small (min 16)"
        );
        anyhow::ensure!(
            self.max_expression_len <= 1_048_576,
            "Max expression length too large (max 1048576)"
        );
        Ok(())
    }

    /// Loads and validates configuration from TOML content.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(InterpreterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_depth_rejected() {
        let config = InterpreterConfig {
            preprocess_depth_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = InterpreterConfig::from_toml("preprocess_depth_limit = 4\n").unwrap();
        assert_eq!(config.preprocess_depth_limit, 4);
        assert_eq!(config.max_expression_len, 4096);
    }

    #[test]
    fn test_from_toml_invalid() {
        assert!(InterpreterConfig::from_toml("max_expression_len = 1\n").is_err());
    }
}
