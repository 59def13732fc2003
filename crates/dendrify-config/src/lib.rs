// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # Dendrify Configuration
//!
//! Loads `dendrify.toml` with three tiers of precedence:
//! 1. TOML file (base defaults)
//! 2. `DENDRIFY_*` environment variables
//! 3. CLI overrides (explicit user values)
//!
//! Physical values are kept as quantity strings (`"1 uF/cm**2"`) and are
//! parsed and dimension-checked by [`validate_config`].

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::*;
pub use types::*;
pub use validation::*;

use dendrify_units::Quantity;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Parse a quantity string held by a configuration field
pub fn parse_quantity(field: &str, text: &str) -> ConfigResult<Quantity> {
    text.parse().map_err(|e: dendrify_units::UnitError| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dendrify_units::Dimension;

    #[test]
    fn test_parse_quantity() {
        let q = parse_quantity("model.v_rest", "-65 mV").unwrap();
        assert_eq!(q.dimension(), Dimension::VOLTAGE);

        let err = parse_quantity("model.cm", "1 furlong").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "model.cm"));
    }
}
