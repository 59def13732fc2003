// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Parses every quantity string, checks it against its physical role and
//! collects all problems before reporting.

use dendrify_units::{Dimension, Quantity};

use crate::{ConfigError, ConfigResult, DendrifyConfig};

/// Log levels understood by the observability layer
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Namespace policies understood by the model compiler
pub const NAMESPACE_POLICIES: &[&str] = &["share_identical", "always_qualify"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    InvalidQuantity { field: String, value: String, reason: String },
    WrongDimension { field: String, expected: Dimension, actual: Dimension },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuantity { field, value, reason } => {
                write!(f, "{} = '{}' is not a quantity: {}", field, value, reason)
            }
            Self::WrongDimension { field, expected, actual } => {
                write!(f, "{} must have dimension {}, got {}", field, expected, actual)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Parsable quantity strings with the right dimension
/// - Positive finite factors, time step and NMDA constants
/// - Known namespace policy and log level
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &DendrifyConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::ValidationError(format!(
        "{} problem(s):\n{}",
        errors.len(),
        error_messages
    )))
}

/// Every validation problem, in field order
pub fn collect_errors(config: &DendrifyConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_model(config, &mut errors);
    validate_ionic(config, &mut errors);
    validate_population(config, &mut errors);
    validate_choices(config, &mut errors);
    errors
}

fn validate_model(config: &DendrifyConfig, errors: &mut Vec<ConfigValidationError>) {
    let model = &config.model;
    let quantities = [
        ("model.cm", &model.cm, Dimension::SPECIFIC_CAPACITANCE),
        ("model.gl", &model.gl, Dimension::SPECIFIC_CONDUCTANCE),
        ("model.r_axial", &model.r_axial, Dimension::RESISTIVITY),
        ("model.v_rest", &model.v_rest, Dimension::VOLTAGE),
    ];
    for (field, value, expected) in quantities {
        if let Some(text) = value {
            check_quantity(field, text, expected, errors);
        }
    }
    for (field, factor) in [
        ("model.scale_factor", model.scale_factor),
        ("model.spine_factor", model.spine_factor),
    ] {
        if let Some(f) = factor {
            check_positive(field, f, errors);
        }
    }
}

fn validate_ionic(config: &DendrifyConfig, errors: &mut Vec<ConfigValidationError>) {
    for (name, text) in config.ionic.reversal_potentials() {
        check_quantity(&format!("ionic.{}", name), text, Dimension::VOLTAGE, errors);
    }
    for (field, value) in [
        ("ionic.mg", config.ionic.mg),
        ("ionic.alpha", config.ionic.alpha),
        ("ionic.beta", config.ionic.beta),
    ] {
        check_positive(field, value, errors);
    }
    if !config.ionic.gamma.is_finite() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "ionic.gamma".to_string(),
            reason: format!("must be finite, got {}", config.ionic.gamma),
        });
    }
}

fn validate_population(config: &DendrifyConfig, errors: &mut Vec<ConfigValidationError>) {
    if let Some(text) = &config.population.dt {
        if let Some(dt) = check_quantity("population.dt", text, Dimension::TIME, errors) {
            check_positive("population.dt", dt.value(), errors);
        }
    }
    if let Some(method) = &config.population.method {
        if method.trim().is_empty() {
            errors.push(ConfigValidationError::InvalidValue {
                field: "population.method".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
    }
}

fn validate_choices(config: &DendrifyConfig, errors: &mut Vec<ConfigValidationError>) {
    if !NAMESPACE_POLICIES.contains(&config.namespace.policy.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "namespace.policy".to_string(),
            reason: format!("expected one of {:?}, got '{}'", NAMESPACE_POLICIES, config.namespace.policy),
        });
    }
    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("expected one of {:?}, got '{}'", LOG_LEVELS, config.logging.level),
        });
    }
}

fn check_quantity(
    field: &str,
    text: &str,
    expected: Dimension,
    errors: &mut Vec<ConfigValidationError>,
) -> Option<Quantity> {
    match text.parse::<Quantity>() {
        Ok(q) if q.dimension() == expected => Some(q),
        Ok(q) => {
            errors.push(ConfigValidationError::WrongDimension {
                field: field.to_string(),
                expected,
                actual: q.dimension(),
            });
            None
        }
        Err(e) => {
            errors.push(ConfigValidationError::InvalidQuantity {
                field: field.to_string(),
                value: text.to_string(),
                reason: e.to_string(),
            });
            None
        }
    }
}

fn check_positive(field: &str, value: f64, errors: &mut Vec<ConfigValidationError>) {
    if !(value.is_finite() && value > 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be a positive number, got {}", value),
        });
    }
}
