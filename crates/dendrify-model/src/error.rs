// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Error types for model construction and compilation
//!
//! Every variant names the offending identifiers so callers can report an
//! actionable message. Nothing here is retried or downgraded: a model
//! description that fails is an authoring error.

use dendrify_units::{Dimension, UnitError};

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Coarse classification of [`ModelError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Graph construction or validation failed
    Structural,
    /// A compartment, mechanism or equation is ill-formed
    Semantic,
}

/// Errors that can occur while describing or compiling a neuron model
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    // === Structural ===
    #[error("Duplicate compartment: '{0}' already exists in the model")]
    DuplicateCompartment(String),

    #[error("Unknown compartment: '{0}'")]
    UnknownCompartment(String),

    #[error("Compartment '{child}' already has parent '{existing}'; cannot also attach it to '{requested}'")]
    MultipleParents {
        child: String,
        existing: String,
        requested: String,
    },

    #[error("Connecting '{parent}' -> '{child}' would create a cycle")]
    Cycle { parent: String, child: String },

    #[error("Duplicate connection between '{parent}' and '{child}'")]
    DuplicateConnection { parent: String, child: String },

    #[error("Model has more than one soma: {}", .0.join(", "))]
    MultipleSomata(Vec<String>),

    #[error("Model has no soma compartment")]
    MissingSoma,

    #[error("Soma '{soma}' must be the root, but it is attached to parent '{parent}'")]
    SomaHasParent { soma: String, parent: String },

    #[error("Compartments not reachable from soma '{soma}': {}", .unreachable.join(", "))]
    DisconnectedTopology {
        soma: String,
        unreachable: Vec<String>,
    },

    // === Semantic ===
    #[error("Invalid unit for {owner}.{parameter}: expected {expected}, got {actual}")]
    InvalidUnit {
        owner: String,
        parameter: String,
        expected: String,
        actual: Dimension,
    },

    #[error("Invalid value for {owner}.{parameter}: {reason}")]
    InvalidValue {
        owner: String,
        parameter: String,
        reason: String,
    },

    #[error("Duplicate {what} '{name}' on compartment '{compartment}'")]
    DuplicateMechanism {
        compartment: String,
        what: &'static str,
        name: String,
    },

    #[error("Unresolvable units in '{equation}': {detail}")]
    UnresolvableUnit { equation: String, detail: String },

    #[error("Unknown reference '{name}' in {context}")]
    UnknownReference { name: String, context: String },

    #[error("Invalid equation '{source_text}': {reason}")]
    InvalidEquation { source_text: String, reason: String },

    #[error("Invalid name '{0}': names must start with a letter and contain only letters, digits and '_'")]
    InvalidName(String),

    #[error("Invalid name '{0}': compartment and connection-point names may not contain '_', which joins generated names")]
    SeparatorInName(String),

    #[error("Compartment '{compartment}' is missing {parameter} and no model-wide default is set")]
    MissingParameter {
        compartment: String,
        parameter: &'static str,
    },

    #[error("Receptor '{receptor}' on compartment '{compartment}' must declare a 'pre' connection point")]
    MissingConnectionPoint {
        compartment: String,
        receptor: String,
    },

    #[error("Spike generator '{mechanism}' is only allowed on the soma, found on '{compartment}'")]
    MisplacedSpikeGenerator {
        compartment: String,
        mechanism: String,
    },

    #[error("Compartment '{compartment}' declares more than one spike generator: {}", .mechanisms.join(", "))]
    MultipleSpikeGenerators {
        compartment: String,
        mechanisms: Vec<String>,
    },

    #[error("Name collision: '{0}' is produced by more than one declaration")]
    NameCollision(String),

    #[error("Invalid population: {0}")]
    InvalidPopulation(String),
}

impl ModelError {
    /// Structural (graph) vs semantic (description) failure
    pub fn class(&self) -> ErrorClass {
        match self {
            ModelError::DuplicateCompartment(_)
            | ModelError::UnknownCompartment(_)
            | ModelError::MultipleParents { .. }
            | ModelError::Cycle { .. }
            | ModelError::DuplicateConnection { .. }
            | ModelError::MultipleSomata(_)
            | ModelError::MissingSoma
            | ModelError::SomaHasParent { .. }
            | ModelError::DisconnectedTopology { .. } => ErrorClass::Structural,
            _ => ErrorClass::Semantic,
        }
    }

    pub(crate) fn invalid_unit(owner: &str, parameter: &str, err: UnitError) -> Self {
        match err {
            UnitError::UnexpectedDimension {
                expected, actual, ..
            } => ModelError::InvalidUnit {
                owner: owner.to_string(),
                parameter: parameter.to_string(),
                expected: expected.to_string(),
                actual,
            },
            UnitError::DimensionMismatch { left, right, .. } => ModelError::InvalidUnit {
                owner: owner.to_string(),
                parameter: parameter.to_string(),
                expected: left.to_string(),
                actual: right,
            },
            other => ModelError::InvalidEquation {
                source_text: format!("{}.{}", owner, parameter),
                reason: other.to_string(),
            },
        }
    }
}

/// Check a name that becomes one `_`-joined segment of generated names
pub(crate) fn check_segment(name: &str) -> ModelResult<()> {
    check_identifier(name)?;
    if name.contains('_') {
        return Err(ModelError::SeparatorInName(name.to_string()));
    }
    Ok(())
}

/// Check that a user-supplied name is a valid identifier
pub(crate) fn check_identifier(name: &str) -> ModelResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ModelError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            ModelError::Cycle {
                parent: "a".into(),
                child: "b".into()
            }
            .class(),
            ErrorClass::Structural
        );
        assert_eq!(
            ModelError::UnknownReference {
                name: "x".into(),
                context: "soma".into()
            }
            .class(),
            ErrorClass::Semantic
        );
    }

    #[test]
    fn test_messages_name_offenders() {
        let err = ModelError::MultipleParents {
            child: "d2".into(),
            existing: "d1".into(),
            requested: "soma".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("d2"));
        assert!(msg.contains("d1"));
        assert!(msg.contains("soma"));
    }

    #[test]
    fn test_identifier_check() {
        assert!(check_identifier("soma").is_ok());
        assert!(check_identifier("d1_prox").is_ok());
        assert!(check_identifier("1d").is_err());
        assert!(check_identifier("d-1").is_err());
        assert!(check_identifier("").is_err());
    }

    #[test]
    fn test_segment_check() {
        assert!(check_segment("dend1").is_ok());
        assert_eq!(check_segment("d1_prox"), Err(ModelError::SeparatorInName("d1_prox".into())));
        assert_eq!(check_segment("1d"), Err(ModelError::InvalidName("1d".into())));
        assert_eq!(ModelError::SeparatorInName("a_b".into()).class(), ErrorClass::Semantic);
    }
}
