// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Error types for quantity arithmetic and parsing

use crate::dimension::Dimension;

/// Result type for unit operations
pub type UnitResult<T> = Result<T, UnitError>;

/// Errors that can occur while combining or parsing quantities
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("Dimension mismatch in {operation}: {left} vs {right}")]
    DimensionMismatch {
        operation: &'static str,
        left: Dimension,
        right: Dimension,
    },

    #[error("Expected dimension {expected} for {role}, got {actual}")]
    UnexpectedDimension {
        role: String,
        expected: Dimension,
        actual: Dimension,
    },

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Invalid quantity '{input}': {reason}")]
    Parse { input: String, reason: String },
}
