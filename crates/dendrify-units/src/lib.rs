// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # Dendrify Units
//!
//! Minimal runtime quantity type consumed by the model compiler:
//! - **Dimension**: SI base-dimension exponent vector
//! - **Quantity**: SI magnitude + dimension with checked arithmetic
//! - **Parsing**: unit expressions (`mV`, `uF/cm**2`) and quantity text (`-70 mV`)
//!
//! The compiler treats quantities as opaque values; it only multiplies,
//! divides, compares dimensions and prints them.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod dimension;
pub mod error;
pub mod parse;
pub mod quantity;
pub mod units;

pub use dimension::Dimension;
pub use error::{UnitError, UnitResult};
pub use parse::{lookup_unit, parse_unit};
pub use quantity::Quantity;
