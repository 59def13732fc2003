// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # dendrify-observability
//!
//! Logging setup shared by the dendrify crates and tools, with per-crate
//! debug flag support.
//!
//! ## Features
//! - `file-logging`: Timestamped run folders with a combined log file

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known dendrify log targets for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "dendrify",
    "dendrify-units",
    "dendrify-config",
    "dendrify-model",
];
