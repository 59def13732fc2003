// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # Dendrify
//!
//! Compose multi-compartment neuron models from reusable compartment
//! specifications and compile them into one coupled equation system with a
//! single parameter namespace, ready to hand to a population-based spiking
//! simulator.
//!
//! ## Quick Start
//!
//! ```rust
//! use dendrify::prelude::*;
//! use dendrify::units::units;
//!
//! let passive = |c: f64| {
//!     PassiveProperties::new()
//!         .capacitance(c * units::PICOFARAD)
//!         .leak_conductance(10.0 * units::NANOSIEMENS)
//!         .leak_reversal(-70.0 * units::MILLIVOLT)
//! };
//!
//! let model = NeuronModelBuilder::new("ball_and_stick", 50)
//!     .add(CompartmentSpec::soma("soma", Geometry::point(), passive(200.0))?)?
//!     .add(CompartmentSpec::dendrite("dend", Geometry::point(), passive(50.0))?)?
//!     .connect("soma", "dend", Coupling::Resistance(100.0 * units::MEGAOHM))?
//!     .compile(PopulationOptions::new().method("euler"))?;
//!
//! assert_eq!(model.voltage_equations().count(), 2);
//! assert_eq!(model.namespace().len(), 5);
//! # Ok::<(), dendrify::model::ModelError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - **`config`** (default): `dendrify.toml` loading and [`setup`] helpers
//! - **`observability`** (default): logging initialization and debug flags
//! - **`file-logging`**: log files in timestamped run folders
//! - **`cli`**: the `dendrify-describe` tool
//!
//! ## Architecture
//!
//! ```text
//! dendrify-units          quantities and SI dimensions
//!        ↓
//! dendrify-model          compartments → topology → synthesis → descriptor → backend
//!        ↑
//! dendrify-config         model-wide defaults, ionic constants, policy, logging
//! dendrify-observability  tracing subscriber setup
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use dendrify_model as model;
pub use dendrify_units as units;

#[cfg(feature = "config")]
pub use dendrify_config as config;

#[cfg(feature = "observability")]
pub use dendrify_observability as observability;

#[cfg(feature = "config")]
pub mod setup;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use dendrify_model::prelude::*;
    pub use dendrify_units::{Dimension, Quantity};

    #[cfg(feature = "config")]
    pub use crate::setup::{builder_from_config, SetupError, SetupResult};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let q: Quantity = "-70 mV".parse().unwrap();
        assert_eq!(q.dimension(), Dimension::VOLTAGE);
        assert_eq!(NamespacePolicy::default(), NamespacePolicy::ShareIdentical);
    }
}
