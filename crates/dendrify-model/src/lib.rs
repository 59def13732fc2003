// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # Dendrify Model
//!
//! Compartmental neuron model composition and equation synthesis:
//! - **Compartments**: geometry, passive properties, mechanisms and receptors
//! - **Topology**: a tree of axially coupled compartments rooted at the soma
//! - **Synthesis**: one coupled equation system with a merged parameter namespace
//! - **Builder**: one-step compilation into an immutable [`ModelDescriptor`]
//! - **Backend**: adapter trait and isolated simulation scopes
//!
//! ## Data Flow
//!
//! ```text
//! CompartmentSpec -> TopologyGraph -> EquationSynthesizer -> ModelDescriptor -> SimulationBackend
//! ```
//!
//! Construction is synchronous and pure. Every fallible operation returns a
//! [`ModelError`] naming the offending compartment, parameter or equation.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod builder;
pub mod compartment;
pub mod defaults;
pub mod descriptor;
pub mod equation;
pub mod error;
pub mod expr;
pub mod mechanism;
pub mod namespace;
pub mod receptor;
pub mod synthesis;
pub mod topology;

pub use backend::{BackendError, BackendResult, InMemoryBackend, PopulationHandle, SimulationBackend, SimulationScope};
pub use builder::NeuronModelBuilder;
pub use compartment::{CompartmentKind, CompartmentSpec, Geometry, PassiveProperties, ResolvedPassive};
pub use defaults::{IonicDefaults, ModelProperties};
pub use descriptor::{AxialCurrent, ConnectionPoint, EventSpec, ModelDescriptor, PopulationOptions};
pub use equation::{parse_equation, parse_equations, Equation, EquationKind};
pub use error::{ErrorClass, ModelError, ModelResult};
pub use expr::{parse_expr, parse_statements, Expr, Statement, Ty};
pub use mechanism::{
    AdaptationParams, CustomEvent, DSpikeChannel, DSpikeParams, DSpikeProperties, Mechanism, Param, SpikeGenerator,
};
pub use namespace::NamespacePolicy;
pub use receptor::{Kinetics, Receptor};
pub use synthesis::{EquationSynthesizer, SynthesizedSystem};
pub use topology::{Connection, Coupling, TopologyGraph};

/// Common imports for building models
pub mod prelude {
    pub use crate::backend::{InMemoryBackend, SimulationBackend, SimulationScope};
    pub use crate::builder::NeuronModelBuilder;
    pub use crate::compartment::{CompartmentKind, CompartmentSpec, Geometry, PassiveProperties};
    pub use crate::defaults::{IonicDefaults, ModelProperties};
    pub use crate::descriptor::{ModelDescriptor, PopulationOptions};
    pub use crate::error::{ModelError, ModelResult};
    pub use crate::mechanism::{AdaptationParams, DSpikeChannel, DSpikeParams, DSpikeProperties, Mechanism};
    pub use crate::namespace::NamespacePolicy;
    pub use crate::receptor::Receptor;
    pub use crate::topology::Coupling;
}
