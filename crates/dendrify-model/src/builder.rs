// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # Neuron Model Builder
//!
//! Collects compartments, connections and model-wide settings, then compiles
//! them in one step into an immutable [`ModelDescriptor`]. Population name
//! and size are declared up front; there is no separate linking step.
//!
//! ```
//! use dendrify_model::prelude::*;
//! use dendrify_units::units;
//!
//! let passive = PassiveProperties::new()
//!     .capacitance(200.0 * units::PICOFARAD)
//!     .leak_conductance(10.0 * units::NANOSIEMENS)
//!     .leak_reversal(-70.0 * units::MILLIVOLT);
//! let soma = CompartmentSpec::soma("soma", Geometry::point(), passive)?;
//!
//! let model = NeuronModelBuilder::new("cells", 10)
//!     .add(soma)?
//!     .compile(PopulationOptions::new().method("euler"))?;
//! assert_eq!(model.voltage_equations().count(), 1);
//! # Ok::<(), dendrify_model::ModelError>(())
//! ```

use std::collections::BTreeMap;

use dendrify_units::{Dimension, Quantity};
use tracing::{debug, info};

use crate::compartment::CompartmentSpec;
use crate::defaults::{IonicDefaults, ModelProperties};
use crate::descriptor::{ModelDescriptor, PopulationOptions};
use crate::equation::{parse_equations, Equation};
use crate::error::{check_identifier, ModelError, ModelResult};
use crate::mechanism::{DSpikeChannel, DSpikeProperties};
use crate::namespace::NamespacePolicy;
use crate::synthesis::EquationSynthesizer;
use crate::topology::{Coupling, TopologyGraph};

/// Mutable build session for one neuron model
#[derive(Debug, Clone)]
pub struct NeuronModelBuilder {
    name: String,
    size: usize,
    graph: TopologyGraph,
    properties: ModelProperties,
    ionic: IonicDefaults,
    policy: NamespacePolicy,
    params: BTreeMap<String, Quantity>,
    equations: Vec<Equation>,
}

impl NeuronModelBuilder {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
            graph: TopologyGraph::new(),
            properties: ModelProperties::default(),
            ionic: IonicDefaults::default(),
            policy: NamespacePolicy::default(),
            params: BTreeMap::new(),
            equations: Vec::new(),
        }
    }

    pub fn add(mut self, spec: CompartmentSpec) -> ModelResult<Self> {
        self.graph.add_compartment(spec)?;
        Ok(self)
    }

    pub fn connect(mut self, parent: &str, child: &str, coupling: Coupling) -> ModelResult<Self> {
        self.graph.connect(parent, child, coupling)?;
        Ok(self)
    }

    /// Model-wide passive defaults; values set here override per-compartment
    /// scale and spine factors
    pub fn model_properties(mut self, properties: ModelProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn ionic_defaults(mut self, ionic: IonicDefaults) -> Self {
        self.ionic = ionic;
        self
    }

    pub fn namespace_policy(mut self, policy: NamespacePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Model-wide parameters (later calls overwrite earlier values)
    pub fn add_params<I, S>(mut self, params: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = (S, Quantity)>,
        S: Into<String>,
    {
        for (name, value) in params {
            let name = name.into();
            check_identifier(&name)?;
            if let Some(previous) = self.params.insert(name.clone(), value) {
                debug!(target: "dendrify-model", "Parameter '{}' changed from {} to {}", name, previous, value);
            }
        }
        Ok(self)
    }

    /// Extra equations appended after the synthesized ones, in model names
    pub fn add_equations(mut self, text: &str) -> ModelResult<Self> {
        self.equations.extend(parse_equations(text)?);
        Ok(self)
    }

    /// Model-wide timing of every dendritic spike of the given channel
    pub fn dspike_properties(self, channel: DSpikeChannel, timing: DSpikeProperties) -> ModelResult<Self> {
        let params = timing.params(channel);
        for param in &params {
            param.validate(&format!("dspike_{}", channel.as_str()))?;
        }
        self.add_params(params.into_iter().map(|p| (p.name, p.value)))
    }

    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    /// Validate, synthesize and freeze the model
    pub fn compile(self, options: PopulationOptions) -> ModelResult<ModelDescriptor> {
        check_identifier(&self.name)?;
        if self.size == 0 {
            return Err(ModelError::InvalidPopulation(format!(
                "population '{}' must contain at least one neuron",
                self.name
            )));
        }
        if let Some(dt) = options.dt {
            if dt.dimension() != Dimension::TIME || !(dt.value().is_finite() && dt.value() > 0.0) {
                return Err(ModelError::InvalidPopulation(format!("dt must be a positive time, got {}", dt)));
            }
        }
        self.properties.validate()?;
        self.ionic.validate()?;

        let system = EquationSynthesizer::new(&self.graph, &self.properties, &self.ionic)
            .policy(self.policy)
            .extra_params(self.params.clone())
            .extra_equations(self.equations.clone())
            .synthesize()?;

        info!(
            target: "dendrify-model",
            "Compiled model '{}' (size {}): {} compartment(s), {} equation(s), {} parameter(s)",
            self.name,
            self.size,
            system.compartments.len(),
            system.equations.len(),
            system.namespace.len()
        );

        Ok(ModelDescriptor {
            name: self.name,
            size: self.size,
            options,
            compartments: system.compartments,
            equations: system.equations,
            namespace: system.namespace,
            initial_values: system.initial_values,
            threshold: system.threshold,
            reset: system.reset,
            refractory: system.refractory,
            events: system.events,
            custom_events: system.custom_events,
            axial_currents: system.axial_currents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compartment::{Geometry, PassiveProperties};
    use dendrify_units::units;

    fn soma() -> CompartmentSpec {
        CompartmentSpec::soma(
            "soma",
            Geometry::point(),
            PassiveProperties::new()
                .capacitance(200.0 * units::PICOFARAD)
                .leak_conductance(10.0 * units::NANOSIEMENS)
                .leak_reversal(-70.0 * units::MILLIVOLT),
        )
        .unwrap()
    }

    #[test]
    fn test_single_compartment_compiles() {
        let model = NeuronModelBuilder::new("pop", 4)
            .add(soma())
            .unwrap()
            .compile(PopulationOptions::new())
            .unwrap();
        assert_eq!(model.compartments(), ["soma"]);
        assert_eq!(model.size(), 4);
        assert!(model.axial_currents().is_empty());
        assert_eq!(model.namespace().len(), 3);
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let err = NeuronModelBuilder::new("pop", 0)
            .add(soma())
            .unwrap()
            .compile(PopulationOptions::new())
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidPopulation(_)));
    }

    #[test]
    fn test_invalid_dt_is_rejected() {
        let err = NeuronModelBuilder::new("pop", 1)
            .add(soma())
            .unwrap()
            .compile(PopulationOptions::new().dt(1.0 * units::MILLIVOLT))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidPopulation(_)));
    }

    #[test]
    fn test_empty_builder_has_no_soma() {
        let err = NeuronModelBuilder::new("pop", 1)
            .compile(PopulationOptions::new())
            .unwrap_err();
        assert_eq!(err, ModelError::MissingSoma);
    }

    #[test]
    fn test_model_wide_params_and_equations() {
        let model = NeuronModelBuilder::new("pop", 1)
            .add(soma())
            .unwrap()
            .add_params([("tau_x", 5.0 * units::MILLISECOND)])
            .unwrap()
            .add_equations("dx/dt = -x / tau_x : 1")
            .unwrap()
            .compile(PopulationOptions::new())
            .unwrap();
        assert!(model.namespace().contains_key("tau_x"));
        assert_eq!(model.equations().last().unwrap().to_string(), "dx/dt = -x / tau_x : 1");
    }

    #[test]
    fn test_bad_param_name() {
        let result = NeuronModelBuilder::new("pop", 1).add_params([("1x", 1.0 * units::MILLISECOND)]);
        assert!(matches!(result, Err(ModelError::InvalidName(_))));
    }

    #[test]
    fn test_dspike_properties_become_params() {
        let timing = DSpikeProperties {
            tau_rise: Some(0.5 * units::MILLISECOND),
            tau_fall: Some(1.0 * units::MILLISECOND),
            offset_fall: Some(0.5 * units::MILLISECOND),
            refractory: Some(5.0 * units::MILLISECOND),
        };
        let builder = NeuronModelBuilder::new("pop", 1)
            .dspike_properties(DSpikeChannel::Na, timing)
            .unwrap();
        let names: Vec<_> = builder.params.keys().cloned().collect();
        assert_eq!(names, vec!["offset_Kn", "refractory_Na", "tau_Kn", "tau_Na"]);
    }
}
