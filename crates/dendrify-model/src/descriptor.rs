// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # Model Descriptor
//!
//! The compiled, backend-agnostic model: everything a population-of-neurons
//! primitive needs to instantiate the model. Immutable once built.

use std::collections::BTreeMap;
use std::fmt;

use dendrify_units::Quantity;
use serde::Serialize;

use crate::equation::Equation;
use crate::expr::{join_statements, Expr, Statement};

/// Options forwarded to the population primitive
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PopulationOptions {
    /// Integration method (`euler`, `exponential_euler`, `rk4`, ...)
    pub method: Option<String>,
    /// Integration time step
    pub dt: Option<Quantity>,
    /// Any other backend-specific option, passed through verbatim
    pub extra: BTreeMap<String, String>,
}

impl PopulationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn dt(mut self, dt: Quantity) -> Self {
        self.dt = Some(dt);
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Synaptic input hook exposed for external wiring
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionPoint {
    pub compartment: String,
    pub receptor: String,
    pub pre: String,
    /// Statements run on every presynaptic spike
    pub delivery: Vec<Statement>,
}

/// A custom event (dendritic spikes)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSpec {
    pub name: String,
    pub compartment: String,
    pub condition: Expr,
    pub actions: Vec<Statement>,
}

/// Axial current flowing into `compartment` from `neighbor`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxialCurrent {
    pub variable: String,
    pub compartment: String,
    pub neighbor: String,
    pub resistance: Quantity,
    pub expression: Expr,
}

/// Compiled neuron model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDescriptor {
    pub(crate) name: String,
    pub(crate) size: usize,
    pub(crate) options: PopulationOptions,
    pub(crate) compartments: Vec<String>,
    pub(crate) equations: Vec<Equation>,
    pub(crate) namespace: BTreeMap<String, Quantity>,
    pub(crate) initial_values: BTreeMap<String, Expr>,
    pub(crate) threshold: Option<Expr>,
    pub(crate) reset: Vec<Statement>,
    pub(crate) refractory: Option<Quantity>,
    pub(crate) events: BTreeMap<String, ConnectionPoint>,
    pub(crate) custom_events: Vec<EventSpec>,
    pub(crate) axial_currents: Vec<AxialCurrent>,
}

impl ModelDescriptor {
    /// Population name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of neurons in the population
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn options(&self) -> &PopulationOptions {
        &self.options
    }

    /// Compartment names, soma first then breadth-first
    pub fn compartments(&self) -> &[String] {
        &self.compartments
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    /// All equations as one block, one declaration per line
    pub fn equations_text(&self) -> String {
        self.equations
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn equation(&self, variable: &str) -> Option<&Equation> {
        self.equations.iter().find(|e| e.variable == variable)
    }

    /// Voltage equations, one per compartment
    pub fn voltage_equations(&self) -> impl Iterator<Item = &Equation> {
        self.compartments
            .iter()
            .filter_map(move |c| self.equation(&format!("V_{}", c)))
    }

    pub fn namespace(&self) -> &BTreeMap<String, Quantity> {
        &self.namespace
    }

    pub fn initial_values(&self) -> &BTreeMap<String, Expr> {
        &self.initial_values
    }

    pub fn threshold(&self) -> Option<&Expr> {
        self.threshold.as_ref()
    }

    pub fn reset(&self) -> &[Statement] {
        &self.reset
    }

    /// Reset statements as a code block, if the model spikes
    pub fn reset_text(&self) -> Option<String> {
        if self.reset.is_empty() {
            None
        } else {
            Some(join_statements(&self.reset))
        }
    }

    pub fn refractory(&self) -> Option<Quantity> {
        self.refractory
    }

    /// Connection points keyed by `<receptor>_<pre>_<compartment>`
    pub fn events(&self) -> &BTreeMap<String, ConnectionPoint> {
        &self.events
    }

    pub fn custom_events(&self) -> &[EventSpec] {
        &self.custom_events
    }

    pub fn axial_currents(&self) -> &[AxialCurrent] {
        &self.axial_currents
    }

    /// Sum of every axial current, as a coefficient map over `(voltage,
    /// coupling)` pairs. Empty when current is conserved at every junction.
    pub fn axial_residual(&self) -> Option<BTreeMap<(String, Option<String>), f64>> {
        let total = self
            .axial_currents
            .iter()
            .map(|a| a.expression.clone())
            .reduce(Expr::add)?;
        total.linearize()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_json_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl fmt::Display for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(45);
        writeln!(f, "MODEL '{}' (size {})", self.name, self.size)?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "equations:")?;
        for eq in &self.equations {
            writeln!(f, "    {}", eq)?;
        }
        writeln!(f, "\nparameters:")?;
        for (name, value) in &self.namespace {
            writeln!(f, "    '{}': {}", name, value)?;
        }
        writeln!(f, "\ninitial values:")?;
        for (name, value) in &self.initial_values {
            writeln!(f, "    {} = {}", name, value)?;
        }
        writeln!(f, "\nevents:")?;
        if self.events.is_empty() {
            writeln!(f, "    None")?;
        }
        for (name, point) in &self.events {
            writeln!(f, "    '{}': '{}'", name, join_statements(&point.delivery).replace('\n', "; "))?;
        }
        if !self.custom_events.is_empty() {
            writeln!(f, "\ncustom events:")?;
            for event in &self.custom_events {
                writeln!(
                    f,
                    "    '{}': '{}' -> '{}'",
                    event.name,
                    event.condition,
                    join_statements(&event.actions).replace('\n', "; ")
                )?;
            }
        }
        match &self.threshold {
            Some(threshold) => writeln!(f, "\nthreshold: {}", threshold)?,
            None => writeln!(f, "\nthreshold: None")?,
        }
        if let Some(reset) = self.reset_text() {
            writeln!(f, "reset: {}", reset.replace('\n', "; "))?;
        }
        if let Some(refractory) = self.refractory {
            writeln!(f, "refractory: {}", refractory)?;
        }
        write!(f, "{}", rule)
    }
}
