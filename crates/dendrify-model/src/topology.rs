// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # Compartment Topology
//!
//! Compartments and their axial couplings. Edges are checked as they are
//! added (unknown endpoints, self-loops, cycles, second parents, duplicates);
//! [`TopologyGraph::validate`] then checks the whole graph is a single tree
//! rooted at the soma.
//!
//! Iteration follows insertion order everywhere, so two graphs built by the
//! same calls compile to the same equations.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use dendrify_units::{Dimension, Quantity};

use crate::compartment::CompartmentSpec;
use crate::defaults::ModelProperties;
use crate::error::{ModelError, ModelResult};

/// How the coupling resistance of an edge is obtained
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Coupling {
    /// Explicit coupling resistance
    Resistance(Quantity),
    /// Explicit coupling conductance
    Conductance(Quantity),
    /// Series resistance of half of each compartment's cylinder
    #[default]
    HalfCylinders,
    /// Resistance of the full cylinder of the named endpoint
    Cylinder(String),
}

impl fmt::Display for Coupling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coupling::Resistance(r) => write!(f, "{}", r),
            Coupling::Conductance(g) => write!(f, "{}", g),
            Coupling::HalfCylinders => write!(f, "half_cylinders"),
            Coupling::Cylinder(name) => write!(f, "cylinder_{}", name),
        }
    }
}

impl FromStr for Coupling {
    type Err = ModelError;

    /// `half_cylinders`, `cylinder_<name>`, or a resistance/conductance
    /// quantity such as `50 Mohm` or `15 nS`
    fn from_str(s: &str) -> ModelResult<Self> {
        let s = s.trim();
        if s == "half_cylinders" {
            return Ok(Coupling::HalfCylinders);
        }
        if let Some(name) = s.strip_prefix("cylinder_") {
            return Ok(Coupling::Cylinder(name.to_string()));
        }
        let q: Quantity = s
            .parse()
            .map_err(|e| ModelError::invalid_unit("connection", "coupling", e))?;
        match q.dimension() {
            d if d == Dimension::RESISTANCE => Ok(Coupling::Resistance(q)),
            d if d == Dimension::CONDUCTANCE => Ok(Coupling::Conductance(q)),
            d => Err(ModelError::InvalidUnit {
                owner: "connection".to_string(),
                parameter: "coupling".to_string(),
                expected: format!("{} or {}", Dimension::RESISTANCE, Dimension::CONDUCTANCE),
                actual: d,
            }),
        }
    }
}

/// An axial coupling between a parent and a child compartment
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub parent: String,
    pub child: String,
    pub coupling: Coupling,
}

impl Connection {
    /// `parent->child`, as used in error messages
    pub fn label(&self) -> String {
        format!("{}->{}", self.parent, self.child)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    compartments: Vec<CompartmentSpec>,
    index: BTreeMap<String, usize>,
    connections: Vec<Connection>,
    parents: BTreeMap<String, String>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_compartment(&mut self, spec: CompartmentSpec) -> ModelResult<()> {
        if self.index.contains_key(spec.name()) {
            return Err(ModelError::DuplicateCompartment(spec.name().to_string()));
        }
        tracing::debug!(target: "dendrify-model", "Adding compartment '{}' ({:?})", spec.name(), spec.kind());
        self.index.insert(spec.name().to_string(), self.compartments.len());
        self.compartments.push(spec);
        Ok(())
    }

    pub fn connect(&mut self, parent: &str, child: &str, coupling: Coupling) -> ModelResult<()> {
        for name in [parent, child] {
            if !self.index.contains_key(name) {
                return Err(ModelError::UnknownCompartment(name.to_string()));
            }
        }
        let cycle = || ModelError::Cycle {
            parent: parent.to_string(),
            child: child.to_string(),
        };
        if parent == child {
            return Err(cycle());
        }
        if self.parents.get(child).map(String::as_str) == Some(parent) {
            return Err(ModelError::DuplicateConnection {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        }
        if self.ancestors(parent).any(|a| a == child) {
            return Err(cycle());
        }
        if let Some(existing) = self.parents.get(child) {
            return Err(ModelError::MultipleParents {
                child: child.to_string(),
                existing: existing.clone(),
                requested: parent.to_string(),
            });
        }
        self.check_coupling(parent, child, &coupling)?;

        tracing::debug!(target: "dendrify-model", "Connecting '{}' -> '{}' ({})", parent, child, coupling);
        self.parents.insert(child.to_string(), parent.to_string());
        self.connections.push(Connection {
            parent: parent.to_string(),
            child: child.to_string(),
            coupling,
        });
        Ok(())
    }

    fn check_coupling(&self, parent: &str, child: &str, coupling: &Coupling) -> ModelResult<()> {
        let owner = format!("{}->{}", parent, child);
        let (value, expected) = match coupling {
            Coupling::Resistance(r) => (r, Dimension::RESISTANCE),
            Coupling::Conductance(g) => (g, Dimension::CONDUCTANCE),
            Coupling::HalfCylinders => return Ok(()),
            Coupling::Cylinder(name) if name == parent || name == child => return Ok(()),
            Coupling::Cylinder(name) => {
                return Err(ModelError::InvalidValue {
                    owner,
                    parameter: "coupling".to_string(),
                    reason: format!("cylinder_{} must name one of the two endpoints", name),
                })
            }
        };
        value
            .expect_dimension(expected, "coupling")
            .map_err(|e| ModelError::invalid_unit(&owner, "coupling", e))?;
        if !(value.value().is_finite() && value.value() > 0.0) {
            return Err(ModelError::InvalidValue {
                owner,
                parameter: "coupling".to_string(),
                reason: format!("must be positive, got {}", value),
            });
        }
        Ok(())
    }

    fn ancestors<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let mut current = Some(name);
        std::iter::from_fn(move || {
            let parent = self.parents.get(current?).map(String::as_str);
            current = parent;
            parent
        })
    }

    /// Check the graph is one tree rooted at the only soma; returns the soma
    pub fn validate(&self) -> ModelResult<&CompartmentSpec> {
        let somata: Vec<&CompartmentSpec> = self.compartments.iter().filter(|c| c.is_soma()).collect();
        let soma = match somata.as_slice() {
            [] => return Err(ModelError::MissingSoma),
            [soma] => *soma,
            many => {
                return Err(ModelError::MultipleSomata(
                    many.iter().map(|c| c.name().to_string()).collect(),
                ))
            }
        };
        if let Some(parent) = self.parents.get(soma.name()) {
            return Err(ModelError::SomaHasParent {
                soma: soma.name().to_string(),
                parent: parent.clone(),
            });
        }

        let reached = self.breadth_first_from(soma.name());
        if reached.len() != self.compartments.len() {
            let unreachable = self
                .compartments
                .iter()
                .map(CompartmentSpec::name)
                .filter(|n| !reached.contains(n))
                .map(str::to_string)
                .collect();
            return Err(ModelError::DisconnectedTopology {
                soma: soma.name().to_string(),
                unreachable,
            });
        }
        tracing::debug!(
            target: "dendrify-model",
            "Topology valid: {} compartment(s), {} connection(s), root '{}'",
            self.compartments.len(),
            self.connections.len(),
            soma.name()
        );
        Ok(soma)
    }

    fn breadth_first_from<'a>(&'a self, root: &'a str) -> Vec<&'a str> {
        let mut order = vec![root];
        let mut queue = VecDeque::from([root]);
        while let Some(node) = queue.pop_front() {
            for child in self.children(node) {
                order.push(child);
                queue.push_back(child);
            }
        }
        order
    }

    /// Compartments in breadth-first order from the soma (empty without a soma)
    pub fn breadth_first(&self) -> Vec<&CompartmentSpec> {
        match self.root() {
            Some(root) => self
                .breadth_first_from(root.name())
                .into_iter()
                .filter_map(|n| self.get(n))
                .collect(),
            None => Vec::new(),
        }
    }

    /// First soma, in insertion order
    pub fn root(&self) -> Option<&CompartmentSpec> {
        self.compartments.iter().find(|c| c.is_soma())
    }

    pub fn get(&self, name: &str) -> Option<&CompartmentSpec> {
        self.index.get(name).map(|&i| &self.compartments[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn compartments(&self) -> &[CompartmentSpec] {
        &self.compartments
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn parent(&self, name: &str) -> Option<&str> {
        self.parents.get(name).map(String::as_str)
    }

    /// Children in the order they were connected
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.parent == name)
            .map(|c| c.child.as_str())
    }

    /// Edges touching `name`: the parent edge first, then child edges
    pub fn edges_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        let up = self.connections.iter().filter(move |c| c.child == name);
        let down = self.connections.iter().filter(move |c| c.parent == name);
        up.chain(down)
    }

    pub fn len(&self) -> usize {
        self.compartments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compartments.is_empty()
    }

    /// Coupling resistance of an edge
    pub fn resistance(&self, connection: &Connection, defaults: &ModelProperties) -> ModelResult<Quantity> {
        let lookup = |name: &str| {
            self.get(name)
                .ok_or_else(|| ModelError::UnknownCompartment(name.to_string()))
        };
        match &connection.coupling {
            Coupling::Resistance(r) => Ok(*r),
            Coupling::Conductance(g) => Ok(g.recip()),
            Coupling::HalfCylinders => {
                let parent = lookup(&connection.parent)?.axial_resistance(defaults, 0.5)?;
                let child = lookup(&connection.child)?.axial_resistance(defaults, 0.5)?;
                parent
                    .checked_add(child)
                    .map_err(|e| ModelError::invalid_unit(&connection.label(), "coupling", e))
            }
            Coupling::Cylinder(name) => lookup(name)?.axial_resistance(defaults, 1.0),
        }
    }
}
