// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # Simulation Backend Abstraction
//!
//! The compiled [`ModelDescriptor`] is handed to a population-of-neurons
//! primitive through a [`SimulationBackend`]. Backends own all runtime state;
//! the compiler never inspects a [`PopulationHandle`].
//!
//! A [`SimulationScope`] is one isolated build-and-run context. Scopes share
//! nothing: resetting or replacing one never touches another, and a new
//! scope starts from an empty backend.

use thiserror::Error;
use tracing::{debug, info};

use crate::descriptor::ModelDescriptor;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Population '{0}' already exists in this scope")]
    DuplicatePopulation(String),

    #[error("Backend '{backend}' rejected model '{model}': {reason}")]
    Rejected {
        backend: String,
        model: String,
        reason: String,
    },
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Opaque reference to an instantiated population
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PopulationHandle {
    pub id: usize,
    pub name: String,
    /// Scope generation the population was created in
    pub generation: u64,
}

/// Adapter to an external simulator
pub trait SimulationBackend {
    /// Get backend type name for logging/debugging
    fn backend_name(&self) -> &str;

    /// Instantiate one population from a compiled model
    fn instantiate(&mut self, descriptor: &ModelDescriptor, generation: u64) -> BackendResult<PopulationHandle>;

    /// Drop every population and any runtime state
    fn reset(&mut self);
}

/// Reference backend that records instantiated models
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    populations: Vec<ModelDescriptor>,
    /// Scope generation of each entry in `populations`
    generations: Vec<u64>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn populations(&self) -> &[ModelDescriptor] {
        &self.populations
    }

    /// Resolve a handle; handles from an earlier generation never resolve
    pub fn get(&self, handle: &PopulationHandle) -> Option<&ModelDescriptor> {
        if self.generations.get(handle.id) != Some(&handle.generation) {
            return None;
        }
        self.populations
            .get(handle.id)
            .filter(|d| d.name() == handle.name)
    }
}

impl SimulationBackend for InMemoryBackend {
    fn backend_name(&self) -> &str {
        "in-memory"
    }

    fn instantiate(&mut self, descriptor: &ModelDescriptor, generation: u64) -> BackendResult<PopulationHandle> {
        if self.populations.iter().any(|d| d.name() == descriptor.name()) {
            return Err(BackendError::DuplicatePopulation(descriptor.name().to_string()));
        }
        self.populations.push(descriptor.clone());
        self.generations.push(generation);
        Ok(PopulationHandle {
            id: self.populations.len() - 1,
            name: descriptor.name().to_string(),
            generation,
        })
    }

    fn reset(&mut self) {
        self.populations.clear();
        self.generations.clear();
    }
}

/// Explicit simulation context owning one backend
pub struct SimulationScope<B: SimulationBackend> {
    backend: B,
    generation: u64,
    handles: Vec<PopulationHandle>,
}

impl<B: SimulationBackend> SimulationScope<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            generation: 0,
            handles: Vec::new(),
        }
    }

    /// Consume a compiled model and create its population
    pub fn instantiate(&mut self, descriptor: ModelDescriptor) -> BackendResult<PopulationHandle> {
        let handle = self.backend.instantiate(&descriptor, self.generation)?;
        info!(
            target: "dendrify-model",
            "[{}] Instantiated population '{}' ({} neuron(s)) in scope generation {}",
            self.backend.backend_name(),
            handle.name,
            descriptor.size(),
            self.generation
        );
        self.handles.push(handle.clone());
        Ok(handle)
    }

    /// Clear every population of this scope
    pub fn reset(&mut self) {
        debug!(
            target: "dendrify-model",
            "[{}] Resetting scope generation {} ({} population(s))",
            self.backend.backend_name(),
            self.generation,
            self.handles.len()
        );
        self.backend.reset();
        self.handles.clear();
    }

    /// Reset and start a new generation; old handles become stale
    pub fn new_scope(&mut self) -> u64 {
        self.reset();
        self.generation += 1;
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn populations(&self) -> &[PopulationHandle] {
        &self.handles
    }

    /// Whether a handle belongs to the live generation of this scope
    pub fn is_live(&self, handle: &PopulationHandle) -> bool {
        handle.generation == self.generation && self.handles.contains(handle)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NeuronModelBuilder;
    use crate::compartment::{CompartmentSpec, Geometry, PassiveProperties};
    use crate::descriptor::PopulationOptions;
    use dendrify_units::units;

    fn model(name: &str) -> ModelDescriptor {
        let passive = PassiveProperties::new()
            .capacitance(100.0 * units::PICOFARAD)
            .leak_conductance(5.0 * units::NANOSIEMENS)
            .leak_reversal(-65.0 * units::MILLIVOLT);
        NeuronModelBuilder::new(name, 2)
            .add(CompartmentSpec::soma("soma", Geometry::point(), passive).unwrap())
            .unwrap()
            .compile(PopulationOptions::new())
            .unwrap()
    }

    #[test]
    fn test_instantiate_and_duplicate() {
        let mut scope = SimulationScope::new(InMemoryBackend::new());
        let handle = scope.instantiate(model("a")).unwrap();
        assert_eq!(handle.id, 0);
        assert_eq!(scope.backend().get(&handle).unwrap().name(), "a");
        assert_eq!(
            scope.instantiate(model("a")),
            Err(BackendError::DuplicatePopulation("a".into()))
        );
        assert_eq!(scope.populations().len(), 1);
    }

    #[test]
    fn test_new_scope_isolates_runs() {
        let mut scope = SimulationScope::new(InMemoryBackend::new());
        let first = scope.instantiate(model("a")).unwrap();
        assert_eq!(scope.new_scope(), 1);
        assert!(!scope.is_live(&first));
        assert!(scope.backend().populations().is_empty());
        let second = scope.instantiate(model("a")).unwrap();
        assert_eq!(second.generation, 1);
        assert!(scope.is_live(&second));
    }

    #[test]
    fn test_stale_handle_does_not_resolve() {
        let mut scope = SimulationScope::new(InMemoryBackend::new());
        let first = scope.instantiate(model("a")).unwrap();
        scope.new_scope();
        let second = scope.instantiate(model("a")).unwrap();
        assert_eq!((first.id, &first.name), (second.id, &second.name));
        assert!(scope.backend().get(&first).is_none());
        assert_eq!(scope.backend().get(&second).unwrap().name(), "a");
    }

    #[test]
    fn test_scopes_share_nothing() {
        let mut left = SimulationScope::new(InMemoryBackend::new());
        let mut right = SimulationScope::new(InMemoryBackend::new());
        left.instantiate(model("a")).unwrap();
        right.instantiate(model("a")).unwrap();
        left.reset();
        assert!(left.populations().is_empty());
        assert_eq!(right.into_backend().populations().len(), 1);
    }
}
