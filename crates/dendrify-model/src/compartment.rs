// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # Compartments
//!
//! Immutable description of one electrical compartment. Construction checks
//! every quantity against its physical role, so every constructed
//! `CompartmentSpec` is dimensionally sound.
//!
//! Capacitance and leak conductance are given either absolutely
//! (`200 pF`, `10 nS`) or per membrane area (`1 uF/cm**2`, `0.05 mS/cm**2`);
//! the unit decides which. Specific values need a geometry:
//!
//! ```text
//! area = pi * diameter * length * scale_factor [* spine_factor for dendrites]
//! ```

use core::f64::consts::PI;

use dendrify_units::{Dimension, Quantity};
use serde::Serialize;

use crate::defaults::ModelProperties;
use crate::error::{check_segment, ModelError, ModelResult};
use crate::mechanism::Mechanism;
use crate::receptor::Receptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompartmentKind {
    Soma,
    Dendrite,
}

/// Cylinder dimensions of a compartment
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Geometry {
    pub length: Option<Quantity>,
    pub diameter: Option<Quantity>,
}

impl Geometry {
    pub fn cylinder(length: Quantity, diameter: Quantity) -> Self {
        Self {
            length: Some(length),
            diameter: Some(diameter),
        }
    }

    /// No geometry: only absolute passive values are usable
    pub fn point() -> Self {
        Self::default()
    }

    fn lateral_area(&self) -> Option<Quantity> {
        Some(PI * self.length? * self.diameter?)
    }

    /// Cross-section area
    fn cross_section(&self) -> Option<Quantity> {
        let radius = self.diameter? / 2.0;
        Some(PI * radius * radius)
    }
}

/// Passive electrical parameters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassiveProperties {
    /// Absolute (F) or specific (F/m^2) membrane capacitance
    pub capacitance: Option<Quantity>,
    /// Absolute (S) or specific (S/m^2) leak conductance
    pub leak_conductance: Option<Quantity>,
    /// Leak reversal potential, also the resting potential
    pub leak_reversal: Option<Quantity>,
    /// Specific axial resistivity (ohm*m)
    pub axial_resistivity: Option<Quantity>,
    pub scale_factor: Option<f64>,
    pub spine_factor: Option<f64>,
}

impl PassiveProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacitance(mut self, value: Quantity) -> Self {
        self.capacitance = Some(value);
        self
    }

    pub fn leak_conductance(mut self, value: Quantity) -> Self {
        self.leak_conductance = Some(value);
        self
    }

    pub fn leak_reversal(mut self, value: Quantity) -> Self {
        self.leak_reversal = Some(value);
        self
    }

    pub fn axial_resistivity(mut self, value: Quantity) -> Self {
        self.axial_resistivity = Some(value);
        self
    }

    pub fn scale_factor(mut self, factor: f64) -> Self {
        self.scale_factor = Some(factor);
        self
    }

    pub fn spine_factor(mut self, factor: f64) -> Self {
        self.spine_factor = Some(factor);
        self
    }
}

/// Passive values after model-wide defaults and membrane area are applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPassive {
    pub capacitance: Quantity,
    pub leak_conductance: Quantity,
    pub leak_reversal: Quantity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompartmentSpec {
    name: String,
    kind: CompartmentKind,
    geometry: Geometry,
    passive: PassiveProperties,
    mechanisms: Vec<Mechanism>,
    receptors: Vec<Receptor>,
}

fn check_role(owner: &str, parameter: &str, value: Option<Quantity>, allowed: &[Dimension]) -> ModelResult<()> {
    let Some(q) = value else {
        return Ok(());
    };
    if allowed.contains(&q.dimension()) {
        return Ok(());
    }
    let expected = allowed
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(" or ");
    Err(ModelError::InvalidUnit {
        owner: owner.to_string(),
        parameter: parameter.to_string(),
        expected,
        actual: q.dimension(),
    })
}

fn check_positive(owner: &str, parameter: &str, value: Option<f64>) -> ModelResult<()> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(ModelError::InvalidValue {
            owner: owner.to_string(),
            parameter: parameter.to_string(),
            reason: format!("must be a positive number, got {}", v),
        }),
        _ => Ok(()),
    }
}

impl CompartmentSpec {
    pub fn new(
        name: impl Into<String>,
        kind: CompartmentKind,
        geometry: Geometry,
        passive: PassiveProperties,
        mechanisms: Vec<Mechanism>,
        receptors: Vec<Receptor>,
    ) -> ModelResult<Self> {
        let name = name.into();
        check_segment(&name)?;

        check_role(&name, "length", geometry.length, &[Dimension::LENGTH])?;
        check_role(&name, "diameter", geometry.diameter, &[Dimension::LENGTH])?;
        for (parameter, value) in [("length", geometry.length), ("diameter", geometry.diameter)] {
            check_positive(&name, parameter, value.map(|q| q.value()))?;
        }
        check_role(
            &name,
            "capacitance",
            passive.capacitance,
            &[Dimension::CAPACITANCE, Dimension::SPECIFIC_CAPACITANCE],
        )?;
        check_role(
            &name,
            "leak_conductance",
            passive.leak_conductance,
            &[Dimension::CONDUCTANCE, Dimension::SPECIFIC_CONDUCTANCE],
        )?;
        check_role(&name, "leak_reversal", passive.leak_reversal, &[Dimension::VOLTAGE])?;
        check_role(&name, "axial_resistivity", passive.axial_resistivity, &[Dimension::RESISTIVITY])?;
        check_positive(&name, "scale_factor", passive.scale_factor)?;
        check_positive(&name, "spine_factor", passive.spine_factor)?;

        let mut mechanism_names = std::collections::BTreeSet::new();
        let mut spike_generators = Vec::new();
        for mechanism in &mechanisms {
            mechanism.validate(&name)?;
            if !mechanism_names.insert(mechanism.name()) {
                return Err(ModelError::DuplicateMechanism {
                    compartment: name,
                    what: "mechanism",
                    name: mechanism.name().to_string(),
                });
            }
            if mechanism.spike_generator().is_some() {
                spike_generators.push(mechanism.name().to_string());
            }
        }
        if spike_generators.len() > 1 {
            return Err(ModelError::MultipleSpikeGenerators {
                compartment: name,
                mechanisms: spike_generators,
            });
        }
        if kind == CompartmentKind::Dendrite {
            if let Some(mechanism) = spike_generators.pop() {
                return Err(ModelError::MisplacedSpikeGenerator {
                    compartment: name,
                    mechanism,
                });
            }
        }

        let mut receptor_ids = std::collections::BTreeSet::new();
        for receptor in &receptors {
            receptor.validate(&name)?;
            if !receptor_ids.insert(receptor.id()) {
                return Err(ModelError::DuplicateMechanism {
                    compartment: name,
                    what: "receptor",
                    name: receptor.id(),
                });
            }
        }

        Ok(Self {
            name,
            kind,
            geometry,
            passive,
            mechanisms,
            receptors,
        })
    }

    /// Somatic compartment without active mechanisms or receptors
    pub fn soma(name: impl Into<String>, geometry: Geometry, passive: PassiveProperties) -> ModelResult<Self> {
        Self::new(name, CompartmentKind::Soma, geometry, passive, Vec::new(), Vec::new())
    }

    /// Dendritic compartment without active mechanisms or receptors
    pub fn dendrite(name: impl Into<String>, geometry: Geometry, passive: PassiveProperties) -> ModelResult<Self> {
        Self::new(name, CompartmentKind::Dendrite, geometry, passive, Vec::new(), Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CompartmentKind {
        self.kind
    }

    pub fn is_soma(&self) -> bool {
        self.kind == CompartmentKind::Soma
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn passive(&self) -> &PassiveProperties {
        &self.passive
    }

    pub fn mechanisms(&self) -> &[Mechanism] {
        &self.mechanisms
    }

    pub fn receptors(&self) -> &[Receptor] {
        &self.receptors
    }

    /// Area scaling after model-wide overrides
    fn area_factor(&self, defaults: &ModelProperties) -> f64 {
        let scale = defaults
            .scale_factor
            .or(self.passive.scale_factor)
            .unwrap_or(1.0);
        let spine = match self.kind {
            CompartmentKind::Dendrite => defaults
                .spine_factor
                .or(self.passive.spine_factor)
                .unwrap_or(1.0),
            CompartmentKind::Soma => 1.0,
        };
        scale * spine
    }

    /// Effective membrane area, if the geometry is known
    pub fn area(&self, defaults: &ModelProperties) -> Option<Quantity> {
        self.geometry
            .lateral_area()
            .map(|a| a * self.area_factor(defaults))
    }

    fn absolute(
        &self,
        parameter: &'static str,
        own: Option<Quantity>,
        fallback: Option<Quantity>,
        absolute: Dimension,
        defaults: &ModelProperties,
    ) -> ModelResult<Quantity> {
        let value = own.or(fallback).ok_or_else(|| ModelError::MissingParameter {
            compartment: self.name.clone(),
            parameter,
        })?;
        if value.dimension() == absolute {
            return Ok(value);
        }
        let area = self.area(defaults).ok_or_else(|| ModelError::MissingParameter {
            compartment: self.name.clone(),
            parameter: "geometry (length and diameter)",
        })?;
        Ok(value * area)
    }

    pub fn capacitance(&self, defaults: &ModelProperties) -> ModelResult<Quantity> {
        self.absolute(
            "capacitance",
            self.passive.capacitance,
            defaults.cm,
            Dimension::CAPACITANCE,
            defaults,
        )
    }

    pub fn leak_conductance(&self, defaults: &ModelProperties) -> ModelResult<Quantity> {
        self.absolute(
            "leak_conductance",
            self.passive.leak_conductance,
            defaults.gl,
            Dimension::CONDUCTANCE,
            defaults,
        )
    }

    pub fn leak_reversal(&self, defaults: &ModelProperties) -> ModelResult<Quantity> {
        self.passive
            .leak_reversal
            .or(defaults.v_rest)
            .ok_or_else(|| ModelError::MissingParameter {
                compartment: self.name.clone(),
                parameter: "leak_reversal",
            })
    }

    pub fn resolve(&self, defaults: &ModelProperties) -> ModelResult<ResolvedPassive> {
        Ok(ResolvedPassive {
            capacitance: self.capacitance(defaults)?,
            leak_conductance: self.leak_conductance(defaults)?,
            leak_reversal: self.leak_reversal(defaults)?,
        })
    }

    /// Axial resistance of the whole cylinder (`fraction = 0.5` for half)
    pub(crate) fn axial_resistance(&self, defaults: &ModelProperties, fraction: f64) -> ModelResult<Quantity> {
        let resistivity = self
            .passive
            .axial_resistivity
            .or(defaults.r_axial)
            .ok_or_else(|| ModelError::MissingParameter {
                compartment: self.name.clone(),
                parameter: "axial_resistivity",
            })?;
        let geometry_missing = || ModelError::MissingParameter {
            compartment: self.name.clone(),
            parameter: "geometry (length and diameter)",
        };
        let length = self.geometry.length.ok_or_else(geometry_missing)?;
        let cross_section = self.geometry.cross_section().ok_or_else(geometry_missing)?;
        Ok(resistivity * (length * fraction) / cross_section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receptor::Receptor;
    use dendrify_units::units;

    fn soma_passive() -> PassiveProperties {
        PassiveProperties::new()
            .capacitance(200.0 * units::PICOFARAD)
            .leak_conductance(10.0 * units::NANOSIEMENS)
            .leak_reversal(-70.0 * units::MILLIVOLT)
    }

    #[test]
    fn test_absolute_values_pass_through() {
        let soma = CompartmentSpec::soma("soma", Geometry::point(), soma_passive()).unwrap();
        let resolved = soma.resolve(&ModelProperties::default()).unwrap();
        assert_eq!(resolved.capacitance, 200.0 * units::PICOFARAD);
        assert_eq!(resolved.leak_reversal, -70.0 * units::MILLIVOLT);
    }

    #[test]
    fn test_specific_values_scale_with_area() {
        let geometry = Geometry::cylinder(100.0 * units::MICROMETRE, 1.0 * units::MICROMETRE);
        let passive = PassiveProperties::new()
            .capacitance(1.0 * units::MICROFARAD_PER_CM2)
            .leak_conductance(0.05 * units::MILLISIEMENS_PER_CM2)
            .spine_factor(1.5);
        let dend = CompartmentSpec::dendrite("dend", geometry, passive).unwrap();
        let defaults = ModelProperties::new().v_rest(-65.0 * units::MILLIVOLT);
        let area = PI * 100e-6 * 1e-6 * 1.5;
        let c = dend.capacitance(&defaults).unwrap();
        assert_eq!(c.dimension(), Dimension::CAPACITANCE);
        assert!((c.value() - 1e-2 * area).abs() < 1e-20);
        assert_eq!(dend.leak_reversal(&defaults).unwrap(), -65.0 * units::MILLIVOLT);
    }

    #[test]
    fn test_model_scale_factor_overrides() {
        let geometry = Geometry::cylinder(10.0 * units::MICROMETRE, 10.0 * units::MICROMETRE);
        let soma = CompartmentSpec::soma("soma", geometry, PassiveProperties::new().scale_factor(2.0)).unwrap();
        let base = soma.area(&ModelProperties::default()).unwrap();
        let scaled = soma.area(&ModelProperties::new().scale_factor(3.0)).unwrap();
        assert!((scaled.value() / base.value() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_values_are_reported() {
        let soma = CompartmentSpec::soma("soma", Geometry::point(), PassiveProperties::new()).unwrap();
        assert_eq!(
            soma.capacitance(&ModelProperties::default()),
            Err(ModelError::MissingParameter {
                compartment: "soma".into(),
                parameter: "capacitance"
            })
        );
        let specific = ModelProperties::new().cm(1.0 * units::MICROFARAD_PER_CM2);
        assert!(matches!(
            soma.capacitance(&specific),
            Err(ModelError::MissingParameter { .. })
        ));
    }

    #[test]
    fn test_wrong_dimension_is_rejected() {
        let passive = PassiveProperties::new().capacitance(50.0 * units::MEGAOHM);
        let err = CompartmentSpec::soma("soma", Geometry::point(), passive).unwrap_err();
        match err {
            ModelError::InvalidUnit { owner, parameter, actual, .. } => {
                assert_eq!(owner, "soma");
                assert_eq!(parameter, "capacitance");
                assert_eq!(actual, Dimension::RESISTANCE);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_mechanism_and_receptor() {
        let lif = || Mechanism::leaky_if(-50.0 * units::MILLIVOLT, -65.0 * units::MILLIVOLT, None).unwrap();
        let err = CompartmentSpec::new(
            "soma",
            CompartmentKind::Soma,
            Geometry::point(),
            soma_passive(),
            vec![lif(), lif()],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateMechanism { what: "mechanism", .. }));

        let ampa = |pre: &str| Receptor::ampa(pre, 1.0 * units::NANOSIEMENS, 2.0 * units::MILLISECOND);
        assert!(CompartmentSpec::new(
            "dend",
            CompartmentKind::Dendrite,
            Geometry::point(),
            soma_passive(),
            vec![],
            vec![ampa("L1"), ampa("L2")],
        )
        .is_ok());
        let err = CompartmentSpec::new(
            "dend",
            CompartmentKind::Dendrite,
            Geometry::point(),
            soma_passive(),
            vec![],
            vec![ampa("L1"), ampa("L1")],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateMechanism {
                compartment: "dend".into(),
                what: "receptor",
                name: "AMPA_L1".into()
            }
        );
    }

    #[test]
    fn test_spike_generator_only_on_soma() {
        let lif = Mechanism::leaky_if(-50.0 * units::MILLIVOLT, -65.0 * units::MILLIVOLT, None).unwrap();
        let err = CompartmentSpec::new(
            "dend",
            CompartmentKind::Dendrite,
            Geometry::point(),
            soma_passive(),
            vec![lif],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::MisplacedSpikeGenerator { .. }));
    }

    #[test]
    fn test_receptor_without_pre_fails_at_construction() {
        let receptor = Receptor::nmda("", 1.0 * units::NANOSIEMENS, 60.0 * units::MILLISECOND);
        let err = CompartmentSpec::new(
            "dend",
            CompartmentKind::Dendrite,
            Geometry::point(),
            soma_passive(),
            vec![],
            vec![receptor],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::MissingConnectionPoint { .. }));
    }

    #[test]
    fn test_half_cylinder_resistance() {
        let geometry = Geometry::cylinder(100.0 * units::MICROMETRE, 2.0 * units::MICROMETRE);
        let dend = CompartmentSpec::dendrite(
            "dend",
            geometry,
            PassiveProperties::new().axial_resistivity(150.0 * units::OHM_CM),
        )
        .unwrap();
        let r = dend.axial_resistance(&ModelProperties::default(), 0.5).unwrap();
        assert_eq!(r.dimension(), Dimension::RESISTANCE);
        let expected = 1.5 * 50e-6 / (PI * 1e-6 * 1e-6);
        assert!((r.value() - expected).abs() / expected < 1e-12);
    }
}
