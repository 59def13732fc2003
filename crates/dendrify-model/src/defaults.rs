// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Model-wide electrophysiological defaults and ionic constants

use dendrify_units::{units, Dimension, Quantity};

use crate::error::{ModelError, ModelResult};

/// Model-wide passive properties
///
/// `cm`, `gl`, `r_axial` and `v_rest` only fill values a compartment left
/// unset. `scale_factor` applies to every compartment and `spine_factor` to
/// every dendrite, replacing per-compartment values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelProperties {
    /// Specific membrane capacitance (F/m^2)
    pub cm: Option<Quantity>,
    /// Specific leak conductance (S/m^2)
    pub gl: Option<Quantity>,
    /// Specific axial resistivity (ohm*m)
    pub r_axial: Option<Quantity>,
    /// Resting potential, used as the leak reversal
    pub v_rest: Option<Quantity>,
    pub scale_factor: Option<f64>,
    pub spine_factor: Option<f64>,
}

impl ModelProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cm(mut self, cm: Quantity) -> Self {
        self.cm = Some(cm);
        self
    }

    pub fn gl(mut self, gl: Quantity) -> Self {
        self.gl = Some(gl);
        self
    }

    pub fn r_axial(mut self, r_axial: Quantity) -> Self {
        self.r_axial = Some(r_axial);
        self
    }

    pub fn v_rest(mut self, v_rest: Quantity) -> Self {
        self.v_rest = Some(v_rest);
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

    /// Check every set value against its physical role
    pub fn validate(&self) -> ModelResult<()> {
        let checks = [
            ("cm", self.cm, Dimension::SPECIFIC_CAPACITANCE),
            ("gl", self.gl, Dimension::SPECIFIC_CONDUCTANCE),
            ("r_axial", self.r_axial, Dimension::RESISTIVITY),
            ("v_rest", self.v_rest, Dimension::VOLTAGE),
        ];
        for (parameter, value, expected) in checks {
            if let Some(q) = value {
                q.expect_dimension(expected, parameter)
                    .map_err(|e| ModelError::invalid_unit("model", parameter, e))?;
            }
        }
        for (parameter, factor) in [("scale_factor", self.scale_factor), ("spine_factor", self.spine_factor)] {
            if let Some(f) = factor {
                if !(f.is_finite() && f > 0.0) {
                    return Err(ModelError::InvalidValue {
                        owner: "model".to_string(),
                        parameter: parameter.to_string(),
                        reason: format!("must be a positive number, got {}", f),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Reversal potentials and NMDA magnesium-block constants shared by the
/// built-in receptor and dendritic-spike presets
#[derive(Debug, Clone, PartialEq)]
pub struct IonicDefaults {
    pub e_ampa: Quantity,
    pub e_nmda: Quantity,
    pub e_gaba: Quantity,
    pub e_na: Quantity,
    pub e_k: Quantity,
    pub e_ca: Quantity,
    /// Extracellular Mg concentration (mM, dimensionless)
    pub mg: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Default for IonicDefaults {
    fn default() -> Self {
        Self {
            e_ampa: 0.0 * units::MILLIVOLT,
            e_nmda: 0.0 * units::MILLIVOLT,
            e_gaba: -80.0 * units::MILLIVOLT,
            e_na: 70.0 * units::MILLIVOLT,
            e_k: -89.0 * units::MILLIVOLT,
            e_ca: 136.0 * units::MILLIVOLT,
            mg: 1.0,
            alpha: 0.062,
            beta: 3.57,
            gamma: 0.0,
        }
    }
}

impl IonicDefaults {
    /// Namespace entries, in a fixed order
    pub fn entries(&self) -> Vec<(&'static str, Quantity)> {
        vec![
            ("E_AMPA", self.e_ampa),
            ("E_NMDA", self.e_nmda),
            ("E_GABA", self.e_gaba),
            ("E_Na", self.e_na),
            ("E_K", self.e_k),
            ("E_Ca", self.e_ca),
            ("Mg", Quantity::scalar(self.mg)),
            ("alpha_NMDA", Quantity::scalar(self.alpha)),
            ("beta_NMDA", Quantity::scalar(self.beta)),
            ("gamma_NMDA", Quantity::scalar(self.gamma)),
        ]
    }

    pub fn get(&self, name: &str) -> Option<Quantity> {
        self.entries()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, q)| q)
    }

    pub fn validate(&self) -> ModelResult<()> {
        for (name, q) in self.entries() {
            let expected = if name.starts_with("E_") {
                Dimension::VOLTAGE
            } else {
                Dimension::DIMENSIONLESS
            };
            q.expect_dimension(expected, name)
                .map_err(|e| ModelError::invalid_unit("ionic", name, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ionic_defaults() {
        let ionic = IonicDefaults::default();
        assert_eq!(ionic.get("E_GABA"), Some(-80.0 * units::MILLIVOLT));
        assert_eq!(ionic.get("beta_NMDA"), Some(Quantity::scalar(3.57)));
        assert_eq!(ionic.get("E_X"), None);
        assert!(ionic.validate().is_ok());
    }

    #[test]
    fn test_model_properties_validation() {
        let ok = ModelProperties::new()
            .cm(1.0 * units::MICROFARAD_PER_CM2)
            .v_rest(-65.0 * units::MILLIVOLT)
            .scale_factor(2.8);
        assert!(ok.validate().is_ok());

        let wrong = ModelProperties::new().cm(200.0 * units::PICOFARAD);
        assert!(matches!(wrong.validate(), Err(ModelError::InvalidUnit { .. })));

        let negative = ModelProperties::new().spine_factor(-1.0);
        assert!(negative.validate().is_err());
    }
}
