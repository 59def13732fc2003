// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # Synaptic Receptors
//!
//! A receptor is a conductance-based synaptic current with a named external
//! input hook (`pre`). Each receptor exposes one connection point whose
//! delivery statements run when a presynaptic spike arrives.
//!
//! Local names used by the generated equations, for a receptor `R`:
//! - `I_R`: synaptic current (outward positive)
//! - `s_R`: gating variable (and `x_R` for rise-decay kinetics)
//! - `g_R`, `tau_R` / `tau_R_rise` / `tau_R_decay`, `E_R`: parameters
//!
//! `E_R` falls back to the model's ionic defaults (`E_AMPA`, `E_NMDA`,
//! `E_GABA`) when the receptor sets no reversal potential of its own.

use dendrify_units::{Dimension, Quantity};

use crate::equation::{parse_equations, Equation};
use crate::error::{check_segment, ModelError, ModelResult};
use crate::expr::{parse_statements, Statement, Ty};
use crate::mechanism::{Param, COMPARTMENT_LOCALS};

/// Gating kinetics of a receptor
#[derive(Debug, Clone, PartialEq)]
pub enum Kinetics {
    /// Instantaneous rise, exponential decay
    Exponential { tau_decay: Quantity },
    /// Normalized difference of exponentials
    RiseDecay { tau_rise: Quantity, tau_decay: Quantity },
    /// User-written equations defining `I_<name>` plus delivery statements
    Custom {
        equations: Vec<Equation>,
        on_pre: Vec<Statement>,
        params: Vec<Param>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receptor {
    name: String,
    pre: String,
    conductance: Quantity,
    reversal: Option<Quantity>,
    kinetics: Kinetics,
    mg_block: bool,
}

impl Receptor {
    pub fn new(name: impl Into<String>, pre: impl Into<String>, conductance: Quantity, kinetics: Kinetics) -> Self {
        Self {
            name: name.into(),
            pre: pre.into(),
            conductance,
            reversal: None,
            kinetics,
            mg_block: false,
        }
    }

    pub fn ampa(pre: impl Into<String>, conductance: Quantity, tau_decay: Quantity) -> Self {
        Self::new("AMPA", pre, conductance, Kinetics::Exponential { tau_decay })
    }

    /// NMDA receptor with the voltage-dependent Mg block
    pub fn nmda(pre: impl Into<String>, conductance: Quantity, tau_decay: Quantity) -> Self {
        Self::new("NMDA", pre, conductance, Kinetics::Exponential { tau_decay }).with_mg_block()
    }

    pub fn gaba(pre: impl Into<String>, conductance: Quantity, tau_decay: Quantity) -> Self {
        Self::new("GABA", pre, conductance, Kinetics::Exponential { tau_decay })
    }

    /// Receptor with hand-written kinetics
    pub fn custom(
        name: impl Into<String>,
        pre: impl Into<String>,
        conductance: Quantity,
        equations: &str,
        on_pre: &str,
    ) -> ModelResult<Self> {
        Ok(Self::new(
            name,
            pre,
            conductance,
            Kinetics::Custom {
                equations: parse_equations(equations)?,
                on_pre: parse_statements(on_pre)?,
                params: Vec::new(),
            },
        ))
    }

    /// Switch exponential kinetics to rise-decay with the given rise time.
    /// Only exponential kinetics can take a rise time.
    pub fn with_rise(mut self, tau_rise: Quantity) -> ModelResult<Self> {
        match self.kinetics {
            Kinetics::Exponential { tau_decay } => {
                self.kinetics = Kinetics::RiseDecay { tau_rise, tau_decay };
                Ok(self)
            }
            _ => Err(ModelError::InvalidValue {
                owner: self.id(),
                parameter: "tau_rise".to_string(),
                reason: "a rise time only applies to exponential kinetics".to_string(),
            }),
        }
    }

    pub fn with_reversal(mut self, reversal: Quantity) -> Self {
        self.reversal = Some(reversal);
        self
    }

    pub fn with_mg_block(mut self) -> Self {
        self.mg_block = true;
        self
    }

    /// Extra parameter for custom kinetics
    pub fn with_param(mut self, name: impl Into<String>, value: Quantity) -> ModelResult<Self> {
        let name = name.into();
        match &mut self.kinetics {
            Kinetics::Custom { params, .. } => {
                params.push(Param::new(name, value));
                Ok(self)
            }
            _ => Err(ModelError::InvalidValue {
                owner: self.id(),
                parameter: name,
                reason: "built-in kinetics take no extra parameters".to_string(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pre(&self) -> &str {
        &self.pre
    }

    pub fn conductance(&self) -> Quantity {
        self.conductance
    }

    pub fn reversal(&self) -> Option<Quantity> {
        self.reversal
    }

    pub fn kinetics(&self) -> &Kinetics {
        &self.kinetics
    }

    pub fn has_mg_block(&self) -> bool {
        self.mg_block
    }

    /// Identity within a compartment: receptor name plus its input hook.
    /// Neither part may contain '_', so the pair can be read back.
    pub fn id(&self) -> String {
        format!("{}_{}", self.name, self.pre)
    }

    /// Local name of the synaptic current
    pub fn current(&self) -> String {
        format!("I_{}", self.name)
    }

    /// Name of the reversal potential parameter
    pub fn reversal_name(&self) -> String {
        format!("E_{}", self.name)
    }

    /// Parameters declared by this receptor
    pub fn params(&self) -> Vec<Param> {
        let r = &self.name;
        let mut out = vec![Param::typed(format!("g_{}", r), self.conductance, Dimension::CONDUCTANCE)];
        if let Some(e) = self.reversal {
            out.push(Param::typed(self.reversal_name(), e, Dimension::VOLTAGE));
        }
        match &self.kinetics {
            Kinetics::Exponential { tau_decay } => {
                out.push(Param::typed(format!("tau_{}", r), *tau_decay, Dimension::TIME));
            }
            Kinetics::RiseDecay { tau_rise, tau_decay } => {
                out.push(Param::typed(format!("tau_{}_rise", r), *tau_rise, Dimension::TIME));
                out.push(Param::typed(format!("tau_{}_decay", r), *tau_decay, Dimension::TIME));
            }
            Kinetics::Custom { params, .. } => out.extend(params.iter().cloned()),
        }
        out
    }

    /// Equations in local names
    pub fn equations(&self) -> ModelResult<Vec<Equation>> {
        let r = &self.name;
        let block = if self.mg_block {
            " / (1 + Mg * exp(-alpha_NMDA * (V / mV + gamma_NMDA)) / beta_NMDA)"
        } else {
            ""
        };
        let text = match &self.kinetics {
            Kinetics::Exponential { .. } => format!(
                "I_{r} = g_{r} * s_{r} * (V - E_{r}){block} : amp\n\
                 ds_{r}/dt = -s_{r} / tau_{r} : 1"
            ),
            Kinetics::RiseDecay { .. } => format!(
                "I_{r} = g_{r} * s_{r} * (V - E_{r}){block} : amp\n\
                 dx_{r}/dt = -x_{r} / tau_{r}_rise : 1\n\
                 ds_{r}/dt = ((tau_{r}_decay / tau_{r}_rise) ** (tau_{r}_rise / (tau_{r}_decay - tau_{r}_rise)) * x_{r} - s_{r}) / tau_{r}_decay : 1"
            ),
            Kinetics::Custom { equations, .. } => return Ok(equations.clone()),
        };
        parse_equations(&text)
    }

    /// Statements run on a presynaptic spike, in local names
    pub fn delivery(&self) -> ModelResult<Vec<Statement>> {
        match &self.kinetics {
            Kinetics::Exponential { .. } => parse_statements(&format!("s_{} += 1", self.name)),
            Kinetics::RiseDecay { .. } => parse_statements(&format!("x_{} += 1", self.name)),
            Kinetics::Custom { on_pre, .. } => Ok(on_pre.clone()),
        }
    }

    pub(crate) fn validate(&self, compartment: &str) -> ModelResult<()> {
        check_segment(&self.name)?;
        if self.pre.trim().is_empty() {
            return Err(ModelError::MissingConnectionPoint {
                compartment: compartment.to_string(),
                receptor: self.name.clone(),
            });
        }
        check_segment(&self.pre)?;

        let owner = format!("{}.{}", compartment, self.id());
        for param in self.params() {
            param.validate(&owner)?;
        }

        let equations = self.equations()?;
        let current = self.current();
        match equations.iter().find(|e| e.variable == current) {
            Some(eq) if eq.ty == Ty::Quantity(Dimension::CURRENT) => {}
            Some(eq) => {
                return Err(ModelError::InvalidUnit {
                    owner,
                    parameter: current,
                    expected: Dimension::CURRENT.to_string(),
                    actual: eq.ty.dimension().unwrap_or(Dimension::BOOLEAN),
                })
            }
            None => {
                return Err(ModelError::UnknownReference {
                    name: current,
                    context: format!("equations of receptor '{}'", owner),
                })
            }
        }
        if let Some(eq) = equations
            .iter()
            .find(|e| COMPARTMENT_LOCALS.contains(&e.variable.as_str()))
        {
            return Err(ModelError::NameCollision(format!(
                "{} (redefined by receptor '{}')",
                eq.variable, owner
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dendrify_units::units;

    #[test]
    fn test_ampa_equations() {
        let r = Receptor::ampa("L1", 1.0 * units::NANOSIEMENS, 2.0 * units::MILLISECOND);
        let eqs: Vec<_> = r.equations().unwrap().iter().map(|e| e.to_string()).collect();
        assert_eq!(
            eqs,
            vec![
                "I_AMPA = g_AMPA * s_AMPA * (V - E_AMPA) : amp",
                "ds_AMPA/dt = -s_AMPA / tau_AMPA : 1",
            ]
        );
        assert_eq!(r.delivery().unwrap()[0].to_string(), "s_AMPA += 1");
        assert_eq!(r.id(), "AMPA_L1");
        assert!(r.validate("dend").is_ok());
    }

    #[test]
    fn test_nmda_has_mg_block() {
        let r = Receptor::nmda("L2", 1.0 * units::NANOSIEMENS, 60.0 * units::MILLISECOND);
        let current = r.equations().unwrap()[0].to_string();
        assert!(current.contains("Mg * exp(-alpha_NMDA * (V / mV + gamma_NMDA)) / beta_NMDA"));
    }

    #[test]
    fn test_rise_decay_delivers_to_rise_variable() {
        let r = Receptor::gaba("inh", 1.0 * units::NANOSIEMENS, 8.0 * units::MILLISECOND)
            .with_rise(1.0 * units::MILLISECOND)
            .unwrap();
        assert_eq!(r.equations().unwrap().len(), 3);
        assert_eq!(r.delivery().unwrap()[0].to_string(), "x_GABA += 1");
        let names: Vec<_> = r.params().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["g_GABA", "tau_GABA_rise", "tau_GABA_decay"]);
    }

    #[test]
    fn test_missing_pre_is_rejected() {
        let r = Receptor::ampa("", 1.0 * units::NANOSIEMENS, 2.0 * units::MILLISECOND);
        assert_eq!(
            r.validate("soma"),
            Err(ModelError::MissingConnectionPoint {
                compartment: "soma".into(),
                receptor: "AMPA".into()
            })
        );
    }

    #[test]
    fn test_wrong_conductance_unit() {
        let r = Receptor::ampa("L1", 1.0 * units::NANOAMP, 2.0 * units::MILLISECOND);
        assert!(matches!(r.validate("soma"), Err(ModelError::InvalidUnit { .. })));
    }

    #[test]
    fn test_custom_receptor_must_define_its_current() {
        let ok = Receptor::custom(
            "syn",
            "ext",
            1.0 * units::NANOSIEMENS,
            "I_syn = g_syn * u_syn * (V - E_syn) : amp\ndu_syn/dt = -u_syn / tau_u : 1",
            "u_syn += 0.5",
        )
        .unwrap()
        .with_reversal(-10.0 * units::MILLIVOLT)
        .with_param("tau_u", 5.0 * units::MILLISECOND)
        .unwrap();
        assert!(ok.validate("dend").is_ok());

        let missing = Receptor::custom("syn", "ext", 1.0 * units::NANOSIEMENS, "du/dt = -u / tau_u : 1", "u += 1")
            .unwrap();
        assert!(matches!(missing.validate("dend"), Err(ModelError::UnknownReference { .. })));
    }

    #[test]
    fn test_misapplied_builders_are_rejected() {
        let custom = Receptor::custom("syn", "ext", 1.0 * units::NANOSIEMENS, "I_syn = g_syn * (V - E_syn) : amp", "")
            .unwrap();
        assert!(matches!(
            custom.with_rise(1.0 * units::MILLISECOND),
            Err(ModelError::InvalidValue { parameter, .. }) if parameter == "tau_rise"
        ));

        let ampa = Receptor::ampa("L1", 1.0 * units::NANOSIEMENS, 2.0 * units::MILLISECOND);
        assert!(matches!(
            ampa.clone().with_param("tau_u", 5.0 * units::MILLISECOND),
            Err(ModelError::InvalidValue { parameter, .. }) if parameter == "tau_u"
        ));

        let twice = ampa.with_rise(0.5 * units::MILLISECOND).unwrap();
        assert!(twice.with_rise(0.5 * units::MILLISECOND).is_err());
    }

    #[test]
    fn test_receptor_ids_are_unambiguous() {
        // "AMPA_L1_x" could split as pre "L1_x" or receptor "AMPA_L1"
        let r = Receptor::ampa("L1_x", 1.0 * units::NANOSIEMENS, 2.0 * units::MILLISECOND);
        assert_eq!(r.validate("dend"), Err(ModelError::SeparatorInName("L1_x".into())));

        let named = Receptor::custom("AMPA_L1", "x", 1.0 * units::NANOSIEMENS, "I_AMPA_L1 = 0 * amp : amp", "")
            .unwrap();
        assert_eq!(named.validate("dend"), Err(ModelError::SeparatorInName("AMPA_L1".into())));
    }
}
