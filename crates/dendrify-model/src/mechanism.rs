// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # Active Mechanisms
//!
//! A mechanism contributes membrane currents (outward positive, amp) and its
//! own kinetic state to one compartment. Equations are written against local
//! names; the synthesizer later qualifies them with the compartment name.
//!
//! Inside mechanism equations the following compartment locals resolve:
//! `V` (membrane voltage), `E_L` (leak reversal), `g_L` (leak conductance),
//! `C` (capacitance) and `I_ext` (injected current). `t` is simulation time.
//!
//! Presets cover the point-neuron models and dendritic spikes:
//! - [`Mechanism::leaky_if`]
//! - [`Mechanism::adaptive_if`]
//! - [`Mechanism::adex`]
//! - [`Mechanism::dspike`]

use dendrify_units::{Dimension, Quantity};

use crate::equation::{parse_equations, Equation};
use crate::error::{check_identifier, ModelError, ModelResult};
use crate::expr::{parse_expr, parse_statements, Expr, Statement, Ty};

/// Compartment locals every mechanism and receptor may reference
pub const COMPARTMENT_LOCALS: [&str; 5] = ["V", "E_L", "g_L", "C", "I_ext"];

/// Named parameter with an optional required dimension
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: Quantity,
    pub expected: Option<Dimension>,
}

impl Param {
    pub fn new(name: impl Into<String>, value: Quantity) -> Self {
        Self {
            name: name.into(),
            value,
            expected: None,
        }
    }

    pub fn typed(name: impl Into<String>, value: Quantity, expected: Dimension) -> Self {
        Self {
            name: name.into(),
            value,
            expected: Some(expected),
        }
    }

    pub(crate) fn validate(&self, owner: &str) -> ModelResult<()> {
        check_identifier(&self.name)?;
        if let Some(expected) = self.expected {
            self.value
                .expect_dimension(expected, &self.name)
                .map_err(|e| ModelError::invalid_unit(owner, &self.name, e))?;
        }
        Ok(())
    }
}

/// Somatic spike generation: threshold condition, reset and refractoriness
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeGenerator {
    pub threshold: Expr,
    pub reset: Vec<Statement>,
    pub refractory: Option<Quantity>,
}

impl SpikeGenerator {
    pub fn new(threshold: &str, reset: &str) -> ModelResult<Self> {
        Ok(Self {
            threshold: parse_expr(threshold)?,
            reset: parse_statements(reset)?,
            refractory: None,
        })
    }

    pub fn with_refractory(mut self, refractory: Option<Quantity>) -> Self {
        self.refractory = refractory;
        self
    }
}

/// A named condition with the statements run when it becomes true
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEvent {
    pub name: String,
    pub condition: Expr,
    pub actions: Vec<Statement>,
}

impl CustomEvent {
    pub fn new(name: impl Into<String>, condition: &str, actions: &str) -> ModelResult<Self> {
        let name = name.into();
        check_identifier(&name)?;
        Ok(Self {
            name,
            condition: parse_expr(condition)?,
            actions: parse_statements(actions)?,
        })
    }
}

/// Ion channel family of a dendritic spike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DSpikeChannel {
    Na,
    Ca,
}

impl DSpikeChannel {
    /// (depolarizing ion, repolarizing current suffix, depolarizing reversal)
    fn names(self) -> (&'static str, &'static str, &'static str) {
        match self {
            DSpikeChannel::Na => ("Na", "Kn", "E_Na"),
            DSpikeChannel::Ca => ("Ca", "Kc", "E_Ca"),
        }
    }

    pub fn as_str(self) -> &'static str {
        self.names().0
    }
}

impl std::str::FromStr for DSpikeChannel {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        match s {
            "Na" => Ok(DSpikeChannel::Na),
            "Ca" => Ok(DSpikeChannel::Ca),
            other => Err(ModelError::InvalidValue {
                owner: "dspike".to_string(),
                parameter: "channel".to_string(),
                reason: format!("expected 'Na' or 'Ca', got '{}'", other),
            }),
        }
    }
}

/// Timing of a dendritic spike; unset values must be supplied model-wide
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DSpikeProperties {
    /// Decay of the depolarizing conductance
    pub tau_rise: Option<Quantity>,
    /// Decay of the repolarizing conductance
    pub tau_fall: Option<Quantity>,
    /// Delay between spike onset and repolarization
    pub offset_fall: Option<Quantity>,
    /// Inactive period after a spike
    pub refractory: Option<Quantity>,
}

impl DSpikeProperties {
    /// Parameter declarations for the set values, named after `channel`
    pub fn params(&self, channel: DSpikeChannel) -> Vec<Param> {
        let (ion, k, _) = channel.names();
        [
            (format!("tau_{}", ion), self.tau_rise),
            (format!("tau_{}", k), self.tau_fall),
            (format!("offset_{}", k), self.offset_fall),
            (format!("refractory_{}", ion), self.refractory),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| Param::typed(name, v, Dimension::TIME)))
        .collect()
    }
}

/// Amplitude and threshold of a dendritic spike
#[derive(Debug, Clone, PartialEq)]
pub struct DSpikeParams {
    pub threshold: Quantity,
    /// Conductance added at spike onset
    pub g_rise: Quantity,
    /// Conductance added at repolarization onset
    pub g_fall: Quantity,
    pub timing: DSpikeProperties,
}

/// Parameters of the adaptive integrate-and-fire family
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptationParams {
    pub v_th: Quantity,
    pub v_reset: Quantity,
    /// Subthreshold adaptation conductance
    pub a: Quantity,
    /// Spike-triggered adaptation current
    pub b: Quantity,
    pub tau_w: Quantity,
    pub refractory: Option<Quantity>,
}

/// An active mechanism declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Mechanism {
    name: String,
    currents: Vec<String>,
    equations: Vec<Equation>,
    params: Vec<Param>,
    spike: Option<SpikeGenerator>,
    events: Vec<CustomEvent>,
    initial: Vec<(String, Expr)>,
}

impl Mechanism {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            currents: Vec::new(),
            equations: Vec::new(),
            params: Vec::new(),
            spike: None,
            events: Vec::new(),
            initial: Vec::new(),
        }
    }

    /// Append equation declarations (one per line)
    pub fn with_equations(mut self, text: &str) -> ModelResult<Self> {
        self.equations.extend(parse_equations(text)?);
        Ok(self)
    }

    /// Mark a variable as a membrane current of this mechanism
    pub fn with_current(mut self, variable: impl Into<String>) -> Self {
        self.currents.push(variable.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Quantity) -> Self {
        self.params.push(Param::new(name, value));
        self
    }

    pub fn with_typed_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_spike_generator(mut self, spike: SpikeGenerator) -> Self {
        self.spike = Some(spike);
        self
    }

    pub fn with_event(mut self, event: CustomEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Initial value of a local variable (event flags, timers)
    pub fn with_initial(mut self, variable: impl Into<String>, value: Expr) -> Self {
        self.initial.push((variable.into(), value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn currents(&self) -> &[String] {
        &self.currents
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn spike_generator(&self) -> Option<&SpikeGenerator> {
        self.spike.as_ref()
    }

    pub fn events(&self) -> &[CustomEvent] {
        &self.events
    }

    pub fn initial_values(&self) -> &[(String, Expr)] {
        &self.initial
    }

    /// Variables defined by this mechanism's equations
    pub fn locals(&self) -> impl Iterator<Item = &str> {
        self.equations.iter().map(|e| e.variable.as_str())
    }

    fn local_type(&self, variable: &str) -> Option<Ty> {
        self.equations
            .iter()
            .find(|e| e.variable == variable)
            .map(|e| e.ty)
    }

    /// Structural checks that need no knowledge of the rest of the model
    pub(crate) fn validate(&self, compartment: &str) -> ModelResult<()> {
        check_identifier(&self.name)?;
        let owner = format!("{}.{}", compartment, self.name);

        for param in &self.params {
            param.validate(&owner)?;
        }

        let mut seen = std::collections::BTreeSet::new();
        for eq in &self.equations {
            if COMPARTMENT_LOCALS.contains(&eq.variable.as_str()) {
                return Err(ModelError::NameCollision(format!(
                    "{} (redefined by mechanism '{}')",
                    eq.variable, self.name
                )));
            }
            if !seen.insert(eq.variable.as_str()) {
                return Err(ModelError::NameCollision(format!("{}.{}", owner, eq.variable)));
            }
        }

        for current in &self.currents {
            match self.local_type(current) {
                Some(Ty::Quantity(d)) if d == Dimension::CURRENT => {}
                Some(Ty::Quantity(d)) => {
                    return Err(ModelError::InvalidUnit {
                        owner,
                        parameter: current.clone(),
                        expected: Dimension::CURRENT.to_string(),
                        actual: d,
                    })
                }
                Some(Ty::Boolean) => {
                    return Err(ModelError::InvalidUnit {
                        owner,
                        parameter: current.clone(),
                        expected: Dimension::CURRENT.to_string(),
                        actual: Dimension::BOOLEAN,
                    })
                }
                None => {
                    return Err(ModelError::UnknownReference {
                        name: current.clone(),
                        context: format!("currents of mechanism '{}'", owner),
                    })
                }
            }
        }

        if let Some(refractory) = self.spike.as_ref().and_then(|s| s.refractory) {
            refractory
                .expect_dimension(Dimension::TIME, "refractory")
                .map_err(|e| ModelError::invalid_unit(&owner, "refractory", e))?;
        }

        for (variable, _) in &self.initial {
            if self.local_type(variable).is_none() {
                return Err(ModelError::UnknownReference {
                    name: variable.clone(),
                    context: format!("initial values of mechanism '{}'", owner),
                });
            }
        }
        Ok(())
    }

    /// Leaky integrate-and-fire spike generation
    pub fn leaky_if(v_th: Quantity, v_reset: Quantity, refractory: Option<Quantity>) -> ModelResult<Self> {
        Ok(Mechanism::new("leakyIF")
            .with_typed_param(Param::typed("V_th", v_th, Dimension::VOLTAGE))
            .with_typed_param(Param::typed("V_reset", v_reset, Dimension::VOLTAGE))
            .with_spike_generator(SpikeGenerator::new("V > V_th", "V = V_reset")?.with_refractory(refractory)))
    }

    /// Integrate-and-fire with a spike-triggered adaptation current `w`
    pub fn adaptive_if(params: AdaptationParams) -> ModelResult<Self> {
        Self::adaptation("adaptiveIF", params)
    }

    /// Adaptive exponential integrate-and-fire
    pub fn adex(params: AdaptationParams, v_t: Quantity, delta_t: Quantity) -> ModelResult<Self> {
        Ok(Self::adaptation("adex", params)?
            .with_equations("I_exp = -g_L * delta_T * exp((V - V_T) / delta_T) : amp")?
            .with_current("I_exp")
            .with_typed_param(Param::typed("V_T", v_t, Dimension::VOLTAGE))
            .with_typed_param(Param::typed("delta_T", delta_t, Dimension::VOLTAGE)))
    }

    fn adaptation(name: &str, p: AdaptationParams) -> ModelResult<Self> {
        Ok(Mechanism::new(name)
            .with_equations("dw/dt = (a * (V - E_L) - w) / tau_w : amp")?
            .with_current("w")
            .with_typed_param(Param::typed("V_th", p.v_th, Dimension::VOLTAGE))
            .with_typed_param(Param::typed("V_reset", p.v_reset, Dimension::VOLTAGE))
            .with_typed_param(Param::typed("a", p.a, Dimension::CONDUCTANCE))
            .with_typed_param(Param::typed("b", p.b, Dimension::CURRENT))
            .with_typed_param(Param::typed("tau_w", p.tau_w, Dimension::TIME))
            .with_spike_generator(
                SpikeGenerator::new("V > V_th", "V = V_reset; w += b")?.with_refractory(p.refractory),
            ))
    }

    /// Dendritic spike: a fast depolarizing conductance followed, after a
    /// delay, by a repolarizing potassium conductance, driven by custom events
    pub fn dspike(channel: DSpikeChannel, p: DSpikeParams) -> ModelResult<Self> {
        let (ion, k, reversal) = channel.names();
        let equations = format!(
            "I_{ion} = g_{ion} * (V - {reversal}) : amp\n\
             dg_{ion}/dt = -g_{ion} / tau_{ion} : siemens\n\
             I_{k} = g_{k} * (V - E_K) : amp\n\
             dg_{k}/dt = -g_{k} / tau_{k} : siemens\n\
             allow_I_{ion} : boolean\n\
             allow_I_{k} : boolean\n\
             timer_{ion} : second",
        );

        let mut mechanism = Mechanism::new(format!("dspike_{}", ion))
            .with_equations(&equations)?
            .with_current(format!("I_{}", ion))
            .with_current(format!("I_{}", k))
            .with_typed_param(Param::typed(format!("Vth_{}", ion), p.threshold, Dimension::VOLTAGE))
            .with_typed_param(Param::typed(format!("g_{}_max", ion), p.g_rise, Dimension::CONDUCTANCE))
            .with_typed_param(Param::typed(format!("g_{}_max", k), p.g_fall, Dimension::CONDUCTANCE))
            .with_event(CustomEvent::new(
                format!("activate_I_{}", ion),
                &format!("V >= Vth_{ion} and allow_I_{ion}"),
                &format!(
                    "g_{ion} += g_{ion}_max; allow_I_{ion} = False; allow_I_{k} = True; timer_{ion} = t"
                ),
            )?)
            .with_event(CustomEvent::new(
                format!("activate_I_{}", k),
                &format!("t >= timer_{ion} + offset_{k} and allow_I_{k}"),
                &format!("g_{k} += g_{k}_max; allow_I_{k} = False"),
            )?)
            .with_event(CustomEvent::new(
                format!("deactivate_I_{}", ion),
                &format!("t >= timer_{ion} + refractory_{ion} and not allow_I_{ion} and not allow_I_{k}"),
                &format!("allow_I_{ion} = True"),
            )?)
            .with_initial(format!("allow_I_{}", ion), Expr::Bool(true))
            .with_initial(format!("allow_I_{}", k), Expr::Bool(false));
        for param in p.timing.params(channel) {
            mechanism = mechanism.with_typed_param(param);
        }
        Ok(mechanism)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dendrify_units::units;

    fn adaptation() -> AdaptationParams {
        AdaptationParams {
            v_th: -40.0 * units::MILLIVOLT,
            v_reset: -55.0 * units::MILLIVOLT,
            a: 2.0 * units::NANOSIEMENS,
            b: 50.0 * units::PICOAMP,
            tau_w: 100.0 * units::MILLISECOND,
            refractory: Some(2.0 * units::MILLISECOND),
        }
    }

    #[test]
    fn test_leaky_if_has_spike_generator() {
        let m = Mechanism::leaky_if(-50.0 * units::MILLIVOLT, -65.0 * units::MILLIVOLT, None).unwrap();
        let spike = m.spike_generator().unwrap();
        assert_eq!(spike.threshold.to_string(), "V > V_th");
        assert_eq!(spike.reset.len(), 1);
        assert!(m.currents().is_empty());
        assert!(m.validate("soma").is_ok());
    }

    #[test]
    fn test_adaptive_if_resets_adaptation() {
        let m = Mechanism::adaptive_if(adaptation()).unwrap();
        assert_eq!(m.currents(), ["w"]);
        let reset: Vec<_> = m.spike_generator().unwrap().reset.iter().map(|s| s.to_string()).collect();
        assert_eq!(reset, vec!["V = V_reset", "w += b"]);
        assert!(m.validate("soma").is_ok());
    }

    #[test]
    fn test_adex_adds_exponential_current() {
        let m = Mechanism::adex(adaptation(), -50.0 * units::MILLIVOLT, 2.0 * units::MILLIVOLT).unwrap();
        assert_eq!(m.currents(), ["w", "I_exp"]);
        assert!(m.params().iter().any(|p| p.name == "delta_T"));
    }

    #[test]
    fn test_dspike_events_and_flags() {
        let p = DSpikeParams {
            threshold: -35.0 * units::MILLIVOLT,
            g_rise: 30.0 * units::NANOSIEMENS,
            g_fall: 15.0 * units::NANOSIEMENS,
            timing: DSpikeProperties {
                tau_rise: Some(0.5 * units::MILLISECOND),
                ..Default::default()
            },
        };
        let m = Mechanism::dspike(DSpikeChannel::Ca, p).unwrap();
        assert_eq!(m.name(), "dspike_Ca");
        assert_eq!(m.events().len(), 3);
        assert_eq!(m.events()[1].name, "activate_I_Kc");
        assert_eq!(m.initial_values()[0], ("allow_I_Ca".to_string(), Expr::Bool(true)));
        let params: Vec<_> = m.params().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(params, vec!["Vth_Ca", "g_Ca_max", "g_Kc_max", "tau_Ca"]);
        assert!(m.validate("dend").is_ok());
    }

    #[test]
    fn test_wrong_preset_unit_is_rejected() {
        let m = Mechanism::leaky_if(-50.0 * units::NANOSIEMENS, -65.0 * units::MILLIVOLT, None).unwrap();
        match m.validate("soma") {
            Err(ModelError::InvalidUnit { owner, parameter, .. }) => {
                assert_eq!(owner, "soma.leakyIF");
                assert_eq!(parameter, "V_th");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_current_must_be_defined_and_amp() {
        let undefined = Mechanism::new("m").with_current("I_x");
        assert!(matches!(undefined.validate("soma"), Err(ModelError::UnknownReference { .. })));

        let wrong = Mechanism::new("m")
            .with_equations("I_x = V / mV : 1")
            .unwrap()
            .with_current("I_x");
        assert!(matches!(wrong.validate("soma"), Err(ModelError::InvalidUnit { .. })));
    }

    #[test]
    fn test_redefining_compartment_local_is_rejected() {
        let m = Mechanism::new("m").with_equations("V = E_L : volt").unwrap();
        assert!(matches!(m.validate("soma"), Err(ModelError::NameCollision(_))));
    }

    #[test]
    fn test_channel_from_str() {
        assert_eq!("Na".parse::<DSpikeChannel>().unwrap(), DSpikeChannel::Na);
        assert!("K".parse::<DSpikeChannel>().is_err());
    }
}
