// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # Equation Synthesis
//!
//! Turns a validated [`TopologyGraph`] into one coupled equation system.
//!
//! For every compartment `c`, in breadth-first order from the soma:
//!
//! ```text
//! dV_c/dt = (-I_leak_c - sum(I_mech) - sum(I_syn) + sum(I_axial) + I_ext_c) / C_c : volt
//! I_leak_c = g_L_c * (V_c - E_L_c) : amp
//! I_axial_n_c = (V_n - V_c) / (r * unit) : amp    one per neighbor n
//! I_ext_c : amp
//! <mechanism equations>                          locals renamed <local>_c
//! <receptor equations>                           locals renamed <local>_<pre>_c
//! ```
//!
//! Outward currents are positive, so membrane and synaptic currents are
//! subtracted; inward axial and injected currents are added. The two axial
//! currents of an edge are exact negatives of each other. Coupling
//! resistances are written into the axial currents as literal quantities
//! and never enter the namespace.
//!
//! Parameters are merged through the namespace resolver; identifiers that
//! match neither a local nor a declared parameter are left untouched and
//! must resolve against model-wide parameters, ionic defaults, or a unit
//! name. Every equation, condition and statement is then type-checked.

use std::collections::{BTreeMap, BTreeSet};

use dendrify_units::{Dimension, Quantity};
use tracing::debug;

use crate::compartment::CompartmentSpec;
use crate::defaults::{IonicDefaults, ModelProperties};
use crate::descriptor::{AxialCurrent, ConnectionPoint, EventSpec};
use crate::equation::Equation;
use crate::error::{ModelError, ModelResult};
use crate::expr::{infer, AssignOp, Expr, Scope, Statement, Ty};
use crate::namespace::{Namespace, NamespacePolicy, NamespaceResolver};
use crate::receptor::Receptor;
use crate::topology::TopologyGraph;

type RenameMap = BTreeMap<String, String>;

const CURRENT: Ty = Ty::Quantity(Dimension::CURRENT);

fn qualified(base: &str, owner: &str) -> String {
    format!("{}_{}", base, owner)
}

fn compartment_scope(compartment: &str) -> String {
    format!("c:{}", compartment)
}

fn receptor_scope(compartment: &str, receptor: &Receptor) -> String {
    format!("r:{}:{}", compartment, receptor.id())
}

fn receptor_suffix(compartment: &str, receptor: &Receptor) -> String {
    format!("{}_{}", receptor.pre(), compartment)
}

/// `r * unit` with the largest ohm prefix that keeps `r` at or above one
fn resistance_literal(resistance: Quantity) -> Expr {
    let ohms = resistance.value();
    let (unit, scale) = [("Gohm", 1e9), ("Mohm", 1e6), ("kohm", 1e3)]
        .into_iter()
        .find(|(_, scale)| ohms.abs() >= *scale)
        .unwrap_or(("ohm", 1.0));
    let mut magnitude = ohms / scale;
    if magnitude.abs() >= 1.0 {
        // reciprocal conductances carry float noise in the last digits
        magnitude = (magnitude * 1e9).round() / 1e9;
    }
    Expr::mul(Expr::Number(magnitude), Expr::ident(unit))
}

/// Output of [`EquationSynthesizer::synthesize`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesizedSystem {
    pub compartments: Vec<String>,
    pub equations: Vec<Equation>,
    pub namespace: BTreeMap<String, Quantity>,
    pub initial_values: BTreeMap<String, Expr>,
    pub threshold: Option<Expr>,
    pub reset: Vec<Statement>,
    pub refractory: Option<Quantity>,
    pub events: BTreeMap<String, ConnectionPoint>,
    pub custom_events: Vec<EventSpec>,
    pub axial_currents: Vec<AxialCurrent>,
}

impl SynthesizedSystem {
    fn referenced_identifiers(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for eq in &self.equations {
            if let Some(rhs) = eq.rhs() {
                out.extend(rhs.identifiers());
            }
        }
        if let Some(threshold) = &self.threshold {
            out.extend(threshold.identifiers());
        }
        let statements = self
            .reset
            .iter()
            .chain(self.events.values().flat_map(|p| p.delivery.iter()))
            .chain(self.custom_events.iter().flat_map(|e| e.actions.iter()));
        for statement in statements {
            out.extend(statement.value.identifiers());
        }
        for event in &self.custom_events {
            out.extend(event.condition.identifiers());
        }
        for value in self.initial_values.values() {
            out.extend(value.identifiers());
        }
        out
    }
}

/// Builds the coupled equation system of a compartment tree
pub struct EquationSynthesizer<'a> {
    graph: &'a TopologyGraph,
    properties: &'a ModelProperties,
    ionic: &'a IonicDefaults,
    policy: NamespacePolicy,
    extra_params: BTreeMap<String, Quantity>,
    extra_equations: Vec<Equation>,
}

impl<'a> EquationSynthesizer<'a> {
    pub fn new(graph: &'a TopologyGraph, properties: &'a ModelProperties, ionic: &'a IonicDefaults) -> Self {
        Self {
            graph,
            properties,
            ionic,
            policy: NamespacePolicy::default(),
            extra_params: BTreeMap::new(),
            extra_equations: Vec::new(),
        }
    }

    pub fn policy(mut self, policy: NamespacePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Model-wide parameters; they replace same-named compartment parameters
    pub fn extra_params(mut self, params: BTreeMap<String, Quantity>) -> Self {
        self.extra_params = params;
        self
    }

    /// Equations appended verbatim after every compartment
    pub fn extra_equations(mut self, equations: Vec<Equation>) -> Self {
        self.extra_equations = equations;
        self
    }

    pub fn synthesize(&self) -> ModelResult<SynthesizedSystem> {
        self.graph.validate()?;
        let order = self.graph.breadth_first();
        let mut ns = self.namespace(&order)?;

        let mut system = SynthesizedSystem {
            compartments: order.iter().map(|c| c.name().to_string()).collect(),
            ..Default::default()
        };
        for compartment in &order {
            let map = self.compartment_map(compartment, &ns)?;
            self.emit_compartment(compartment, &map, &ns, &mut system)?;
        }
        system.equations.extend(self.extra_equations.iter().cloned());

        let mut variables: BTreeMap<String, Ty> = BTreeMap::new();
        for eq in &system.equations {
            if eq.variable == "t"
                || ns.contains(&eq.variable)
                || variables.insert(eq.variable.clone(), eq.ty).is_some()
            {
                return Err(ModelError::NameCollision(eq.variable.clone()));
            }
        }

        let referenced = system.referenced_identifiers();
        for (name, value) in self.ionic.entries() {
            if referenced.contains(name) && !ns.contains(name) && !variables.contains_key(name) {
                ns.insert(name, value)?;
            }
        }

        self.check(&system, &ns, &variables)?;
        system.namespace = ns.into_values();

        debug!(
            target: "dendrify-model",
            "Synthesized {} equation(s), {} parameter(s), {} connection point(s) over {} compartment(s)",
            system.equations.len(),
            system.namespace.len(),
            system.events.len(),
            system.compartments.len()
        );
        Ok(system)
    }

    /// Declare every parameter and resolve names
    fn namespace(&self, order: &[&CompartmentSpec]) -> ModelResult<Namespace> {
        let mut resolver = NamespaceResolver::new();
        for compartment in order {
            let c = compartment.name();
            let scope = compartment_scope(c);
            let passive = compartment.resolve(self.properties)?;
            resolver.declare(&scope, c, "C", passive.capacitance)?;
            resolver.declare(&scope, c, "g_L", passive.leak_conductance)?;
            resolver.declare(&scope, c, "E_L", passive.leak_reversal)?;
            for mechanism in compartment.mechanisms() {
                for param in mechanism.params() {
                    resolver.declare(&scope, c, &param.name, param.value)?;
                }
            }
            for receptor in compartment.receptors() {
                let scope = receptor_scope(c, receptor);
                let suffix = receptor_suffix(c, receptor);
                for param in receptor.params() {
                    resolver.declare(&scope, &suffix, &param.name, param.value)?;
                }
            }
        }

        resolver.resolve(self.policy, &self.extra_params)
    }

    /// Local name -> model name for everything a mechanism of `compartment` sees
    fn compartment_map(&self, compartment: &CompartmentSpec, ns: &Namespace) -> ModelResult<RenameMap> {
        let c = compartment.name();
        let scope = compartment_scope(c);
        let mut map = RenameMap::new();
        map.insert("V".to_string(), qualified("V", c));
        map.insert("I_ext".to_string(), qualified("I_ext", c));
        for (base, name) in ns.scoped(&scope) {
            map.insert(base.to_string(), name.to_string());
        }
        for mechanism in compartment.mechanisms() {
            for local in mechanism.locals() {
                if map.insert(local.to_string(), qualified(local, c)).is_some() {
                    return Err(ModelError::NameCollision(qualified(local, c)));
                }
            }
        }
        Ok(map)
    }

    /// Compartment map plus the receptor's own parameters and locals
    fn receptor_map(
        &self,
        compartment: &CompartmentSpec,
        receptor: &Receptor,
        equations: &[Equation],
        base: &RenameMap,
        ns: &Namespace,
    ) -> ModelResult<RenameMap> {
        let c = compartment.name();
        let suffix = receptor_suffix(c, receptor);
        let scope = receptor_scope(c, receptor);
        let mut map = base.clone();
        for (param, name) in ns.scoped(&scope) {
            map.insert(param.to_string(), name.to_string());
        }
        for eq in equations {
            let local = eq.variable.as_str();
            if map.insert(local.to_string(), qualified(local, &suffix)).is_some() {
                return Err(ModelError::NameCollision(qualified(local, &suffix)));
            }
        }
        Ok(map)
    }

    fn emit_compartment(
        &self,
        compartment: &CompartmentSpec,
        map: &RenameMap,
        ns: &Namespace,
        system: &mut SynthesizedSystem,
    ) -> ModelResult<()> {
        let c = compartment.name();
        let local = |name: &str| map.get(name).cloned().unwrap_or_else(|| name.to_string());
        let v = qualified("V", c);
        let i_leak = qualified("I_leak", c);
        let i_ext = qualified("I_ext", c);

        let mut auxiliary = vec![Equation::algebraic(
            &i_leak,
            Expr::mul(
                Expr::ident(local("g_L")),
                Expr::sub(Expr::ident(&v), Expr::ident(local("E_L"))),
            ),
            CURRENT,
        )];
        let mut kinetics = Vec::new();
        let mut rhs = Expr::neg(Expr::ident(&i_leak));

        for mechanism in compartment.mechanisms() {
            for current in mechanism.currents() {
                rhs = Expr::sub(rhs, Expr::ident(local(current)));
            }
            kinetics.extend(mechanism.equations().iter().map(|e| e.rename(map)));
            for event in mechanism.events() {
                system.custom_events.push(EventSpec {
                    name: qualified(&event.name, c),
                    compartment: c.to_string(),
                    condition: event.condition.rename(map),
                    actions: event.actions.iter().map(|s| s.rename(map)).collect(),
                });
            }
            for (variable, value) in mechanism.initial_values() {
                system.initial_values.insert(local(variable), value.rename(map));
            }
            if let Some(spike) = mechanism.spike_generator() {
                system.threshold = Some(spike.threshold.rename(map));
                system.reset = spike.reset.iter().map(|s| s.rename(map)).collect();
                system.refractory = spike.refractory;
            }
        }

        for receptor in compartment.receptors() {
            let equations = receptor.equations()?;
            let rmap = self.receptor_map(compartment, receptor, &equations, map, ns)?;
            let current = rmap
                .get(&receptor.current())
                .cloned()
                .unwrap_or_else(|| receptor.current());
            rhs = Expr::sub(rhs, Expr::ident(current));
            kinetics.extend(equations.iter().map(|e| e.rename(&rmap)));
            system.events.insert(
                format!("{}_{}", receptor.id(), c),
                ConnectionPoint {
                    compartment: c.to_string(),
                    receptor: receptor.name().to_string(),
                    pre: receptor.pre().to_string(),
                    delivery: receptor.delivery()?.iter().map(|s| s.rename(&rmap)).collect(),
                },
            );
        }

        for connection in self.graph.edges_of(c) {
            let neighbor = if connection.parent == c {
                connection.child.as_str()
            } else {
                connection.parent.as_str()
            };
            let variable = format!("I_axial_{}_{}", neighbor, c);
            let resistance = self.graph.resistance(connection, self.properties)?;
            let expression = Expr::div(
                Expr::sub(Expr::ident(qualified("V", neighbor)), Expr::ident(&v)),
                resistance_literal(resistance),
            );
            rhs = Expr::add(rhs, Expr::ident(&variable));
            auxiliary.push(Equation::algebraic(&variable, expression.clone(), CURRENT));
            system.axial_currents.push(AxialCurrent {
                variable,
                compartment: c.to_string(),
                neighbor: neighbor.to_string(),
                resistance,
                expression,
            });
        }

        rhs = Expr::add(rhs, Expr::ident(&i_ext));
        auxiliary.push(Equation::declared(&i_ext, CURRENT));

        let mut voltage = Equation::differential(&v, Expr::div(rhs, Expr::ident(local("C"))), Dimension::VOLTAGE);
        if compartment.is_soma() && system.refractory.is_some() {
            voltage = voltage.with_flag("unless refractory");
        }
        system.initial_values.insert(v, Expr::ident(local("E_L")));

        debug!(
            target: "dendrify-model",
            "Compartment '{}': {} auxiliary and {} kinetic equation(s)",
            c,
            auxiliary.len(),
            kinetics.len()
        );
        system.equations.push(voltage);
        system.equations.extend(auxiliary);
        system.equations.extend(kinetics);
        Ok(())
    }

    fn check(&self, system: &SynthesizedSystem, ns: &Namespace, variables: &BTreeMap<String, Ty>) -> ModelResult<()> {
        let mut scope = variables.clone();
        scope.insert("t".to_string(), Ty::Quantity(Dimension::TIME));
        for (name, value) in &ns.values {
            scope
                .entry(name.clone())
                .or_insert(Ty::Quantity(value.dimension()));
        }
        let checker = StatementChecker {
            scope: &scope,
            variables,
            ns,
        };

        for eq in &system.equations {
            eq.check(&scope)?;
        }
        if let Some(threshold) = &system.threshold {
            checker.condition(threshold, "threshold")?;
        }
        checker.statements(&system.reset, "reset")?;
        for (key, point) in &system.events {
            checker.statements(&point.delivery, &format!("delivery of '{}'", key))?;
        }
        for event in &system.custom_events {
            let context = format!("event '{}'", event.name);
            checker.condition(&event.condition, &context)?;
            checker.statements(&event.actions, &context)?;
        }
        for (variable, value) in &system.initial_values {
            let statement = Statement::new(variable.clone(), AssignOp::Set, value.clone());
            checker.statements(std::slice::from_ref(&statement), "initial values")?;
        }
        Ok(())
    }
}

struct StatementChecker<'a> {
    scope: &'a BTreeMap<String, Ty>,
    variables: &'a BTreeMap<String, Ty>,
    ns: &'a Namespace,
}

impl StatementChecker<'_> {
    fn condition(&self, expr: &Expr, context: &str) -> ModelResult<()> {
        match infer(expr, self.scope as &dyn Scope, context)? {
            Ty::Boolean => Ok(()),
            other => Err(ModelError::UnresolvableUnit {
                equation: format!("{}: {}", context, expr),
                detail: format!("condition has dimension {}, expected boolean", other),
            }),
        }
    }

    fn statements(&self, statements: &[Statement], context: &str) -> ModelResult<()> {
        for statement in statements {
            let text = format!("{}: {}", context, statement);
            let target = match self.variables.get(&statement.target) {
                Some(ty) => *ty,
                None if self.ns.contains(&statement.target) => {
                    return Err(ModelError::InvalidEquation {
                        source_text: text,
                        reason: format!("cannot assign to parameter '{}'", statement.target),
                    })
                }
                None => {
                    return Err(ModelError::UnknownReference {
                        name: statement.target.clone(),
                        context: text,
                    })
                }
            };
            let value = infer(&statement.value, self.scope as &dyn Scope, &text)?;
            let expected = match (statement.op, target) {
                (AssignOp::Set, ty) => ty,
                (AssignOp::Add | AssignOp::Sub, Ty::Quantity(_)) => target,
                (AssignOp::Mul | AssignOp::Div, Ty::Quantity(_)) => Ty::DIMENSIONLESS,
                (_, Ty::Boolean) => {
                    return Err(ModelError::UnresolvableUnit {
                        equation: text,
                        detail: "arithmetic assignment to a boolean".to_string(),
                    })
                }
            };
            if value != expected {
                return Err(ModelError::UnresolvableUnit {
                    equation: text,
                    detail: format!("assigned value has dimension {}, expected {}", value, expected),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compartment::{CompartmentKind, Geometry, PassiveProperties};
    use crate::mechanism::Mechanism;
    use crate::topology::Coupling;
    use dendrify_units::units;

    fn passive(c_pf: f64, g_ns: f64) -> PassiveProperties {
        PassiveProperties::new()
            .capacitance(c_pf * units::PICOFARAD)
            .leak_conductance(g_ns * units::NANOSIEMENS)
            .leak_reversal(-70.0 * units::MILLIVOLT)
    }

    fn two_compartments(mechanisms: Vec<Mechanism>, receptors: Vec<Receptor>) -> TopologyGraph {
        let mut g = TopologyGraph::new();
        g.add_compartment(
            CompartmentSpec::new("soma", CompartmentKind::Soma, Geometry::point(), passive(200.0, 10.0), mechanisms, vec![])
                .unwrap(),
        )
        .unwrap();
        g.add_compartment(
            CompartmentSpec::new("dend", CompartmentKind::Dendrite, Geometry::point(), passive(50.0, 2.0), vec![], receptors)
                .unwrap(),
        )
        .unwrap();
        g.connect("soma", "dend", Coupling::Resistance(50.0 * units::MEGAOHM))
            .unwrap();
        g
    }

    fn synthesize(graph: &TopologyGraph) -> ModelResult<SynthesizedSystem> {
        EquationSynthesizer::new(graph, &ModelProperties::default(), &IonicDefaults::default()).synthesize()
    }

    fn text(system: &SynthesizedSystem, variable: &str) -> String {
        system
            .equations
            .iter()
            .find(|e| e.variable == variable)
            .map(|e| e.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_passive_two_compartments() {
        let system = synthesize(&two_compartments(vec![], vec![])).unwrap();
        assert_eq!(
            text(&system, "V_soma"),
            "dV_soma/dt = (-I_leak_soma + I_axial_dend_soma + I_ext_soma) / C_soma : volt"
        );
        assert_eq!(
            text(&system, "V_dend"),
            "dV_dend/dt = (-I_leak_dend + I_axial_soma_dend + I_ext_dend) / C_dend : volt"
        );
        assert_eq!(text(&system, "I_leak_dend"), "I_leak_dend = g_L_dend * (V_dend - E_L) : amp");
        assert_eq!(
            text(&system, "I_axial_dend_soma"),
            "I_axial_dend_soma = (V_dend - V_soma) / (50 * Mohm) : amp"
        );
        assert_eq!(system.namespace.len(), 5);
        let names: Vec<_> = system.namespace.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["C_dend", "C_soma", "E_L", "g_L_dend", "g_L_soma"]);
        assert_eq!(system.axial_currents[0].resistance, 50.0 * units::MEGAOHM);
        assert!(system.threshold.is_none());
        assert!(system.reset.is_empty());
        assert_eq!(system.initial_values["V_dend"], Expr::ident("E_L"));
    }

    #[test]
    fn test_axial_currents_cancel() {
        let mut g = two_compartments(vec![], vec![]);
        for name in ["a", "b"] {
            g.add_compartment(CompartmentSpec::dendrite(name, Geometry::point(), passive(10.0, 1.0)).unwrap())
                .unwrap();
        }
        g.connect("dend", "a", Coupling::Conductance(5.0 * units::NANOSIEMENS)).unwrap();
        g.connect("soma", "b", Coupling::Resistance(80.0 * units::MEGAOHM)).unwrap();
        let system = synthesize(&g).unwrap();
        assert_eq!(system.axial_currents.len(), 6);
        let total = system
            .axial_currents
            .iter()
            .map(|a| a.expression.clone())
            .reduce(Expr::add)
            .unwrap();
        assert_eq!(total.linearize(), Some(BTreeMap::new()));
    }

    #[test]
    fn test_spike_generator_on_soma() {
        let lif = Mechanism::leaky_if(
            -50.0 * units::MILLIVOLT,
            -65.0 * units::MILLIVOLT,
            Some(2.0 * units::MILLISECOND),
        )
        .unwrap();
        let system = synthesize(&two_compartments(vec![lif], vec![])).unwrap();
        assert_eq!(system.threshold.as_ref().unwrap().to_string(), "V_soma > V_th");
        assert_eq!(system.reset[0].to_string(), "V_soma = V_reset");
        assert_eq!(system.refractory, Some(2.0 * units::MILLISECOND));
        assert!(text(&system, "V_soma").ends_with("(unless refractory)"));
        assert!(!text(&system, "V_dend").contains("unless"));
    }

    #[test]
    fn test_receptor_is_qualified_and_exposed() {
        let nmda = Receptor::nmda("L1", 1.0 * units::NANOSIEMENS, 60.0 * units::MILLISECOND);
        let system = synthesize(&two_compartments(vec![], vec![nmda])).unwrap();
        assert!(text(&system, "V_dend").contains("- I_NMDA_L1_dend"));
        assert_eq!(
            text(&system, "s_NMDA_L1_dend"),
            "ds_NMDA_L1_dend/dt = -s_NMDA_L1_dend / tau_NMDA : 1"
        );
        let point = &system.events["NMDA_L1_dend"];
        assert_eq!(point.pre, "L1");
        assert_eq!(point.delivery[0].to_string(), "s_NMDA_L1_dend += 1");
        for name in ["E_NMDA", "Mg", "alpha_NMDA", "beta_NMDA", "gamma_NMDA", "g_NMDA"] {
            assert!(system.namespace.contains_key(name), "missing {}", name);
        }
        assert!(!system.namespace.contains_key("E_GABA"));
    }

    #[test]
    fn test_differing_parameters_are_qualified() {
        let ampa = |g: f64| Receptor::ampa("L1", g * units::NANOSIEMENS, 2.0 * units::MILLISECOND);
        let mut g = two_compartments(vec![], vec![ampa(1.0)]);
        g.add_compartment(
            CompartmentSpec::new(
                "apical",
                CompartmentKind::Dendrite,
                Geometry::point(),
                passive(50.0, 2.0),
                vec![],
                vec![ampa(3.0)],
            )
            .unwrap(),
        )
        .unwrap();
        g.connect("dend", "apical", Coupling::Resistance(50.0 * units::MEGAOHM)).unwrap();
        let system = synthesize(&g).unwrap();
        assert!(system.namespace.contains_key("g_AMPA_L1_dend"));
        assert!(system.namespace.contains_key("g_AMPA_L1_apical"));
        assert!(system.namespace.contains_key("tau_AMPA"));
        assert_eq!(system.namespace["C_apical"], system.namespace["C_dend"]);
        assert!(text(&system, "I_AMPA_L1_apical").contains("g_AMPA_L1_apical"));
    }

    #[test]
    fn test_always_qualify_policy() {
        let g = two_compartments(vec![], vec![]);
        let system = EquationSynthesizer::new(&g, &ModelProperties::default(), &IonicDefaults::default())
            .policy(NamespacePolicy::AlwaysQualify)
            .synthesize()
            .unwrap();
        assert!(system.namespace.contains_key("E_L_soma"));
        assert!(system.namespace.contains_key("E_L_dend"));
        assert!(!system.namespace.contains_key("E_L"));
    }

    #[test]
    fn test_unknown_reference() {
        let m = Mechanism::new("drift")
            .with_equations("I_d = g_d * (V - E_d) : amp")
            .unwrap()
            .with_current("I_d")
            .with_param("g_d", 1.0 * units::NANOSIEMENS);
        let err = synthesize(&two_compartments(vec![m], vec![])).unwrap_err();
        assert!(matches!(err, ModelError::UnknownReference { ref name, .. } if name == "E_d"));
    }

    #[test]
    fn test_unresolvable_unit() {
        let m = Mechanism::new("bad")
            .with_equations("I_b = g_b * V + V : amp")
            .unwrap()
            .with_current("I_b")
            .with_param("g_b", 1.0 * units::NANOSIEMENS);
        let err = synthesize(&two_compartments(vec![m], vec![])).unwrap_err();
        assert!(matches!(err, ModelError::UnresolvableUnit { .. }));
    }

    #[test]
    fn test_extra_equation_cannot_shadow() {
        let g = two_compartments(vec![], vec![]);
        let extra = crate::equation::parse_equations("V_soma : volt").unwrap();
        let err = EquationSynthesizer::new(&g, &ModelProperties::default(), &IonicDefaults::default())
            .extra_equations(extra)
            .synthesize()
            .unwrap_err();
        assert_eq!(err, ModelError::NameCollision("V_soma".into()));
    }

    #[test]
    fn test_reset_cannot_assign_parameter() {
        let m = Mechanism::leaky_if(-50.0 * units::MILLIVOLT, -65.0 * units::MILLIVOLT, None)
            .unwrap()
            .with_spike_generator(crate::mechanism::SpikeGenerator::new("V > V_th", "V_th = V").unwrap());
        let err = synthesize(&two_compartments(vec![m], vec![])).unwrap_err();
        assert!(matches!(err, ModelError::InvalidEquation { .. }));
    }

    #[test]
    fn test_generated_names_stay_distinct() {
        assert_eq!(
            CompartmentSpec::dendrite("a_b", Geometry::point(), passive(10.0, 1.0)).unwrap_err(),
            ModelError::SeparatorInName("a_b".into())
        );

        // edges a->bc and ab->c would collide if '_' were allowed inside names
        let mut g = two_compartments(vec![], vec![]);
        for name in ["a", "bc", "ab", "c"] {
            g.add_compartment(CompartmentSpec::dendrite(name, Geometry::point(), passive(10.0, 1.0)).unwrap())
                .unwrap();
        }
        g.connect("dend", "a", Coupling::Resistance(10.0 * units::MEGAOHM)).unwrap();
        g.connect("a", "bc", Coupling::Resistance(20.0 * units::MEGAOHM)).unwrap();
        g.connect("soma", "ab", Coupling::Resistance(30.0 * units::MEGAOHM)).unwrap();
        g.connect("ab", "c", Coupling::Resistance(40.0 * units::MEGAOHM)).unwrap();
        let system = synthesize(&g).unwrap();

        let names: BTreeSet<_> = system.axial_currents.iter().map(|a| a.variable.clone()).collect();
        assert_eq!(names.len(), system.axial_currents.len());
        assert!(names.contains("I_axial_bc_a") && names.contains("I_axial_c_ab"));
        assert!(text(&system, "I_axial_a_bc").contains("(20 * Mohm)"));
        assert!(text(&system, "I_axial_ab_c").contains("(40 * Mohm)"));
    }
}
