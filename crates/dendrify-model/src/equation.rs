// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Equation declarations
//!
//! One declaration per line, in one of three forms:
//!
//! ```text
//! dX/dt = expr : unit (flags)   differential
//! X = expr : unit               algebraic
//! X : unit                      declared (set externally or by events)
//! ```
//!
//! `unit` is any unit expression understood by `dendrify-units`, or
//! `boolean`. Lines starting with `#` are ignored.

use core::fmt;
use std::collections::BTreeMap;

use dendrify_units::{parse_unit, Dimension};

use crate::error::{check_identifier, ModelError, ModelResult};
use crate::expr::{infer, parse_expr, Expr, Scope, Ty};

/// Right-hand side of an equation
#[derive(Debug, Clone, PartialEq)]
pub enum EquationKind {
    Differential(Expr),
    Algebraic(Expr),
    Declared,
}

/// A single equation of the synthesized system
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub variable: String,
    pub kind: EquationKind,
    pub ty: Ty,
    pub flags: Vec<String>,
}

impl Equation {
    pub fn differential(variable: impl Into<String>, rhs: Expr, dimension: Dimension) -> Self {
        Self {
            variable: variable.into(),
            kind: EquationKind::Differential(rhs),
            ty: Ty::Quantity(dimension),
            flags: Vec::new(),
        }
    }

    pub fn algebraic(variable: impl Into<String>, rhs: Expr, ty: Ty) -> Self {
        Self {
            variable: variable.into(),
            kind: EquationKind::Algebraic(rhs),
            ty,
            flags: Vec::new(),
        }
    }

    pub fn declared(variable: impl Into<String>, ty: Ty) -> Self {
        Self {
            variable: variable.into(),
            kind: EquationKind::Declared,
            ty,
            flags: Vec::new(),
        }
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    pub fn rhs(&self) -> Option<&Expr> {
        match &self.kind {
            EquationKind::Differential(e) | EquationKind::Algebraic(e) => Some(e),
            EquationKind::Declared => None,
        }
    }

    pub fn is_differential(&self) -> bool {
        matches!(self.kind, EquationKind::Differential(_))
    }

    /// Rename the defined variable and every identifier on the right-hand side
    pub fn rename(&self, map: &BTreeMap<String, String>) -> Equation {
        let kind = match &self.kind {
            EquationKind::Differential(e) => EquationKind::Differential(e.rename(map)),
            EquationKind::Algebraic(e) => EquationKind::Algebraic(e.rename(map)),
            EquationKind::Declared => EquationKind::Declared,
        };
        Equation {
            variable: map.get(&self.variable).cloned().unwrap_or_else(|| self.variable.clone()),
            kind,
            ty: self.ty,
            flags: self.flags.clone(),
        }
    }

    /// Check that the right-hand side has the dimension the declaration states
    pub fn check(&self, scope: &dyn Scope) -> ModelResult<()> {
        let context = self.to_string();
        let expected = match (&self.kind, self.ty) {
            (EquationKind::Declared, _) => return Ok(()),
            (EquationKind::Differential(_), Ty::Quantity(d)) => Ty::Quantity(d / Dimension::TIME),
            (EquationKind::Differential(_), Ty::Boolean) => {
                return Err(ModelError::UnresolvableUnit {
                    equation: context,
                    detail: "a differential equation cannot be boolean".to_string(),
                })
            }
            (EquationKind::Algebraic(_), ty) => ty,
        };
        let rhs = self.rhs().ok_or_else(|| ModelError::InvalidEquation {
            source_text: context.clone(),
            reason: "missing right-hand side".to_string(),
        })?;
        let actual = infer(rhs, scope, &context)?;
        if actual == expected {
            Ok(())
        } else {
            Err(ModelError::UnresolvableUnit {
                equation: context,
                detail: format!("right-hand side has dimension {}, expected {}", actual, expected),
            })
        }
    }
}

/// Long unit name as written in equation declarations
pub fn unit_name(ty: Ty) -> String {
    const LONG: &[(&str, Dimension)] = &[
        ("volt", Dimension::VOLTAGE),
        ("amp", Dimension::CURRENT),
        ("siemens", Dimension::CONDUCTANCE),
        ("farad", Dimension::CAPACITANCE),
        ("ohm", Dimension::RESISTANCE),
        ("second", Dimension::TIME),
        ("hertz", Dimension::FREQUENCY),
        ("metre", Dimension::LENGTH),
        ("coulomb", Dimension::CHARGE),
        ("mole", Dimension::AMOUNT),
    ];
    const BASE: [&str; 7] = ["metre", "kilogram", "second", "amp", "kelvin", "mole", "candela"];

    let dim = match ty {
        Ty::Boolean => return "boolean".to_string(),
        Ty::Quantity(d) if d.is_dimensionless() => return "1".to_string(),
        Ty::Quantity(d) => d,
    };
    if let Some((name, _)) = LONG.iter().find(|(_, d)| *d == dim) {
        return (*name).to_string();
    }
    let mut numerator = Vec::new();
    let mut denominator = Vec::new();
    for (name, exp) in BASE.iter().zip(dim.exponents().iter()) {
        let target = if *exp > 0 { &mut numerator } else { &mut denominator };
        match exp.abs() {
            0 => {}
            1 => target.push((*name).to_string()),
            n => target.push(format!("{}**{}", name, n)),
        }
    }
    let num = if numerator.is_empty() {
        "1".to_string()
    } else {
        numerator.join("*")
    };
    match denominator.len() {
        0 => num,
        1 => format!("{}/{}", num, denominator[0]),
        _ => format!("{}/({})", num, denominator.join("*")),
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EquationKind::Differential(rhs) => {
                write!(f, "d{}/dt = {} : {}", self.variable, rhs, unit_name(self.ty))?
            }
            EquationKind::Algebraic(rhs) => {
                write!(f, "{} = {} : {}", self.variable, rhs, unit_name(self.ty))?
            }
            EquationKind::Declared => write!(f, "{} : {}", self.variable, unit_name(self.ty))?,
        }
        if !self.flags.is_empty() {
            write!(f, " ({})", self.flags.join(", "))?;
        }
        Ok(())
    }
}

impl serde::Serialize for Equation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Position of the assignment `=` (not part of `==`, `<=`, `>=`, `!=`)
fn assignment_position(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len()).find(|&i| {
        bytes[i] == b'='
            && (i == 0 || !matches!(bytes[i - 1], b'=' | b'<' | b'>' | b'!'))
            && bytes.get(i + 1) != Some(&b'=')
    })
}

fn parse_type(text: &str, line: &str) -> ModelResult<Ty> {
    if text == "boolean" {
        return Ok(Ty::Boolean);
    }
    let (scale, dim) = parse_unit(text).map_err(|e| ModelError::InvalidEquation {
        source_text: line.to_string(),
        reason: e.to_string(),
    })?;
    if scale != 1.0 {
        return Err(ModelError::InvalidEquation {
            source_text: line.to_string(),
            reason: format!("declared unit '{}' must be a coherent SI unit", text),
        });
    }
    Ok(Ty::Quantity(dim))
}

/// Parse one declaration line
pub fn parse_equation(line: &str) -> ModelResult<Equation> {
    let invalid = |reason: &str| ModelError::InvalidEquation {
        source_text: line.to_string(),
        reason: reason.to_string(),
    };

    let colon = line.rfind(':').ok_or_else(|| invalid("missing ': unit'"))?;
    let (body, unit_part) = (line[..colon].trim(), line[colon + 1..].trim());

    let (unit_text, flags) = match unit_part.find('(') {
        Some(open) => {
            let close = unit_part.rfind(')').ok_or_else(|| invalid("unclosed flag list"))?;
            if close < open || !unit_part[close + 1..].trim().is_empty() {
                return Err(invalid("malformed flag list"));
            }
            let flags = unit_part[open + 1..close]
                .split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
            (unit_part[..open].trim(), flags)
        }
        None => (unit_part, Vec::new()),
    };
    let ty = parse_type(unit_text, line)?;

    let (lhs, rhs) = match assignment_position(body) {
        Some(pos) => (body[..pos].trim(), Some(body[pos + 1..].trim())),
        None => (body, None),
    };

    let (variable, differential) = match lhs.strip_prefix('d').and_then(|s| s.strip_suffix("/dt")) {
        Some(var) if rhs.is_some() => (var.trim(), true),
        _ => (lhs, false),
    };
    check_identifier(variable).map_err(|_| invalid("left-hand side must be a variable name"))?;

    let kind = match rhs {
        Some(text) if differential => EquationKind::Differential(parse_expr(text)?),
        Some(text) => EquationKind::Algebraic(parse_expr(text)?),
        None => EquationKind::Declared,
    };
    Ok(Equation {
        variable: variable.to_string(),
        kind,
        ty,
        flags,
    })
}

/// Parse a block of declarations, one per line
pub fn parse_equations(text: &str) -> ModelResult<Vec<Equation>> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(parse_equation)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_forms() {
        let eqs = parse_equations(
            "dw/dt = (a*(V - E_L) - w) / tau_w : amp\n\
             I_w = w : amp\n\
             # comment\n\
             allow_I_Na : boolean",
        )
        .unwrap();
        assert_eq!(eqs.len(), 3);
        assert!(eqs[0].is_differential());
        assert_eq!(eqs[0].variable, "w");
        assert_eq!(eqs[1].ty, Ty::Quantity(Dimension::CURRENT));
        assert_eq!(eqs[2].kind, EquationKind::Declared);
        assert_eq!(eqs[2].ty, Ty::Boolean);
    }

    #[test]
    fn test_flags_and_display() {
        let eq = parse_equation("dV/dt = (E_L - V) / tau : volt (unless refractory)").unwrap();
        assert_eq!(eq.flags, vec!["unless refractory"]);
        assert_eq!(eq.to_string(), "dV/dt = (E_L - V) / tau : volt (unless refractory)");
    }

    #[test]
    fn test_comparison_is_not_assignment() {
        let eq = parse_equation("spiking = V >= V_th : boolean").unwrap();
        assert_eq!(eq.variable, "spiking");
        assert_eq!(eq.rhs().unwrap().to_string(), "V >= V_th");
    }

    #[test]
    fn test_rejects_bad_lines() {
        assert!(parse_equation("dV/dt = -V / tau").is_err());
        assert!(parse_equation("3x = V : volt").is_err());
        assert!(parse_equation("x = V : mV").is_err());
        assert!(parse_equation("x = V : furlong").is_err());
    }

    #[test]
    fn test_unit_names() {
        assert_eq!(unit_name(Ty::Quantity(Dimension::VOLTAGE)), "volt");
        assert_eq!(unit_name(Ty::DIMENSIONLESS), "1");
        assert_eq!(
            unit_name(Ty::Quantity(Dimension::SPECIFIC_CAPACITANCE)),
            "second**4*amp**2/(metre**4*kilogram)"
        );
    }

    #[test]
    fn test_check_dimensions() {
        let mut scope = BTreeMap::new();
        scope.insert("V".to_string(), Ty::Quantity(Dimension::VOLTAGE));
        scope.insert("E_L".to_string(), Ty::Quantity(Dimension::VOLTAGE));
        scope.insert("tau".to_string(), Ty::Quantity(Dimension::TIME));
        let ok = parse_equation("dV/dt = (E_L - V) / tau : volt").unwrap();
        assert!(ok.check(&scope).is_ok());
        let bad = parse_equation("dV/dt = E_L - V : volt").unwrap();
        assert!(matches!(bad.check(&scope), Err(ModelError::UnresolvableUnit { .. })));
    }
}
