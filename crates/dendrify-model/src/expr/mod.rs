// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! # Equation Language
//!
//! A small expression language in the style of population-based simulators:
//!
//! ```text
//! dV/dt = (g_L * (E_L - V) + I) / C : volt
//! I_Na = g_Na * (V - E_Na) : amp
//! V > V_th and allow_spike
//! V = V_reset; w += b
//! ```
//!
//! Expressions are parsed once into [`Expr`] trees. Namespacing is done by
//! renaming identifiers on the tree, never by string substitution, so a
//! local `V` is rewritten to `V_soma` without touching `V_th`.

pub mod infer;
pub mod lexer;
pub mod parser;

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

pub use infer::{infer, Scope, Ty};
pub use parser::{parse_expr, parse_statements};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "**",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }

    pub(crate) fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::Eq
            | BinaryOp::Ne => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div => 6,
            BinaryOp::Pow => 8,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }
}

const NOT_PRECEDENCE: u8 = 3;
const NEG_PRECEDENCE: u8 = 7;
const ATOM_PRECEDENCE: u8 = 9;

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Bool(bool),
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        function: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Expr {
        Expr::Ident(name.into())
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn div(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Div, lhs, rhs)
    }

    pub fn neg(operand: Expr) -> Expr {
        Expr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(operand),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(v) if *v < 0.0 => NEG_PRECEDENCE,
            Expr::Number(_) | Expr::Bool(_) | Expr::Ident(_) | Expr::Call { .. } => ATOM_PRECEDENCE,
            Expr::Unary { op: UnaryOp::Neg, .. } => NEG_PRECEDENCE,
            Expr::Unary { op: UnaryOp::Not, .. } => NOT_PRECEDENCE,
            Expr::Binary { op, .. } => op.precedence(),
        }
    }

    /// Every identifier referenced by the expression (function names excluded)
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Ident(name) => {
                out.insert(name.clone());
            }
            Expr::Unary { operand, .. } => operand.collect_identifiers(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_identifiers(out);
                rhs.collect_identifiers(out);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_identifiers(out);
                }
            }
            Expr::Number(_) | Expr::Bool(_) => {}
        }
    }

    /// Rename identifiers found in `map`; others are left untouched
    pub fn rename(&self, map: &BTreeMap<String, String>) -> Expr {
        match self {
            Expr::Ident(name) => match map.get(name) {
                Some(new_name) => Expr::Ident(new_name.clone()),
                None => self.clone(),
            },
            Expr::Unary { op, operand } => Expr::Unary {
                op: *op,
                operand: Box::new(operand.rename(map)),
            },
            Expr::Binary { op, lhs, rhs } => Expr::Binary {
                op: *op,
                lhs: Box::new(lhs.rename(map)),
                rhs: Box::new(rhs.rename(map)),
            },
            Expr::Call { function, args } => Expr::Call {
                function: function.clone(),
                args: args.iter().map(|a| a.rename(map)).collect(),
            },
            Expr::Number(_) | Expr::Bool(_) => self.clone(),
        }
    }

    /// Express a sum of terms `±k * X` or `±k * X / D` as a coefficient map
    /// keyed by `(X, D)`, where `D` is an identifier or a literal quantity
    /// such as `50 * Mohm`, printed.
    ///
    /// Returns `None` for anything non-linear. Used to check that axial
    /// currents cancel pairwise.
    pub fn linearize(&self) -> Option<BTreeMap<(String, Option<String>), f64>> {
        let mut out = BTreeMap::new();
        self.linearize_into(1.0, None, &mut out)?;
        out.retain(|_, coeff| *coeff != 0.0);
        Some(out)
    }

    fn linearize_into(
        &self,
        scale: f64,
        divisor: Option<&str>,
        out: &mut BTreeMap<(String, Option<String>), f64>,
    ) -> Option<()> {
        match self {
            Expr::Ident(name) => {
                *out
                    .entry((name.clone(), divisor.map(str::to_string)))
                    .or_insert(0.0) += scale;
                Some(())
            }
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => operand.linearize_into(-scale, divisor, out),
            Expr::Binary { op, lhs, rhs } => match (op, lhs.as_ref(), rhs.as_ref()) {
                (BinaryOp::Add, _, _) => {
                    lhs.linearize_into(scale, divisor, out)?;
                    rhs.linearize_into(scale, divisor, out)
                }
                (BinaryOp::Sub, _, _) => {
                    lhs.linearize_into(scale, divisor, out)?;
                    rhs.linearize_into(-scale, divisor, out)
                }
                (BinaryOp::Mul, Expr::Number(k), other) | (BinaryOp::Mul, other, Expr::Number(k)) => {
                    other.linearize_into(scale * k, divisor, out)
                }
                (BinaryOp::Div, numerator, denominator) if divisor.is_none() && denominator.is_factor() => {
                    let key = denominator.to_string();
                    numerator.linearize_into(scale, Some(key.as_str()), out)
                }
                (BinaryOp::Div, numerator, Expr::Number(k)) => {
                    numerator.linearize_into(scale / k, divisor, out)
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// An identifier, or a number times an identifier
    fn is_factor(&self) -> bool {
        match self {
            Expr::Ident(_) => true,
            Expr::Binary {
                op: BinaryOp::Mul,
                lhs,
                rhs,
            } => matches!((lhs.as_ref(), rhs.as_ref()), (Expr::Number(_), Expr::Ident(_))),
            _ => false,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, parent: u8, strict: bool) -> fmt::Result {
        let own = self.precedence();
        if own < parent || (strict && own == parent) {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

pub(crate) fn format_number(value: f64) -> String {
    let abs = value.abs();
    if value == 0.0 || (1e-4..1e15).contains(&abs) {
        format!("{}", value)
    } else {
        format!("{:e}", value)
    }
}

impl fmt::Display for Expr {
    /// Prints with the minimum parentheses needed to preserve structure
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(v) => write!(f, "{}", format_number(*v)),
            Expr::Bool(true) => write!(f, "True"),
            Expr::Bool(false) => write!(f, "False"),
            Expr::Ident(name) => write!(f, "{}", name),
            Expr::Unary { op: UnaryOp::Neg, operand } => {
                write!(f, "-")?;
                operand.fmt_child(f, NEG_PRECEDENCE, false)
            }
            Expr::Unary { op: UnaryOp::Not, operand } => {
                write!(f, "not ")?;
                operand.fmt_child(f, NOT_PRECEDENCE, false)
            }
            Expr::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                // ** is right-associative; - and / and comparisons are not associative
                let (strict_lhs, strict_rhs) = match op {
                    BinaryOp::Pow => (true, false),
                    BinaryOp::Sub | BinaryOp::Div => (false, true),
                    op if op.is_comparison() => (true, true),
                    _ => (false, false),
                };
                lhs.fmt_child(f, prec, strict_lhs)?;
                write!(f, " {} ", op.symbol())?;
                rhs.fmt_child(f, prec, strict_rhs)
            }
            Expr::Call { function, args } => {
                write!(f, "{}(", function)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl serde::Serialize for Expr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Assignment operator of a [`Statement`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    fn symbol(self) -> &'static str {
        match self {
            AssignOp::Set => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
        }
    }
}

/// `target op value`, as used in resets, event actions and synaptic delivery
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub target: String,
    pub op: AssignOp,
    pub value: Expr,
}

impl Statement {
    pub fn new(target: impl Into<String>, op: AssignOp, value: Expr) -> Self {
        Self {
            target: target.into(),
            op,
            value,
        }
    }

    pub fn rename(&self, map: &BTreeMap<String, String>) -> Statement {
        Statement {
            target: map.get(&self.target).cloned().unwrap_or_else(|| self.target.clone()),
            op: self.op,
            value: self.value.rename(map),
        }
    }

    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut out = self.value.identifiers();
        out.insert(self.target.clone());
        out
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.target, self.op.symbol(), self.value)
    }
}

impl serde::Serialize for Statement {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Join statements the way a simulator's code block expects them
pub fn join_statements(statements: &[Statement]) -> String {
    statements
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
