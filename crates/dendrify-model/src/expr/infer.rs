// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Dimension inference over expression trees
//!
//! Every identifier is resolved through a [`Scope`]. Names the scope does
//! not know are tried as unit names (`mV`, `ms`, `nS`) so expressions such as
//! `V/mV` or `0*amp` type-check the way simulators expect.

use std::collections::BTreeMap;

use dendrify_units::{lookup_unit, Dimension};

use super::{BinaryOp, Expr, UnaryOp};
use crate::error::{ModelError, ModelResult};

/// Type of an expression: a physical dimension or a boolean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ty {
    Quantity(Dimension),
    Boolean,
}

impl Ty {
    pub const DIMENSIONLESS: Ty = Ty::Quantity(Dimension::DIMENSIONLESS);

    pub fn dimension(&self) -> Option<Dimension> {
        match self {
            Ty::Quantity(d) => Some(*d),
            Ty::Boolean => None,
        }
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ty::Quantity(d) => write!(f, "{}", d),
            Ty::Boolean => write!(f, "boolean"),
        }
    }
}

/// Name resolution for inference
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<Ty>;
}

impl Scope for BTreeMap<String, Ty> {
    fn lookup(&self, name: &str) -> Option<Ty> {
        self.get(name).copied()
    }
}

struct Inference<'a> {
    scope: &'a dyn Scope,
    context: &'a str,
}

impl Inference<'_> {
    fn unresolvable(&self, detail: String) -> ModelError {
        ModelError::UnresolvableUnit {
            equation: self.context.to_string(),
            detail,
        }
    }

    fn quantity(&self, ty: Ty, what: &Expr) -> ModelResult<Dimension> {
        ty.dimension()
            .ok_or_else(|| self.unresolvable(format!("'{}' is boolean, expected a quantity", what)))
    }

    fn boolean(&self, ty: Ty, what: &Expr) -> ModelResult<()> {
        match ty {
            Ty::Boolean => Ok(()),
            Ty::Quantity(d) => Err(self.unresolvable(format!(
                "'{}' has dimension {}, expected a boolean",
                what, d
            ))),
        }
    }

    fn same(&self, lhs: &Expr, l: Dimension, rhs: &Expr, r: Dimension) -> ModelResult<Dimension> {
        if l == r {
            Ok(l)
        } else {
            Err(self.unresolvable(format!(
                "'{}' ({}) and '{}' ({}) have incompatible dimensions",
                lhs, l, rhs, r
            )))
        }
    }

    fn infer(&self, expr: &Expr) -> ModelResult<Ty> {
        match expr {
            Expr::Number(_) => Ok(Ty::DIMENSIONLESS),
            Expr::Bool(_) => Ok(Ty::Boolean),
            Expr::Ident(name) => {
                if let Some(ty) = self.scope.lookup(name) {
                    return Ok(ty);
                }
                match lookup_unit(name) {
                    Ok((_, dim)) => Ok(Ty::Quantity(dim)),
                    Err(_) => Err(ModelError::UnknownReference {
                        name: name.clone(),
                        context: self.context.to_string(),
                    }),
                }
            }
            Expr::Unary { op, operand } => {
                let ty = self.infer(operand)?;
                match op {
                    UnaryOp::Neg => Ok(Ty::Quantity(self.quantity(ty, operand)?)),
                    UnaryOp::Not => {
                        self.boolean(ty, operand)?;
                        Ok(Ty::Boolean)
                    }
                }
            }
            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),
            Expr::Call { function, args } => self.call(function, args),
        }
    }

    fn binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> ModelResult<Ty> {
        let lt = self.infer(lhs)?;
        let rt = self.infer(rhs)?;
        match op {
            BinaryOp::And | BinaryOp::Or => {
                self.boolean(lt, lhs)?;
                self.boolean(rt, rhs)?;
                Ok(Ty::Boolean)
            }
            BinaryOp::Eq | BinaryOp::Ne if lt == Ty::Boolean && rt == Ty::Boolean => Ok(Ty::Boolean),
            op if op.is_comparison() => {
                let l = self.quantity(lt, lhs)?;
                let r = self.quantity(rt, rhs)?;
                self.same(lhs, l, rhs, r)?;
                Ok(Ty::Boolean)
            }
            BinaryOp::Add | BinaryOp::Sub => {
                let l = self.quantity(lt, lhs)?;
                let r = self.quantity(rt, rhs)?;
                Ok(Ty::Quantity(self.same(lhs, l, rhs, r)?))
            }
            BinaryOp::Mul => {
                let l = self.quantity(lt, lhs)?;
                let r = self.quantity(rt, rhs)?;
                Ok(Ty::Quantity(l * r))
            }
            BinaryOp::Div => {
                let l = self.quantity(lt, lhs)?;
                let r = self.quantity(rt, rhs)?;
                Ok(Ty::Quantity(l / r))
            }
            BinaryOp::Pow => {
                let base = self.quantity(lt, lhs)?;
                let exponent = self.quantity(rt, rhs)?;
                if !exponent.is_dimensionless() {
                    return Err(self.unresolvable(format!("exponent '{}' must be dimensionless", rhs)));
                }
                if base.is_dimensionless() {
                    return Ok(Ty::DIMENSIONLESS);
                }
                match integer_literal(rhs) {
                    Some(power) => Ok(Ty::Quantity(base.powi(power))),
                    None => Err(self.unresolvable(format!(
                        "'{}' has dimension {}; it can only be raised to an integer literal",
                        lhs, base
                    ))),
                }
            }
            _ => Err(self.unresolvable(format!("unsupported operator in '{} {:?} {}'", lhs, op, rhs))),
        }
    }

    fn call(&self, function: &str, args: &[Expr]) -> ModelResult<Ty> {
        let arity = |n: usize| -> ModelResult<()> {
            if args.len() == n {
                Ok(())
            } else {
                Err(self.unresolvable(format!(
                    "{}() takes {} argument(s), got {}",
                    function,
                    n,
                    args.len()
                )))
            }
        };
        match function {
            "exp" | "log" | "log10" | "sin" | "cos" | "tan" | "sinh" | "cosh" | "tanh" => {
                arity(1)?;
                let d = self.quantity(self.infer(&args[0])?, &args[0])?;
                if !d.is_dimensionless() {
                    return Err(self.unresolvable(format!(
                        "argument of {}() must be dimensionless, '{}' has dimension {}",
                        function, args[0], d
                    )));
                }
                Ok(Ty::DIMENSIONLESS)
            }
            "sqrt" => {
                arity(1)?;
                let d = self.quantity(self.infer(&args[0])?, &args[0])?;
                d.root(2).map(Ty::Quantity).ok_or_else(|| {
                    self.unresolvable(format!("cannot take the square root of dimension {}", d))
                })
            }
            "abs" => {
                arity(1)?;
                Ok(Ty::Quantity(self.quantity(self.infer(&args[0])?, &args[0])?))
            }
            "int" => {
                arity(1)?;
                self.infer(&args[0])?;
                Ok(Ty::DIMENSIONLESS)
            }
            "clip" => {
                arity(3)?;
                let x = self.quantity(self.infer(&args[0])?, &args[0])?;
                for bound in &args[1..] {
                    let b = self.quantity(self.infer(bound)?, bound)?;
                    self.same(&args[0], x, bound, b)?;
                }
                Ok(Ty::Quantity(x))
            }
            other => Err(ModelError::UnknownReference {
                name: format!("{}()", other),
                context: self.context.to_string(),
            }),
        }
    }
}

fn integer_literal(expr: &Expr) -> Option<i8> {
    let value = match expr {
        Expr::Number(v) => *v,
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => match operand.as_ref() {
            Expr::Number(v) => -*v,
            _ => return None,
        },
        _ => return None,
    };
    if value.fract() == 0.0 && value.abs() <= i8::MAX as f64 {
        Some(value as i8)
    } else {
        None
    }
}

/// Infer the type of `expr`; `context` names the owning equation in errors
pub fn infer(expr: &Expr, scope: &dyn Scope, context: &str) -> ModelResult<Ty> {
    Inference { scope, context }.infer(expr)
}
