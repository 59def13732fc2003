// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Unit and quantity text parsing
//!
//! Accepts the unit spellings used in equation declarations and config
//! files: short symbols with SI prefixes (`mV`, `nS`, `pF`, `um`, `Mohm`),
//! long names (`volt`, `mvolt`, `siemens`, `metre`), products, quotients and
//! integer powers (`uF/cm**2`, `ohm*cm`, `m^-2`). `1` is dimensionless.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit0, digit1, multispace0, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::fold_many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::dimension::Dimension;
use crate::error::{UnitError, UnitResult};

/// Base units: spellings, scale to SI, dimension
const BASE_UNITS: &[(&[&str], f64, Dimension)] = &[
    (&["V", "volt"], 1.0, Dimension::VOLTAGE),
    (&["A", "amp", "ampere"], 1.0, Dimension::CURRENT),
    (&["S", "siemens"], 1.0, Dimension::CONDUCTANCE),
    (&["F", "farad"], 1.0, Dimension::CAPACITANCE),
    (&["ohm", "Ω", "Ohm"], 1.0, Dimension::RESISTANCE),
    (&["s", "second"], 1.0, Dimension::TIME),
    (&["m", "metre", "meter"], 1.0, Dimension::LENGTH),
    (&["g", "gram"], 1e-3, Dimension::MASS),
    (&["Hz", "hertz"], 1.0, Dimension::FREQUENCY),
    (&["C", "coulomb"], 1.0, Dimension::CHARGE),
    (&["J", "joule"], 1.0, Dimension::ENERGY),
    (&["W", "watt"], 1.0, Dimension::POWER),
    (&["N", "newton"], 1.0, Dimension::FORCE),
    (&["K", "kelvin"], 1.0, Dimension::TEMPERATURE),
    (&["mol", "mole"], 1.0, Dimension::AMOUNT),
    (&["M", "molar"], 1e3, Dimension::CONCENTRATION),
    (&["cd", "candela"], 1.0, Dimension::LUMINOSITY),
];

const PREFIXES: &[(&str, f64)] = &[
    ("f", 1e-15),
    ("p", 1e-12),
    ("n", 1e-9),
    ("u", 1e-6),
    ("µ", 1e-6),
    ("m", 1e-3),
    ("c", 1e-2),
    ("d", 1e-1),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
];

fn lookup_base(name: &str) -> Option<(f64, Dimension)> {
    BASE_UNITS
        .iter()
        .find(|(names, _, _)| names.contains(&name))
        .map(|(_, scale, dim)| (*scale, *dim))
}

/// Resolve a single unit name, with or without an SI prefix
pub fn lookup_unit(name: &str) -> UnitResult<(f64, Dimension)> {
    if let Some(found) = lookup_base(name) {
        return Ok(found);
    }
    if name == "kg" {
        return Ok((1.0, Dimension::MASS));
    }
    for (prefix, factor) in PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            if rest.is_empty() {
                continue;
            }
            if let Some((scale, dim)) = lookup_base(rest) {
                return Ok((factor * scale, dim));
            }
        }
    }
    Err(UnitError::UnknownUnit(name.to_string()))
}

/// Parsed unit expression; names are resolved only when evaluated
#[derive(Debug, Clone, PartialEq)]
enum UnitExpr<'a> {
    One,
    Name(&'a str),
    Product(Box<UnitExpr<'a>>, Box<UnitExpr<'a>>),
    Quotient(Box<UnitExpr<'a>>, Box<UnitExpr<'a>>),
    Power(Box<UnitExpr<'a>>, i8),
}

impl UnitExpr<'_> {
    fn eval(&self) -> UnitResult<(f64, Dimension)> {
        Ok(match self {
            UnitExpr::One => (1.0, Dimension::DIMENSIONLESS),
            UnitExpr::Name(name) => lookup_unit(name)?,
            UnitExpr::Product(left, right) => {
                let ((ls, ld), (rs, rd)) = (left.eval()?, right.eval()?);
                (ls * rs, ld * rd)
            }
            UnitExpr::Quotient(left, right) => {
                let ((ls, ld), (rs, rd)) = (left.eval()?, right.eval()?);
                (ls / rs, ld / rd)
            }
            UnitExpr::Power(base, exp) => {
                let (scale, dim) = base.eval()?;
                (scale.powi(*exp as i32), dim.powi(*exp))
            }
        })
    }
}

fn unit_expr(input: &str) -> IResult<&str, UnitExpr<'_>> {
    let (input, first) = unit_power(input)?;
    fold_many0(
        pair(delimited(multispace0, one_of("*/"), multispace0), unit_power),
        move || first.clone(),
        |acc, (op, rhs)| match op {
            '*' => UnitExpr::Product(Box::new(acc), Box::new(rhs)),
            _ => UnitExpr::Quotient(Box::new(acc), Box::new(rhs)),
        },
    )(input)
}

fn unit_power(input: &str) -> IResult<&str, UnitExpr<'_>> {
    map(
        pair(
            unit_atom,
            opt(preceded(delimited(multispace0, alt((tag("**"), tag("^"))), multispace0), exponent)),
        ),
        |(base, exp)| match exp {
            Some(exp) => UnitExpr::Power(Box::new(base), exp),
            None => base,
        },
    )(input)
}

fn exponent(input: &str) -> IResult<&str, i8> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |text: &str| text.parse::<i8>())(input)
}

fn unit_atom(input: &str) -> IResult<&str, UnitExpr<'_>> {
    alt((
        delimited(pair(char('('), multispace0), unit_expr, pair(multispace0, char(')'))),
        value(UnitExpr::One, char('1')),
        map(take_while1(|c: char| c.is_alphabetic()), UnitExpr::Name),
    ))(input)
}

/// Signed decimal literal with optional exponent: `-70`, `.5`, `2.5e-3`
fn number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            alt((
                recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                recognize(pair(char('.'), digit1)),
            )),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |text: &str| text.parse::<f64>(),
    )(input)
}

fn parse_failure(input: &str, err: nom::Err<nom::error::Error<&str>>) -> UnitError {
    let reason = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) if e.input.is_empty() => "unexpected end of unit".to_string(),
        nom::Err::Error(e) | nom::Err::Failure(e) => format!("unexpected input at '{}'", e.input),
        nom::Err::Incomplete(_) => "incomplete unit".to_string(),
    };
    UnitError::Parse {
        input: input.to_string(),
        reason,
    }
}

/// Parse a unit expression into (scale to SI, dimension)
pub fn parse_unit(input: &str) -> UnitResult<(f64, Dimension)> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok((1.0, Dimension::DIMENSIONLESS));
    }
    let (_, tree) = all_consuming(unit_expr)(trimmed).map_err(|e| parse_failure(input, e))?;
    tree.eval()
}

/// Split `"-70 mV"` / `"2.5e-3*second"` into the numeric part and the unit part
pub(crate) fn split_quantity(input: &str) -> UnitResult<(f64, &str)> {
    let (unit, (value, ..)) = tuple((number, multispace0, opt(char('*')), multispace0))(input.trim())
        .map_err(|_: nom::Err<nom::error::Error<&str>>| UnitError::Parse {
            input: input.to_string(),
            reason: "missing numeric value".to_string(),
        })?;
    Ok((value, unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * a.abs().max(b.abs())
    }

    #[test]
    fn test_prefixed_units() {
        let (scale, dim) = parse_unit("mV").unwrap();
        assert!(close(scale, 1e-3));
        assert_eq!(dim, Dimension::VOLTAGE);

        let (scale, dim) = parse_unit("Mohm").unwrap();
        assert!(close(scale, 1e6));
        assert_eq!(dim, Dimension::RESISTANCE);

        let (scale, dim) = parse_unit("um").unwrap();
        assert!(close(scale, 1e-6));
        assert_eq!(dim, Dimension::LENGTH);
    }

    #[test]
    fn test_compound_units() {
        let (scale, dim) = parse_unit("uF/cm**2").unwrap();
        assert!(close(scale, 1e-2));
        assert_eq!(dim, Dimension::SPECIFIC_CAPACITANCE);

        let (scale, dim) = parse_unit("ohm*cm").unwrap();
        assert!(close(scale, 1e-2));
        assert_eq!(dim, Dimension::RESISTIVITY);

        let (_, dim) = parse_unit("m^2*kg*s^-4*A^-1").unwrap();
        assert_eq!(dim, Dimension::VOLTAGE / Dimension::TIME);
    }

    #[test]
    fn test_dimensionless() {
        assert_eq!(parse_unit("1").unwrap().1, Dimension::DIMENSIONLESS);
        assert_eq!(parse_unit("").unwrap().1, Dimension::DIMENSIONLESS);
    }

    #[test]
    fn test_unknown_unit() {
        assert!(matches!(parse_unit("furlong"), Err(UnitError::UnknownUnit(_))));
    }

    #[test]
    fn test_split_quantity() {
        assert_eq!(split_quantity("-70 mV").unwrap(), (-70.0, "mV"));
        assert_eq!(split_quantity("2.5e-3*second").unwrap(), (2.5e-3, "second"));
        assert_eq!(split_quantity("0.062").unwrap(), (0.062, ""));
        assert_eq!(split_quantity("2 * Mohm").unwrap(), (2.0, "Mohm"));
        assert_eq!(split_quantity(".5 ms").unwrap(), (0.5, "ms"));
        assert!(split_quantity("mV").is_err());
    }

    #[test]
    fn test_grouping_and_spacing() {
        let (scale, dim) = parse_unit("mV / (ms * ms)").unwrap();
        assert!(close(scale, 1e3));
        assert_eq!(dim, Dimension::VOLTAGE / Dimension::TIME.powi(2));

        let (scale, dim) = parse_unit("1/ms").unwrap();
        assert!(close(scale, 1e3));
        assert_eq!(dim, Dimension::FREQUENCY);
    }

    #[test]
    fn test_malformed_units() {
        for bad in ["(mV", "mV)", "m^x", "mV *", "2mV", "m^200"] {
            assert!(matches!(parse_unit(bad), Err(UnitError::Parse { .. })), "{}", bad);
        }
        assert_eq!(
            parse_unit("mV/"),
            Err(UnitError::Parse {
                input: "mV/".into(),
                reason: "unexpected input at '/'".into()
            })
        );
    }
}
