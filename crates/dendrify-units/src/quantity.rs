// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Quantities: an SI magnitude paired with a [`Dimension`]

use core::cmp::Ordering;
use core::fmt;
use core::ops::{Div, Mul, Neg};
use core::str::FromStr;

use crate::dimension::Dimension;
use crate::error::{UnitError, UnitResult};
use crate::parse::{parse_unit, split_quantity};

/// A physical quantity stored in coherent SI units
///
/// Multiplication and division always succeed and combine dimensions.
/// Addition, subtraction and comparison require equal dimensions and are
/// exposed as checked operations returning [`UnitError`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    value: f64,
    dimension: Dimension,
}

impl Quantity {
    /// Construct from a magnitude already expressed in SI units
    pub const fn new(value: f64, dimension: Dimension) -> Self {
        Self { value, dimension }
    }

    /// Dimensionless scalar
    pub const fn scalar(value: f64) -> Self {
        Self::new(value, Dimension::DIMENSIONLESS)
    }

    /// Construct from a magnitude and a unit expression (`"mV"`, `"uF/cm**2"`)
    pub fn with_unit(value: f64, unit: &str) -> UnitResult<Self> {
        let (scale, dimension) = parse_unit(unit)?;
        Ok(Self::new(value * scale, dimension))
    }

    /// Magnitude in SI units
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension.is_dimensionless()
    }

    pub fn same_dimension(&self, other: &Quantity) -> bool {
        self.dimension == other.dimension
    }

    /// Fail unless this quantity has the expected dimension
    pub fn expect_dimension(&self, expected: Dimension, role: &str) -> UnitResult<()> {
        if self.dimension == expected {
            Ok(())
        } else {
            Err(UnitError::UnexpectedDimension {
                role: role.to_string(),
                expected,
                actual: self.dimension,
            })
        }
    }

    pub fn checked_add(self, rhs: Quantity) -> UnitResult<Quantity> {
        self.require_same(&rhs, "addition")?;
        Ok(Quantity::new(self.value + rhs.value, self.dimension))
    }

    pub fn checked_sub(self, rhs: Quantity) -> UnitResult<Quantity> {
        self.require_same(&rhs, "subtraction")?;
        Ok(Quantity::new(self.value - rhs.value, self.dimension))
    }

    pub fn checked_cmp(&self, rhs: &Quantity) -> UnitResult<Option<Ordering>> {
        self.require_same(rhs, "comparison")?;
        Ok(self.value.partial_cmp(&rhs.value))
    }

    pub fn powi(self, power: i8) -> Quantity {
        Quantity::new(self.value.powi(power as i32), self.dimension.powi(power))
    }

    pub fn recip(self) -> Quantity {
        Quantity::new(1.0 / self.value, self.dimension.recip())
    }

    /// Magnitude expressed in another unit of the same dimension
    pub fn in_unit(&self, unit: &str) -> UnitResult<f64> {
        let (scale, dimension) = parse_unit(unit)?;
        self.require_same(&Quantity::new(scale, dimension), "conversion")?;
        Ok(self.value / scale)
    }

    fn require_same(&self, rhs: &Quantity, operation: &'static str) -> UnitResult<()> {
        if self.dimension == rhs.dimension {
            Ok(())
        } else {
            Err(UnitError::DimensionMismatch {
                operation,
                left: self.dimension,
                right: rhs.dimension,
            })
        }
    }
}

impl Mul for Quantity {
    type Output = Quantity;

    fn mul(self, rhs: Quantity) -> Quantity {
        Quantity::new(self.value * rhs.value, self.dimension * rhs.dimension)
    }
}

impl Div for Quantity {
    type Output = Quantity;

    fn div(self, rhs: Quantity) -> Quantity {
        Quantity::new(self.value / rhs.value, self.dimension / rhs.dimension)
    }
}

impl Mul<f64> for Quantity {
    type Output = Quantity;

    fn mul(self, rhs: f64) -> Quantity {
        Quantity::new(self.value * rhs, self.dimension)
    }
}

impl Mul<Quantity> for f64 {
    type Output = Quantity;

    fn mul(self, rhs: Quantity) -> Quantity {
        Quantity::new(self * rhs.value, rhs.dimension)
    }
}

impl Div<f64> for Quantity {
    type Output = Quantity;

    fn div(self, rhs: f64) -> Quantity {
        Quantity::new(self.value / rhs, self.dimension)
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Quantity {
        Quantity::new(-self.value, self.dimension)
    }
}

const DISPLAY_PREFIXES: &[(&str, f64)] = &[
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("", 1.0),
    ("m", 1e-3),
    ("u", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
];

const PREFIXABLE: &[&str] = &["V", "A", "S", "F", "ohm", "s", "C", "m"];

pub(crate) fn format_number(x: f64) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    let abs = x.abs();
    if (1e-3..1e6).contains(&abs) {
        let text = format!("{:.9}", x);
        let text = text.trim_end_matches('0').trim_end_matches('.');
        text.to_string()
    } else {
        format!("{:e}", x)
    }
}

impl fmt::Display for Quantity {
    /// `-70 mV`, `200 pF`, `0.01 F/m^2`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.dimension.to_string();
        if self.dimension.is_dimensionless() {
            return write!(f, "{}", format_number(self.value));
        }
        if PREFIXABLE.contains(&unit.as_str()) && self.value != 0.0 {
            let abs = self.value.abs();
            let (prefix, factor) = DISPLAY_PREFIXES
                .iter()
                .find(|(_, factor)| abs >= *factor * (1.0 - 1e-12))
                .copied()
                .unwrap_or(("f", 1e-15));
            return write!(f, "{} {}{}", format_number(self.value / factor), prefix, unit);
        }
        write!(f, "{} {}", format_number(self.value), unit)
    }
}

impl FromStr for Quantity {
    type Err = UnitError;

    /// Parse `"-70 mV"`, `"1 uF/cm**2"`, `"0.062"`
    fn from_str(s: &str) -> UnitResult<Self> {
        let (number, unit) = split_quantity(s)?;
        Quantity::with_unit(number, unit)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Quantity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Quantity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <std::string::String as serde::Deserialize>::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::*;

    #[test]
    fn test_products_combine_dimensions() {
        let current = 10.0 * NANOSIEMENS * (20.0 * MILLIVOLT);
        assert_eq!(current.dimension(), Dimension::CURRENT);
        assert!((current.value() - 2e-10).abs() < 1e-22);

        let tau = 200.0 * PICOFARAD / (10.0 * NANOSIEMENS);
        assert_eq!(tau.dimension(), Dimension::TIME);
        assert!((tau.value() - 0.02).abs() < 1e-15);
    }

    #[test]
    fn test_checked_add_rejects_mismatch() {
        let v = -70.0 * MILLIVOLT;
        assert!(v.checked_add(5.0 * MILLIVOLT).is_ok());
        let err = v.checked_add(1.0 * NANOAMP).unwrap_err();
        assert!(matches!(err, UnitError::DimensionMismatch { operation: "addition", .. }));
    }

    #[test]
    fn test_display() {
        assert_eq!((-70.0 * MILLIVOLT).to_string(), "-70 mV");
        assert_eq!((200.0 * PICOFARAD).to_string(), "200 pF");
        assert_eq!((50.0 * MEGAOHM).to_string(), "50 Mohm");
        assert_eq!(Quantity::scalar(0.062).to_string(), "0.062");
    }

    #[test]
    fn test_parse() {
        let q: Quantity = "-70 mV".parse().unwrap();
        assert!(q.same_dimension(&MILLIVOLT));
        assert!((q.value() + 0.07).abs() < 1e-15);

        let cm: Quantity = "1 uF/cm**2".parse().unwrap();
        assert_eq!(cm.dimension(), Dimension::SPECIFIC_CAPACITANCE);
        assert!((cm.value() - 0.01).abs() < 1e-15);
    }

    #[test]
    fn test_in_unit() {
        let q = 0.5 * SECOND;
        assert!((q.in_unit("ms").unwrap() - 500.0).abs() < 1e-9);
        assert!(q.in_unit("mV").is_err());
    }

    #[test]
    fn test_serde_text_form() {
        let q = 2.0 * NANOSIEMENS;
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(json, "\"2 nS\"");
        let back: Quantity = serde_json::from_str(&json).unwrap();
        assert!((back.value() - q.value()).abs() < 1e-21);
        assert_eq!(back.dimension(), q.dimension());
    }
}
