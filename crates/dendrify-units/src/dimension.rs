// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! SI dimensions as exponent vectors
//!
//! A [`Dimension`] stores the exponent of each of the seven SI base
//! dimensions, in the order metre, kilogram, second, ampere, kelvin, mole,
//! candela. Products and quotients of quantities add and subtract exponents.

use core::fmt;
use core::ops::{Div, Mul};

/// Number of SI base dimensions
pub const BASE_COUNT: usize = 7;

/// Exponents of the SI base dimensions (m, kg, s, A, K, mol, cd)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Dimension(pub [i8; BASE_COUNT]);

impl Dimension {
    pub const DIMENSIONLESS: Dimension = Dimension([0, 0, 0, 0, 0, 0, 0]);
    pub const LENGTH: Dimension = Dimension([1, 0, 0, 0, 0, 0, 0]);
    pub const MASS: Dimension = Dimension([0, 1, 0, 0, 0, 0, 0]);
    pub const TIME: Dimension = Dimension([0, 0, 1, 0, 0, 0, 0]);
    pub const CURRENT: Dimension = Dimension([0, 0, 0, 1, 0, 0, 0]);
    pub const TEMPERATURE: Dimension = Dimension([0, 0, 0, 0, 1, 0, 0]);
    pub const AMOUNT: Dimension = Dimension([0, 0, 0, 0, 0, 1, 0]);
    pub const LUMINOSITY: Dimension = Dimension([0, 0, 0, 0, 0, 0, 1]);

    pub const AREA: Dimension = Dimension([2, 0, 0, 0, 0, 0, 0]);
    pub const FREQUENCY: Dimension = Dimension([0, 0, -1, 0, 0, 0, 0]);
    pub const CHARGE: Dimension = Dimension([0, 0, 1, 1, 0, 0, 0]);
    pub const VOLTAGE: Dimension = Dimension([2, 1, -3, -1, 0, 0, 0]);
    pub const RESISTANCE: Dimension = Dimension([2, 1, -3, -2, 0, 0, 0]);
    pub const CONDUCTANCE: Dimension = Dimension([-2, -1, 3, 2, 0, 0, 0]);
    pub const CAPACITANCE: Dimension = Dimension([-2, -1, 4, 2, 0, 0, 0]);
    pub const ENERGY: Dimension = Dimension([2, 1, -2, 0, 0, 0, 0]);
    pub const POWER: Dimension = Dimension([2, 1, -3, 0, 0, 0, 0]);
    pub const FORCE: Dimension = Dimension([1, 1, -2, 0, 0, 0, 0]);
    pub const CONCENTRATION: Dimension = Dimension([-3, 0, 0, 0, 0, 1, 0]);

    /// Capacitance per membrane area (F/m^2)
    pub const SPECIFIC_CAPACITANCE: Dimension = Dimension([-4, -1, 4, 2, 0, 0, 0]);
    /// Conductance per membrane area (S/m^2)
    pub const SPECIFIC_CONDUCTANCE: Dimension = Dimension([-4, -1, 3, 2, 0, 0, 0]);
    /// Resistivity (ohm*m)
    pub const RESISTIVITY: Dimension = Dimension([3, 1, -3, -2, 0, 0, 0]);

    /// Boolean-valued variables carry no dimension; kept as an alias so
    /// call sites read naturally.
    pub const BOOLEAN: Dimension = Dimension::DIMENSIONLESS;

    pub const fn new(exponents: [i8; BASE_COUNT]) -> Self {
        Self(exponents)
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|&e| e == 0)
    }

    pub fn exponents(&self) -> &[i8; BASE_COUNT] {
        &self.0
    }

    /// Raise to an integer power
    pub fn powi(self, power: i8) -> Self {
        let mut out = self.0;
        for e in out.iter_mut() {
            *e *= power;
        }
        Dimension(out)
    }

    pub fn recip(self) -> Self {
        self.powi(-1)
    }

    /// Integer root, if every exponent divides evenly
    pub fn root(self, degree: i8) -> Option<Self> {
        if degree == 0 {
            return None;
        }
        let mut out = self.0;
        for e in out.iter_mut() {
            if *e % degree != 0 {
                return None;
            }
            *e /= degree;
        }
        Some(Dimension(out))
    }
}

impl Mul for Dimension {
    type Output = Dimension;

    fn mul(self, rhs: Dimension) -> Dimension {
        let mut out = self.0;
        for (e, r) in out.iter_mut().zip(rhs.0.iter()) {
            *e += *r;
        }
        Dimension(out)
    }
}

impl Div for Dimension {
    type Output = Dimension;

    fn div(self, rhs: Dimension) -> Dimension {
        self * rhs.recip()
    }
}

/// Named coherent SI units used when printing a dimension
pub(crate) const NAMED: &[(&str, Dimension)] = &[
    ("V", Dimension::VOLTAGE),
    ("A", Dimension::CURRENT),
    ("S", Dimension::CONDUCTANCE),
    ("F", Dimension::CAPACITANCE),
    ("ohm", Dimension::RESISTANCE),
    ("s", Dimension::TIME),
    ("Hz", Dimension::FREQUENCY),
    ("C", Dimension::CHARGE),
    ("J", Dimension::ENERGY),
    ("W", Dimension::POWER),
    ("N", Dimension::FORCE),
    ("kg", Dimension::MASS),
    ("K", Dimension::TEMPERATURE),
    ("mol", Dimension::AMOUNT),
    ("cd", Dimension::LUMINOSITY),
];

const BASE_SYMBOLS: [&str; BASE_COUNT] = ["m", "kg", "s", "A", "K", "mol", "cd"];

impl fmt::Display for Dimension {
    /// Prints the dimension as a parseable unit expression, preferring a
    /// named unit optionally divided or multiplied by a power of metre
    /// (`F/m^2`, `ohm*m`), and falling back to base units.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "1");
        }
        for length_power in [0i8, -1, -2, -3, 1, 2, 3] {
            let rest = *self / Dimension::LENGTH.powi(length_power);
            if let Some((symbol, _)) = NAMED.iter().find(|(_, d)| *d == rest) {
                return match length_power {
                    0 => write!(f, "{}", symbol),
                    1 => write!(f, "{}*m", symbol),
                    p if p > 1 => write!(f, "{}*m^{}", symbol, p),
                    -1 => write!(f, "{}/m", symbol),
                    p => write!(f, "{}/m^{}", symbol, -p),
                };
            }
        }
        if *self == Dimension::LENGTH {
            return write!(f, "m");
        }
        let mut first = true;
        for (symbol, exp) in BASE_SYMBOLS.iter().zip(self.0.iter()) {
            if *exp == 0 {
                continue;
            }
            if !first {
                write!(f, "*")?;
            }
            first = false;
            if *exp == 1 {
                write!(f, "{}", symbol)?;
            } else {
                write!(f, "{}^{}", symbol, exp)?;
            }
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Dimension {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Dimension {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <std::string::String as serde::Deserialize>::deserialize(deserializer)?;
        crate::parse::parse_unit(&text)
            .map(|(_, dim)| dim)
            .map_err(serde::de::Error::custom)
    }
}
