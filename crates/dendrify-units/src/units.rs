// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Unit constants
//!
//! Multiply a magnitude by a constant to build a quantity:
//! `-70.0 * MILLIVOLT`, `200.0 * PICOFARAD`.

use crate::dimension::Dimension;
use crate::quantity::Quantity;

pub const ONE: Quantity = Quantity::new(1.0, Dimension::DIMENSIONLESS);

pub const VOLT: Quantity = Quantity::new(1.0, Dimension::VOLTAGE);
pub const MILLIVOLT: Quantity = Quantity::new(1e-3, Dimension::VOLTAGE);

pub const AMP: Quantity = Quantity::new(1.0, Dimension::CURRENT);
pub const NANOAMP: Quantity = Quantity::new(1e-9, Dimension::CURRENT);
pub const PICOAMP: Quantity = Quantity::new(1e-12, Dimension::CURRENT);

pub const SIEMENS: Quantity = Quantity::new(1.0, Dimension::CONDUCTANCE);
pub const MILLISIEMENS: Quantity = Quantity::new(1e-3, Dimension::CONDUCTANCE);
pub const NANOSIEMENS: Quantity = Quantity::new(1e-9, Dimension::CONDUCTANCE);

pub const FARAD: Quantity = Quantity::new(1.0, Dimension::CAPACITANCE);
pub const MICROFARAD: Quantity = Quantity::new(1e-6, Dimension::CAPACITANCE);
pub const PICOFARAD: Quantity = Quantity::new(1e-12, Dimension::CAPACITANCE);

pub const OHM: Quantity = Quantity::new(1.0, Dimension::RESISTANCE);
pub const KILOOHM: Quantity = Quantity::new(1e3, Dimension::RESISTANCE);
pub const MEGAOHM: Quantity = Quantity::new(1e6, Dimension::RESISTANCE);

pub const SECOND: Quantity = Quantity::new(1.0, Dimension::TIME);
pub const MILLISECOND: Quantity = Quantity::new(1e-3, Dimension::TIME);

pub const HERTZ: Quantity = Quantity::new(1.0, Dimension::FREQUENCY);

pub const METRE: Quantity = Quantity::new(1.0, Dimension::LENGTH);
pub const CENTIMETRE: Quantity = Quantity::new(1e-2, Dimension::LENGTH);
pub const MICROMETRE: Quantity = Quantity::new(1e-6, Dimension::LENGTH);

/// 1 uF/cm^2
pub const MICROFARAD_PER_CM2: Quantity = Quantity::new(1e-2, Dimension::SPECIFIC_CAPACITANCE);
/// 1 mS/cm^2
pub const MILLISIEMENS_PER_CM2: Quantity = Quantity::new(10.0, Dimension::SPECIFIC_CONDUCTANCE);
/// 1 S/m^2
pub const SIEMENS_PER_M2: Quantity = Quantity::new(1.0, Dimension::SPECIFIC_CONDUCTANCE);
/// 1 ohm*cm
pub const OHM_CM: Quantity = Quantity::new(1e-2, Dimension::RESISTIVITY);
