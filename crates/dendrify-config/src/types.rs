// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions mirroring `dendrify.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DendrifyConfig {
    pub model: ModelConfig,
    pub namespace: NamespaceConfig,
    pub ionic: IonicConfig,
    pub population: PopulationConfig,
    pub logging: LoggingConfig,
}

/// Model-wide passive defaults
///
/// When set, these replace the per-compartment values of every compartment
/// that has a geometry (specific values are scaled by membrane area).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Specific membrane capacitance, e.g. `"1 uF/cm**2"`
    pub cm: Option<String>,
    /// Specific leak conductance, e.g. `"0.04 mS/cm**2"`
    pub gl: Option<String>,
    /// Axial resistivity, e.g. `"150 ohm*cm"`
    pub r_axial: Option<String>,
    /// Resting potential, e.g. `"-70 mV"`
    pub v_rest: Option<String>,
    pub scale_factor: Option<f64>,
    pub spine_factor: Option<f64>,
}

/// Parameter namespace merging
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// `share_identical` or `always_qualify`
    pub policy: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            policy: "share_identical".to_string(),
        }
    }
}

/// Reversal potentials and NMDA magnesium-block constants
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IonicConfig {
    pub e_ampa: String,
    pub e_nmda: String,
    pub e_gaba: String,
    pub e_na: String,
    pub e_k: String,
    pub e_ca: String,
    pub mg: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Default for IonicConfig {
    fn default() -> Self {
        Self {
            e_ampa: "0 mV".to_string(),
            e_nmda: "0 mV".to_string(),
            e_gaba: "-80 mV".to_string(),
            e_na: "70 mV".to_string(),
            e_k: "-89 mV".to_string(),
            e_ca: "136 mV".to_string(),
            mg: 1.0,
            alpha: 0.062,
            beta: 3.57,
            gamma: 0.0,
        }
    }
}

impl IonicConfig {
    /// Reversal potential fields as `(name, value)` pairs
    pub fn reversal_potentials(&self) -> [(&'static str, &str); 6] {
        [
            ("e_ampa", self.e_ampa.as_str()),
            ("e_nmda", self.e_nmda.as_str()),
            ("e_gaba", self.e_gaba.as_str()),
            ("e_na", self.e_na.as_str()),
            ("e_k", self.e_k.as_str()),
            ("e_ca", self.e_ca.as_str()),
        ]
    }
}

/// Options forwarded to the simulator when a population is created
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Integration method name, passed through unchanged
    pub method: Option<String>,
    /// Integration time step, e.g. `"0.1 ms"`
    pub dt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Base directory for log files (file-logging builds only)
    pub log_dir: Option<PathBuf>,
    /// Crates logged at debug level regardless of `level`
    pub debug_crates: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            debug_crates: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg: DendrifyConfig = toml::from_str(
            r#"
            [model]
            cm = "1 uF/cm**2"

            [ionic]
            e_gaba = "-75 mV"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.model.cm.as_deref(), Some("1 uF/cm**2"));
        assert_eq!(cfg.model.gl, None);
        assert_eq!(cfg.ionic.e_gaba, "-75 mV");
        assert_eq!(cfg.ionic.e_k, "-89 mV");
        assert_eq!(cfg.namespace.policy, "share_identical");
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_json_roundtrip_of_defaults() {
        let cfg = DendrifyConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: DendrifyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
