// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Bridge from `dendrify.toml` settings to model-compiler inputs
//!
//! Every function validates before converting, so a bad quantity string or
//! an unknown policy fails here with the offending field named.

use dendrify_config::{
    parse_quantity, validate_config, ConfigError, ConfigResult, DendrifyConfig, IonicConfig, ModelConfig,
    PopulationConfig,
};
use dendrify_model::{IonicDefaults, ModelError, ModelProperties, NamespacePolicy, NeuronModelBuilder, PopulationOptions};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type SetupResult<T> = Result<T, SetupError>;

/// Model-wide passive defaults from `[model]`
pub fn model_properties(config: &ModelConfig) -> ConfigResult<ModelProperties> {
    let quantity = |field: &str, value: &Option<String>| {
        value
            .as_deref()
            .map(|text| parse_quantity(field, text))
            .transpose()
    };
    Ok(ModelProperties {
        cm: quantity("model.cm", &config.cm)?,
        gl: quantity("model.gl", &config.gl)?,
        r_axial: quantity("model.r_axial", &config.r_axial)?,
        v_rest: quantity("model.v_rest", &config.v_rest)?,
        scale_factor: config.scale_factor,
        spine_factor: config.spine_factor,
    })
}

/// Reversal potentials and NMDA constants from `[ionic]`
pub fn ionic_defaults(config: &IonicConfig) -> ConfigResult<IonicDefaults> {
    Ok(IonicDefaults {
        e_ampa: parse_quantity("ionic.e_ampa", &config.e_ampa)?,
        e_nmda: parse_quantity("ionic.e_nmda", &config.e_nmda)?,
        e_gaba: parse_quantity("ionic.e_gaba", &config.e_gaba)?,
        e_na: parse_quantity("ionic.e_na", &config.e_na)?,
        e_k: parse_quantity("ionic.e_k", &config.e_k)?,
        e_ca: parse_quantity("ionic.e_ca", &config.e_ca)?,
        mg: config.mg,
        alpha: config.alpha,
        beta: config.beta,
        gamma: config.gamma,
    })
}

/// Simulator options from `[population]`
pub fn population_options(config: &PopulationConfig) -> ConfigResult<PopulationOptions> {
    let mut options = PopulationOptions::new();
    if let Some(method) = &config.method {
        options = options.method(method.clone());
    }
    if let Some(dt) = &config.dt {
        options = options.dt(parse_quantity("population.dt", dt)?);
    }
    Ok(options)
}

/// A builder preloaded with the configured defaults, ionic constants and
/// namespace policy
pub fn builder_from_config(
    name: impl Into<String>,
    size: usize,
    config: &DendrifyConfig,
) -> SetupResult<NeuronModelBuilder> {
    validate_config(config)?;
    let policy: NamespacePolicy = config.namespace.policy.parse()?;
    let builder = NeuronModelBuilder::new(name, size)
        .model_properties(model_properties(&config.model)?)
        .ionic_defaults(ionic_defaults(&config.ionic)?)
        .namespace_policy(policy);
    debug!(target: "dendrify", "Builder configured with namespace policy {}", policy);
    Ok(builder)
}

/// Install console logging from `[logging]` plus process debug flags
#[cfg(feature = "observability")]
pub fn init_logging_from_config(config: &DendrifyConfig) -> ConfigResult<()> {
    let mut flags = dendrify_observability::parse_debug_flags();
    for crate_name in &config.logging.debug_crates {
        flags.enable(crate_name);
    }
    dendrify_observability::init_logging(&flags, &config.logging.level.to_lowercase())
        .map_err(|e| ConfigError::InvalidValue {
            field: "logging".to_string(),
            reason: format!("{:#}", e),
        })
}

/// Console logging plus a run folder under `log_dir`; keep the guard alive
/// for as long as logs should be written
#[cfg(feature = "file-logging")]
pub fn init_file_logging_from_config(
    config: &DendrifyConfig,
    log_dir: Option<std::path::PathBuf>,
) -> ConfigResult<dendrify_observability::LoggingGuard> {
    let mut flags = dendrify_observability::parse_debug_flags();
    for crate_name in &config.logging.debug_crates {
        flags.enable(crate_name);
    }
    dendrify_observability::init_file_logging(&flags, &config.logging.level.to_lowercase(), log_dir, None, None)
        .map_err(|e| ConfigError::InvalidValue {
            field: "logging".to_string(),
            reason: format!("{:#}", e),
        })
}
