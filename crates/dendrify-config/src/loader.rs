// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Every overridable setting has one key, used verbatim by CLI overrides and
//! upper-cased behind a `DENDRIFY_` prefix by environment overrides
//! (`v_rest` / `DENDRIFY_V_REST`). Values that fail to parse as numbers are
//! ignored with a warning; quantity strings are stored as given and checked
//! by [`crate::validate_config`].

use crate::{ConfigError, ConfigResult, DendrifyConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "dendrify.toml";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "DENDRIFY_CONFIG_PATH";

/// Keys accepted by [`apply_cli_overrides`] and, prefixed, by
/// [`apply_environment_overrides`]
pub const OVERRIDE_KEYS: &[&str] = &[
    "cm",
    "gl",
    "r_axial",
    "v_rest",
    "scale_factor",
    "spine_factor",
    "namespace_policy",
    "e_ampa",
    "e_nmda",
    "e_gaba",
    "e_na",
    "e_k",
    "e_ca",
    "mg",
    "method",
    "dt",
    "log_level",
    "log_dir",
];

/// Find the dendrify configuration file
///
/// Search order:
/// 1. `DENDRIFY_CONFIG_PATH` environment variable
/// 2. Current working directory: `./dendrify.toml`
/// 3. Parent directory: `../dendrify.toml`
/// 4. Workspace root (searches up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent.to_path_buf();
                }
                None => break,
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from a TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the file is not found or contains invalid TOML. Call
/// [`crate::validate_config`] to check the values themselves.
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<DendrifyConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    debug!(target: "dendrify-config", "Loading configuration from {}", config_file.display());

    let content = fs::read_to_string(&config_file)?;
    let mut config: DendrifyConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Apply `DENDRIFY_<KEY>` environment variables for every key in [`OVERRIDE_KEYS`]
pub fn apply_environment_overrides(config: &mut DendrifyConfig) {
    for key in OVERRIDE_KEYS {
        let var = format!("DENDRIFY_{}", key.to_uppercase());
        if let Ok(value) = env::var(&var) {
            apply_override(config, key, &value, &var);
        }
    }
}

/// Apply CLI argument overrides
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Map of override keys to values (e.g., `{"v_rest": "-65 mV", "dt": "0.05 ms"}`)
pub fn apply_cli_overrides(config: &mut DendrifyConfig, cli_args: &HashMap<String, String>) {
    for key in OVERRIDE_KEYS {
        if let Some(value) = cli_args.get(*key) {
            apply_override(config, key, value, "command line");
        }
    }
    for key in cli_args.keys() {
        if !OVERRIDE_KEYS.contains(&key.as_str()) {
            warn!(target: "dendrify-config", "Ignoring unknown configuration override '{}'", key);
        }
    }
}

fn apply_override(config: &mut DendrifyConfig, key: &str, value: &str, source: &str) {
    let number = || match value.trim().parse::<f64>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(
                target: "dendrify-config",
                "Ignoring {} override for '{}': '{}' is not a number",
                source, key, value
            );
            None
        }
    };
    let text = value.to_string();

    match key {
        "cm" => config.model.cm = Some(text),
        "gl" => config.model.gl = Some(text),
        "r_axial" => config.model.r_axial = Some(text),
        "v_rest" => config.model.v_rest = Some(text),
        "scale_factor" => {
            if let Some(n) = number() {
                config.model.scale_factor = Some(n);
            }
        }
        "spine_factor" => {
            if let Some(n) = number() {
                config.model.spine_factor = Some(n);
            }
        }
        "namespace_policy" => config.namespace.policy = text,
        "e_ampa" => config.ionic.e_ampa = text,
        "e_nmda" => config.ionic.e_nmda = text,
        "e_gaba" => config.ionic.e_gaba = text,
        "e_na" => config.ionic.e_na = text,
        "e_k" => config.ionic.e_k = text,
        "e_ca" => config.ionic.e_ca = text,
        "mg" => {
            if let Some(n) = number() {
                config.ionic.mg = n;
            }
        }
        "method" => config.population.method = Some(text),
        "dt" => config.population.dt = Some(text),
        "log_level" => config.logging.level = text,
        "log_dir" => config.logging.log_dir = Some(PathBuf::from(text)),
        _ => return,
    }
    debug!(target: "dendrify-config", "Override {} = '{}' ({})", key, value, source);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom.toml");
        File::create(&config_path).unwrap();

        env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing_file() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();

        env::set_var(CONFIG_PATH_ENV, dir.path().join("absent.toml"));
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let saved_v_rest = env::var("DENDRIFY_V_REST").ok();
        env::remove_var("DENDRIFY_V_REST");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[model]").unwrap();
        writeln!(file, "v_rest = \"-65 mV\"").unwrap();
        writeln!(file, "spine_factor = 1.5").unwrap();
        writeln!(file, "[namespace]").unwrap();
        writeln!(file, "policy = \"always_qualify\"").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.model.v_rest.as_deref(), Some("-65 mV"));
        assert_eq!(config.model.spine_factor, Some(1.5));
        assert_eq!(config.namespace.policy, "always_qualify");

        if let Some(value) = saved_v_rest {
            env::set_var("DENDRIFY_V_REST", value);
        }
    }

    #[test]
    fn test_malformed_toml() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[model\ncm = ").unwrap();
        assert!(matches!(
            load_config(Some(&config_path), None),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = DendrifyConfig::default();

        env::set_var("DENDRIFY_GL", "0.05 mS/cm**2");
        env::set_var("DENDRIFY_SCALE_FACTOR", "2.5");
        env::set_var("DENDRIFY_MG", "not-a-number");

        apply_environment_overrides(&mut config);

        env::remove_var("DENDRIFY_GL");
        env::remove_var("DENDRIFY_SCALE_FACTOR");
        env::remove_var("DENDRIFY_MG");

        assert_eq!(config.model.gl.as_deref(), Some("0.05 mS/cm**2"));
        assert_eq!(config.model.scale_factor, Some(2.5));
        assert_eq!(config.ionic.mg, 1.0);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = DendrifyConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("dt".to_string(), "0.05 ms".to_string());
        cli_args.insert("log_level".to_string(), "debug".to_string());
        cli_args.insert("unknown".to_string(), "x".to_string());

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.population.dt.as_deref(), Some("0.05 ms"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[model]").unwrap();
        writeln!(file, "v_rest = \"-70 mV\"").unwrap();
        writeln!(file, "cm = \"1 uF/cm**2\"").unwrap();

        env::set_var("DENDRIFY_V_REST", "-65 mV");
        env::set_var("DENDRIFY_CM", "0.9 uF/cm**2");

        let mut cli_args = HashMap::new();
        cli_args.insert("v_rest".to_string(), "-60 mV".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("DENDRIFY_V_REST");
        env::remove_var("DENDRIFY_CM");

        // CLI wins for v_rest, env wins for cm (no CLI override)
        assert_eq!(config.model.v_rest.as_deref(), Some("-60 mV"));
        assert_eq!(config.model.cm.as_deref(), Some("0.9 uF/cm**2"));
    }
}
