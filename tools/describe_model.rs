// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

/*!
Model Description Tool

Compiles one of the built-in morphologies with the settings of
`dendrify.toml` (plus environment and `--set` overrides) and prints the
resulting model descriptor.

Usage:
  cargo run --features cli --bin dendrify-describe -- [PRESET] [--config <path>] [--json]

Example:
  cargo run --features cli --bin dendrify-describe -- pyramidal --set v_rest="-65 mV" --debug dendrify-model
*/

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use dendrify::config::{apply_cli_overrides, apply_environment_overrides, find_config_file, load_config, DendrifyConfig};
use dendrify::observability::KNOWN_CRATES;
use dendrify::prelude::*;
use dendrify::setup::{init_logging_from_config, population_options};
use dendrify::units::units;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// Single leaky integrate-and-fire soma
    Point,
    /// Soma plus one apical dendrite with AMPA/NMDA input
    BallAndStick,
    /// Adaptive soma, two apical segments with Na dendritic spikes, one basal segment
    Pyramidal,
}

#[derive(Parser, Debug)]
#[command(name = "dendrify-describe", version, about = "Compile a built-in morphology and print its model descriptor")]
struct Args {
    /// Morphology to compile
    #[arg(value_enum, default_value_t = Preset::BallAndStick)]
    preset: Preset,

    /// Path to dendrify.toml (searched for when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Population size
    #[arg(short = 'n', long, default_value_t = 1)]
    size: usize,

    /// Print the descriptor as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Configuration override, e.g. `--set dt="0.05 ms"` (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Enable debug logging for a crate, or `all` (repeatable)
    #[arg(long = "debug", value_name = "CRATE")]
    debug: Vec<String>,

    /// Also write logs to a timestamped run folder under this directory
    #[cfg(feature = "file-logging")]
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut cli_args = HashMap::new();
    for item in &args.overrides {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| format!("override '{}' is not KEY=VALUE", item))?;
        cli_args.insert(key.trim().to_string(), value.trim().trim_matches('"').to_string());
    }

    let mut config = match (&args.config, find_config_file()) {
        (Some(path), _) => load_config(Some(path.as_path()), Some(&cli_args))?,
        (None, Ok(path)) => load_config(Some(path.as_path()), Some(&cli_args))?,
        (None, Err(_)) => {
            let mut config = DendrifyConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, &cli_args);
            config
        }
    };

    for crate_name in &args.debug {
        if crate_name == "all" {
            config
                .logging
                .debug_crates
                .extend(KNOWN_CRATES.iter().map(|c| c.to_string()));
        } else {
            config.logging.debug_crates.push(crate_name.clone());
        }
    }
    #[cfg(feature = "file-logging")]
    let _log_guard = match &args.log_dir {
        Some(dir) => Some(dendrify::setup::init_file_logging_from_config(&config, Some(dir.clone()))?),
        None => {
            init_logging_from_config(&config)?;
            None
        }
    };
    #[cfg(not(feature = "file-logging"))]
    init_logging_from_config(&config)?;

    if !matches!(args.preset, Preset::Point) {
        config.model.cm.get_or_insert_with(|| "1 uF/cm**2".to_string());
        config.model.gl.get_or_insert_with(|| "0.04 mS/cm**2".to_string());
        config.model.r_axial.get_or_insert_with(|| "150 ohm*cm".to_string());
        config.model.v_rest.get_or_insert_with(|| "-70 mV".to_string());
    }

    let name = format!("{:?}", args.preset).to_lowercase();
    let builder = builder_from_config(name, args.size, &config)?;
    let model = build(args.preset, builder)?.compile(population_options(&config.population)?)?;

    if args.json {
        println!("{}", model.to_json()?);
    } else {
        println!("{}", model);
    }

    let mut scope = SimulationScope::new(InMemoryBackend::new());
    let handle = scope.instantiate(model)?;
    eprintln!(
        "Instantiated '{}' on backend '{}' (generation {})",
        handle.name,
        scope.backend().backend_name(),
        handle.generation
    );
    Ok(())
}

fn build(preset: Preset, builder: NeuronModelBuilder) -> ModelResult<NeuronModelBuilder> {
    let cylinder = |length_um: f64, diameter_um: f64| {
        Geometry::cylinder(length_um * units::MICROMETRE, diameter_um * units::MICROMETRE)
    };

    match preset {
        Preset::Point => {
            let passive = PassiveProperties::new()
                .capacitance(200.0 * units::PICOFARAD)
                .leak_conductance(10.0 * units::NANOSIEMENS)
                .leak_reversal(-70.0 * units::MILLIVOLT);
            let soma = CompartmentSpec::new(
                "soma",
                CompartmentKind::Soma,
                Geometry::point(),
                passive,
                vec![Mechanism::leaky_if(
                    -50.0 * units::MILLIVOLT,
                    -60.0 * units::MILLIVOLT,
                    Some(2.0 * units::MILLISECOND),
                )?],
                vec![],
            )?;
            builder.add(soma)
        }
        Preset::BallAndStick => {
            let soma = CompartmentSpec::new(
                "soma",
                CompartmentKind::Soma,
                cylinder(25.0, 25.0),
                PassiveProperties::new(),
                vec![Mechanism::leaky_if(
                    -50.0 * units::MILLIVOLT,
                    -60.0 * units::MILLIVOLT,
                    Some(2.0 * units::MILLISECOND),
                )?],
                vec![],
            )?;
            let dend = CompartmentSpec::new(
                "dend",
                CompartmentKind::Dendrite,
                cylinder(250.0, 1.0),
                PassiveProperties::new(),
                vec![],
                vec![
                    Receptor::ampa("input", 1.0 * units::NANOSIEMENS, 2.5 * units::MILLISECOND),
                    Receptor::nmda("input", 1.0 * units::NANOSIEMENS, 60.0 * units::MILLISECOND),
                ],
            )?;
            builder
                .add(soma)?
                .add(dend)?
                .connect("soma", "dend", Coupling::HalfCylinders)
        }
        Preset::Pyramidal => {
            let soma = CompartmentSpec::new(
                "soma",
                CompartmentKind::Soma,
                cylinder(20.0, 20.0),
                PassiveProperties::new(),
                vec![Mechanism::adaptive_if(AdaptationParams {
                    v_th: -40.0 * units::MILLIVOLT,
                    v_reset: -55.0 * units::MILLIVOLT,
                    a: 2.0 * units::NANOSIEMENS,
                    b: 50.0 * units::PICOAMP,
                    tau_w: 100.0 * units::MILLISECOND,
                    refractory: Some(2.0 * units::MILLISECOND),
                })?],
                vec![],
            )?;
            let dspike = DSpikeParams {
                threshold: -35.0 * units::MILLIVOLT,
                g_rise: 30.0 * units::NANOSIEMENS,
                g_fall: 15.0 * units::NANOSIEMENS,
                timing: DSpikeProperties::default(),
            };
            let apical = |name: &str| -> ModelResult<CompartmentSpec> {
                CompartmentSpec::new(
                    name,
                    CompartmentKind::Dendrite,
                    cylinder(100.0, 2.5),
                    PassiveProperties::new().spine_factor(1.5),
                    vec![Mechanism::dspike(DSpikeChannel::Na, dspike.clone())?],
                    vec![
                        Receptor::ampa("L2", 1.5 * units::NANOSIEMENS, 2.5 * units::MILLISECOND),
                        Receptor::nmda("L2", 0.8 * units::NANOSIEMENS, 60.0 * units::MILLISECOND),
                    ],
                )
            };
            let basal = CompartmentSpec::new(
                "basal",
                CompartmentKind::Dendrite,
                cylinder(150.0, 1.0),
                PassiveProperties::new(),
                vec![],
                vec![Receptor::gaba("inh", 2.0 * units::NANOSIEMENS, 8.0 * units::MILLISECOND)
                    .with_rise(1.0 * units::MILLISECOND)?],
            )?;
            builder
                .add(soma)?
                .add(apical("proximal")?)?
                .add(apical("distal")?)?
                .add(basal)?
                .connect("soma", "proximal", Coupling::HalfCylinders)?
                .connect("proximal", "distal", Coupling::Cylinder("distal".into()))?
                .connect("soma", "basal", Coupling::HalfCylinders)?
                .dspike_properties(
                    DSpikeChannel::Na,
                    DSpikeProperties {
                        tau_rise: Some(0.5 * units::MILLISECOND),
                        tau_fall: Some(1.0 * units::MILLISECOND),
                        offset_fall: Some(0.5 * units::MILLISECOND),
                        refractory: Some(5.0 * units::MILLISECOND),
                    },
                )
        }
    }
}
