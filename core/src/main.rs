//! KINEMATIC: dead reckoning of position, velocity, and heading from inertial samples.
//!
//! - `replay`: integrate a recorded CSV sample log and write the state after every step.
//! - `constant`: integrate a constant acceleration / angular velocity for a number of steps.
//! - `config`: write a template replay configuration file.
//!
//! A replay can also be run entirely from a configuration file (TOML/JSON/YAML) with `--config`.

mod common;

use clap::{Args, Parser, Subcommand};
use common::{DEFAULT_LOG_LEVEL, ensure_parent_dir, init_logger, parse_level, validate_input_file};
use log::{LevelFilter, error, info};
use nalgebra::Vector3;
use std::error::Error;
use std::path::{Path, PathBuf};

use kinematic::config::{LoggingConfig, ReplayConfig};
use kinematic::sim::{run, write_states};
use kinematic::source::ConstantSource;
use kinematic::{KinematicIntegrator, TimeSampling};

const LONG_ABOUT: &str = "KINEMATIC: dead reckoning of position, velocity, and heading from inertial samples.

Each step reads a linear acceleration, an angular velocity, and a step size and applies a
semi-implicit Euler update: velocity first, then position from the new velocity, then the
heading and elapsed time. Samples are integrated raw; there is no filtering or bias correction.

Sample logs are CSV files with the header:
  dt,accel_x,accel_y,accel_z,gyro_x,gyro_y,gyro_z";

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about = "Dead reckoning of position, velocity, and heading from inertial samples.", long_about = LONG_ABOUT)]
struct Cli {
    /// Run a replay from a configuration file (TOML/JSON/YAML)
    /// This option overrides any subcommand arguments
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Command to execute (ignored if --config is provided)
    #[command(subcommand)]
    command: Option<Command>,

    /// Log level (off, error, warn, info, debug, trace) [default: info]
    /// Takes precedence over the level in a configuration file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log file path (if not specified, logs to stderr)
    /// Takes precedence over the file in a configuration file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

/// Top-level commands
#[derive(Subcommand, Clone)]
enum Command {
    #[command(
        name = "replay",
        about = "Integrate a recorded sample log",
        long_about = "Integrate a recorded CSV sample log one row per step and write the integrated state after every step to a CSV file."
    )]
    Replay(ReplayArgs),
    #[command(
        name = "constant",
        about = "Integrate constant inputs",
        long_about = "Integrate a constant linear acceleration and angular velocity with a fixed step size and report the final state."
    )]
    Constant(ConstantArgs),
    #[command(name = "config", about = "Generate a template configuration file")]
    CreateConfig(CreateConfigArgs),
}

#[derive(Args, Clone, Debug)]
struct ReplayArgs {
    /// Input CSV sample log
    #[arg(short, long, value_parser)]
    input: PathBuf,

    /// Output CSV file for the integrated states
    #[arg(short, long, value_parser)]
    output: PathBuf,

    /// Read the delta time once per step (reuse) or twice (requery)
    #[arg(long, value_enum, default_value_t = TimeSampling::Reuse)]
    time_sampling: TimeSampling,

    /// Reject non-finite samples and negative delta times
    #[arg(long)]
    validate: bool,
}

#[derive(Args, Clone, Debug)]
struct ConstantArgs {
    /// Linear acceleration
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true, default_values_t = [0.0, 0.0, 0.0])]
    accel: Vec<f64>,

    /// Angular velocity
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true, default_values_t = [0.0, 0.0, 0.0])]
    gyro: Vec<f64>,

    /// Step size
    #[arg(long, default_value_t = 0.01)]
    dt: f64,

    /// Number of steps to integrate
    #[arg(long, default_value_t = 100)]
    steps: u64,

    /// Optional CSV file for the state after every step
    #[arg(short, long, value_parser)]
    output: Option<PathBuf>,

    /// Print the final state as JSON instead of a single summary line
    #[arg(long)]
    json: bool,
}

#[derive(Args, Clone, Debug)]
struct CreateConfigArgs {
    /// Path of the configuration file to write (.toml, .json, .yaml)
    #[arg(short, long, default_value = "replay.toml")]
    output: PathBuf,
}

fn run_replay(args: &ReplayArgs) -> Result<(), Box<dyn Error>> {
    validate_input_file(&args.input)?;
    ensure_parent_dir(&args.output)?;
    let config = ReplayConfig {
        input: args.input.display().to_string(),
        output: args.output.display().to_string(),
        time_sampling: args.time_sampling,
        validate_samples: args.validate,
        ..Default::default()
    };
    run(&config)?;
    Ok(())
}

fn run_constant(args: &ConstantArgs) -> Result<(), Box<dyn Error>> {
    let accel = Vector3::from_column_slice(&args.accel);
    let gyro = Vector3::from_column_slice(&args.gyro);
    info!(
        "Integrating constant inputs: accel [{}, {}, {}], gyro [{}, {}, {}], dt {}, {} steps",
        accel[0], accel[1], accel[2], gyro[0], gyro[1], gyro[2], args.dt, args.steps
    );
    let mut integrator = KinematicIntegrator::new(ConstantSource::new(accel, gyro, args.dt));
    let mut states = Vec::new();
    for _ in 0..args.steps {
        integrator.step()?;
        if args.output.is_some() {
            states.push(integrator.state());
        }
    }
    if let Err(corruption) = integrator.check_finite() {
        error!("{}", corruption);
    }
    if let Some(output) = &args.output {
        ensure_parent_dir(output)?;
        write_states(output, &states)?;
        info!("Results written to {}", output.display());
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&integrator.state())?);
    } else {
        println!("{}", integrator.state());
    }
    Ok(())
}

fn create_config_file(args: &CreateConfigArgs) -> Result<(), Box<dyn Error>> {
    let config = ReplayConfig {
        input: "samples.csv".to_string(),
        output: "states.csv".to_string(),
        ..Default::default()
    };
    ensure_parent_dir(&args.output)?;
    config.to_file(&args.output)?;
    println!("Template configuration written to {}", args.output.display());
    Ok(())
}

fn run_from_config(config: &ReplayConfig) -> Result<(), Box<dyn Error>> {
    info!("Input: {}", config.input);
    info!("Output: {}", config.output);
    validate_input_file(Path::new(&config.input))?;
    ensure_parent_dir(Path::new(&config.output))?;
    if let Err(e) = run(config) {
        error!("Replay failed: {}", e);
        return Err(e.into());
    }
    Ok(())
}

/// Logger level and file: command line flags first, then the configuration file, then defaults.
fn logger_settings(cli: &Cli, logging: Option<&LoggingConfig>) -> (LevelFilter, Option<PathBuf>) {
    let level = cli
        .log_level
        .as_deref()
        .or(logging.map(|l| l.level.as_str()))
        .unwrap_or(DEFAULT_LOG_LEVEL);
    let file = cli
        .log_file
        .clone()
        .or_else(|| logging.and_then(|l| l.file.as_ref().map(PathBuf::from)));
    (parse_level(level), file)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(ref config_path) = cli.config {
        let config = ReplayConfig::from_file(config_path)?;
        let (level, log_file) = logger_settings(&cli, Some(&config.logging));
        init_logger(level, log_file.as_deref())?;
        info!("Loaded configuration from {}", config_path.display());
        return run_from_config(&config);
    }

    let (level, log_file) = logger_settings(&cli, None);
    init_logger(level, log_file.as_deref())?;

    match cli.command {
        Some(Command::Replay(args)) => {
            info!("Replaying {}", args.input.display());
            run_replay(&args)
        }
        Some(Command::Constant(args)) => run_constant(&args),
        Some(Command::CreateConfig(args)) => create_config_file(&args),
        None => {
            eprintln!("Error: No command provided. Use -h or --help for usage information.");
            std::process::exit(1);
        }
    }
}
