//! End-to-end tests for the kinematic integrator.
//!
//! These drive the public API the way a host simulation would: a caller-owned source bound by
//! mutable borrow and stepped once per tick, plus the CSV replay path from sample log to state
//! output. Expected values come from the closed-form solution of the semi-implicit Euler
//! recursion for constant inputs.
use std::path::PathBuf;

use assert_approx_eq::assert_approx_eq;
use nalgebra::Vector3;

use kinematic::config::ReplayConfig;
use kinematic::error::ReplayError;
use kinematic::sim::{read_states, run};
use kinematic::source::{ConstantSource, FiniteCheck, ImuSample};
use kinematic::{KinematicIntegrator, KinematicSource, TimeSampling};

/// Host-side physics and clock, owned by the caller and advanced once per tick.
struct SimulatedVehicle {
    accel: Vector3<f64>,
    gyro: Vector3<f64>,
    frame_times: Vec<f64>,
    frame: usize,
}
impl SimulatedVehicle {
    fn new(accel: Vector3<f64>, gyro: Vector3<f64>, frame_times: Vec<f64>) -> Self {
        SimulatedVehicle {
            accel,
            gyro,
            frame_times,
            frame: 0,
        }
    }
    fn advance(&mut self) {
        self.frame += 1;
    }
}
impl KinematicSource for SimulatedVehicle {
    type Error = String;
    fn linear_acceleration(&mut self) -> Result<Vector3<f64>, Self::Error> {
        Ok(self.accel)
    }
    fn angular_velocity(&mut self) -> Result<Vector3<f64>, Self::Error> {
        Ok(self.gyro)
    }
    fn delta_time(&mut self) -> Result<f64, Self::Error> {
        self.frame_times
            .get(self.frame)
            .copied()
            .ok_or_else(|| format!("no frame {}", self.frame))
    }
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(name)
}

#[test]
fn borrowed_source_driven_per_tick() {
    let mut vehicle = SimulatedVehicle::new(
        Vector3::new(2.0, 0.0, 0.0),
        Vector3::new(0.0, 0.0, 0.5),
        vec![0.02, 0.02, 0.04, 0.01],
    );
    let mut expected_velocity = 0.0;
    let mut expected_position = 0.0;
    let mut expected_elapsed = 0.0;
    for tick in 0..4 {
        let dt = vehicle.frame_times[tick];
        {
            let mut integrator_tick = KinematicIntegrator::new(&mut vehicle);
            integrator_tick.step().unwrap();
            assert_approx_eq!(integrator_tick.velocity()[0], 2.0 * dt);
        }
        expected_velocity += 2.0 * dt;
        expected_position += expected_velocity * dt;
        expected_elapsed += dt;
        vehicle.advance();
    }
    // a long-lived integrator over a fresh clock reproduces the accumulated sums
    vehicle.frame = 0;
    let mut integrator = KinematicIntegrator::new(&mut vehicle);
    for _ in 0..4 {
        integrator.step().unwrap();
        integrator.source_mut().advance();
    }
    assert_approx_eq!(integrator.velocity()[0], expected_velocity, 1e-12);
    assert_approx_eq!(integrator.position()[0], expected_position, 1e-12);
    assert_approx_eq!(integrator.bearing()[2], 0.5 * expected_elapsed, 1e-12);
    assert_approx_eq!(integrator.elapsed(), expected_elapsed, 1e-12);

    // the clock ran out: the error passes through unchanged and state is kept
    let before = integrator.state();
    assert_eq!(integrator.step(), Err("no frame 4".to_string()));
    assert_eq!(integrator.state(), before);
}

#[test]
fn free_fall_matches_reference_values() {
    let source = ConstantSource::new(Vector3::new(0.0, 0.0, -9.8), Vector3::zeros(), 0.1);
    let mut integrator = KinematicIntegrator::new(source);
    for _ in 0..10 {
        integrator.step().unwrap();
    }
    assert_approx_eq!(integrator.velocity()[2], -9.8, 1e-9);
    assert_approx_eq!(integrator.position()[2], -5.39, 1e-9);
    assert_approx_eq!(integrator.elapsed(), 1.0, 1e-9);
    assert_eq!(integrator.position()[0], 0.0);
    assert_eq!(integrator.position()[1], 0.0);
}

#[test]
fn long_run_closed_form() {
    let accel = Vector3::new(0.3, -0.1, 0.05);
    let gyro = Vector3::new(-0.02, 0.01, 0.2);
    let dt = 0.01;
    let n = 1000_u64;
    let mut integrator =
        KinematicIntegrator::new(FiniteCheck::new(ConstantSource::new(accel, gyro, dt)));
    for _ in 0..n {
        integrator.step().unwrap();
    }
    let nf = n as f64;
    for i in 0..3 {
        assert_approx_eq!(integrator.velocity()[i], accel[i] * nf * dt, 1e-9);
        assert_approx_eq!(
            integrator.position()[i],
            accel[i] * dt * dt * nf * (nf + 1.0) / 2.0,
            1e-9
        );
        assert_approx_eq!(integrator.bearing()[i], gyro[i] * nf * dt, 1e-9);
    }
    assert_approx_eq!(integrator.elapsed(), nf * dt, 1e-9);
    assert_eq!(integrator.steps(), n);
    assert_eq!(integrator.source().rejected(), 0);
}

#[test]
fn csv_replay_end_to_end() {
    let input = temp_path("kinematic_it_samples.csv");
    let output = temp_path("kinematic_it_states.csv");
    let samples: Vec<ImuSample> = (0..20)
        .map(|k| {
            ImuSample::new(
                0.05,
                Vector3::new(1.0, 0.0, -9.8),
                Vector3::new(0.0, 0.0, if k < 10 { 0.2 } else { -0.2 }),
            )
        })
        .collect();
    ImuSample::to_csv(&samples, &input).unwrap();

    let config = ReplayConfig {
        input: input.display().to_string(),
        output: output.display().to_string(),
        validate_samples: true,
        ..Default::default()
    };
    let states = run(&config).unwrap();
    assert_eq!(states.len(), 20);

    let last = states.last().unwrap();
    assert_approx_eq!(last.elapsed, 1.0, 1e-9);
    assert_approx_eq!(last.velocity[0], 1.0, 1e-9);
    assert_approx_eq!(last.velocity[2], -9.8, 1e-9);
    assert_approx_eq!(last.position[0], 0.0025 * 210.0, 1e-9);
    // turning one way then back returns the heading to zero
    assert_approx_eq!(last.heading[2], 0.0, 1e-12);

    let written = read_states(&output).unwrap();
    assert_eq!(written, states);

    let _ = std::fs::remove_file(&input);
    let _ = std::fs::remove_file(&output);
}

#[test]
fn csv_replay_from_config_file() {
    let input = temp_path("kinematic_it_cfg_samples.csv");
    let output = temp_path("kinematic_it_cfg_states.csv");
    let config_path = temp_path("kinematic_it_replay.yaml");
    let samples = vec![ImuSample::new(0.5, Vector3::new(0.0, 2.0, 0.0), Vector3::zeros()); 6];
    ImuSample::to_csv(&samples, &input).unwrap();

    ReplayConfig {
        input: input.display().to_string(),
        output: output.display().to_string(),
        time_sampling: TimeSampling::Requery,
        ..Default::default()
    }
    .to_file(&config_path)
    .unwrap();

    let config = ReplayConfig::from_file(&config_path).unwrap();
    let states = run(&config).unwrap();
    // requery consumes two samples per step
    assert_eq!(states.len(), 3);
    assert_approx_eq!(states[2].elapsed, 1.5, 1e-12);
    assert_approx_eq!(states[2].velocity[1], 3.0, 1e-12);

    let _ = std::fs::remove_file(&input);
    let _ = std::fs::remove_file(&output);
    let _ = std::fs::remove_file(&config_path);
}

#[test]
fn csv_replay_missing_input() {
    let config = ReplayConfig {
        input: temp_path("kinematic_it_does_not_exist.csv").display().to_string(),
        output: temp_path("kinematic_it_unused.csv").display().to_string(),
        ..Default::default()
    };
    assert!(matches!(run(&config), Err(ReplayError::Csv(_))));
}

#[test]
fn csv_replay_negative_dt_rejected_only_when_validating() {
    let samples = vec![
        ImuSample::new(0.1, Vector3::new(1.0, 0.0, 0.0), Vector3::zeros()),
        ImuSample::new(-0.1, Vector3::new(1.0, 0.0, 0.0), Vector3::zeros()),
    ];
    let raw = kinematic::sim::replay(samples.clone(), &ReplayConfig::default()).unwrap();
    assert_eq!(raw.len(), 2);
    assert_approx_eq!(raw[1].elapsed, 0.0, 1e-12);

    let validating = ReplayConfig {
        validate_samples: true,
        ..Default::default()
    };
    let result = kinematic::sim::replay(samples, &validating);
    assert!(matches!(result, Err(ReplayError::Rejected { step: 2, .. })));
}
