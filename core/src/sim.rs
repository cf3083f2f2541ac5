//! Replay of recorded sample logs through the integrator.
//!
//! This module provides:
//! - [`replay`]: integrate a list of samples and collect the state after every step
//! - [`run`]: the same, reading and writing CSV files named by a [`ReplayConfig`]
//! - [`StateRecord`] with [`write_states`] / [`read_states`] for the CSV state output
use std::path::Path;

use log::{debug, info, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config::ReplayConfig;
use crate::error::{ReplayError, SampleError, SourceError};
use crate::source::{FiniteCheck, ImuSample, SampleSequence};
use crate::{KinematicIntegrator, KinematicSource, KinematicState, TimeSampling};

/// One row of integrated state output.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub step: u64,
    pub elapsed: f64,
    pub pos_x: f64,
    pub pos_y: f64,
    pub pos_z: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub vel_z: f64,
    pub heading_x: f64,
    pub heading_y: f64,
    pub heading_z: f64,
}
impl From<&KinematicState> for StateRecord {
    fn from(state: &KinematicState) -> Self {
        StateRecord {
            step: state.steps,
            elapsed: state.elapsed,
            pos_x: state.position[0],
            pos_y: state.position[1],
            pos_z: state.position[2],
            vel_x: state.velocity[0],
            vel_y: state.velocity[1],
            vel_z: state.velocity[2],
            heading_x: state.heading[0],
            heading_y: state.heading[1],
            heading_z: state.heading[2],
        }
    }
}
impl From<StateRecord> for KinematicState {
    fn from(record: StateRecord) -> Self {
        KinematicState {
            position: Vector3::new(record.pos_x, record.pos_y, record.pos_z),
            velocity: Vector3::new(record.vel_x, record.vel_y, record.vel_z),
            heading: Vector3::new(record.heading_x, record.heading_y, record.heading_z),
            elapsed: record.elapsed,
            steps: record.step,
        }
    }
}

/// Writes integrated states to a CSV file, one row per state.
pub fn write_states<P: AsRef<Path>>(path: P, states: &[KinematicState]) -> Result<(), ReplayError> {
    let mut writer = csv::Writer::from_path(path)?;
    for state in states {
        writer.serialize(StateRecord::from(state))?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads states previously written by [`write_states`].
pub fn read_states<P: AsRef<Path>>(path: P) -> Result<Vec<KinematicState>, ReplayError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut states = Vec::new();
    for result in rdr.deserialize() {
        let record: StateRecord = result?;
        states.push(KinematicState::from(record));
    }
    Ok(states)
}

/// Integrate `samples` in order and return the state after every completed step.
///
/// Stepping stops when the sequence runs out. With [`TimeSampling::Reuse`] that is one state per
/// sample; with [`TimeSampling::Requery`] each step consumes two samples, and a trailing sample
/// without a partner is read but never integrated (a warning reports it). When
/// `config.validate_samples` is set, a non-finite or negative sample aborts the replay with
/// [`ReplayError::Rejected`]; otherwise it is integrated as-is.
pub fn replay(
    samples: Vec<ImuSample>,
    config: &ReplayConfig,
) -> Result<Vec<KinematicState>, ReplayError> {
    let sequence = SampleSequence::new(samples);
    info!(
        "Replaying {} samples (time sampling: {}, validation: {})",
        sequence.len(),
        config.time_sampling,
        config.validate_samples
    );
    let (states, consumed) = if config.validate_samples {
        let mut integrator = KinematicIntegrator::with_time_sampling(
            FiniteCheck::new(sequence),
            config.time_sampling,
        );
        let states = integrate_to_end(&mut integrator, |step, error: SampleError<SourceError>| {
            match error {
                SampleError::Source(source) => ReplayError::Source(source),
                other => ReplayError::Rejected { step, error: other },
            }
        })?;
        (states, integrator.source().inner().position())
    } else {
        let mut integrator =
            KinematicIntegrator::with_time_sampling(sequence, config.time_sampling);
        let states = integrate_to_end(&mut integrator, |_, error| ReplayError::Source(error))?;
        (states, integrator.source().position())
    };
    let dropped = unintegrated_samples(consumed, states.len() as u64, config.time_sampling);
    if dropped > 0 {
        warn!(
            "{} trailing sample(s) consumed without a complete step (time sampling: {})",
            dropped, config.time_sampling
        );
    }
    if let Some(last) = states.last() {
        info!("Final state: {}", last);
    }
    Ok(states)
}

/// Samples the sequence gave up that no completed step accounts for.
fn unintegrated_samples(consumed: usize, steps: u64, time_sampling: TimeSampling) -> u64 {
    (consumed as u64).saturating_sub(steps * time_sampling.clock_reads())
}

fn integrate_to_end<S, F>(
    integrator: &mut KinematicIntegrator<S>,
    classify: F,
) -> Result<Vec<KinematicState>, ReplayError>
where
    S: KinematicSource,
    F: Fn(u64, S::Error) -> ReplayError,
{
    let mut states = Vec::new();
    loop {
        match integrator.step() {
            Ok(()) => {
                let state = integrator.state();
                debug!("{}", state);
                states.push(state);
            }
            Err(error) => {
                let error = classify(integrator.steps() + 1, error);
                if error.is_exhausted() {
                    break;
                }
                return Err(error);
            }
        }
    }
    if let Err(corruption) = integrator.check_finite() {
        warn!("Integrated state is corrupted: {}", corruption);
    }
    Ok(states)
}

/// Read the input CSV named by `config`, replay it, and write the states to the output CSV.
pub fn run(config: &ReplayConfig) -> Result<Vec<KinematicState>, ReplayError> {
    info!("Reading samples from {}", config.input);
    let samples = ImuSample::from_csv(&config.input)?;
    let states = replay(samples, config)?;
    write_states(&config.output, &states)?;
    info!("Wrote {} states to {}", states.len(), config.output);
    Ok(states)
}
