//! Sample sources for the integrator
//!
//! - [`ConstantSource`]: fixed acceleration, angular velocity, and step size. Useful for closed-form checks.
//! - [`SampleSequence`]: replays a recorded list of [`ImuSample`]s, advancing on each delta time query.
//! - [`FiniteCheck`]: wraps any other source and rejects non-finite or backwards samples at the boundary.
//!
//! Recorded samples are stored in CSV with one row per tick:
//!
//! ```text
//! dt,accel_x,accel_y,accel_z,gyro_x,gyro_y,gyro_z
//! ```
use std::convert::Infallible;
use std::fmt::{self, Display};
use std::path::Path;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Quantity, SampleError, SourceError};
use crate::{KinematicSource, all_finite};

/// One tick of inertial input: the step size and the acceleration and angular rate sensed over it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SampleRow", into = "SampleRow")]
pub struct ImuSample {
    /// Time since the previous sample
    pub dt: f64,
    /// Linear acceleration, length/time^2
    pub accel: Vector3<f64>,
    /// Angular velocity, angle/time
    pub gyro: Vector3<f64>,
}
impl ImuSample {
    pub fn new(dt: f64, accel: Vector3<f64>, gyro: Vector3<f64>) -> Self {
        ImuSample { dt, accel, gyro }
    }
    /// Reads a sequence of samples from a CSV file with a header row.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use kinematic::source::ImuSample;
    ///
    /// let samples = ImuSample::from_csv("./data/samples.csv").expect("Failed to read samples");
    /// println!("Loaded {} samples", samples.len());
    /// ```
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Self>, csv::Error> {
        let mut rdr = csv::Reader::from_path(path)?;
        let mut samples = Vec::new();
        for result in rdr.deserialize() {
            let sample: Self = result?;
            samples.push(sample);
        }
        Ok(samples)
    }
    /// Writes samples to a CSV file, header included.
    pub fn to_csv<P: AsRef<Path>>(samples: &[Self], path: P) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        for sample in samples {
            writer.serialize(sample)?;
        }
        writer.flush()?;
        Ok(())
    }
}
impl Display for ImuSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ImuSample {{ dt: {:.4}, accel: [{:.4}, {:.4}, {:.4}], gyro: [{:.4}, {:.4}, {:.4}] }}",
            self.dt,
            self.accel[0],
            self.accel[1],
            self.accel[2],
            self.gyro[0],
            self.gyro[1],
            self.gyro[2]
        )
    }
}

/// Flat CSV layout of an [`ImuSample`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct SampleRow {
    dt: f64,
    accel_x: f64,
    accel_y: f64,
    accel_z: f64,
    gyro_x: f64,
    gyro_y: f64,
    gyro_z: f64,
}
impl From<SampleRow> for ImuSample {
    fn from(row: SampleRow) -> Self {
        ImuSample {
            dt: row.dt,
            accel: Vector3::new(row.accel_x, row.accel_y, row.accel_z),
            gyro: Vector3::new(row.gyro_x, row.gyro_y, row.gyro_z),
        }
    }
}
impl From<ImuSample> for SampleRow {
    fn from(sample: ImuSample) -> Self {
        SampleRow {
            dt: sample.dt,
            accel_x: sample.accel[0],
            accel_y: sample.accel[1],
            accel_z: sample.accel[2],
            gyro_x: sample.gyro[0],
            gyro_y: sample.gyro[1],
            gyro_z: sample.gyro[2],
        }
    }
}

/// Source that returns the same inputs on every query.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConstantSource {
    pub accel: Vector3<f64>,
    pub gyro: Vector3<f64>,
    pub dt: f64,
}
impl ConstantSource {
    pub fn new(accel: Vector3<f64>, gyro: Vector3<f64>, dt: f64) -> Self {
        ConstantSource { accel, gyro, dt }
    }
}
impl KinematicSource for ConstantSource {
    type Error = Infallible;
    fn linear_acceleration(&mut self) -> Result<Vector3<f64>, Self::Error> {
        Ok(self.accel)
    }
    fn angular_velocity(&mut self) -> Result<Vector3<f64>, Self::Error> {
        Ok(self.gyro)
    }
    fn delta_time(&mut self) -> Result<f64, Self::Error> {
        Ok(self.dt)
    }
}

/// Replays recorded samples in order.
///
/// Acceleration and angular velocity report the current sample. Reading the delta time returns
/// the current sample's `dt` and then moves on to the next sample, so the delta time query acts
/// as the clock tick. Any query past the last sample fails with [`SourceError::Exhausted`].
#[derive(Clone, Debug, Default)]
pub struct SampleSequence {
    samples: Vec<ImuSample>,
    cursor: usize,
}
impl SampleSequence {
    pub fn new(samples: Vec<ImuSample>) -> Self {
        SampleSequence { samples, cursor: 0 }
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    /// Samples not yet consumed by a delta time query.
    pub fn remaining(&self) -> usize {
        self.samples.len().saturating_sub(self.cursor)
    }
    /// Index of the sample the next query will read.
    pub fn position(&self) -> usize {
        self.cursor
    }
    fn current(&self) -> Result<&ImuSample, SourceError> {
        self.samples
            .get(self.cursor)
            .ok_or(SourceError::Exhausted { index: self.cursor })
    }
}
impl From<Vec<ImuSample>> for SampleSequence {
    fn from(samples: Vec<ImuSample>) -> Self {
        SampleSequence::new(samples)
    }
}
impl KinematicSource for SampleSequence {
    type Error = SourceError;
    fn linear_acceleration(&mut self) -> Result<Vector3<f64>, Self::Error> {
        Ok(self.current()?.accel)
    }
    fn angular_velocity(&mut self) -> Result<Vector3<f64>, Self::Error> {
        Ok(self.current()?.gyro)
    }
    fn delta_time(&mut self) -> Result<f64, Self::Error> {
        let dt = self.current()?.dt;
        self.cursor += 1;
        Ok(dt)
    }
}

/// Boundary validation for another source.
///
/// Forwards every query to the inner source and rejects NaN or infinite components and negative
/// delta times with a [`SampleError`]. Because the integrator reads all inputs before it mutates
/// anything, a rejected sample leaves the integrated state untouched. The integration itself is
/// unchanged; a caller who wants raw propagation simply does not wrap the source.
#[derive(Clone, Debug, Default)]
pub struct FiniteCheck<S> {
    inner: S,
    rejected: u64,
}
impl<S: KinematicSource> FiniteCheck<S> {
    pub fn new(inner: S) -> Self {
        FiniteCheck { inner, rejected: 0 }
    }
    pub fn inner(&self) -> &S {
        &self.inner
    }
    pub fn into_inner(self) -> S {
        self.inner
    }
    /// Number of samples rejected so far.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
    fn check_vector(
        &mut self,
        quantity: Quantity,
        vector: Vector3<f64>,
    ) -> Result<Vector3<f64>, SampleError<S::Error>> {
        if all_finite(&vector) {
            return Ok(vector);
        }
        let value = vector
            .iter()
            .copied()
            .find(|x| !x.is_finite())
            .unwrap_or(f64::NAN);
        self.reject(SampleError::NonFinite { quantity, value })
    }
    fn reject<T>(&mut self, error: SampleError<S::Error>) -> Result<T, SampleError<S::Error>> {
        self.rejected += 1;
        match &error {
            SampleError::NonFinite { quantity, value } => {
                log::warn!("Rejected non-finite {} sample ({})", quantity, value)
            }
            SampleError::NegativeDeltaTime(dt) => {
                log::warn!("Rejected negative delta time sample ({})", dt)
            }
            SampleError::Source(_) => {}
        }
        Err(error)
    }
}
impl<S: KinematicSource> KinematicSource for FiniteCheck<S> {
    type Error = SampleError<S::Error>;
    fn linear_acceleration(&mut self) -> Result<Vector3<f64>, Self::Error> {
        let accel = self.inner.linear_acceleration().map_err(SampleError::Source)?;
        self.check_vector(Quantity::LinearAcceleration, accel)
    }
    fn angular_velocity(&mut self) -> Result<Vector3<f64>, Self::Error> {
        let gyro = self.inner.angular_velocity().map_err(SampleError::Source)?;
        self.check_vector(Quantity::AngularVelocity, gyro)
    }
    fn delta_time(&mut self) -> Result<f64, Self::Error> {
        let dt = self.inner.delta_time().map_err(SampleError::Source)?;
        if !dt.is_finite() {
            return self.reject(SampleError::NonFinite {
                quantity: Quantity::DeltaTime,
                value: dt,
            });
        }
        if dt < 0.0 {
            return self.reject(SampleError::NegativeDeltaTime(dt));
        }
        Ok(dt)
    }
}
