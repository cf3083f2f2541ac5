//! Kinematic dead reckoning from inertial samples
//!
//! This crate maintains the dead-reckoned kinematic state of a single body (position, velocity,
//! and an accumulated heading) by integrating linear acceleration and angular velocity samples
//! over time. It is intended to sit inside a larger simulation or control stack that drives one
//! integration step per control tick and reads the integrated state back for navigation or
//! display. It is not a sensor-fusion filter and not an orientation tracker: samples are
//! integrated raw and losslessly, without noise modeling, bias correction, or drift compensation.
//!
//! This crate is primarily built off of:
//! - [`nalgebra`](https://crates.io/crates/nalgebra): Provides the vector types for every kinematic quantity.
//! - [`serde`](https://crates.io/crates/serde) and [`csv`](https://crates.io/crates/csv): Sample logs, state output, and replay configuration.
//!
//! ## Crate overview
//!
//! - The crate root holds the [`KinematicSource`] trait and the [`KinematicIntegrator`] itself.
//! - [source]: Sample sources (constant, recorded sequence) and the [`source::FiniteCheck`] boundary adapter.
//! - [sim]: CSV replay driver for recorded sample logs.
//! - [config]: Replay configuration read from JSON, YAML, or TOML.
//! - [error]: Error types for sources, validation, and replay.
//!
//! ## Integration scheme
//!
//! Each call to [`KinematicIntegrator::step`] reads a linear acceleration $a$, an angular
//! velocity $\omega$ and a step size $t$ from the bound source and applies a semi-implicit
//! (symplectic) Euler update:
//!
//! $$
//! v(+) = v(-) + a t
//! $$
//!
//! $$
//! p(+) = p(-) + v(+) t
//! $$
//!
//! $$
//! h(+) = h(-) + \omega t
//! $$
//!
//! $$
//! T(+) = T(-) + t
//! $$
//!
//! The position update uses the velocity _after_ its own update. This ordering changes the
//! numerical trajectory relative to explicit Euler and is preserved exactly. The heading $h$ is a
//! raw running integral of the angular velocity samples: it is not a unit vector, it is not
//! wrapped, and no rotation is applied to the acceleration. Frames and units are whatever the
//! source uses; the integrator does not convert or sanitize them.
//!
//! For constant inputs the closed form after $n$ steps is
//!
//! $$
//! v_n = n a t, \quad p_n = a t^2 \frac{n (n + 1)}{2}, \quad h_n = n \omega t, \quad T_n = n t
//! $$
pub mod config;
pub mod error;
pub mod sim;
pub mod source;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use std::fmt::{self, Display};

use crate::error::{CorruptionError, Quantity};

/// Provider of the per-tick inputs consumed by [`KinematicIntegrator::step`].
///
/// Implementors supply an instantaneous linear acceleration (length/time²), an instantaneous
/// angular velocity (angle/time), and the time elapsed since the previous tick. The delta time
/// query may be stateful: a recorded sequence, for example, advances to its next sample when its
/// delta time is read. Every query may fail with the implementor's own error type, which the
/// integrator passes through unchanged.
///
/// The trait is implemented for `&mut S` and `Box<S>`, so a caller that needs to keep ownership
/// of its source can bind a mutable borrow instead.
pub trait KinematicSource {
    /// Error raised by a failing query.
    type Error;
    /// Current linear acceleration.
    fn linear_acceleration(&mut self) -> Result<Vector3<f64>, Self::Error>;
    /// Current angular velocity.
    fn angular_velocity(&mut self) -> Result<Vector3<f64>, Self::Error>;
    /// Time since the previous tick. Expected to be non-negative.
    fn delta_time(&mut self) -> Result<f64, Self::Error>;
}
impl<S: KinematicSource + ?Sized> KinematicSource for &mut S {
    type Error = S::Error;
    fn linear_acceleration(&mut self) -> Result<Vector3<f64>, Self::Error> {
        (**self).linear_acceleration()
    }
    fn angular_velocity(&mut self) -> Result<Vector3<f64>, Self::Error> {
        (**self).angular_velocity()
    }
    fn delta_time(&mut self) -> Result<f64, Self::Error> {
        (**self).delta_time()
    }
}
impl<S: KinematicSource + ?Sized> KinematicSource for Box<S> {
    type Error = S::Error;
    fn linear_acceleration(&mut self) -> Result<Vector3<f64>, Self::Error> {
        (**self).linear_acceleration()
    }
    fn angular_velocity(&mut self) -> Result<Vector3<f64>, Self::Error> {
        (**self).angular_velocity()
    }
    fn delta_time(&mut self) -> Result<f64, Self::Error> {
        (**self).delta_time()
    }
}

/// How many times a step reads the source's delta time.
///
/// With a well-behaved source whose delta time is stable within a tick both policies produce
/// identical state. They differ only for a consuming clock, where `Requery` reads the next tick's
/// value for the elapsed-time accumulator and so advances the source twice per step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeSampling {
    /// Read delta time once and use it for both the kinematic update and the elapsed time.
    #[default]
    Reuse,
    /// Read delta time a second, independent time for the elapsed time accumulator.
    Requery,
}
impl TimeSampling {
    /// Number of delta time reads a single step makes.
    pub fn clock_reads(self) -> u64 {
        match self {
            TimeSampling::Reuse => 1,
            TimeSampling::Requery => 2,
        }
    }
}
impl Display for TimeSampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSampling::Reuse => f.write_str("reuse"),
            TimeSampling::Requery => f.write_str("requery"),
        }
    }
}

/// Snapshot of the integrated state after some number of steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KinematicState {
    /// Accumulated position (length)
    pub position: Vector3<f64>,
    /// Accumulated velocity (length/time)
    pub velocity: Vector3<f64>,
    /// Accumulated heading (angle), the raw integral of angular velocity
    pub heading: Vector3<f64>,
    /// Sum of all delta time samples
    pub elapsed: f64,
    /// Number of completed steps
    pub steps: u64,
}
impl Display for KinematicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KinematicState {{ step: {}, t: {:.4}, pos: [{:.4}, {:.4}, {:.4}], vel: [{:.4}, {:.4}, {:.4}], heading: [{:.4}, {:.4}, {:.4}] }}",
            self.steps,
            self.elapsed,
            self.position[0],
            self.position[1],
            self.position[2],
            self.velocity[0],
            self.velocity[1],
            self.velocity[2],
            self.heading[0],
            self.heading[1],
            self.heading[2]
        )
    }
}

/// Dead-reckoning integrator bound to a [`KinematicSource`].
///
/// All accumulators start at zero and are mutated only by [`KinematicIntegrator::step`]. There is
/// no reset; construct a new integrator to start over. `step` takes `&mut self`, so concurrent use
/// has to be serialized by the caller (e.g. behind a `Mutex`).
///
/// # Example
///
/// ```
/// use kinematic::KinematicIntegrator;
/// use kinematic::source::ConstantSource;
/// use nalgebra::Vector3;
///
/// let source = ConstantSource::new(Vector3::new(1.0, 0.0, 0.0), Vector3::zeros(), 1.0);
/// let mut integrator = KinematicIntegrator::new(source);
/// integrator.step().unwrap();
/// assert_eq!(integrator.velocity(), Vector3::new(1.0, 0.0, 0.0));
/// assert_eq!(integrator.position(), Vector3::new(1.0, 0.0, 0.0));
/// ```
#[derive(Clone, Debug)]
pub struct KinematicIntegrator<S> {
    source: S,
    time_sampling: TimeSampling,
    position: Vector3<f64>,
    velocity: Vector3<f64>,
    heading: Vector3<f64>,
    elapsed: f64,
    steps: u64,
}
impl<S: KinematicSource> KinematicIntegrator<S> {
    /// Create an integrator at rest at the origin, reading delta time once per step.
    pub fn new(source: S) -> Self {
        Self::with_time_sampling(source, TimeSampling::default())
    }
    /// Create an integrator at rest at the origin with an explicit delta time policy.
    pub fn with_time_sampling(source: S, time_sampling: TimeSampling) -> Self {
        KinematicIntegrator {
            source,
            time_sampling,
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            heading: Vector3::zeros(),
            elapsed: 0.0,
            steps: 0,
        }
    }
    /// Advance the state by exactly one sample.
    ///
    /// Reads acceleration, angular velocity, and delta time from the source (plus a second delta
    /// time under [`TimeSampling::Requery`]), then updates velocity, position, heading and elapsed
    /// time in that order. Position uses the freshly updated velocity.
    ///
    /// Every query happens before any accumulator changes, so a source error leaves the state
    /// exactly as it was before the call. Non-finite samples are not checked: they are integrated
    /// as-is and corrupt every later reading (see [`KinematicIntegrator::check_finite`]).
    pub fn step(&mut self) -> Result<(), S::Error> {
        let accel = self.source.linear_acceleration()?;
        let gyro = self.source.angular_velocity()?;
        let dt = self.source.delta_time()?;
        let dt_elapsed = match self.time_sampling {
            TimeSampling::Reuse => dt,
            TimeSampling::Requery => self.source.delta_time()?,
        };

        self.velocity += accel * dt;
        self.position += self.velocity * dt;
        self.heading += gyro * dt;
        self.elapsed += dt_elapsed;
        self.steps += 1;
        Ok(())
    }
    /// Current position.
    pub fn position(&self) -> Vector3<f64> {
        self.position
    }
    /// Current velocity.
    pub fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }
    /// Current heading, the accumulated angular displacement.
    pub fn bearing(&self) -> Vector3<f64> {
        self.heading
    }
    /// Total time integrated so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
    /// Number of completed steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }
    pub fn time_sampling(&self) -> TimeSampling {
        self.time_sampling
    }
    /// Copy of all accumulators.
    pub fn state(&self) -> KinematicState {
        KinematicState {
            position: self.position,
            velocity: self.velocity,
            heading: self.heading,
            elapsed: self.elapsed,
            steps: self.steps,
        }
    }
    /// Check the accumulators for NaN or infinities.
    ///
    /// Returns the first corrupted quantity in update order (velocity, position, heading,
    /// elapsed). This is a read-only diagnostic and does not repair anything.
    pub fn check_finite(&self) -> Result<(), CorruptionError> {
        let checks = [
            (Quantity::Velocity, all_finite(&self.velocity)),
            (Quantity::Position, all_finite(&self.position)),
            (Quantity::Heading, all_finite(&self.heading)),
            (Quantity::Elapsed, self.elapsed.is_finite()),
        ];
        match checks.iter().find(|(_, finite)| !finite) {
            Some((quantity, _)) => Err(CorruptionError::NonFinite {
                quantity: *quantity,
                steps: self.steps,
            }),
            None => Ok(()),
        }
    }
    pub fn source(&self) -> &S {
        &self.source
    }
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
    /// Unbind the source, discarding the integrated state.
    pub fn into_source(self) -> S {
        self.source
    }
}

pub(crate) fn all_finite(vector: &Vector3<f64>) -> bool {
    vector.iter().all(|x| x.is_finite())
}
