//! Error types for sample sources, boundary validation, and replay.
//!
//! The integrator itself has no error type for [`crate::KinematicIntegrator::step`]; a failing step
//! returns whatever the bound source returned. The types here belong to the sources shipped with
//! this crate, the [`crate::source::FiniteCheck`] boundary adapter, and the replay driver.

use std::fmt::{self, Display};
use std::io;

/// Names the kinematic quantity an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantity {
    LinearAcceleration,
    AngularVelocity,
    DeltaTime,
    Position,
    Velocity,
    Heading,
    Elapsed,
}
impl Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quantity::LinearAcceleration => "linear acceleration",
            Quantity::AngularVelocity => "angular velocity",
            Quantity::DeltaTime => "delta time",
            Quantity::Position => "position",
            Quantity::Velocity => "velocity",
            Quantity::Heading => "heading",
            Quantity::Elapsed => "elapsed time",
        };
        f.write_str(name)
    }
}

/// Errors raised by the sample sources in [`crate::source`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// The sequence has no sample left at `index`.
    #[error("sample sequence exhausted at index {index}")]
    Exhausted { index: usize },
}

/// A sample rejected at the source boundary by [`crate::source::FiniteCheck`].
///
/// `E` is the error type of the wrapped source; its failures pass through as
/// [`SampleError::Source`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SampleError<E> {
    /// The wrapped source failed.
    #[error("source query failed: {0}")]
    Source(E),
    /// The source produced NaN or an infinity.
    #[error("non-finite {quantity} sample: {value}")]
    NonFinite { quantity: Quantity, value: f64 },
    /// The source produced a negative step size.
    #[error("negative delta time sample: {0}")]
    NegativeDeltaTime(f64),
}

/// The uncontrolled numerical corruption failure mode.
///
/// Non-finite samples are integrated unchanged and poison every later reading. This error names
/// the first accumulator found in that state; see [`crate::KinematicIntegrator::check_finite`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CorruptionError {
    #[error("{quantity} became non-finite after {steps} steps")]
    NonFinite { quantity: Quantity, steps: u64 },
}

/// Errors from the CSV replay driver in [`crate::sim`].
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed CSV or a row that does not deserialize
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The sample source failed
    #[error("sample source error: {0}")]
    Source(#[from] SourceError),

    /// A sample was rejected by boundary validation
    #[error("rejected sample at step {step}: {error}")]
    Rejected {
        step: u64,
        error: SampleError<SourceError>,
    },
}
impl ReplayError {
    /// True when the replay stopped because the sample sequence ran out.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, ReplayError::Source(SourceError::Exhausted { .. }))
    }
}
