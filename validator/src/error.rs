//! Error types returned by the validator and its collaborators.

use thiserror::Error;

use crate::geometry::NormalizedPoint2D;
use crate::tracker::TrackerError;
use crate::validator::CalibrationValidator;

/// Every failure a validator operation can report.
///
/// Errors are never retried internally. Undefined metrics (insufficient data)
/// are reported as NaN inside a successful result, never as an error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no eye tracker found at address {address:?}")]
    InvalidEyetracker { address: String },

    #[error(
        "sample count {0} is outside [{min}, {max}]",
        min = crate::config::SAMPLE_COUNT_MIN,
        max = crate::config::SAMPLE_COUNT_MAX
    )]
    InvalidSampleCount(usize),

    #[error(
        "timeout {0} ms is outside [{min}, {max}] ms",
        min = crate::config::TIMEOUT_MS_MIN,
        max = crate::config::TIMEOUT_MS_MAX
    )]
    InvalidTimeout(u64),

    #[error("screen point {0} is outside the unit square")]
    InvalidScreenPoint(NormalizedPoint2D),

    #[error("validator is not in validation mode")]
    NotInValidationMode,

    #[error("validator is already in validation mode")]
    AlreadyInValidationMode,

    #[error("operation not allowed while collecting data")]
    OperationNotAllowedDuringDataCollection,

    #[error("no data has been collected")]
    NoDataCollected,

    #[error("gaze direction is degenerate for screen point {screen_point}")]
    DegenerateGazeVector { screen_point: NormalizedPoint2D },

    #[error("internal error: {0}")]
    InternalError(#[from] TrackerError),
}

/// Returned by [`CalibrationValidator::destroy`] when the validator cannot be
/// released yet. The validator is handed back untouched.
#[derive(Debug, Error)]
#[error("failed to destroy validator: {error}")]
pub struct DestroyError {
    pub validator: CalibrationValidator,
    #[source]
    pub error: ValidationError,
}

impl DestroyError {
    pub fn into_parts(self) -> (CalibrationValidator, ValidationError) {
        (self.validator, self.error)
    }
}
