//! Screen-based calibration validation for eye trackers.
//!
//! Collects gaze samples while a user fixates known stimulus points, then
//! reports per-eye accuracy and precision in degrees. The binary entry point
//! in `main.rs` runs the full procedure against a simulated tracker.

pub mod clock;
pub mod collector;
pub mod config;
pub mod error;
pub mod gaze;
pub mod geometry;
pub mod simulated;
pub mod statistics;
pub mod tracker;
pub mod validator;

pub use config::ValidatorConfig;
pub use error::{DestroyError, ValidationError};
pub use gaze::GazeSample;
pub use geometry::{DisplayArea, NormalizedPoint2D, Point3, Vec3};
pub use statistics::{EyeMetrics, ValidationPoint, ValidationResult};
pub use tracker::{EyeTracker, TrackerError, TrackerRegistry, TrackerResolver};
pub use validator::{CalibrationValidator, ValidatorState};
