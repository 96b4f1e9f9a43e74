//! Binocular gaze samples as delivered by the eye tracker stream.

use crate::geometry::{NormalizedPoint2D, Point3, Vec3};

// ── Validity ────────────────────────────────────────────────

/// Tracker-reported validity of a single measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
    #[default]
    Invalid,
    Valid,
}

impl Validity {
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

impl From<bool> for Validity {
    fn from(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid
        }
    }
}

// ── Per-eye data ────────────────────────────────────────────

/// Estimated point of regard.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GazePoint {
    /// Where the gaze hits the display area, normalized.
    pub position_on_display_area: NormalizedPoint2D,
    /// The same point in user coordinates (mm).
    pub position_in_user_coordinates: Point3,
    pub validity: Validity,
}

/// Modeled eye position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GazeOrigin {
    pub position_in_user_coordinates: Point3,
    pub validity: Validity,
}

/// Pupil diameter in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PupilData {
    pub diameter: f64,
    pub validity: Validity,
}

/// Everything the tracker reports about one eye in one sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EyeData {
    pub gaze_point: GazePoint,
    pub gaze_origin: GazeOrigin,
    pub pupil: PupilData,
}

impl EyeData {
    /// Origin-to-point direction, not normalized.
    pub fn gaze_direction(&self) -> Vec3 {
        Vec3::between(
            self.gaze_origin.position_in_user_coordinates,
            self.gaze_point.position_in_user_coordinates,
        )
    }
}

// ── Gaze sample ─────────────────────────────────────────────

/// One binocular sample from the gaze stream.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GazeSample {
    pub left_eye: EyeData,
    pub right_eye: EyeData,
    /// Device clock timestamp (µs).
    pub device_time_stamp: i64,
    /// Host clock timestamp (µs).
    pub system_time_stamp: i64,
}

impl GazeSample {
    /// Both eyes have a valid gaze point.
    pub fn is_binocular_valid(&self) -> bool {
        self.left_eye.gaze_point.validity.is_valid()
            && self.right_eye.gaze_point.validity.is_valid()
    }

    pub fn eye(&self, eye: Eye) -> &EyeData {
        match eye {
            Eye::Left => &self.left_eye,
            Eye::Right => &self.right_eye,
        }
    }
}

/// Which eye a measurement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}
