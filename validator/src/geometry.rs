//! Geometry primitives for calibration validation.
//!
//! 3D points and vectors live in the eye tracker's user coordinate system
//! (millimetres, origin at the tracker). Stimulus points are normalized
//! active-display coordinates in `[0, 1]²`, mapped into 3D through the
//! tracker's display area.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use thiserror::Error;

/// Relative tolerance used when matching stimulus points.
pub const SCREEN_POINT_REL_TOLERANCE: f64 = 1e-9;
/// Absolute tolerance used when matching stimulus points.
pub const SCREEN_POINT_ABS_TOLERANCE: f64 = 0.0;

/// Errors from vector operations that have no defined result.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeometryError {
    /// The vector has zero (or non-finite) length and no direction.
    #[error("vector has no direction (length {length})")]
    ZeroLength { length: f64 },
}

// ── Vec3 ────────────────────────────────────────────────────

/// 3D vector in the user coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A position in the user coordinate system.
///
/// Same representation as [`Vec3`]; the alias marks the role.
pub type Point3 = Vec3;

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Vector pointing from `from` to `to`.
    pub fn between(from: Point3, to: Point3) -> Self {
        to - from
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction.
    ///
    /// Fails for zero-length and non-finite vectors instead of dividing by zero.
    pub fn normalize(self) -> Result<Self, GeometryError> {
        let len = self.length();
        if len == 0.0 || !len.is_finite() {
            return Err(GeometryError::ZeroLength { length: len });
        }
        Ok(self / len)
    }

    /// Componentwise arithmetic mean. `None` for an empty input.
    pub fn mean<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        let mut sum = Self::ZERO;
        let mut count = 0usize;
        for p in points {
            sum = sum + p;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(sum / count as f64)
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// Angle between two vectors in degrees, in `[0, 180]`.
///
/// The cosine is clamped to `[-1, 1]` so rounding overshoot on (anti)parallel
/// vectors cannot push `acos` out of its domain.
pub fn angle_deg(u: Vec3, v: Vec3) -> Result<f64, GeometryError> {
    let denom = u.length() * v.length();
    if denom == 0.0 || !denom.is_finite() {
        return Err(GeometryError::ZeroLength { length: denom });
    }
    let cos = (u.dot(v) / denom).clamp(-1.0, 1.0);
    Ok(cos.acos().to_degrees())
}

// ── Normalized 2D point ─────────────────────────────────────

/// A stimulus location in normalized active-display coordinates.
///
/// `(0, 0)` is the top-left corner of the display area, `(1, 1)` the
/// bottom-right one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedPoint2D {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both coordinates lie in `[0, 1]`. NaN is outside.
    pub fn is_on_display(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }

    /// Tolerant equality used to match re-collected and discarded points.
    pub fn approx_eq(&self, other: &Self) -> bool {
        is_close(self.x, other.x) && is_close(self.y, other.y)
    }
}

impl fmt::Display for NormalizedPoint2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

fn is_close(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    diff <= (SCREEN_POINT_REL_TOLERANCE * a.abs().max(b.abs())).max(SCREEN_POINT_ABS_TOLERANCE)
}

// ── Display area ────────────────────────────────────────────

/// Physical placement of the active display in user coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayArea {
    pub top_left: Point3,
    pub top_right: Point3,
    pub bottom_left: Point3,
}

impl DisplayArea {
    pub fn new(top_left: Point3, top_right: Point3, bottom_left: Point3) -> Self {
        Self {
            top_left,
            top_right,
            bottom_left,
        }
    }

    /// Fourth corner, completing the parallelogram.
    pub fn bottom_right(&self) -> Point3 {
        self.top_right + (self.bottom_left - self.top_left)
    }

    pub fn width(&self) -> f64 {
        (self.top_right - self.top_left).length()
    }

    pub fn height(&self) -> f64 {
        (self.bottom_left - self.top_left).length()
    }

    /// Map a normalized stimulus point onto the display plane.
    pub fn to_user_coordinates(&self, point: &NormalizedPoint2D) -> Point3 {
        let dx = self.top_right - self.top_left;
        let dy = self.bottom_left - self.top_left;
        self.top_left + dx * point.x + dy * point.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn unit_square() -> DisplayArea {
        DisplayArea::new(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
        )
    }

    #[test]
    fn test_center_maps_to_square_center() {
        let area = unit_square();
        let p = area.to_user_coordinates(&NormalizedPoint2D::new(0.5, 0.5));
        assert_abs_diff_eq!(p.x, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(p.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_corners_map_to_corners() {
        let area = unit_square();
        assert_eq!(
            area.to_user_coordinates(&NormalizedPoint2D::new(0.0, 0.0)),
            area.top_left
        );
        assert_eq!(
            area.to_user_coordinates(&NormalizedPoint2D::new(1.0, 0.0)),
            area.top_right
        );
        assert_eq!(
            area.to_user_coordinates(&NormalizedPoint2D::new(0.0, 1.0)),
            area.bottom_left
        );
        assert_eq!(
            area.to_user_coordinates(&NormalizedPoint2D::new(1.0, 1.0)),
            area.bottom_right()
        );
    }

    #[test]
    fn test_display_area_dimensions() {
        let area = DisplayArea::new(
            Vec3::new(-250.0, 300.0, 50.0),
            Vec3::new(250.0, 300.0, 50.0),
            Vec3::new(-250.0, 20.0, 0.0),
        );
        assert_abs_diff_eq!(area.width(), 500.0, epsilon = 1e-9);
        assert_abs_diff_eq!(area.height(), (280.0f64 * 280.0 + 2500.0).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_angle_same_vector_is_zero() {
        for u in [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.3, -2.0, 7.5),
            Vec3::new(1e-3, 1e-3, -1e-3),
        ] {
            assert_abs_diff_eq!(angle_deg(u, u).unwrap(), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_angle_opposite_vector_is_180() {
        let u = Vec3::new(0.3, -2.0, 7.5);
        assert_abs_diff_eq!(angle_deg(u, -u).unwrap(), 180.0, epsilon = 1e-5);
    }

    #[test]
    fn test_angle_orthogonal_is_90() {
        let a = angle_deg(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 5.0)).unwrap();
        assert_abs_diff_eq!(a, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_angle_ignores_magnitude() {
        let a = angle_deg(Vec3::new(1.0, 1.0, 0.0), Vec3::new(3.0, 0.0, 0.0)).unwrap();
        assert_abs_diff_eq!(a, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_angle_zero_vector_errors() {
        assert!(angle_deg(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_normalize() {
        let n = Vec3::new(3.0, 0.0, -4.0).normalize().unwrap();
        assert_abs_diff_eq!(n.length(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(n.x, 0.6, epsilon = 1e-12);
        assert!(matches!(
            Vec3::ZERO.normalize(),
            Err(GeometryError::ZeroLength { .. })
        ));
        assert!(Vec3::new(f64::NAN, 0.0, 0.0).normalize().is_err());
    }

    #[test]
    fn test_mean() {
        let m = Vec3::mean([Vec3::new(1.0, 2.0, 3.0), Vec3::new(3.0, 4.0, 5.0)]).unwrap();
        assert_eq!(m, Vec3::new(2.0, 3.0, 4.0));
        assert!(Vec3::mean(std::iter::empty()).is_none());
    }

    #[test]
    fn test_between_points_from_first_to_second() {
        let v = Vec3::between(Vec3::new(1.0, 1.0, 1.0), Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(v, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_screen_point_bounds() {
        assert!(NormalizedPoint2D::new(0.0, 1.0).is_on_display());
        assert!(NormalizedPoint2D::new(0.3, 0.3).is_on_display());
        assert!(!NormalizedPoint2D::new(1.5, 0.2).is_on_display());
        assert!(!NormalizedPoint2D::new(0.2, -0.01).is_on_display());
        assert!(!NormalizedPoint2D::new(f64::NAN, 0.5).is_on_display());
    }

    #[test]
    fn test_screen_point_tolerant_equality() {
        let a = NormalizedPoint2D::new(0.3, 0.7);
        assert!(a.approx_eq(&NormalizedPoint2D::new(0.3 + 1e-12, 0.7)));
        assert!(!a.approx_eq(&NormalizedPoint2D::new(0.3 + 1e-6, 0.7)));
        assert!(NormalizedPoint2D::new(0.0, 0.0).approx_eq(&NormalizedPoint2D::new(0.0, 0.0)));
        assert!(!NormalizedPoint2D::new(0.0, 0.0).approx_eq(&NormalizedPoint2D::new(1e-300, 0.0)));
    }
}
