//! Accuracy and precision statistics over collected points.
//!
//! All metrics are angles in degrees:
//!
//! - **accuracy**: angle between the mean gaze direction
//!   (`mean_origin → mean_point`) and the target direction
//!   (`mean_origin → stimulus`).
//! - **precision**: root mean square of the angle between each sample's
//!   direction (`origin_i → point_i`) and the direction from the same origin
//!   to the mean gaze point.
//! - **precision RMS**: root mean square of the angle between consecutive
//!   sample directions (sample-to-sample jitter).
//!
//! A point with fewer samples than the configured count timed out; its
//! metrics are NaN and it is excluded from the averages.

use std::fmt::Write as _;

use tracing::info;

use crate::collector::CollectedPoint;
use crate::gaze::{Eye, GazeSample};
use crate::geometry::{angle_deg, DisplayArea, GeometryError, NormalizedPoint2D, Point3, Vec3};

// ── Metrics ─────────────────────────────────────────────────

/// The three metrics for one eye, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub precision_rms: f64,
}

impl EyeMetrics {
    /// All metrics undefined (insufficient data).
    pub const UNDEFINED: Self = Self {
        accuracy: f64::NAN,
        precision: f64::NAN,
        precision_rms: f64::NAN,
    };

    pub fn is_undefined(&self) -> bool {
        self.accuracy.is_nan() && self.precision.is_nan() && self.precision_rms.is_nan()
    }
}

/// Result for one stimulus location.
#[derive(Debug, Clone)]
pub struct ValidationPoint {
    pub screen_point: NormalizedPoint2D,
    /// Fewer valid samples than requested were collected.
    pub timed_out: bool,
    pub left: EyeMetrics,
    pub right: EyeMetrics,
    /// Raw samples, kept even for timed-out points.
    pub samples: Vec<GazeSample>,
}

impl ValidationPoint {
    pub fn accuracy_left(&self) -> f64 {
        self.left.accuracy
    }
    pub fn accuracy_right(&self) -> f64 {
        self.right.accuracy
    }
    pub fn precision_left(&self) -> f64 {
        self.left.precision
    }
    pub fn precision_right(&self) -> f64 {
        self.right.precision
    }
    pub fn precision_rms_left(&self) -> f64 {
        self.left.precision_rms
    }
    pub fn precision_rms_right(&self) -> f64 {
        self.right.precision_rms
    }

    pub fn gaze_data_count(&self) -> usize {
        self.samples.len()
    }
}

/// Per-point results plus averages over the points that did not time out.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub points: Vec<ValidationPoint>,
    pub average_left: EyeMetrics,
    pub average_right: EyeMetrics,
}

impl ValidationResult {
    pub fn average_accuracy_left(&self) -> f64 {
        self.average_left.accuracy
    }
    pub fn average_accuracy_right(&self) -> f64 {
        self.average_right.accuracy
    }
    pub fn average_precision_left(&self) -> f64 {
        self.average_left.precision
    }
    pub fn average_precision_right(&self) -> f64 {
        self.average_right.precision
    }
    pub fn average_precision_rms_left(&self) -> f64 {
        self.average_left.precision_rms
    }
    pub fn average_precision_rms_right(&self) -> f64 {
        self.average_right.precision_rms
    }

    pub fn points_count(&self) -> usize {
        self.points.len()
    }

    /// Points that reached the configured sample count.
    pub fn measured_points(&self) -> impl Iterator<Item = &ValidationPoint> {
        self.points.iter().filter(|p| !p.timed_out)
    }

    /// Compact s-expression report for IPC consumers.
    pub fn to_sexp(&self) -> String {
        let mut out = format!(
            "(:points-count {} :average (:left {} :right {}) :points (",
            self.points.len(),
            metrics_sexp(&self.average_left),
            metrics_sexp(&self.average_right),
        );
        for (i, p) in self.points.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(
                out,
                "(:screen-point ({:.4} {:.4}) :timed-out {} :samples {} :left {} :right {})",
                p.screen_point.x,
                p.screen_point.y,
                if p.timed_out { "t" } else { "nil" },
                p.samples.len(),
                metrics_sexp(&p.left),
                metrics_sexp(&p.right),
            );
        }
        out.push_str("))");
        out
    }
}

fn metrics_sexp(m: &EyeMetrics) -> String {
    format!(
        "(:accuracy {} :precision {} :precision-rms {})",
        sexp_float(m.accuracy),
        sexp_float(m.precision),
        sexp_float(m.precision_rms),
    )
}

fn sexp_float(v: f64) -> String {
    if v.is_nan() {
        "nil".to_string()
    } else {
        format!("{:.4}", v)
    }
}

// ── Computation ─────────────────────────────────────────────

/// A point whose gaze geometry has no direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegenerateGaze {
    pub screen_point: NormalizedPoint2D,
    pub eye: Eye,
    pub source: GeometryError,
}

/// Compute per-point metrics and averages.
///
/// Pure: reads `points` and `display_area` only.
pub fn compute(
    points: &[CollectedPoint],
    display_area: &DisplayArea,
    sample_count: usize,
) -> Result<ValidationResult, DegenerateGaze> {
    let mut out = Vec::with_capacity(points.len());
    for point in points {
        let vp = if point.samples.len() < sample_count {
            ValidationPoint {
                screen_point: point.screen_point,
                timed_out: true,
                left: EyeMetrics::UNDEFINED,
                right: EyeMetrics::UNDEFINED,
                samples: point.samples.clone(),
            }
        } else {
            let stimulus = display_area.to_user_coordinates(&point.screen_point);
            let metrics = |eye: Eye| {
                eye_metrics(&point.samples, eye, stimulus).map_err(|source| DegenerateGaze {
                    screen_point: point.screen_point,
                    eye,
                    source,
                })
            };
            ValidationPoint {
                screen_point: point.screen_point,
                timed_out: false,
                left: metrics(Eye::Left)?,
                right: metrics(Eye::Right)?,
                samples: point.samples.clone(),
            }
        };
        out.push(vp);
    }

    let average_left = average(out.iter().filter(|p| !p.timed_out).map(|p| &p.left));
    let average_right = average(out.iter().filter(|p| !p.timed_out).map(|p| &p.right));

    info!(
        "validation computed over {} points ({} measured): accuracy L {:.3} R {:.3}, precision L {:.3} R {:.3}",
        out.len(),
        out.iter().filter(|p| !p.timed_out).count(),
        average_left.accuracy,
        average_right.accuracy,
        average_left.precision,
        average_right.precision,
    );

    Ok(ValidationResult {
        points: out,
        average_left,
        average_right,
    })
}

/// Metrics for one eye over a non-empty sample sequence.
fn eye_metrics(
    samples: &[GazeSample],
    eye: Eye,
    stimulus: Point3,
) -> Result<EyeMetrics, GeometryError> {
    let origins = samples.iter().map(|s| s.eye(eye).gaze_origin.position_in_user_coordinates);
    let points = samples.iter().map(|s| s.eye(eye).gaze_point.position_in_user_coordinates);
    let (Some(mean_origin), Some(mean_point)) = (Vec3::mean(origins), Vec3::mean(points)) else {
        return Ok(EyeMetrics::UNDEFINED);
    };

    let accuracy = angle_deg(
        Vec3::between(mean_origin, mean_point).normalize()?,
        Vec3::between(mean_origin, stimulus).normalize()?,
    )?;

    let mut directions = Vec::with_capacity(samples.len());
    let mut sum_sq = 0.0;
    for s in samples {
        let data = s.eye(eye);
        let origin = data.gaze_origin.position_in_user_coordinates;
        let direction = data.gaze_direction().normalize()?;
        let toward_mean = Vec3::between(origin, mean_point).normalize()?;
        let a = angle_deg(direction, toward_mean)?;
        sum_sq += a * a;
        directions.push(direction);
    }
    let precision = (sum_sq / samples.len() as f64).sqrt();

    Ok(EyeMetrics {
        accuracy,
        precision,
        precision_rms: precision_rms(&directions)?,
    })
}

/// RMS of consecutive-direction angles. NaN for fewer than two directions.
fn precision_rms(directions: &[Vec3]) -> Result<f64, GeometryError> {
    if directions.len() < 2 {
        return Ok(f64::NAN);
    }
    let mut sum_sq = 0.0;
    for pair in directions.windows(2) {
        let a = angle_deg(pair[0], pair[1])?;
        sum_sq += a * a;
    }
    Ok((sum_sq / (directions.len() - 1) as f64).sqrt())
}

/// Sum-then-divide average; NaN when there is nothing to average.
fn average<'a, I>(metrics: I) -> EyeMetrics
where
    I: Iterator<Item = &'a EyeMetrics>,
{
    let mut sum = EyeMetrics {
        accuracy: 0.0,
        precision: 0.0,
        precision_rms: 0.0,
    };
    let mut count = 0usize;
    for m in metrics {
        sum.accuracy += m.accuracy;
        sum.precision += m.precision;
        sum.precision_rms += m.precision_rms;
        count += 1;
    }
    if count == 0 {
        return EyeMetrics::UNDEFINED;
    }
    let n = count as f64;
    EyeMetrics {
        accuracy: sum.accuracy / n,
        precision: sum.precision / n,
        precision_rms: sum.precision_rms / n,
    }
}
