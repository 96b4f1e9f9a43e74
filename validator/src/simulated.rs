//! In-process eye tracker and deterministic gaze generator.
//!
//! Used by the integration tests and the demo binary in place of real
//! hardware. Samples are pushed explicitly with [`SimulatedEyeTracker::deliver`]
//! from whichever thread the caller chooses.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::gaze::{EyeData, GazeOrigin, GazePoint, GazeSample, PupilData, Validity};
use crate::geometry::{DisplayArea, NormalizedPoint2D, Point3, Vec3};
use crate::tracker::{EyeTracker, GazeCallback, SubscriptionId, TrackerError};

/// A 510 × 290 mm display standing in the z = 0 plane above the tracker.
pub fn default_display_area() -> DisplayArea {
    DisplayArea::new(
        Vec3::new(-255.0, 300.0, 0.0),
        Vec3::new(255.0, 300.0, 0.0),
        Vec3::new(-255.0, 10.0, 0.0),
    )
}

// ── Fault injection ─────────────────────────────────────────

/// Operations that should fail on the next call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerFaults {
    pub subscribe: bool,
    pub unsubscribe: bool,
    pub display_area: bool,
}

// ── Simulated tracker ───────────────────────────────────────

/// Eye tracker backed by an in-memory subscriber list.
pub struct SimulatedEyeTracker {
    address: String,
    display_area: DisplayArea,
    subscribers: RwLock<Vec<(SubscriptionId, GazeCallback)>>,
    next_id: AtomicU64,
    faults: Mutex<TrackerFaults>,
}

impl SimulatedEyeTracker {
    pub fn new(address: impl Into<String>, display_area: DisplayArea) -> Self {
        Self {
            address: address.into(),
            display_area,
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            faults: Mutex::new(TrackerFaults::default()),
        }
    }

    pub fn with_default_display(address: impl Into<String>) -> Self {
        Self::new(address, default_display_area())
    }

    /// Push one sample to every subscriber. Returns how many were notified.
    ///
    /// Holds the subscriber read lock for the whole delivery, so an
    /// unsubscription waits until in-flight callbacks have returned.
    pub fn deliver(&self, sample: &GazeSample) -> usize {
        let subscribers = self.subscribers.read();
        for (_, callback) in subscribers.iter() {
            callback(sample);
        }
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn set_faults(&self, faults: TrackerFaults) {
        *self.faults.lock() = faults;
    }
}

impl EyeTracker for SimulatedEyeTracker {
    fn address(&self) -> &str {
        &self.address
    }

    fn subscribe_to_gaze_data(
        &self,
        callback: GazeCallback,
    ) -> Result<SubscriptionId, TrackerError> {
        if self.faults.lock().subscribe {
            return Err(TrackerError::Subscribe(format!(
                "{}: gaze stream unavailable",
                self.address
            )));
        }
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, callback));
        debug!("{}: gaze subscriber {} added", self.address, id);
        Ok(id)
    }

    fn unsubscribe_from_gaze_data(&self, id: SubscriptionId) -> Result<(), TrackerError> {
        if self.faults.lock().unsubscribe {
            return Err(TrackerError::Unsubscribe(format!(
                "{}: gaze stream unavailable",
                self.address
            )));
        }
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        if subscribers.len() == before {
            return Err(TrackerError::UnknownSubscription(id));
        }
        debug!("{}: gaze subscriber {} removed", self.address, id);
        Ok(())
    }

    fn display_area(&self) -> Result<DisplayArea, TrackerError> {
        if self.faults.lock().display_area {
            return Err(TrackerError::DisplayArea(format!(
                "{}: display area not configured",
                self.address
            )));
        }
        Ok(self.display_area)
    }
}

// ── Simulated gaze ──────────────────────────────────────────

/// Deterministic binocular gaze generator fixating a stimulus.
///
/// The gaze point lands on the display plane, displaced from the stimulus by
/// a constant horizontal `offset_deg` (accuracy error) plus a saccade-free
/// wobble of amplitude `jitter_deg` (precision error).
#[derive(Debug, Clone)]
pub struct SimulatedGaze {
    pub left_origin: Point3,
    pub right_origin: Point3,
    /// Systematic angular error (degrees).
    pub offset_deg: f64,
    /// Jitter amplitude (degrees).
    pub jitter_deg: f64,
    /// Every n-th sample has an invalid right-eye gaze point. 0 disables.
    pub dropout_every: u64,
    pub sample_rate_hz: f64,
    sample_index: u64,
}

impl SimulatedGaze {
    pub fn new() -> Self {
        Self {
            left_origin: Vec3::new(-32.0, 150.0, 600.0),
            right_origin: Vec3::new(32.0, 150.0, 600.0),
            offset_deg: 0.0,
            jitter_deg: 0.0,
            dropout_every: 0,
            sample_rate_hz: 120.0,
            sample_index: 0,
        }
    }

    /// Number of samples generated so far.
    pub fn samples_generated(&self) -> u64 {
        self.sample_index
    }

    /// Generate the next sample looking at `target`.
    pub fn generate(&mut self, area: &DisplayArea, target: &NormalizedPoint2D) -> GazeSample {
        let i = self.sample_index;
        self.sample_index += 1;

        let t = i as f64 / self.sample_rate_hz.max(1.0);
        let wobble_h = (t * 17.0).sin() * self.jitter_deg;
        let wobble_v = (t * 13.0).cos() * self.jitter_deg;

        let stimulus = area.to_user_coordinates(target);
        let dropped = self.dropout_every > 0 && (i + 1) % self.dropout_every == 0;

        let left = self.eye(area, self.left_origin, stimulus, wobble_h, wobble_v, true);
        let right = self.eye(area, self.right_origin, stimulus, wobble_h, wobble_v, !dropped);

        let stamp = (t * 1e6) as i64;
        GazeSample {
            left_eye: left,
            right_eye: right,
            device_time_stamp: stamp,
            system_time_stamp: stamp,
        }
    }

    fn eye(
        &self,
        area: &DisplayArea,
        origin: Point3,
        stimulus: Point3,
        wobble_h: f64,
        wobble_v: f64,
        valid: bool,
    ) -> EyeData {
        let distance = (stimulus - origin).length();
        let across = (area.top_right - area.top_left) / area.width().max(f64::MIN_POSITIVE);
        let down = (area.bottom_left - area.top_left) / area.height().max(f64::MIN_POSITIVE);

        let dh = distance * (self.offset_deg + wobble_h).to_radians().tan();
        let dv = distance * wobble_v.to_radians().tan();
        let point = stimulus + across * dh + down * dv;

        let rel = point - area.top_left;
        let on_display = NormalizedPoint2D::new(
            rel.dot(across) / area.width().max(f64::MIN_POSITIVE),
            rel.dot(down) / area.height().max(f64::MIN_POSITIVE),
        );

        EyeData {
            gaze_point: GazePoint {
                position_on_display_area: on_display,
                position_in_user_coordinates: point,
                validity: Validity::from(valid),
            },
            gaze_origin: GazeOrigin {
                position_in_user_coordinates: origin,
                validity: Validity::Valid,
            },
            pupil: PupilData {
                diameter: 3.2,
                validity: Validity::Valid,
            },
        }
    }
}

impl Default for SimulatedGaze {
    fn default() -> Self {
        Self::new()
    }
}
