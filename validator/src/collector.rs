//! Per-point gaze sample collection.
//!
//! `SampleCollector` owns the single in-progress draft and decides, for each
//! incoming sample, whether to keep it, drop it, or finalize the draft.
//! `CollectedPoints` is the list of finalized points, at most one per
//! (tolerantly) distinct stimulus location.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::clock::{Clock, Stopwatch};
use crate::config::ValidatorConfig;
use crate::gaze::GazeSample;
use crate::geometry::NormalizedPoint2D;

/// Initial capacity of the collected-point list.
const COLLECTED_POINTS_INITIAL_CAPACITY: usize = 5;

// ── Collected point ─────────────────────────────────────────

/// Samples gathered for one stimulus location, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedPoint {
    pub screen_point: NormalizedPoint2D,
    pub samples: Vec<GazeSample>,
}

impl CollectedPoint {
    /// Empty draft with room for `capacity` samples.
    pub fn with_capacity(screen_point: NormalizedPoint2D, capacity: usize) -> Self {
        Self {
            screen_point,
            samples: Vec::with_capacity(capacity),
        }
    }

    pub fn gaze_data_count(&self) -> usize {
        self.samples.len()
    }

    /// Append `other`'s samples after this point's own.
    pub fn extend_from(&mut self, other: CollectedPoint) {
        self.samples.extend(other.samples);
    }
}

// ── Collected point list ────────────────────────────────────

/// Finalized points, keyed by tolerant screen-point equality.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedPoints {
    points: Vec<CollectedPoint>,
}

impl CollectedPoints {
    pub fn new() -> Self {
        Self {
            points: Vec::with_capacity(COLLECTED_POINTS_INITIAL_CAPACITY),
        }
    }

    /// Add a finalized point, merging into an existing entry for the same
    /// stimulus. Existing samples stay first.
    pub fn merge(&mut self, point: CollectedPoint) {
        match self.find_mut(&point.screen_point) {
            Some(existing) => {
                debug!(
                    "merging {} samples into point {} ({} existing)",
                    point.samples.len(),
                    existing.screen_point,
                    existing.samples.len()
                );
                existing.extend_from(point);
            }
            None => self.points.push(point),
        }
    }

    /// Remove the entry for `screen_point`. Returns whether one was removed.
    pub fn discard(&mut self, screen_point: &NormalizedPoint2D) -> bool {
        match self.points.iter().position(|p| p.screen_point.approx_eq(screen_point)) {
            Some(idx) => {
                self.points.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Drop all points and start over with a fresh list.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn find(&self, screen_point: &NormalizedPoint2D) -> Option<&CollectedPoint> {
        self.points.iter().find(|p| p.screen_point.approx_eq(screen_point))
    }

    fn find_mut(&mut self, screen_point: &NormalizedPoint2D) -> Option<&mut CollectedPoint> {
        self.points.iter_mut().find(|p| p.screen_point.approx_eq(screen_point))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn as_slice(&self) -> &[CollectedPoint] {
        &self.points
    }
}

impl Default for CollectedPoints {
    fn default() -> Self {
        Self::new()
    }
}

// ── Sample collector ────────────────────────────────────────

/// Why a draft was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeReason {
    /// The collection deadline passed first.
    TimedOut,
    /// The draft holds the configured number of valid samples.
    SampleCountReached,
}

impl FinalizeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimedOut => "timed-out",
            Self::SampleCountReached => "sample-count-reached",
        }
    }
}

/// What happened to one incoming sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingest {
    /// No draft is open.
    Idle,
    /// Stored in the draft.
    Accepted,
    /// Rejected because a gaze point was invalid.
    Dropped,
    /// The draft was closed; the caller takes ownership of it.
    Finalized {
        reason: FinalizeReason,
        point: CollectedPoint,
    },
}

/// Holds the in-progress draft and its deadline.
#[derive(Debug)]
pub struct SampleCollector {
    sample_count: usize,
    timeout: Duration,
    draft: Option<CollectedPoint>,
    stopwatch: Stopwatch,
}

impl SampleCollector {
    pub fn new(config: &ValidatorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            sample_count: config.sample_count(),
            timeout: config.timeout(),
            draft: None,
            stopwatch: Stopwatch::new(clock),
        }
    }

    /// Open a fresh draft for `screen_point`, discarding any stale one, and
    /// restart the deadline.
    pub fn begin(&mut self, screen_point: NormalizedPoint2D) {
        self.draft = Some(CollectedPoint::with_capacity(screen_point, self.sample_count));
        self.stopwatch.reset();
        self.stopwatch.start();
        info!(
            "collecting {} samples for {} (timeout {} ms)",
            self.sample_count,
            screen_point,
            self.timeout.as_millis()
        );
    }

    /// Throw away the draft, if any.
    pub fn discard(&mut self) {
        self.draft = None;
        self.stopwatch.reset();
    }

    pub fn is_active(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&CollectedPoint> {
        self.draft.as_ref()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.stopwatch.elapsed_ms()
    }

    /// Route one incoming sample.
    ///
    /// Checks the deadline first, then stores the sample if both gaze points
    /// are valid and there is room. The draft closes as soon as it is full.
    pub fn ingest(&mut self, sample: &GazeSample) -> Ingest {
        let Some(draft) = self.draft.as_mut() else {
            return Ingest::Idle;
        };

        if self.stopwatch.elapsed() > self.timeout {
            return self.finalize(FinalizeReason::TimedOut);
        }

        if draft.samples.len() >= self.sample_count {
            return self.finalize(FinalizeReason::SampleCountReached);
        }

        if !sample.is_binocular_valid() {
            debug!("dropping sample with invalid gaze point");
            return Ingest::Dropped;
        }

        draft.samples.push(*sample);
        if draft.samples.len() >= self.sample_count {
            return self.finalize(FinalizeReason::SampleCountReached);
        }
        Ingest::Accepted
    }

    fn finalize(&mut self, reason: FinalizeReason) -> Ingest {
        self.stopwatch.stop();
        match self.draft.take() {
            Some(point) => {
                info!(
                    "point {} finalized ({}): {}/{} samples after {} ms",
                    point.screen_point,
                    reason.as_str(),
                    point.samples.len(),
                    self.sample_count,
                    self.stopwatch.elapsed_ms()
                );
                Ingest::Finalized { reason, point }
            }
            None => Ingest::Idle,
        }
    }
}
