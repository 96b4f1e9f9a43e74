//! Calibration validator: the validation-mode state machine.
//!
//! ```text
//! Idle ──enter──▶ Armed ──start_collecting_data──▶ Collecting
//!  ▲               │  ▲                               │
//!  └────leave──────┘  └──── timeout / count reached ──┘
//! ```
//!
//! Gaze samples arrive on a tracker-owned thread. Public operations are
//! serialized by `control`; the state they share with the sample callback
//! lives behind `shared`. Tracker subscribe and unsubscribe calls are made
//! while holding `control` only, never `shared`.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::collector::{CollectedPoints, Ingest, SampleCollector};
use crate::config::{ValidatorConfig, SAMPLE_COUNT_DEFAULT, TIMEOUT_MS_DEFAULT};
use crate::error::{DestroyError, ValidationError};
use crate::gaze::GazeSample;
use crate::geometry::NormalizedPoint2D;
use crate::statistics::{self, ValidationResult};
use crate::tracker::{EyeTracker, GazeCallback, SubscriptionId, TrackerResolver};

/// Validation-mode state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidatorState {
    /// Not in validation mode; no gaze subscription.
    #[default]
    Idle,
    /// In validation mode, waiting for the next stimulus point.
    Armed,
    /// Collecting samples for one stimulus point.
    Collecting,
}

impl ValidatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Collecting => "collecting",
        }
    }
}

/// State touched by both the API and the sample callback.
struct Shared {
    state: ValidatorState,
    collector: SampleCollector,
    collected: CollectedPoints,
    subscription: Option<SubscriptionId>,
}

impl Shared {
    fn on_gaze_data(&mut self, sample: &GazeSample) {
        if self.state != ValidatorState::Collecting {
            return;
        }
        if let Ingest::Finalized { reason, point } = self.collector.ingest(sample) {
            debug!("merging {} ({})", point.screen_point, reason.as_str());
            self.collected.merge(point);
            self.state = ValidatorState::Armed;
        }
    }
}

/// Screen-based calibration validator bound to one eye tracker.
///
/// Dropping the validator unsubscribes from the gaze stream on a best-effort
/// basis; use [`CalibrationValidator::destroy`] to observe failures.
pub struct CalibrationValidator {
    tracker: Arc<dyn EyeTracker>,
    config: ValidatorConfig,
    control: Mutex<()>,
    shared: Arc<Mutex<Shared>>,
}

impl CalibrationValidator {
    /// Resolve `address` and build a validator.
    ///
    /// Parameters are checked before the address is resolved. No gaze
    /// subscription is made until [`enter_validation_mode`](Self::enter_validation_mode).
    pub fn init(
        resolver: &dyn TrackerResolver,
        address: &str,
        sample_count: usize,
        timeout_ms: u64,
    ) -> Result<Self, ValidationError> {
        let config = ValidatorConfig::new(sample_count, timeout_ms)?;
        let tracker = resolver
            .resolve(address)
            .ok_or_else(|| ValidationError::InvalidEyetracker {
                address: address.to_string(),
            })?;
        Ok(Self::new(tracker, config, Arc::new(SystemClock)))
    }

    /// [`init`](Self::init) with 30 samples per point and a 1000 ms timeout.
    pub fn init_default(
        resolver: &dyn TrackerResolver,
        address: &str,
    ) -> Result<Self, ValidationError> {
        Self::init(resolver, address, SAMPLE_COUNT_DEFAULT, TIMEOUT_MS_DEFAULT)
    }

    pub fn new(
        tracker: Arc<dyn EyeTracker>,
        config: ValidatorConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        info!(
            "calibration validator for {} ({} samples, {} ms timeout)",
            tracker.address(),
            config.sample_count(),
            config.timeout_ms()
        );
        Self {
            tracker,
            config,
            control: Mutex::new(()),
            shared: Arc::new(Mutex::new(Shared {
                state: ValidatorState::Idle,
                collector: SampleCollector::new(&config, clock),
                collected: CollectedPoints::new(),
                subscription: None,
            })),
        }
    }

    // ── Mode ────────────────────────────────────────────────

    /// `Idle → Armed`: subscribe to gaze data with an empty point list.
    pub fn enter_validation_mode(&self) -> Result<(), ValidationError> {
        let _control = self.control.lock();
        if self.shared.lock().state != ValidatorState::Idle {
            return Err(ValidationError::AlreadyInValidationMode);
        }

        let id = self.tracker.subscribe_to_gaze_data(self.gaze_callback())?;

        let mut shared = self.shared.lock();
        shared.collected = CollectedPoints::new();
        shared.collector.discard();
        shared.subscription = Some(id);
        shared.state = ValidatorState::Armed;
        info!(
            "entered validation mode on {} (subscription {})",
            self.tracker.address(),
            id
        );
        Ok(())
    }

    /// `Armed → Idle`: unsubscribe and drop all collected data.
    pub fn leave_validation_mode(&self) -> Result<(), ValidationError> {
        let _control = self.control.lock();
        let subscription = {
            let shared = self.shared.lock();
            match shared.state {
                ValidatorState::Idle => return Err(ValidationError::NotInValidationMode),
                ValidatorState::Collecting => {
                    return Err(ValidationError::OperationNotAllowedDuringDataCollection)
                }
                ValidatorState::Armed => shared.subscription,
            }
        };

        if let Some(id) = subscription {
            self.tracker.unsubscribe_from_gaze_data(id)?;
        }

        let mut shared = self.shared.lock();
        shared.subscription = None;
        shared.collector.discard();
        shared.collected.reset();
        shared.state = ValidatorState::Idle;
        info!("left validation mode on {}", self.tracker.address());
        Ok(())
    }

    // ── Collection ──────────────────────────────────────────

    /// `Armed → Collecting`: start gathering samples for `screen_point`.
    ///
    /// Returns immediately; poll [`is_collecting_data`](Self::is_collecting_data)
    /// to learn when the point is finalized.
    pub fn start_collecting_data(
        &self,
        screen_point: NormalizedPoint2D,
    ) -> Result<(), ValidationError> {
        let _control = self.control.lock();
        let mut shared = self.shared.lock();
        match shared.state {
            ValidatorState::Idle => return Err(ValidationError::NotInValidationMode),
            ValidatorState::Collecting => {
                return Err(ValidationError::OperationNotAllowedDuringDataCollection)
            }
            ValidatorState::Armed => {}
        }
        if !screen_point.is_on_display() {
            return Err(ValidationError::InvalidScreenPoint(screen_point));
        }

        shared.collector.begin(screen_point);
        shared.state = ValidatorState::Collecting;
        Ok(())
    }

    /// Drop every collected point. Allowed in `Idle` and `Armed`.
    pub fn clear_collected_data(&self) -> Result<(), ValidationError> {
        let _control = self.control.lock();
        let mut shared = self.shared.lock();
        if shared.state == ValidatorState::Collecting {
            return Err(ValidationError::OperationNotAllowedDuringDataCollection);
        }
        let dropped = shared.collected.len();
        shared.collector.discard();
        shared.collected = CollectedPoints::new();
        debug!("cleared {} collected points", dropped);
        Ok(())
    }

    /// Remove the point matching `screen_point`, if one was collected.
    pub fn discard_collected_data(
        &self,
        screen_point: NormalizedPoint2D,
    ) -> Result<(), ValidationError> {
        let _control = self.control.lock();
        let mut shared = self.shared.lock();
        match shared.state {
            ValidatorState::Idle => return Err(ValidationError::NotInValidationMode),
            ValidatorState::Collecting => {
                return Err(ValidationError::OperationNotAllowedDuringDataCollection)
            }
            ValidatorState::Armed => {}
        }
        if shared.collected.discard(&screen_point) {
            debug!("discarded collected point {}", screen_point);
        }
        Ok(())
    }

    // ── Results ─────────────────────────────────────────────

    /// Compute accuracy and precision over every collected point.
    ///
    /// Collected data is left untouched, so this may be called repeatedly.
    pub fn compute(&self) -> Result<ValidationResult, ValidationError> {
        let _control = self.control.lock();
        let points = {
            let shared = self.shared.lock();
            if shared.state == ValidatorState::Collecting {
                return Err(ValidationError::OperationNotAllowedDuringDataCollection);
            }
            if shared.collected.is_empty() {
                return Err(ValidationError::NoDataCollected);
            }
            shared.collected.as_slice().to_vec()
        };

        let area = self.tracker.display_area()?;
        statistics::compute(&points, &area, self.config.sample_count()).map_err(|e| {
            warn!(
                "cannot compute validation for {} ({} eye): {}",
                e.screen_point,
                e.eye.as_str(),
                e.source
            );
            ValidationError::DegenerateGazeVector {
                screen_point: e.screen_point,
            }
        })
    }

    // ── Queries ─────────────────────────────────────────────

    pub fn is_validation_mode(&self) -> bool {
        self.state() != ValidatorState::Idle
    }

    pub fn is_collecting_data(&self) -> bool {
        self.state() == ValidatorState::Collecting
    }

    pub fn state(&self) -> ValidatorState {
        self.shared.lock().state
    }

    /// Number of distinct stimulus points collected so far.
    pub fn collected_point_count(&self) -> usize {
        self.shared.lock().collected.len()
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn tracker(&self) -> &Arc<dyn EyeTracker> {
        &self.tracker
    }

    // ── Teardown ────────────────────────────────────────────

    /// Unsubscribe and release the validator.
    ///
    /// On failure the validator is returned inside the error, unchanged.
    pub fn destroy(self) -> Result<(), DestroyError> {
        match self.release() {
            Ok(()) => Ok(()),
            Err(error) => Err(DestroyError {
                validator: self,
                error,
            }),
        }
    }

    fn release(&self) -> Result<(), ValidationError> {
        let _control = self.control.lock();
        let subscription = {
            let shared = self.shared.lock();
            if shared.state == ValidatorState::Collecting {
                return Err(ValidationError::OperationNotAllowedDuringDataCollection);
            }
            shared.subscription
        };

        if let Some(id) = subscription {
            self.tracker.unsubscribe_from_gaze_data(id)?;
        }

        let mut shared = self.shared.lock();
        shared.subscription = None;
        shared.collector.discard();
        shared.collected.reset();
        shared.state = ValidatorState::Idle;
        Ok(())
    }

    fn gaze_callback(&self) -> GazeCallback {
        let shared: Weak<Mutex<Shared>> = Arc::downgrade(&self.shared);
        Arc::new(move |sample: &GazeSample| {
            if let Some(shared) = shared.upgrade() {
                shared.lock().on_gaze_data(sample);
            }
        })
    }

    /// Status as an s-expression for IPC consumers.
    pub fn status_sexp(&self) -> String {
        let shared = self.shared.lock();
        format!(
            "(:tracker \"{}\" :state :{} :sample-count {} :timeout-ms {} :collected {})",
            self.tracker.address(),
            shared.state.as_str(),
            self.config.sample_count(),
            self.config.timeout_ms(),
            shared.collected.len(),
        )
    }
}

impl Drop for CalibrationValidator {
    fn drop(&mut self) {
        let subscription = self.shared.lock().subscription.take();
        if let Some(id) = subscription {
            if let Err(e) = self.tracker.unsubscribe_from_gaze_data(id) {
                warn!("failed to unsubscribe {} on drop: {}", id, e);
            }
        }
    }
}

impl fmt::Debug for CalibrationValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.lock();
        f.debug_struct("CalibrationValidator")
            .field("tracker", &self.tracker.address())
            .field("config", &self.config)
            .field("state", &shared.state)
            .field("collected", &shared.collected.len())
            .field("subscription", &shared.subscription)
            .finish()
    }
}
