//! Eye tracker abstraction: gaze stream subscription and display geometry.
//!
//! The validator only talks to the device through [`EyeTracker`], so tests and
//! the demo binary can drive it with [`crate::simulated::SimulatedEyeTracker`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::gaze::GazeSample;
use crate::geometry::DisplayArea;

/// Callback invoked for every gaze sample, on a thread owned by the tracker.
pub type GazeCallback = Arc<dyn Fn(&GazeSample) + Send + Sync>;

/// Handle for an active gaze stream subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Failures reported by an eye tracker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("eye tracker {0:?} not found")]
    NotFound(String),
    #[error("gaze stream subscription failed: {0}")]
    Subscribe(String),
    #[error("gaze stream unsubscription failed: {0}")]
    Unsubscribe(String),
    #[error("unknown subscription {0}")]
    UnknownSubscription(SubscriptionId),
    #[error("display area query failed: {0}")]
    DisplayArea(String),
}

/// A connected eye tracker.
///
/// Implementations must guarantee that once `unsubscribe_from_gaze_data`
/// returns, the callback is neither running nor invoked again.
pub trait EyeTracker: Send + Sync {
    /// Address the tracker was resolved from.
    fn address(&self) -> &str;

    /// Start delivering gaze samples to `callback`.
    fn subscribe_to_gaze_data(
        &self,
        callback: GazeCallback,
    ) -> Result<SubscriptionId, TrackerError>;

    /// Stop delivering samples to the subscription.
    fn unsubscribe_from_gaze_data(&self, id: SubscriptionId) -> Result<(), TrackerError>;

    /// Current placement of the active display in user coordinates.
    fn display_area(&self) -> Result<DisplayArea, TrackerError>;
}

/// Look up trackers by address.
pub trait TrackerResolver {
    fn resolve(&self, address: &str) -> Option<Arc<dyn EyeTracker>>;
}

// ── Registry ────────────────────────────────────────────────

/// Address → tracker table.
#[derive(Default)]
pub struct TrackerRegistry {
    trackers: HashMap<String, Arc<dyn EyeTracker>>,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tracker under its own address, replacing any previous one.
    pub fn register(&mut self, tracker: Arc<dyn EyeTracker>) {
        self.trackers.insert(tracker.address().to_string(), tracker);
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Addresses in sorted order.
    pub fn addresses(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.trackers.keys().map(String::as_str).collect();
        out.sort_unstable();
        out
    }
}

impl TrackerResolver for TrackerRegistry {
    fn resolve(&self, address: &str) -> Option<Arc<dyn EyeTracker>> {
        self.trackers.get(address).cloned()
    }
}
