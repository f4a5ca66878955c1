//! Process-wide atomic counters for the detection pipeline.
//!
//! Counters are bumped silently at the call site; [`Metrics::flush`] emits
//! all of them as one `tracing::info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    detections_received: AtomicU64,
    detections_dropped: AtomicU64,
    pipelines_completed: AtomicU64,
    pipelines_failed: AtomicU64,
    notifications_failed: AtomicU64,
    resolutions: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            detections_received: AtomicU64::new(0),
            detections_dropped: AtomicU64::new(0),
            pipelines_completed: AtomicU64::new(0),
            pipelines_failed: AtomicU64::new(0),
            notifications_failed: AtomicU64::new(0),
            resolutions: AtomicU64::new(0),
        }
    }

    fn bump(counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = name, "counter incremented");
    }

    pub fn inc_received(&self) {
        Self::bump(&self.detections_received, "detections_received");
    }

    pub fn inc_dropped(&self) {
        Self::bump(&self.detections_dropped, "detections_dropped");
    }

    pub fn inc_completed(&self) {
        Self::bump(&self.pipelines_completed, "pipelines_completed");
    }

    pub fn inc_failed(&self) {
        Self::bump(&self.pipelines_failed, "pipelines_failed");
    }

    pub fn inc_notification_failed(&self) {
        Self::bump(&self.notifications_failed, "notifications_failed");
    }

    pub fn inc_resolutions(&self) {
        Self::bump(&self.resolutions, "resolutions");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            detections_received = self.detections_received(),
            detections_dropped = self.detections_dropped(),
            pipelines_completed = self.pipelines_completed(),
            pipelines_failed = self.pipelines_failed(),
            notifications_failed = self.notifications_failed(),
            resolutions = self.resolutions(),
        );
    }

    pub fn detections_received(&self) -> u64 {
        self.detections_received.load(Ordering::Relaxed)
    }

    pub fn detections_dropped(&self) -> u64 {
        self.detections_dropped.load(Ordering::Relaxed)
    }

    pub fn pipelines_completed(&self) -> u64 {
        self.pipelines_completed.load(Ordering::Relaxed)
    }

    pub fn pipelines_failed(&self) -> u64 {
        self.pipelines_failed.load(Ordering::Relaxed)
    }

    pub fn notifications_failed(&self) -> u64 {
        self.notifications_failed.load(Ordering::Relaxed)
    }

    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.detections_received,
            &self.detections_dropped,
            &self.pipelines_completed,
            &self.pipelines_failed,
            &self.notifications_failed,
            &self.resolutions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
