//! Progress reporting for long-running operations

use crate::types::LandingPhase;

/// Receives progress updates from the landing engine
///
/// Implementations decide how to render them (spinners, JSON lines, nothing).
pub trait ProgressCallback {
    /// A landing phase is starting for `branch`
    fn on_phase(&self, branch: &str, phase: LandingPhase);

    /// Informational message
    fn on_message(&self, message: &str);

    /// Degraded-but-recoverable problem; the operation continues
    fn on_warning(&self, message: &str);
}

/// Progress callback that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_phase(&self, _branch: &str, _phase: LandingPhase) {}

    fn on_message(&self, _message: &str) {}

    fn on_warning(&self, _message: &str) {}
}
