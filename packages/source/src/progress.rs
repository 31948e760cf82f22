//! Progress reporting for imports and downloads.
//!
//! Library code reports through [`ProgressCallback`]; the binary decides
//! how to render it (progress bars in `bikeshare_cli_utils`, nothing in
//! tests).

use std::sync::Arc;

/// Receives progress updates from a long-running step.
pub trait ProgressCallback: Send + Sync {
    /// Sets the expected number of units (rows, files, months).
    fn set_total(&self, total: u64);

    /// Advances by `delta` units.
    fn inc(&self, delta: u64);

    /// Replaces the status message.
    fn set_message(&self, msg: String);

    /// Marks the step finished with a final message.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
