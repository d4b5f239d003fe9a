//! Progress reporting and snapshot publication.
//!
//! [`ProgressCallback`] decouples progress rendering from the pipeline
//! (`indicatif` bars in the CLI, silence in tests). [`ProgressTracker`]
//! owns the per-run counter and additionally publishes JSON snapshots to
//! blob storage so the HTTP API can serve them while a run is in flight.

use std::sync::Arc;

use prospektor_pipeline_models::ProgressSnapshot;
use prospektor_storage::{BlobStore, PROGRESS};

use crate::PipelineError;

/// Trait for reporting progress from long-running operations.
///
/// Implementations must be `Send + Sync` to support use across spawned
/// tokio tasks and `Arc`-based sharing.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Set the current position (absolute, not delta).
    fn set_position(&self, pos: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);

    /// Mark progress as complete and remove the progress indicator.
    fn finish_and_clear(&self);
}

/// A no-op implementation of [`ProgressCallback`] that silently ignores
/// all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn set_position(&self, _pos: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

/// Tracks completed rows for one run and publishes every change.
///
/// The counter is monotonic: it moves forward one completion at a time,
/// whatever order the results arrive in, and never exceeds the total.
pub struct ProgressTracker {
    total: usize,
    processed: usize,
    store: Option<(Arc<dyn BlobStore>, String)>,
    callback: Option<Arc<dyn ProgressCallback>>,
}

impl ProgressTracker {
    /// Creates a tracker for `total` records with no publication targets.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            store: None,
            callback: None,
        }
    }

    /// Publishes every snapshot as JSON under `key` in the progress
    /// container of `store`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        self.store = Some((store, key.into()));
        self
    }

    /// Forwards progress changes to a rendering callback.
    #[must_use]
    pub fn with_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(self.processed, self.total)
    }

    /// Publishes the initial zero snapshot, so consumers can tell a run
    /// that has started from one that never began.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be serialized or stored.
    pub async fn start(&mut self) -> Result<(), PipelineError> {
        if let Some(callback) = &self.callback {
            callback.set_total(self.total as u64);
        }
        self.publish().await
    }

    /// Records one completed row and publishes the updated snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be serialized or stored.
    pub async fn record(&mut self) -> Result<(), PipelineError> {
        if self.processed < self.total {
            self.processed += 1;
        }
        if let Some(callback) = &self.callback {
            callback.inc(1);
        }
        self.publish().await
    }

    /// Marks the run finished on the rendering callback.
    pub fn finish(&self, msg: String) {
        if let Some(callback) = &self.callback {
            callback.finish(msg);
        }
    }

    async fn publish(&self) -> Result<(), PipelineError> {
        if let Some((store, key)) = &self.store {
            let bytes = serde_json::to_vec(&self.snapshot())?;
            store.put(PROGRESS, key, &bytes).await?;
        }
        Ok(())
    }
}
