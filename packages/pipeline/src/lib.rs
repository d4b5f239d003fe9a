#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Enrichment pipeline orchestration.
//!
//! Takes a parsed dataset, resolves its columns, selects the working set of
//! rows and fans the row lookups out across a bounded worker pool under a
//! shared rate budget. Completions are folded back into the dataset by row
//! index and reported as progress snapshots along the way.

pub mod progress;
pub mod rate;
pub mod run;
pub mod select;
pub mod settings;
pub mod worker;

pub use progress::{NullProgress, ProgressCallback, ProgressTracker, null_progress};
pub use rate::{RateBudget, TokenBucket};
pub use run::PipelineRun;
pub use settings::PipelineSettings;

/// Errors that can occur while running the enrichment pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Dataset parsing or column resolution failed.
    #[error("Dataset error: {0}")]
    Dataset(#[from] prospektor_dataset::DatasetError),

    /// Blob store operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] prospektor_storage::StorageError),

    /// Progress snapshot serialization failed.
    #[error("JSON serialize error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (settings file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file parsing failed.
    #[error("Settings parse error: {0}")]
    Settings(#[from] toml::de::Error),
}
