#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the prospektor server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the pipeline types to allow independent evolution of the API
//! contract.

use serde::{Deserialize, Serialize};

/// Response returned when an upload has been accepted for processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAccepted {
    /// Name the dataset was stored under.
    pub filename: String,
    /// Processing status, always `"processing"` on acceptance.
    pub status: String,
}

/// Query parameters shared by the upload, progress and download endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilenameParams {
    /// Name of the uploaded dataset.
    pub filename: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Service status, `"ok"` when the server is up.
    pub status: String,
}
