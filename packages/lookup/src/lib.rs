#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Phone lookup against an external enrichment service.
//!
//! [`PhoneLookup`] is the seam the pipeline depends on; [`SonarClient`] is
//! the production implementation, speaking the Perplexity chat completions
//! protocol. One invocation issues exactly one outbound call — retry policy,
//! rate limiting and row timeouts all live in the pipeline crate.

pub mod parsing;
pub mod sonar;

use async_trait::async_trait;
use prospektor_pipeline_models::LookupOutcome;
use thiserror::Error;

pub use sonar::{DEFAULT_MODEL, SonarClient};

/// Errors from a lookup attempt.
#[derive(Debug, Error)]
pub enum LookupError {
    /// HTTP request to the lookup service failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service returned a non-2xx status.
    #[error("lookup service error: {message}")]
    Service {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// One call to the external enrichment service.
#[async_trait]
pub trait PhoneLookup: Send + Sync {
    /// Asks the service for the phone number of `person` at `company` and
    /// parses the answer into a [`LookupOutcome`].
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] on transport failure, non-2xx status or an
    /// undecodable response body.
    async fn lookup(&self, company: &str, person: &str) -> Result<LookupOutcome, LookupError>;
}
