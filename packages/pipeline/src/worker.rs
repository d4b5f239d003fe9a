//! Per-row enrichment worker.
//!
//! Each worker takes one record through the full sequence: rate budget
//! acquisition, the remote lookup under a hard per-row deadline, then
//! fallback resolution. Every record yields exactly one result; lookup
//! errors and timeouts degrade to the fallback path instead of failing
//! the run.

use std::time::Duration;

use prospektor_lookup::PhoneLookup;
use prospektor_phone::{is_digits, normalize};
use prospektor_pipeline_models::{EnrichmentResult, LookupOutcome, NO_SOURCE, Record};

use crate::rate::TokenBucket;

/// Runs one record through lookup and fallback resolution.
///
/// Records naming neither a company nor a person skip the remote call
/// entirely and go straight to the fallback path.
pub async fn enrich_row(
    record: &Record,
    lookup: &dyn PhoneLookup,
    bucket: &TokenBucket,
    row_timeout: Duration,
) -> EnrichmentResult {
    let outcome = if record.is_blank() {
        LookupOutcome::Absent
    } else {
        bucket.acquire().await;
        match tokio::time::timeout(row_timeout, lookup.lookup(&record.company, &record.person))
            .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => LookupOutcome::Failed {
                reason: err.to_string(),
            },
            Err(_) => LookupOutcome::Failed {
                reason: format!("timed out after {row_timeout:?}"),
            },
        }
    };
    resolve(record, outcome)
}

/// Maps a lookup outcome to the phone/source pair written back to the row.
///
/// Found phones are normalized before annotation; one that does not
/// normalize to digits is treated as absent.
#[must_use]
pub fn resolve(record: &Record, outcome: LookupOutcome) -> EnrichmentResult {
    let (phone, source) = match outcome {
        LookupOutcome::Found { phone, source } => {
            usable(&phone).map_or_else(|| fallback(record), |phone| (phone, source))
        }
        LookupOutcome::FoundNoSource { phone } => usable(&phone)
            .map_or_else(|| fallback(record), |phone| (phone, NO_SOURCE.to_string())),
        LookupOutcome::Absent => fallback(record),
        LookupOutcome::Failed { reason } => {
            log::warn!("row {}: lookup failed: {reason}", record.index);
            fallback(record)
        }
    };
    EnrichmentResult {
        index: record.index,
        phone,
        source,
    }
}

/// Normalizes a phone candidate, rejecting anything that does not come
/// out all digits.
fn usable(phone: &str) -> Option<String> {
    let candidate = normalize(phone);
    is_digits(&candidate).then_some(candidate)
}

/// Keeps a pre-existing phone number when the lookup produced nothing.
/// The fallback path always carries the [`NO_SOURCE`] marker; a value
/// that does not normalize to digits degrades to an empty phone.
fn fallback(record: &Record) -> (String, String) {
    let phone = usable(&record.fallback_phone).unwrap_or_default();
    (phone, NO_SOURCE.to_string())
}
