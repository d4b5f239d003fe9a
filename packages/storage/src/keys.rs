//! Blob key layout shared by the server, the CLI and the pipeline.
//!
//! Every key in the `progress` and `results` containers derives from the
//! uploaded file's stem, so a poller only ever needs the original filename.

/// The filename without its final extension (`liste.csv` → `liste`).
#[must_use]
pub fn file_stem(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    }
}

/// Progress document key for an upload.
#[must_use]
pub fn progress_key(stem: &str) -> String {
    format!("{stem}_progress.json")
}

/// Annotated result key for an upload.
#[must_use]
pub fn result_key(stem: &str) -> String {
    format!("{stem}_processed.csv")
}
