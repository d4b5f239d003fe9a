#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Norwegian phone number normalization and free-text extraction.
//!
//! Input data arrives from spreadsheets, so phone values show up as floats
//! (`47912345.0`), padded strings, country-code-prefixed numbers or plain
//! junk. [`normalize`] canonicalizes anything numeric into a digit string and
//! passes everything else through untouched; [`extract_phone`] digs an
//! 8-digit Norwegian number out of free text.

use std::sync::LazyLock;

use regex::Regex;

/// 8-digit Norwegian number, optionally prefixed with `0047`/`+47`, with
/// spaces or dots tolerated between digit groups.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:0047|\+47)?\D*((?:\d[\s.]*){7}\d)\b").expect("valid regex")
});

/// Canonicalizes a raw phone value into a comparable digit string.
///
/// Empty input yields an empty string. Numeric input (including spreadsheet
/// floats like `47912345.0`) is rendered as an integer-valued decimal string.
/// Anything unparseable, and non-finite parses like `nan`, comes back
/// trimmed but otherwise unchanged; callers must treat non-digit results as
/// unusable rather than expect an error here.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => format!("{:.0}", value.trunc()),
        _ => trimmed.to_string(),
    }
}

/// Scans free text for an 8-digit Norwegian phone number and returns the
/// digits with any separators stripped.
#[must_use]
pub fn extract_phone(text: &str) -> Option<String> {
    let captures = PHONE_RE.captures(text)?;
    Some(
        captures[1]
            .chars()
            .filter(char::is_ascii_digit)
            .collect::<String>(),
    )
}

/// Whether `s` is non-empty and consists solely of ASCII digits.
#[must_use]
pub fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
