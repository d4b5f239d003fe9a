//! Answer parsing: phone candidate and source resolution.

use std::sync::LazyLock;

use prospektor_pipeline_models::LookupOutcome;
use regex::Regex;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s>\]]+").expect("valid regex"));

/// Parses a free-form answer plus its citation list into a [`LookupOutcome`].
///
/// The phone candidate comes from the first non-empty answer line. The source
/// is resolved in priority order: a URL on the second non-empty line, the
/// first non-empty citation entry, any URL anywhere in the answer text. A
/// phone without a resolvable source is [`LookupOutcome::FoundNoSource`]; no
/// phone at all is [`LookupOutcome::Absent`].
#[must_use]
pub fn parse_answer(answer: &str, citations: &[String]) -> LookupOutcome {
    let mut lines = answer.lines().map(str::trim).filter(|line| !line.is_empty());
    let first = lines.next().unwrap_or_default();
    let Some(phone) = prospektor_phone::extract_phone(first) else {
        return LookupOutcome::Absent;
    };

    let second = lines.next().unwrap_or_default();
    let source = URL_RE
        .find(second)
        .map(|url| url.as_str().to_string())
        .or_else(|| {
            citations
                .iter()
                .map(|citation| citation.trim())
                .find(|citation| !citation.is_empty())
                .map(ToString::to_string)
        })
        .or_else(|| URL_RE.find(answer).map(|url| url.as_str().to_string()));

    match source {
        Some(source) => LookupOutcome::Found { phone, source },
        None => LookupOutcome::FoundNoSource { phone },
    }
}
