//! Column resolution by alias list and regex.
//!
//! Prospect lists name their columns inconsistently (`Bedrift`, `Firma`,
//! `Juridisk selskapsnavn`, ...), so resolution runs in two layers: exact
//! alias lists for the lookup columns, case-insensitive anchor regexes for
//! identification columns that only drive column ordering. Resolution
//! happens exactly once, before row selection; everything downstream works
//! with the resolved indices.

use std::sync::LazyLock;

use prospektor_pipeline_models::{EnrichmentResult, Record};
use regex::Regex;

use crate::{Dataset, DatasetError};

/// Annotation column receiving the resolved phone number.
pub const PHONE_COLUMN: &str = "PROSPEKTOR (TLF)";
/// Annotation column receiving the resolved source.
pub const SOURCE_COLUMN: &str = "PROSPEKTOR (KILDE)";
/// Pre-existing phone column consulted on the fallback path.
pub const FALLBACK_COLUMN: &str = "Proff Telefon";

const COMPANY_ALIASES: [&str; 5] = [
    "Juridisk selskapsnavn",
    "Selskapsnavn",
    "Bedrift",
    "Company",
    "Firma",
];
const PERSON_ALIASES: [&str; 4] = ["Navn", "Person", "Kontaktperson", "Name"];

static COMPANY_ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(firma|bedrift|selskapsnavn|company|navn)").expect("valid regex")
});
static ORGNR_ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(org(\.|nr)?|organisasjons?nr)").expect("valid regex"));
static PHONE_ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(telefon|phone|tlf|mobil|proff ?telefon)").expect("valid regex")
});

/// Resolved column indices, valid for the prepared dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    /// Company name column used for lookups.
    pub company: usize,
    /// Person name column used for lookups.
    pub person: usize,
    /// Pre-existing phone column for the fallback path, when present.
    pub fallback: Option<usize>,
    /// Annotation column for the resolved phone.
    pub phone_out: usize,
    /// Annotation column for the resolved source.
    pub source_out: usize,
}

/// Prepares a raw dataset for enrichment: drops junk columns, ensures the
/// two annotation columns exist, reorders the identification columns into a
/// leading block and resolves the lookup columns.
///
/// # Errors
///
/// Returns [`DatasetError::MissingColumn`] when no company or person column
/// can be resolved. This is fatal before any row is scheduled.
pub fn prepare(dataset: &mut Dataset) -> Result<ResolvedColumns, DatasetError> {
    strip_junk_columns(dataset);

    let company_anchor = find_anchor(dataset, &COMPANY_ANCHOR_RE);
    let orgnr_anchor = find_anchor(dataset, &ORGNR_ANCHOR_RE);
    let phone_anchor = find_anchor(dataset, &PHONE_ANCHOR_RE);

    let company_name = COMPANY_ALIASES
        .iter()
        .find(|alias| dataset.column_index(alias).is_some())
        .map(ToString::to_string)
        .or_else(|| company_anchor.clone())
        .ok_or_else(|| missing("company"))?;
    let person_name = PERSON_ALIASES
        .iter()
        .find(|alias| dataset.column_index(alias).is_some())
        .map(ToString::to_string)
        .ok_or_else(|| missing("person"))?;

    if dataset.column_index(PHONE_COLUMN).is_none() {
        dataset.add_column(PHONE_COLUMN);
    }
    if dataset.column_index(SOURCE_COLUMN).is_none() {
        dataset.add_column(SOURCE_COLUMN);
    }

    let ordering_anchor = company_anchor.unwrap_or_else(|| company_name.clone());
    let mut leading: Vec<&str> = vec![&ordering_anchor];
    if let Some(name) = orgnr_anchor.as_deref() {
        leading.push(name);
    }
    if let Some(name) = phone_anchor.as_deref() {
        leading.push(name);
    }
    leading.push(PHONE_COLUMN);
    leading.push(SOURCE_COLUMN);

    let mut order: Vec<usize> = Vec::new();
    for name in leading {
        if let Some(index) = dataset.column_index(name)
            && !order.contains(&index)
        {
            order.push(index);
        }
    }
    for index in 0..dataset.headers().len() {
        if !order.contains(&index) {
            order.push(index);
        }
    }
    dataset.reorder_columns(&order);

    let columns = ResolvedColumns {
        company: dataset
            .column_index(&company_name)
            .ok_or_else(|| missing("company"))?,
        person: dataset
            .column_index(&person_name)
            .ok_or_else(|| missing("person"))?,
        fallback: dataset.column_index(FALLBACK_COLUMN).or_else(|| {
            phone_anchor
                .as_deref()
                .and_then(|name| dataset.column_index(name))
        }),
        phone_out: dataset
            .column_index(PHONE_COLUMN)
            .ok_or_else(|| missing(PHONE_COLUMN))?,
        source_out: dataset
            .column_index(SOURCE_COLUMN)
            .ok_or_else(|| missing(SOURCE_COLUMN))?,
    };

    log::debug!(
        "resolved columns: company={company_name} person={person_name} fallback={:?}",
        columns.fallback.map(|i| &dataset.headers()[i])
    );
    Ok(columns)
}

/// Extracts one [`Record`] per dataset row, using the resolved columns.
#[must_use]
pub fn records(dataset: &Dataset, columns: &ResolvedColumns) -> Vec<Record> {
    (0..dataset.row_count())
        .map(|index| Record {
            index,
            company: dataset.cell(index, columns.company).to_owned(),
            person: dataset.cell(index, columns.person).to_owned(),
            fallback_phone: columns
                .fallback
                .map(|column| dataset.cell(index, column))
                .unwrap_or_default()
                .to_owned(),
        })
        .collect()
}

/// Writes each result's phone and source into the annotation columns at the
/// result's row index. Rows without a result keep their empty annotations.
///
/// # Panics
///
/// Panics when a result's index is out of range for the dataset; results
/// always come from records extracted from the same dataset.
pub fn apply_results(
    dataset: &mut Dataset,
    columns: &ResolvedColumns,
    results: &[EnrichmentResult],
) {
    for result in results {
        dataset.set_cell(result.index, columns.phone_out, result.phone.clone());
        dataset.set_cell(result.index, columns.source_out, result.source.clone());
    }
}

fn missing(name: &str) -> DatasetError {
    DatasetError::MissingColumn {
        name: name.to_string(),
    }
}

/// First header matching `re`, skipping the annotation columns so a
/// re-uploaded processed file resolves the same way as the raw original.
fn find_anchor(dataset: &Dataset, re: &Regex) -> Option<String> {
    dataset
        .headers()
        .iter()
        .filter(|header| header.as_str() != PHONE_COLUMN && header.as_str() != SOURCE_COLUMN)
        .find(|header| re.is_match(header))
        .cloned()
}

fn strip_junk_columns(dataset: &mut Dataset) {
    let keep: Vec<bool> = dataset
        .headers()
        .iter()
        .map(|header| {
            let junk = header.starts_with("Unnamed")
                || (header.to_lowercase().starts_with("kilder") && header != SOURCE_COLUMN);
            !junk
        })
        .collect();
    if keep.contains(&false) {
        dataset.retain_columns(&keep);
    }
}
