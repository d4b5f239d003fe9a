//! Working set selection with an early stop on trailing empty rows.
//!
//! Exported prospect lists often carry hundreds of formatting rows below
//! the real data. The scan stops after a run of consecutive rows naming
//! neither a company nor a person; everything scanned up to that point,
//! the triggering run included, stays in the working set so those rows
//! still receive their annotations.

use prospektor_pipeline_models::Record;

/// Number of consecutive empty rows that ends the scan.
pub const CONSECUTIVE_EMPTY_LIMIT: usize = 3;

/// Selects the records to enrich, in row order.
#[must_use]
pub fn working_set(records: Vec<Record>) -> Vec<Record> {
    let mut selected = Vec::with_capacity(records.len());
    let mut empty_run = 0;
    for record in records {
        let blank = record.is_blank();
        selected.push(record);
        if blank {
            empty_run += 1;
            if empty_run >= CONSECUTIVE_EMPTY_LIMIT {
                break;
            }
        } else {
            empty_run = 0;
        }
    }
    selected
}
