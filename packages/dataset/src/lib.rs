#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CSV dataset handling for prospect lists.
//!
//! A [`Dataset`] is a header row plus string cells. The interesting part is
//! [`columns`]: prospect lists arrive with wildly inconsistent headers, so
//! the company/person/fallback columns are resolved once by alias list and
//! regex before any enrichment starts, and the pipeline only ever sees
//! resolved indices.

use std::io;
use std::path::Path;

use thiserror::Error;

pub mod columns;

pub use columns::{
    FALLBACK_COLUMN, PHONE_COLUMN, ResolvedColumns, SOURCE_COLUMN, apply_results, prepare,
    records,
};

/// Errors from dataset reading, writing and column resolution.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Underlying file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A required identifying column could not be resolved.
    #[error("missing required column: {name}")]
    MissingColumn {
        /// Which column concept was missing (`company` or `person`).
        name: String,
    },
}

/// An in-memory tabular dataset: ordered headers plus string cells.
///
/// Rows are padded or truncated to the header width on read, so cell access
/// by resolved column index is always in range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Parses a CSV document with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Csv`] on malformed CSV.
    pub fn from_reader(reader: impl io::Read) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|header| header.trim().to_owned())
            .collect();

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let row: Vec<String> = (0..headers.len())
                .map(|i| record.get(i).unwrap_or("").to_owned())
                .collect();
            rows.push(row);
        }

        log::debug!("read {} rows x {} columns", rows.len(), headers.len());
        Ok(Self { headers, rows })
    }

    /// Reads a CSV file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the file cannot be opened or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(io::BufReader::new(file))
    }

    /// Serializes the dataset back to CSV bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Csv`] if writing fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DatasetError> {
        let mut bytes = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut bytes);
            writer.write_record(&self.headers)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        Ok(bytes)
    }

    /// Writes the dataset to a CSV file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if serialization or the write fails.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Column headers, in order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell value at `row`/`column`.
    ///
    /// # Panics
    ///
    /// Panics when `row` or `column` is out of range.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> &str {
        &self.rows[row][column]
    }

    /// Overwrites the cell at `row`/`column`.
    ///
    /// # Panics
    ///
    /// Panics when `row` or `column` is out of range.
    pub fn set_cell(&mut self, row: usize, column: usize, value: String) {
        self.rows[row][column] = value;
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    fn add_column(&mut self, name: &str) -> usize {
        self.headers.push(name.to_owned());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    fn retain_columns(&mut self, keep: &[bool]) {
        let mut index = 0;
        self.headers.retain(|_| {
            let kept = keep[index];
            index += 1;
            kept
        });
        for row in &mut self.rows {
            let mut index = 0;
            row.retain(|_| {
                let kept = keep[index];
                index += 1;
                kept
            });
        }
    }

    fn reorder_columns(&mut self, order: &[usize]) {
        self.headers = order.iter().map(|&i| self.headers[i].clone()).collect();
        for row in &mut self.rows {
            *row = order.iter().map(|&i| row[i].clone()).collect();
        }
    }
}
