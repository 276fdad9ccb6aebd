//! Session attendance: each recognized name once, with its first-seen time,
//! appended to a CSV log when the session ends.

use crate::types::UNKNOWN_LABEL;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::Path;
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write attendance: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush attendance: {0}")]
    Io(#[from] std::io::Error),
}

/// A person marked present, with the moment they were first recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Time")]
    time: String,
}

/// Names marked present this session, in the order they were first seen.
#[derive(Debug, Default)]
pub struct AttendanceLog {
    records: Vec<AttendanceRecord>,
    marked: HashSet<String>,
}

impl AttendanceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `name` present at `at` unless already marked. Returns `true` if
    /// this call added it. The reserved `Unknown` label is never recorded.
    pub fn record_if_new(&mut self, name: &str, at: NaiveDateTime) -> bool {
        if name == UNKNOWN_LABEL || self.marked.contains(name) {
            return false;
        }

        self.marked.insert(name.to_string());
        self.records.push(AttendanceRecord {
            name: name.to_string(),
            date: at.date(),
            time: at.time(),
        });
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    /// Append one `Name,Date,Time` row per record to `path`. The header is
    /// written only when the file is new or empty. Returns rows written.
    pub fn append_csv(&self, path: &Path) -> Result<usize, AttendanceError> {
        let needs_header = std::fs::metadata(path).map_or(true, |m| m.len() == 0);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| AttendanceError::Open {
                path: path.display().to_string(),
                source,
            })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        for record in &self.records {
            writer.serialize(CsvRow {
                name: &record.name,
                date: record.date.format(DATE_FORMAT).to_string(),
                time: record.time.format(TIME_FORMAT).to_string(),
            })?;
        }
        writer.flush()?;

        Ok(self.records.len())
    }
}
