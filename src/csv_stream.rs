//! Streaming CSV parsing and row validation.
//!
//! [`PersonCsvReader`] pulls one row at a time from an async CSV reader, maps
//! it through a [`ColumnPlan`], and validates the result. The file is never
//! loaded whole: memory use is one row plus the reader's buffer. Because the
//! reader is pull-based, a consumer that stops asking for rows stops the
//! file from being read.
//!
//! Row-level problems (blank rows, non-UTF-8 values) are counted in
//! [`ParseStats`] and skipped. Only the first [`MAX_LOGGED_FAILURES`] per
//! file are logged. Read errors from the file itself are fatal and returned
//! to the caller.

use anyhow::{Context, Result};
use csv_async::{AsyncReader, AsyncReaderBuilder, ByteRecord};
use lead_ingest_core::{ColumnPlan, HeaderMapping, PersonRecord, ValidationError};
use serde::Serialize;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

/// Invalid rows logged per file before the rest are only counted.
pub const MAX_LOGGED_FAILURES: u64 = 3;

/// Per-file row counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub total_rows: u64,
    pub valid_rows: u64,
    pub invalid_rows: u64,
}

impl AddAssign for ParseStats {
    fn add_assign(&mut self, other: Self) {
        self.total_rows += other.total_rows;
        self.valid_rows += other.valid_rows;
        self.invalid_rows += other.invalid_rows;
    }
}

/// Pull-based reader yielding validated [`PersonRecord`]s from one file.
pub struct PersonCsvReader {
    path: PathBuf,
    reader: AsyncReader<tokio::fs::File>,
    plan: ColumnPlan,
    row: ByteRecord,
    stats: ParseStats,
}

impl PersonCsvReader {
    /// Open `path` and read its header row.
    pub async fn open(path: &Path, mapping: &HeaderMapping) -> Result<Self> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut reader = AsyncReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .create_reader(file);

        let headers = reader
            .headers()
            .await
            .with_context(|| format!("failed to read header row of {}", path.display()))?
            .clone();
        let plan = mapping.plan(headers.iter());

        if plan.mapped_count() == 0 {
            tracing::warn!(path = %path.display(), "no columns match the person schema");
        }
        for duplicate in plan.duplicates() {
            tracing::warn!(path = %path.display(), header = %duplicate, "repeated header ignored");
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            plan,
            row: ByteRecord::new(),
            stats: ParseStats::default(),
        })
    }

    /// Next valid record, or `None` at end of file.
    ///
    /// Invalid rows are counted and skipped.
    pub async fn next_record(&mut self) -> Result<Option<PersonRecord>> {
        loop {
            let more = self
                .reader
                .read_byte_record(&mut self.row)
                .await
                .with_context(|| {
                    format!(
                        "failed to read row {} of {}",
                        self.stats.total_rows + 1,
                        self.path.display()
                    )
                })?;
            if !more {
                return Ok(None);
            }

            self.stats.total_rows += 1;
            let outcome = self
                .plan
                .build_record(self.row.iter())
                .and_then(|record| record.validate().map(|()| record));
            match outcome {
                Ok(record) => {
                    self.stats.valid_rows += 1;
                    return Ok(Some(record));
                }
                Err(e) => self.reject(e),
            }
        }
    }

    fn reject(&mut self, error: ValidationError) {
        self.stats.invalid_rows += 1;
        if self.stats.invalid_rows <= MAX_LOGGED_FAILURES {
            tracing::warn!(
                path = %self.path.display(),
                row = self.stats.total_rows,
                error = %error,
                "invalid row skipped"
            );
        }
        if self.stats.invalid_rows == MAX_LOGGED_FAILURES + 1 {
            tracing::warn!(
                path = %self.path.display(),
                "further invalid rows in this file are not logged"
            );
        }
    }

    /// Counters so far; final once [`next_record`](Self::next_record) has
    /// returned `None`.
    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read a whole file without uploading anything and return its counters.
pub async fn validate_file(path: &Path, mapping: &HeaderMapping) -> Result<ParseStats> {
    let mut reader = PersonCsvReader::open(path, mapping).await?;
    while reader.next_record().await?.is_some() {}
    Ok(reader.stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_ingest_core::Field;
    use std::fs;
    use tempfile::TempDir;

    async fn read_all(path: &Path) -> (Vec<PersonRecord>, ParseStats) {
        let mapping = HeaderMapping::standard();
        let mut reader = PersonCsvReader::open(path, &mapping).await.unwrap();
        let mut records = Vec::new();
        while let Some(record) = reader.next_record().await.unwrap() {
            records.push(record);
        }
        (records, reader.stats())
    }

    #[tokio::test]
    async fn maps_headers_and_drops_unknown_columns() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("people.csv");
        fs::write(
            &path,
            "Full name,Emails,Shoe size,Company Name\n\
             Ada Lovelace,ada@example.com,38,Analytical Engines\n\
             \"Hopper, Grace\",,40,US Navy\n",
        )
        .unwrap();

        let (records, stats) = read_all(&path).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get(Field::FullName), Some("Ada Lovelace"));
        assert_eq!(records[0].get(Field::Email), Some("ada@example.com"));
        assert_eq!(records[1].get(Field::FullName), Some("Hopper, Grace"));
        assert_eq!(records[1].get(Field::Email), None);
        assert_eq!(records[1].get(Field::CompanyName), Some("US Navy"));
        assert_eq!(
            stats,
            ParseStats {
                total_rows: 2,
                valid_rows: 2,
                invalid_rows: 0
            }
        );
    }

    #[tokio::test]
    async fn invalid_rows_are_counted_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mixed.csv");
        let mut body = String::from("Full name,Emails,Skills\n");
        for i in 0..100 {
            if i % 10 == 9 {
                body.push_str(",,\n");
            } else if i == 4 {
                body.push_str(",,rust\n");
            } else {
                body.push_str(&format!("Person {i},p{i}@example.com,\n"));
            }
        }
        fs::write(&path, body).unwrap();

        let (records, stats) = read_all(&path).await;
        assert_eq!(stats.total_rows, 100);
        // only the fully blank rows are rejected; ",,rust" is a lead
        assert_eq!(stats.invalid_rows, 10);
        assert_eq!(stats.valid_rows, 90);
        assert_eq!(records.len(), 90);
        assert_eq!(records[4].get(Field::Skills), Some("rust"));
        assert_eq!(stats.valid_rows + stats.invalid_rows, stats.total_rows);
    }

    #[tokio::test]
    async fn non_utf8_value_rejects_only_that_row() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("latin1.csv");
        let mut bytes = b"Full name,Emails\n".to_vec();
        bytes.extend_from_slice(b"Jos\xe9,jose@example.com\n");
        bytes.extend_from_slice(b"Ada,ada@example.com\n");
        fs::write(&path, bytes).unwrap();

        let (records, stats) = read_all(&path).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get(Field::FullName), Some("Ada"));
        assert_eq!(stats.invalid_rows, 1);
    }

    #[tokio::test]
    async fn short_and_long_rows_are_accepted() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ragged.csv");
        fs::write(
            &path,
            "Full name,Emails,Location\nAda\nGrace,g@example.com,NYC,extra\n",
        )
        .unwrap();

        let (records, stats) = read_all(&path).await;
        assert_eq!(stats.valid_rows, 2);
        assert_eq!(records[0].get(Field::Location), None);
        assert_eq!(records[1].get(Field::Location), Some("NYC"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mapping = HeaderMapping::standard();
        assert!(PersonCsvReader::open(&tmp.path().join("nope.csv"), &mapping)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn validate_file_reports_counts() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("v.csv");
        fs::write(&path, "Full name\nAda\n\"\"\nGrace\n").unwrap();
        let stats = validate_file(&path, &HeaderMapping::standard()).await.unwrap();
        assert_eq!(stats.total_rows, 3);
        assert_eq!(stats.valid_rows, 2);
        assert_eq!(stats.invalid_rows, 1);
    }

    #[tokio::test]
    async fn name_parts_only_row_is_valid() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("names.csv");
        fs::write(
            &path,
            "First Name,Last Name,Job title,Emails
Ada,Lovelace,Analyst,
",
        )
        .unwrap();
        let stats = validate_file(&path, &HeaderMapping::standard()).await.unwrap();
        assert_eq!(
            stats,
            ParseStats {
                total_rows: 1,
                valid_rows: 1,
                invalid_rows: 0
            }
        );
    }

    #[test]
    fn stats_accumulate() {
        let mut total = ParseStats::default();
        total += ParseStats {
            total_rows: 10,
            valid_rows: 9,
            invalid_rows: 1,
        };
        total += ParseStats {
            total_rows: 5,
            valid_rows: 5,
            invalid_rows: 0,
        };
        assert_eq!(total.total_rows, 15);
        assert_eq!(total.invalid_rows, 1);
    }
}
