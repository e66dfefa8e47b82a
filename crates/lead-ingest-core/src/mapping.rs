//! Raw CSV header → canonical field mapping.
//!
//! A [`HeaderMapping`] is a one-to-one table from raw header names to schema
//! [`Field`]s. Given the header row of a particular file it produces a
//! [`ColumnPlan`], which says for each column index which field (if any) the
//! column feeds. Columns whose header is not in the table are dropped.

use std::collections::HashMap;

use thiserror::Error;

use crate::models::{normalize_value, PersonRecord, ValidationError};
use crate::schema::Field;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("raw header '{0}' is mapped more than once")]
    DuplicateHeader(String),

    #[error("field '{field}' is mapped from both '{first}' and '{second}'")]
    FieldMappedTwice {
        field: Field,
        first: String,
        second: String,
    },
}

/// One-to-one table from raw header names to schema fields.
#[derive(Debug, Clone)]
pub struct HeaderMapping {
    by_header: HashMap<String, Field>,
}

impl HeaderMapping {
    /// Build a mapping, rejecting duplicate raw headers and any field that
    /// would be fed from more than one header.
    pub fn new<I, S>(pairs: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (S, Field)>,
        S: Into<String>,
    {
        let mut by_header = HashMap::new();
        let mut by_field: HashMap<Field, String> = HashMap::new();
        for (header, field) in pairs {
            let header: String = header.into();
            let header = clean_header(&header).to_string();
            if by_header.contains_key(&header) {
                return Err(MappingError::DuplicateHeader(header));
            }
            if let Some(first) = by_field.get(&field) {
                return Err(MappingError::FieldMappedTwice {
                    field,
                    first: first.clone(),
                    second: header,
                });
            }
            by_field.insert(field, header.clone());
            by_header.insert(header, field);
        }
        Ok(Self { by_header })
    }

    /// The mapping of every field from its [`Field::default_header`].
    pub fn standard() -> Self {
        let by_header = Field::ALL
            .iter()
            .map(|&f| (f.default_header().to_string(), f))
            .collect();
        Self { by_header }
    }

    pub fn field_for(&self, raw_header: &str) -> Option<Field> {
        self.by_header.get(clean_header(raw_header)).copied()
    }

    pub fn len(&self) -> usize {
        self.by_header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_header.is_empty()
    }

    /// Resolve a file's header row into a [`ColumnPlan`].
    ///
    /// If a file repeats a mapped header, the first column wins and the
    /// later header is reported in [`ColumnPlan::duplicates`].
    pub fn plan<'a, I>(&self, headers: I) -> ColumnPlan
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = [false; Field::COUNT];
        let mut columns = Vec::new();
        let mut headers_out = Vec::new();
        let mut duplicates = Vec::new();
        for raw in headers {
            let header = clean_header(raw).to_string();
            let field = match self.field_for(&header) {
                Some(f) if seen[f.index()] => {
                    duplicates.push(header.clone());
                    None
                }
                Some(f) => {
                    seen[f.index()] = true;
                    Some(f)
                }
                None => None,
            };
            columns.push(field);
            headers_out.push(header);
        }
        ColumnPlan {
            columns,
            headers: headers_out,
            duplicates,
        }
    }
}

impl Default for HeaderMapping {
    fn default() -> Self {
        Self::standard()
    }
}

fn clean_header(raw: &str) -> &str {
    raw.trim_start_matches('\u{feff}').trim()
}

/// Per-file column layout produced by [`HeaderMapping::plan`].
#[derive(Debug, Clone)]
pub struct ColumnPlan {
    columns: Vec<Option<Field>>,
    headers: Vec<String>,
    duplicates: Vec<String>,
}

impl ColumnPlan {
    /// Field fed by column `index`, if any.
    pub fn field(&self, index: usize) -> Option<Field> {
        self.columns.get(index).copied().flatten()
    }

    /// Number of columns that map onto a schema field.
    pub fn mapped_count(&self) -> usize {
        self.columns.iter().filter(|c| c.is_some()).count()
    }

    /// Headers that appeared more than once and were ignored.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Build a record from one row of raw byte values.
    ///
    /// Unmapped columns are skipped without being decoded; extra trailing
    /// values beyond the header row are ignored and missing trailing values
    /// stay `None`.
    pub fn build_record<'a, I>(&self, values: I) -> Result<PersonRecord, ValidationError>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut pairs = Vec::with_capacity(self.columns.len());
        for (index, bytes) in values.into_iter().enumerate() {
            let Some(field) = self.field(index) else {
                continue;
            };
            let text = std::str::from_utf8(bytes).map_err(|_| ValidationError::InvalidUtf8 {
                header: self.headers[index].clone(),
            })?;
            if normalize_value(text).is_some() {
                pairs.push((field, text));
            }
        }
        Ok(PersonRecord::from_pairs(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_maps_every_default_header() {
        let mapping = HeaderMapping::standard();
        assert_eq!(mapping.len(), Field::COUNT);
        assert_eq!(mapping.field_for("Full name"), Some(Field::FullName));
        assert_eq!(mapping.field_for("Emails"), Some(Field::Email));
        assert_eq!(mapping.field_for(" Company Name "), Some(Field::CompanyName));
        assert_eq!(mapping.field_for("Favourite colour"), None);
    }

    #[test]
    fn rejects_many_to_one() {
        let err = HeaderMapping::new([("Emails", Field::Email), ("E-mail", Field::Email)])
            .unwrap_err();
        assert_eq!(
            err,
            MappingError::FieldMappedTwice {
                field: Field::Email,
                first: "Emails".to_string(),
                second: "E-mail".to_string(),
            }
        );
    }

    #[test]
    fn rejects_duplicate_header() {
        let err = HeaderMapping::new([("Name", Field::FullName), ("Name", Field::FirstName)])
            .unwrap_err();
        assert_eq!(err, MappingError::DuplicateHeader("Name".to_string()));
    }

    #[test]
    fn plan_drops_unknown_columns() {
        let mapping = HeaderMapping::standard();
        let plan = mapping.plan(["\u{feff}Full name", "Notes", "Emails"]);
        assert_eq!(plan.field(0), Some(Field::FullName));
        assert_eq!(plan.field(1), None);
        assert_eq!(plan.field(2), Some(Field::Email));
        assert_eq!(plan.field(3), None);
        assert_eq!(plan.mapped_count(), 2);

        let row: [&[u8]; 3] = [b"Ada", b"ignored", b"ada@example.com"];
        let record = plan.build_record(row).unwrap();
        assert_eq!(record.get(Field::FullName), Some("Ada"));
        assert_eq!(record.get(Field::Email), Some("ada@example.com"));
        assert_eq!(record.filled_count(), 2);
    }

    #[test]
    fn plan_keeps_first_of_repeated_header() {
        let mapping = HeaderMapping::standard();
        let plan = mapping.plan(["Emails", "Emails"]);
        assert_eq!(plan.field(0), Some(Field::Email));
        assert_eq!(plan.field(1), None);
        assert_eq!(plan.duplicates(), &["Emails".to_string()]);
    }

    #[test]
    fn short_rows_leave_fields_empty() {
        let plan = HeaderMapping::standard().plan(["Full name", "Emails", "Location"]);
        let row: [&[u8]; 1] = [b"Ada"];
        let record = plan.build_record(row).unwrap();
        assert_eq!(record.get(Field::FullName), Some("Ada"));
        assert_eq!(record.get(Field::Location), None);
    }

    #[test]
    fn invalid_utf8_in_mapped_column_is_rejected() {
        let plan = HeaderMapping::standard().plan(["Notes", "Full name"]);
        let ok: [&[u8]; 2] = [b"\xff\xfe", b"Ada"];
        assert!(plan.build_record(ok).is_ok(), "unmapped column is not decoded");

        let bad: [&[u8]; 2] = [b"x", b"Ad\xffa"];
        assert_eq!(
            plan.build_record(bad).unwrap_err(),
            ValidationError::InvalidUtf8 {
                header: "Full name".to_string()
            }
        );
    }
}
