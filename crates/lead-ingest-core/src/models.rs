//! The person record and its validation rules.

use std::collections::HashMap;
use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

use crate::schema::Field;

/// Why a mapped CSV row was rejected.
///
/// Validation errors are row-level: the parser counts them and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Every mapped column was empty or missing.
    #[error("row has no values in any mapped column")]
    Blank,

    /// A mapped column contained bytes that are not valid UTF-8.
    #[error("column '{header}' is not valid UTF-8")]
    InvalidUtf8 { header: String },
}

/// A single person as read from one CSV row.
///
/// Every schema field is always present; absent or empty values are `None`.
/// Serializes as a flat JSON object keyed by canonical field names, with
/// `null` for missing values.
#[derive(Clone, PartialEq, Eq)]
pub struct PersonRecord {
    values: [Option<String>; Field::COUNT],
}

impl PersonRecord {
    /// A record with every field set to `None`.
    pub fn empty() -> Self {
        Self {
            values: std::array::from_fn(|_| None),
        }
    }

    /// Build a record from `(field, value)` pairs. Values are normalized
    /// with [`normalize_value`]; later pairs overwrite earlier ones.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Field, S)>,
        S: AsRef<str>,
    {
        let mut record = Self::empty();
        for (field, value) in pairs {
            record.values[field.index()] = normalize_value(value.as_ref());
        }
        record
    }

    /// Builder-style setter used while a record is being assembled.
    pub fn with(mut self, field: Field, value: &str) -> Self {
        self.values[field.index()] = normalize_value(value);
        self
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values[field.index()].as_deref()
    }

    /// Iterate over every field in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, Option<&str>)> {
        Field::ALL
            .iter()
            .map(move |&field| (field, self.values[field.index()].as_deref()))
    }

    /// Number of fields with a value.
    pub fn filled_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Check that the record can be ingested.
    ///
    /// Any record with at least one value is accepted. Records without an
    /// email, full name, location or company all share the identity `"::"`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.filled_count() == 0 {
            return Err(ValidationError::Blank);
        }
        Ok(())
    }

    /// Compact JSON text of the record, used as embedding input.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Default for PersonRecord {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for PersonRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().filter_map(|(k, v)| v.map(|v| (k.name(), v))))
            .finish()
    }
}

/// Normalize a raw CSV value: surrounding whitespace is trimmed and empty
/// strings become `None`.
pub fn normalize_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Serialize for PersonRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Field::COUNT))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.name(), &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PersonRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: HashMap<String, Option<String>> = HashMap::deserialize(deserializer)?;
        let mut record = Self::empty();
        for (key, value) in raw {
            if let (Some(field), Some(value)) = (Field::from_name(&key), value) {
                record.values[field.index()] = normalize_value(&value);
            }
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_normalize_to_none() {
        let record = PersonRecord::from_pairs([
            (Field::FullName, "  Ada Lovelace "),
            (Field::Email, ""),
            (Field::Location, "   "),
        ]);
        assert_eq!(record.get(Field::FullName), Some("Ada Lovelace"));
        assert_eq!(record.get(Field::Email), None);
        assert_eq!(record.get(Field::Location), None);
        assert_eq!(record.filled_count(), 1);
    }

    #[test]
    fn serializes_every_field_as_key() {
        let record = PersonRecord::empty().with(Field::Email, "ada@example.com");
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), Field::COUNT);
        assert_eq!(obj["email"], "ada@example.com");
        assert!(obj["full_name"].is_null());
    }

    #[test]
    fn deserialize_ignores_unknown_keys() {
        let json = r#"{"email":"a@b.c","full_name":null,"shoe_size":"42"}"#;
        let record: PersonRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.get(Field::Email), Some("a@b.c"));
        assert_eq!(record.filled_count(), 1);
    }

    #[test]
    fn blank_record_is_invalid() {
        assert_eq!(PersonRecord::empty().validate(), Err(ValidationError::Blank));
    }

    #[test]
    fn record_without_identity_fields_is_valid() {
        let record = PersonRecord::empty().with(Field::Skills, "rust, sql");
        assert_eq!(record.validate(), Ok(()));

        let record = PersonRecord::empty()
            .with(Field::FirstName, "Ada")
            .with(Field::LastName, "Lovelace")
            .with(Field::JobTitle, "Analyst");
        assert_eq!(record.validate(), Ok(()));
    }

    #[test]
    fn record_with_any_identity_field_is_valid() {
        for field in [
            Field::Email,
            Field::FullName,
            Field::Location,
            Field::CompanyName,
        ] {
            let record = PersonRecord::empty().with(field, "x");
            assert!(record.validate().is_ok(), "{} should suffice", field);
        }
    }
}
