//! Deterministic person identifiers.
//!
//! The identifier is a version-5 UUID over [`PERSON_NAMESPACE`] and a
//! normalized identity string, so the same person always maps to the same
//! point id in the vector store regardless of run, process, or file. This is
//! the only deduplication key: two rows with the same identity string are
//! treated as the same person and the later upsert wins.

use uuid::Uuid;

use crate::models::PersonRecord;
use crate::schema::Field;

/// Namespace for person identifiers.
pub const PERSON_NAMESPACE: Uuid = Uuid::from_u128(0x6c65_6164_2d69_6e67_6573_742d_7065_7273);

/// The normalized text a person's identifier is derived from.
///
/// The lower-cased, trimmed email when present; otherwise
/// `full_name:location:company_name` with each part trimmed and lower-cased
/// (missing parts are empty).
pub fn identity_string(record: &PersonRecord) -> String {
    if let Some(email) = record.get(Field::Email) {
        let email = email.trim();
        if !email.is_empty() {
            return email.to_lowercase();
        }
    }
    let part = |field: Field| record.get(field).unwrap_or("").trim().to_lowercase();
    format!(
        "{}:{}:{}",
        part(Field::FullName),
        part(Field::Location),
        part(Field::CompanyName)
    )
}

/// Content-derived identifier for a person record.
pub fn person_id(record: &PersonRecord) -> Uuid {
    Uuid::new_v5(&PERSON_NAMESPACE, identity_string(record).as_bytes())
}
