//! # lead-ingest core
//!
//! Pure logic shared by the ingestion pipeline: the 36-field person schema,
//! raw-header mapping, row validation, and the content-derived identifier
//! used as the deduplication key.
//!
//! This crate contains no tokio, HTTP, or filesystem I/O.

pub mod identity;
pub mod mapping;
pub mod models;
pub mod schema;

pub use identity::{identity_string, person_id, PERSON_NAMESPACE};
pub use mapping::{ColumnPlan, HeaderMapping, MappingError};
pub use models::{PersonRecord, ValidationError};
pub use schema::Field;
