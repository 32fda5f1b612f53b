// ============================================================================
// MedRegistry Library
// ============================================================================

pub mod core;
pub mod query;
pub mod registry;
pub mod schema;
pub mod storage;
pub mod web;

// Re-export main types for convenience
pub use self::core::{DataType, FieldValue, RegistryError, Result, Violation};
pub use query::{Filter, PageLimits, QueryParams, SortOrder, SortSpec};
pub use registry::Registry;
pub use schema::{
    book_schema, employee_schema, patient_schema, Constraint, Derivation, FieldSpec, IdSpec,
    Record, RecordSchema,
};
pub use storage::{Collection, JsonStore, Storage, StoredAttrs};
