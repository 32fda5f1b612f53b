//! Declarative record schemas: per-field constraints evaluated by one
//! validation routine, plus derived attributes recomputed on every
//! materialization.

pub mod catalog;
pub mod constraint;
pub mod derive;
pub mod record;

pub use catalog::{book_schema, employee_schema, patient_schema};
pub use constraint::Constraint;
pub use derive::Derivation;
pub use record::{FieldSpec, IdSpec, Record, RecordSchema};
