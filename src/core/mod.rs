pub mod error;
pub mod value;

pub use error::{RegistryError, Result, Violation};
pub use value::{DataType, FieldValue};
