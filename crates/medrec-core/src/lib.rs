pub mod id;
pub mod validation;

pub use id::{IdError, generate_fhir_id, generate_id, validate_fhir_id};
pub use validation::{CodeSet, UnknownCode, Validate, ValidationError};
