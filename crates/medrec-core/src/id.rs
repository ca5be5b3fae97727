//! Identifier generation and validation.
//!
//! Every record carries two identifiers: a tenant-local primary key (`id`)
//! and an externally visible FHIR logical id (`fhir_id`). Both are generated
//! here so the storage layer never invents its own scheme.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

/// FHIR `id` datatype grammar.
static FHIR_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-\.]{1,64}$").expect("valid FHIR id regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("FHIR id must not be empty")]
    Empty,
    #[error("FHIR id '{0}' must match [A-Za-z0-9-.]{{1,64}}")]
    Malformed(String),
}

/// Generates a new internal primary key.
pub fn generate_id() -> Uuid {
    Uuid::new_v4()
}

/// Generates a new FHIR logical id, independent of the internal key.
pub fn generate_fhir_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn validate_fhir_id(id: &str) -> Result<(), IdError> {
    if id.is_empty() {
        return Err(IdError::Empty);
    }
    if !FHIR_ID.is_match(id) {
        return Err(IdError::Malformed(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_fhir_ids_are_valid() {
        let id = generate_fhir_id();
        assert!(validate_fhir_id(&id).is_ok());
        assert_ne!(id, generate_fhir_id());
    }

    #[test]
    fn rejects_malformed_fhir_ids() {
        assert_eq!(validate_fhir_id(""), Err(IdError::Empty));
        assert!(validate_fhir_id("has space").is_err());
        assert!(validate_fhir_id("slash/inside").is_err());
        assert!(validate_fhir_id(&"a".repeat(65)).is_err());
        assert!(validate_fhir_id("example-1.2").is_ok());
    }
}
