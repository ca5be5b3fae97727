//! HTTP-facing error and response types.
//!
//! Every failure leaves the server as an [`ApiError`], rendered as a FHIR
//! `OperationOutcome` body with the matching status code.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use medrec_core::ValidationError;
use medrec_storage::{ErrorCategory, FilterError, StorageError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod page;

pub use page::PageEnvelope;

pub const FHIR_JSON: &str = "application/fhir+json";

/// Minimal FHIR OperationOutcome representation for API error responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationOutcome {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    pub issue: Vec<OperationOutcomeIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationOutcomeIssue {
    /// fatal | error | warning | information
    pub severity: String,
    /// FHIR issue type: invalid | not-found | conflict | transient | exception
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl OperationOutcome {
    pub fn single(severity: &str, code: &str, diagnostics: impl Into<String>) -> Self {
        Self {
            resource_type: "OperationOutcome".to_string(),
            issue: vec![OperationOutcomeIssue {
                severity: severity.to_string(),
                code: code.to_string(),
                diagnostics: Some(diagnostics.into()),
            }],
        }
    }

    /// First diagnostics message, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        self.issue.first().and_then(|i| i.diagnostics.as_deref())
    }
}

/// High-level API errors to be mapped to HTTP responses and OperationOutcome
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_operation_outcome(&self) -> OperationOutcome {
        match self {
            ApiError::BadRequest(msg) => OperationOutcome::single("error", "invalid", msg),
            ApiError::NotFound(msg) => OperationOutcome::single("error", "not-found", msg),
            ApiError::Conflict(msg) => OperationOutcome::single("error", "conflict", msg),
            ApiError::ServiceUnavailable(msg) => {
                OperationOutcome::single("error", "transient", msg)
            }
            ApiError::Internal(msg) => OperationOutcome::single("fatal", "exception", msg),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err.category() {
            ErrorCategory::NotFound => Self::NotFound(message),
            ErrorCategory::Conflict => Self::Conflict(message),
            ErrorCategory::Validation => Self::BadRequest(message),
            ErrorCategory::Infrastructure | ErrorCategory::Internal => Self::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = serde_json::to_vec(&self.to_operation_outcome()).unwrap_or_else(|_| {
            br#"{"resourceType":"OperationOutcome","issue":[{"severity":"fatal","code":"exception"}]}"#
                .to_vec()
        });

        (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(FHIR_JSON))],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_response_sets_status_and_content_type() {
        let resp = ApiError::bad_request("patient_id is required").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap();
        assert_eq!(content_type, &HeaderValue::from_static(FHIR_JSON));
    }

    #[test]
    fn operation_outcome_shape() {
        let outcome = ApiError::not_found("Patient/123 not found").to_operation_outcome();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["resourceType"], "OperationOutcome");
        assert_eq!(json["issue"][0]["code"], "not-found");
        assert_eq!(json["issue"][0]["diagnostics"], "Patient/123 not found");
    }

    #[test]
    fn storage_errors_map_to_status() {
        let cases = [
            (StorageError::not_found("Claim", "x"), StatusCode::NOT_FOUND),
            (StorageError::unknown_tenant("ghost"), StatusCode::NOT_FOUND),
            (StorageError::conflict("Claim", "dup"), StatusCode::CONFLICT),
            (StorageError::integrity("Claim", "fk"), StatusCode::BAD_REQUEST),
            (StorageError::invalid_input("bad"), StatusCode::BAD_REQUEST),
            (StorageError::connection("refused"), StatusCode::INTERNAL_SERVER_ERROR),
            (StorageError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            let label = err.to_string();
            assert_eq!(ApiError::from(err).status_code(), status, "{label}");
        }
    }

    #[test]
    fn validation_errors_keep_their_message() {
        let err = ApiError::from(ValidationError::invalid_code("status", "done"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_operation_outcome().diagnostics(),
            Some("invalid status: done")
        );
    }

    #[test]
    fn internal_errors_are_fatal() {
        let outcome = ApiError::internal("pool closed").to_operation_outcome();
        assert_eq!(outcome.issue[0].severity, "fatal");
        assert_eq!(outcome.issue[0].code, "exception");
    }
}
