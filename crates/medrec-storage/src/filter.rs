//! Typed search filters parsed from query parameters.

use chrono::{DateTime, NaiveDate, Utc};
use medrec_core::CodeSet;
use uuid::Uuid;

/// A malformed value for a search key the resource does support.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid search parameter '{key}': {message}")]
pub struct FilterError {
    pub key: String,
    pub message: String,
}

impl FilterError {
    #[must_use]
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// A closed set of search predicates for one resource type.
///
/// `parse` returns `Ok(None)` for keys the resource does not support; those
/// keys are reported back to the caller instead of failing the request.
pub trait SearchFilter: Sized + Send + Sync + Clone + std::fmt::Debug + 'static {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError>;
}

/// Resources that never declare filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoFilter {}

impl SearchFilter for NoFilter {
    fn parse(_key: &str, _value: &str) -> Result<Option<Self>, FilterError> {
        Ok(None)
    }
}

pub fn parse_uuid(key: &str, value: &str) -> Result<Uuid, FilterError> {
    Uuid::parse_str(value.trim()).map_err(|_| FilterError::invalid(key, "expected a UUID"))
}

pub fn parse_code<T: CodeSet>(key: &str, value: &str) -> Result<T, FilterError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| FilterError::invalid(key, format!("unknown code '{value}'")))
}

pub fn parse_bool(key: &str, value: &str) -> Result<bool, FilterError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(FilterError::invalid(key, "expected 'true' or 'false'")),
    }
}

/// Parses a calendar date (`YYYY-MM-DD`).
pub fn parse_date(key: &str, value: &str) -> Result<NaiveDate, FilterError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| FilterError::invalid(key, "expected a date (YYYY-MM-DD)"))
}

/// Parses an RFC 3339 instant, or a bare date taken as midnight UTC.
pub fn parse_instant(key: &str, value: &str) -> Result<DateTime<Utc>, FilterError> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    parse_date(key, value)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| FilterError::invalid(key, "expected an RFC 3339 instant or a date"))
}

/// Non-blank free text, trimmed.
pub fn parse_text(key: &str, value: &str) -> Result<String, FilterError> {
    let value = value.trim();
    if value.is_empty() {
        Err(FilterError::invalid(key, "must not be empty"))
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    medrec_core::value_set! {
        enum Tone {
            Loud => "loud",
            Quiet => "quiet",
        }
    }

    #[test]
    fn uuid_and_code_values() {
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid("patient", &id.to_string()).unwrap(), id);
        assert!(parse_uuid("patient", "123").is_err());

        assert_eq!(parse_code::<Tone>("tone", "quiet").unwrap(), Tone::Quiet);
        let err = parse_code::<Tone>("tone", "shouty").unwrap_err();
        assert_eq!(err.key, "tone");
    }

    #[test]
    fn instants_accept_dates() {
        let from_date = parse_instant("since", "2024-03-01").unwrap();
        let from_rfc = parse_instant("since", "2024-03-01T00:00:00Z").unwrap();
        assert_eq!(from_date, from_rfc);

        let offset = parse_instant("since", "2024-03-01T02:00:00+02:00").unwrap();
        assert_eq!(offset, from_rfc);

        assert!(parse_instant("since", "yesterday").is_err());
    }

    #[test]
    fn booleans_and_text() {
        assert!(parse_bool("active", "true").unwrap());
        assert!(parse_bool("active", "yes").is_err());
        assert_eq!(parse_text("name", "  Smith ").unwrap(), "Smith");
        assert!(parse_text("name", "  ").is_err());
    }

    #[test]
    fn no_filter_ignores_everything() {
        assert_eq!(NoFilter::parse("anything", "x"), Ok(None));
    }
}
