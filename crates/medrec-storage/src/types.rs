//! Core types shared by repositories: record metadata, pages and search queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::{FilterError, SearchFilter};

/// Query keys reserved for pagination; never handed to a [`SearchFilter`].
pub const PAGINATION_KEYS: &[&str] = &["limit", "offset"];

/// Identity and timestamps common to every top-level record.
///
/// Flattened into each resource so the wire shape stays flat. All fields are
/// assigned by the store; values sent by clients for the timestamps are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fhir_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecordMeta {
    #[must_use]
    pub fn with_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }
}

/// Limit/offset window for list and search calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    #[must_use]
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Parses `limit`/`offset` query values.
    ///
    /// A missing limit uses `default_limit`; a limit above `max_limit` is
    /// clamped. Negative values are rejected.
    pub fn parse(
        limit: Option<&str>,
        offset: Option<&str>,
        default_limit: i64,
        max_limit: i64,
    ) -> Result<Self, FilterError> {
        let limit = match limit {
            Some(raw) => parse_non_negative("limit", raw)?.min(max_limit),
            None => default_limit,
        };
        let offset = match offset {
            Some(raw) => parse_non_negative("offset", raw)?,
            None => 0,
        };
        Ok(Self { limit, offset })
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}

fn parse_non_negative(key: &str, raw: &str) -> Result<i64, FilterError> {
    match raw.trim().parse::<i64>() {
        Ok(v) if v >= 0 => Ok(v),
        _ => Err(FilterError::invalid(key, "expected a non-negative integer")),
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            limit: request.limit,
            offset: request.offset,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Typed filters parsed from query pairs, plus the keys nobody recognised.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery<F> {
    pub filters: Vec<F>,
    pub ignored: Vec<String>,
}

impl<F> Default for SearchQuery<F> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            ignored: Vec::new(),
        }
    }
}

impl<F: SearchFilter> SearchQuery<F> {
    /// Parses every non-pagination pair. Repeated keys produce repeated
    /// filters, all of which must match.
    pub fn parse<'a, I>(pairs: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            if PAGINATION_KEYS.contains(&key) {
                continue;
            }
            match F::parse(key, value)? {
                Some(filter) => query.filters.push(filter),
                None => {
                    if !query.ignored.iter().any(|k| k == key) {
                        query.ignored.push(key.to_string());
                    }
                }
            }
        }
        Ok(query)
    }

    #[must_use]
    pub fn with_filter(mut self, filter: F) -> Self {
        self.filters.push(filter);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_uuid;

    #[derive(Debug, Clone, PartialEq)]
    enum TestFilter {
        Patient(Uuid),
        Code(String),
    }

    impl SearchFilter for TestFilter {
        fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
            Ok(match key {
                "patient" => Some(Self::Patient(parse_uuid(key, value)?)),
                "code" => Some(Self::Code(value.to_string())),
                _ => None,
            })
        }
    }

    #[test]
    fn page_request_defaults_and_clamps() {
        let page = PageRequest::parse(None, None, 20, 100).unwrap();
        assert_eq!(page, PageRequest::new(20, 0));

        let page = PageRequest::parse(Some("500"), Some("40"), 20, 100).unwrap();
        assert_eq!(page, PageRequest::new(100, 40));

        assert!(PageRequest::parse(Some("-1"), None, 20, 100).is_err());
        assert!(PageRequest::parse(None, Some("ten"), 20, 100).is_err());
    }

    #[test]
    fn search_query_collects_filters_and_ignored_keys() {
        let patient = Uuid::new_v4().to_string();
        let pairs = vec![
            ("patient", patient.as_str()),
            ("code", "2951-2"),
            ("limit", "5"),
            ("colour", "blue"),
            ("colour", "red"),
        ];
        let query = SearchQuery::<TestFilter>::parse(pairs).unwrap();
        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[1], TestFilter::Code("2951-2".into()));
        assert_eq!(query.ignored, vec!["colour".to_string()]);
    }

    #[test]
    fn search_query_rejects_malformed_known_keys() {
        let err = SearchQuery::<TestFilter>::parse(vec![("patient", "nope")]).unwrap_err();
        assert!(err.to_string().contains("patient"));
    }

    #[test]
    fn page_map_keeps_window() {
        let page = Page::new(vec![1, 2], 7, PageRequest::new(2, 4)).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!((page.total, page.limit, page.offset), (7, 2, 4));
    }

    #[test]
    fn record_meta_omits_absent_fields() {
        let json = serde_json::to_value(RecordMeta::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
