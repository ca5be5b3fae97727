use medrec_storage::Page;
use serde::{Deserialize, Serialize};

/// JSON body of a list or search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    /// Query keys the resource does not support.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_params: Vec<String>,
}

impl<T> PageEnvelope<T> {
    pub fn with_ignored(page: Page<T>, ignored_params: Vec<String>) -> Self {
        Self {
            items: page.items,
            total: page.total,
            limit: page.limit,
            offset: page.offset,
            ignored_params,
        }
    }
}

impl<T> From<Page<T>> for PageEnvelope<T> {
    fn from(page: Page<T>) -> Self {
        Self::with_ignored(page, Vec::new())
    }
}
