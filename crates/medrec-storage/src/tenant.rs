//! Tenant identity carried by every storage operation.
//!
//! Repositories take a [`TenantContext`] on every call, so no query can run
//! without a tenant. The backend maps the tenant to an isolated schema.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static TENANT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]{0,39}$").expect("valid tenant id regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TenantError {
    #[error("tenant id '{0}' must be lowercase alphanumeric (with '-'), start with a letter and be at most 40 characters")]
    Malformed(String),
}

/// A validated tenant identifier.
///
/// Tenant ids are restricted so that the derived schema name is always a
/// plain PostgreSQL identifier. `_` is reserved for the schema name, so two
/// distinct tenants never share a schema.
///
/// ```
/// use medrec_storage::TenantId;
///
/// let tenant: TenantId = "north-clinic".parse().unwrap();
/// assert_eq!(tenant.schema_name("tenant_"), "tenant_north_clinic");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn parse(id: &str) -> Result<Self, TenantError> {
        if TENANT_ID.is_match(id) {
            Ok(Self(id.to_string()))
        } else {
            Err(TenantError::Malformed(id.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Schema holding this tenant's tables.
    pub fn schema_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0.replace('-', "_"))
    }
}

impl FromStr for TenantId {
    type Err = TenantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = TenantError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({})", self.0)
    }
}

/// Tenant plus request metadata for one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
    request_id: Option<String>,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            request_id: None,
        }
    }

    /// Attaches the request id used to correlate log lines.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}
