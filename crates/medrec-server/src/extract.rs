//! Request extractors whose rejections render as `OperationOutcome`.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue};
use axum::Json;
use medrec_api::ApiError;
use medrec_storage::{FilterError, PageRequest, TenantContext, TenantId};
use serde::de::DeserializeOwned;

use crate::config::AppConfig;

/// Settings every request handler needs, derived once from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct RequestSettings {
    pub tenant_header: HeaderName,
    pub default_tenant: Option<TenantId>,
    pub default_limit: i64,
    pub max_limit: i64,
}

impl RequestSettings {
    pub fn from_config(cfg: &AppConfig) -> Result<Self, String> {
        let tenant_header = HeaderName::from_bytes(cfg.tenancy.header.as_bytes())
            .map_err(|e| format!("tenancy.header: {e}"))?;
        let default_tenant = cfg
            .tenancy
            .default_tenant
            .as_deref()
            .map(TenantId::parse)
            .transpose()
            .map_err(|e| format!("tenancy.default_tenant: {e}"))?;
        Ok(Self {
            tenant_header,
            default_tenant,
            default_limit: cfg.pagination.default_limit,
            max_limit: cfg.pagination.max_limit,
        })
    }

    pub fn page_request(&self, query: &QueryPairs) -> Result<PageRequest, FilterError> {
        PageRequest::parse(
            query.get("limit"),
            query.get("offset"),
            self.default_limit,
            self.max_limit,
        )
    }
}

/// Tenant resolved from the tenant header, falling back to the configured default.
#[derive(Debug, Clone)]
pub struct Tenant(pub TenantContext);

impl<S> FromRequestParts<S> for Tenant
where
    Arc<RequestSettings>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let settings = Arc::<RequestSettings>::from_ref(state);
        let header = &settings.tenant_header;

        let tenant_id = match parts.headers.get(header) {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| ApiError::bad_request(format!("{header} header is not valid text")))?;
                TenantId::parse(raw.trim()).map_err(|e| ApiError::bad_request(e.to_string()))?
            }
            None => settings
                .default_tenant
                .clone()
                .ok_or_else(|| ApiError::bad_request(format!("{header} header is required")))?,
        };

        let mut ctx = TenantContext::new(tenant_id);
        if let Some(request_id) = parts
            .extensions
            .get::<HeaderValue>()
            .and_then(|v| v.to_str().ok())
        {
            ctx = ctx.with_request_id(request_id);
        }
        Ok(Self(ctx))
    }
}

/// `Path` with a 400 `OperationOutcome` on malformed identifiers.
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| Self(value))
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
    }
}

/// `Json` with a 400 `OperationOutcome` on malformed or mistyped bodies.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
    }
}

/// Raw query pairs, in request order.
#[derive(Debug, Clone, Default)]
pub struct QueryPairs(pub Vec<(String, String)>);

impl QueryPairs {
    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<S> FromRequestParts<S> for QueryPairs
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map(|Query(pairs)| Self(pairs))
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode};

    use super::*;

    fn settings(default_tenant: Option<&str>) -> Arc<RequestSettings> {
        let mut cfg = AppConfig::default();
        cfg.tenancy.default_tenant = default_tenant.map(String::from);
        Arc::new(RequestSettings::from_config(&cfg).unwrap())
    }

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn tenant_from_header() {
        let mut parts = parts(Request::builder().header("x-tenant-id", "north-clinic"));
        parts
            .extensions
            .insert(HeaderValue::from_static("req-42"));

        let Tenant(ctx) = Tenant::from_request_parts(&mut parts, &settings(None))
            .await
            .unwrap();
        assert_eq!(ctx.tenant_id().as_str(), "north-clinic");
        assert_eq!(ctx.request_id(), Some("req-42"));
    }

    #[tokio::test]
    async fn tenant_falls_back_to_default() {
        let mut parts = parts(Request::builder());
        let Tenant(ctx) = Tenant::from_request_parts(&mut parts, &settings(Some("main")))
            .await
            .unwrap();
        assert_eq!(ctx.tenant_id().as_str(), "main");
    }

    #[tokio::test]
    async fn missing_tenant_is_bad_request() {
        let mut parts = parts(Request::builder());
        let err = Tenant::from_request_parts(&mut parts, &settings(None))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("x-tenant-id"));
    }

    #[tokio::test]
    async fn malformed_tenant_is_bad_request() {
        let mut parts = parts(Request::builder().header("x-tenant-id", "North Clinic"));
        let err = Tenant::from_request_parts(&mut parts, &settings(Some("main")))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn query_pairs_keep_order_and_duplicates() {
        let mut parts = parts(Request::builder().uri("/claims?status=draft&limit=5&status=active"));
        let query = QueryPairs::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(query.0.len(), 3);
        assert_eq!(query.get("status"), Some("draft"));

        let page = settings(None).page_request(&query).unwrap();
        assert_eq!(page, PageRequest::new(5, 0));
    }

    #[test]
    fn page_request_clamps_to_max() {
        let query = QueryPairs(vec![("limit".into(), "1000".into())]);
        let page = settings(None).page_request(&query).unwrap();
        assert_eq!(page.limit, 100);
    }
}
