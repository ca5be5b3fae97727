use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{Router, middleware, routing::get};
use medrec_db_postgres::{TenantPool, create_pool, mask_password};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::AppConfig, extract::RequestSettings, handlers, middleware as app_middleware, routes,
};

pub struct MedrecServer {
    addr: SocketAddr,
    app: Router,
}

/// Assembles the operational endpoints, the resource API and the middleware stack.
pub fn build_app(cfg: &AppConfig, tenants: TenantPool) -> anyhow::Result<Router> {
    let settings = RequestSettings::from_config(cfg).map_err(anyhow::Error::msg)?;
    let body_limit = cfg.server.body_limit_bytes;

    let operational = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .with_state(tenants.clone());

    // Outermost first: request id -> trace -> cors -> compression
    let middleware_stack = ServiceBuilder::new()
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new());

    Ok(operational
        .merge(routes::api_router(tenants, Arc::new(settings)))
        .layer(middleware_stack)
        .layer(axum::extract::DefaultBodyLimit::max(body_limit)))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Connects the pool eagerly so a bad database URL fails at startup.
    pub async fn build(self) -> anyhow::Result<MedrecServer> {
        let pool_config = self.config.storage.postgres.pool_config();
        let pool = create_pool(&pool_config).await.with_context(|| {
            format!(
                "connecting to {}",
                mask_password(&pool_config.url)
            )
        })?;
        let tenants = TenantPool::new(pool, self.config.tenancy.options());

        if let Some(ref tenant) = self.config.tenancy.default_tenant {
            tracing::info!(tenant = %tenant, "default tenant configured");
        }

        let app = build_app(&self.config, tenants)?;
        Ok(MedrecServer {
            addr: self.addr,
            app,
        })
    }
}

impl MedrecServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
