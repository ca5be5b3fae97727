//! Tenant-scoped database sessions.
//!
//! A [`TenantSession`] is a pooled transaction whose `search_path` is set
//! locally to the tenant schema. The setting dies with the transaction, so a
//! connection returned to the pool never carries another tenant's path.
//! Dropping a session without [`TenantSession::commit`] rolls it back.

use std::sync::Arc;

use dashmap::DashSet;
use medrec_storage::{StorageError, StorageResult, TenantContext, TenantId};
use sqlx_core::query::query;
use sqlx_core::transaction::Transaction;
use sqlx_postgres::{PgConnection, PgPool, Postgres};
use tracing::{debug, instrument};

use crate::config::TenancyOptions;
use crate::error::classify;
use crate::pool;
use crate::schema;

/// Shared pool plus the tenant-to-schema mapping.
///
/// Cheap to clone; every clone shares the pool and the provisioned-schema
/// cache.
#[derive(Debug, Clone)]
pub struct TenantPool {
    pool: PgPool,
    options: TenancyOptions,
    /// Schemas known to exist.
    provisioned: Arc<DashSet<String>>,
}

impl TenantPool {
    #[must_use]
    pub fn new(pool: PgPool, options: TenancyOptions) -> Self {
        Self {
            pool,
            options,
            provisioned: Arc::new(DashSet::new()),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[must_use]
    pub fn options(&self) -> &TenancyOptions {
        &self.options
    }

    #[must_use]
    pub fn schema_for(&self, tenant: &TenantId) -> String {
        tenant.schema_name(&self.options.schema_prefix)
    }

    /// Opens a transaction bound to the tenant's schema.
    ///
    /// # Errors
    ///
    /// `UnknownTenant` when the schema is absent and auto-provisioning is
    /// off; `Connection` when no connection can be acquired.
    #[instrument(skip_all, fields(tenant = %ctx.tenant_id(), request_id = ctx.request_id()))]
    pub async fn begin(&self, ctx: &TenantContext) -> StorageResult<TenantSession> {
        let schema = self.ensure_schema(ctx.tenant_id()).await?;

        let mut tx = self.pool.begin().await.map_err(|e| classify("session", e))?;
        query("SELECT set_config('search_path', $1, true)")
            .bind(&schema)
            .execute(&mut *tx)
            .await
            .map_err(|e| classify("session", e))?;

        debug!(schema = %schema, "Tenant session opened");
        Ok(TenantSession { tx, schema })
    }

    /// Creates the tenant schema and tables if missing.
    #[instrument(skip(self), fields(tenant = %tenant))]
    pub async fn provision(&self, tenant: &TenantId) -> StorageResult<()> {
        let schema = self.schema_for(tenant);
        schema::provision_schema(&self.pool, &schema).await?;
        self.provisioned.insert(schema);
        Ok(())
    }

    /// Drops the tenant schema and all of its data.
    #[instrument(skip(self), fields(tenant = %tenant))]
    pub async fn deprovision(&self, tenant: &TenantId) -> StorageResult<()> {
        let schema = self.schema_for(tenant);
        schema::drop_schema(&self.pool, &schema).await?;
        self.provisioned.remove(&schema);
        Ok(())
    }

    /// Runs `SELECT 1` against the pool.
    pub async fn ping(&self) -> StorageResult<()> {
        pool::test_connection(&self.pool).await?;
        Ok(())
    }

    async fn ensure_schema(&self, tenant: &TenantId) -> StorageResult<String> {
        let schema = self.schema_for(tenant);

        if self.provisioned.contains(&schema) {
            return Ok(schema);
        }

        if schema::schema_exists(&self.pool, &schema).await? {
            self.provisioned.insert(schema.clone());
            return Ok(schema);
        }

        if !self.options.auto_provision {
            return Err(StorageError::unknown_tenant(tenant.as_str()));
        }

        self.provision(tenant).await?;
        Ok(schema)
    }
}

/// One unit of work inside a tenant schema.
pub struct TenantSession {
    tx: Transaction<'static, Postgres>,
    schema: String,
}

impl TenantSession {
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut *self.tx
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub async fn commit(self) -> StorageResult<()> {
        self.tx.commit().await.map_err(|e| classify("session", e))
    }

    pub async fn rollback(self) -> StorageResult<()> {
        self.tx.rollback().await.map_err(|e| classify("session", e))
    }
}

impl std::fmt::Debug for TenantSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantSession")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}
