//! Generic repositories over [`PgEntity`] and [`PgChild`] tables.

use std::marker::PhantomData;

use async_trait::async_trait;
use medrec_core::{generate_fhir_id, generate_id, validate_fhir_id};
use medrec_storage::{
    ChildRepository, Page, PageRequest, Repository, StorageError, StorageResult, TenantContext,
};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_builder::QueryBuilder;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::entity::{
    PgChild, PgEntity, child_insert_statement, insert_statement, push_where, update_statement,
};
use crate::error::classify;
use crate::tenancy::TenantPool;

/// PostgreSQL implementation of [`Repository`] for any [`PgEntity`].
pub struct PgRepository<E> {
    pool: TenantPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: PgEntity> PgRepository<E> {
    #[must_use]
    pub fn new(pool: TenantPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

impl<E> Clone for PgRepository<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> std::fmt::Debug for PgRepository<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgRepository")
            .field("table", &std::any::type_name::<E>())
            .finish()
    }
}

#[async_trait]
impl<E: PgEntity> Repository<E> for PgRepository<E> {
    #[instrument(skip_all, fields(tenant = %ctx.tenant_id(), resource_type = E::RESOURCE_TYPE))]
    async fn create(&self, ctx: &TenantContext, mut resource: E) -> StorageResult<E> {
        let id = resource.meta().id.unwrap_or_else(generate_id);
        let fhir_id = match resource.meta().fhir_id.clone() {
            Some(fhir_id) => {
                validate_fhir_id(&fhir_id)
                    .map_err(|e| StorageError::invalid_input(format!("fhir_id: {e}")))?;
                fhir_id
            }
            None => generate_fhir_id(),
        };
        let meta = resource.meta_mut();
        meta.id = Some(id);
        meta.fhir_id = Some(fhir_id.clone());

        let mut session = self.pool.begin(ctx).await?;
        let mut builder = insert_statement(&resource, id, &fhir_id)?;
        let created = builder
            .build_query_as::<E>()
            .fetch_one(session.conn())
            .await
            .map_err(|e| classify(E::RESOURCE_TYPE, e))?;
        session.commit().await?;

        debug!(%id, "Created");
        Ok(created)
    }

    #[instrument(skip_all, fields(tenant = %ctx.tenant_id(), resource_type = E::RESOURCE_TYPE, %id))]
    async fn get(&self, ctx: &TenantContext, id: Uuid) -> StorageResult<E> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", E::TABLE);
        let mut session = self.pool.begin(ctx).await?;
        let found = query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(session.conn())
            .await
            .map_err(|e| classify(E::RESOURCE_TYPE, e))?;
        session.commit().await?;

        found.ok_or_else(|| StorageError::not_found(E::RESOURCE_TYPE, id))
    }

    #[instrument(skip_all, fields(tenant = %ctx.tenant_id(), resource_type = E::RESOURCE_TYPE, fhir_id))]
    async fn get_by_fhir_id(&self, ctx: &TenantContext, fhir_id: &str) -> StorageResult<E> {
        let sql = format!("SELECT * FROM {} WHERE fhir_id = $1", E::TABLE);
        let mut session = self.pool.begin(ctx).await?;
        let found = query_as::<_, E>(&sql)
            .bind(fhir_id)
            .fetch_optional(session.conn())
            .await
            .map_err(|e| classify(E::RESOURCE_TYPE, e))?;
        session.commit().await?;

        found.ok_or_else(|| StorageError::not_found(E::RESOURCE_TYPE, fhir_id))
    }

    #[instrument(skip_all, fields(tenant = %ctx.tenant_id(), resource_type = E::RESOURCE_TYPE))]
    async fn update(&self, ctx: &TenantContext, resource: E) -> StorageResult<E> {
        let id = resource
            .id()
            .ok_or_else(|| StorageError::invalid_input("update requires an id"))?;

        let mut session = self.pool.begin(ctx).await?;
        let mut builder = update_statement(&resource, id)?;
        let updated = builder
            .build_query_as::<E>()
            .fetch_optional(session.conn())
            .await
            .map_err(|e| classify(E::RESOURCE_TYPE, e))?
            .ok_or_else(|| StorageError::not_found(E::RESOURCE_TYPE, id))?;
        session.commit().await?;

        Ok(updated)
    }

    #[instrument(skip_all, fields(tenant = %ctx.tenant_id(), resource_type = E::RESOURCE_TYPE, %id))]
    async fn delete(&self, ctx: &TenantContext, id: Uuid) -> StorageResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", E::TABLE);
        let mut session = self.pool.begin(ctx).await?;
        let result = query(&sql)
            .bind(id)
            .execute(session.conn())
            .await
            .map_err(|e| classify(E::RESOURCE_TYPE, e))?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(E::RESOURCE_TYPE, id));
        }
        session.commit().await
    }

    #[instrument(
        skip_all,
        fields(
            tenant = %ctx.tenant_id(),
            resource_type = E::RESOURCE_TYPE,
            filters = filters.len(),
            limit = page.limit,
            offset = page.offset,
        )
    )]
    async fn search(
        &self,
        ctx: &TenantContext,
        filters: &[E::Filter],
        page: PageRequest,
    ) -> StorageResult<Page<E>> {
        // Count and page run in one session
        let mut session = self.pool.begin(ctx).await?;

        let mut count = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", E::TABLE));
        push_where(&mut count, filters);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(session.conn())
            .await
            .map_err(|e| classify(E::RESOURCE_TYPE, e))?;

        let mut select = QueryBuilder::new(format!("SELECT * FROM {}", E::TABLE));
        push_where(&mut select, filters);
        select
            .push(" ORDER BY created_at, id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let items = select
            .build_query_as::<E>()
            .fetch_all(session.conn())
            .await
            .map_err(|e| classify(E::RESOURCE_TYPE, e))?;
        session.commit().await?;

        Ok(Page::new(items, total, page))
    }
}

/// PostgreSQL implementation of [`ChildRepository`] for any [`PgChild`].
pub struct PgChildRepository<C> {
    pool: TenantPool,
    _child: PhantomData<fn() -> C>,
}

impl<C: PgChild> PgChildRepository<C> {
    #[must_use]
    pub fn new(pool: TenantPool) -> Self {
        Self {
            pool,
            _child: PhantomData,
        }
    }
}

impl<C> Clone for PgChildRepository<C> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _child: PhantomData,
        }
    }
}

#[async_trait]
impl<C: PgChild> ChildRepository<C> for PgChildRepository<C> {
    #[instrument(skip_all, fields(tenant = %ctx.tenant_id(), resource_type = C::RESOURCE_TYPE, %parent_id))]
    async fn add(&self, ctx: &TenantContext, parent_id: Uuid, mut child: C) -> StorageResult<C> {
        child.attach(parent_id);
        let id = child.id().unwrap_or_else(generate_id);

        let mut session = self.pool.begin(ctx).await?;
        let mut builder = child_insert_statement(&child, id, parent_id)?;
        let added = builder
            .build_query_as::<C>()
            .fetch_one(session.conn())
            .await
            .map_err(|e| classify(C::RESOURCE_TYPE, e))?;
        session.commit().await?;

        Ok(added)
    }

    #[instrument(skip_all, fields(tenant = %ctx.tenant_id(), resource_type = C::RESOURCE_TYPE, %parent_id))]
    async fn list(&self, ctx: &TenantContext, parent_id: Uuid) -> StorageResult<Vec<C>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = $1 ORDER BY {}",
            C::TABLE,
            C::PARENT_COLUMN,
            C::ORDER_BY
        );
        let mut session = self.pool.begin(ctx).await?;
        let children = query_as::<_, C>(&sql)
            .bind(parent_id)
            .fetch_all(session.conn())
            .await
            .map_err(|e| classify(C::RESOURCE_TYPE, e))?;
        session.commit().await?;

        Ok(children)
    }

    #[instrument(skip_all, fields(tenant = %ctx.tenant_id(), resource_type = C::RESOURCE_TYPE, %parent_id, %child_id))]
    async fn remove(
        &self,
        ctx: &TenantContext,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> StorageResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE id = $1 AND {} = $2",
            C::TABLE,
            C::PARENT_COLUMN
        );
        let mut session = self.pool.begin(ctx).await?;
        let result = query(&sql)
            .bind(child_id)
            .bind(parent_id)
            .execute(session.conn())
            .await
            .map_err(|e| classify(C::RESOURCE_TYPE, e))?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(C::RESOURCE_TYPE, child_id));
        }
        session.commit().await
    }
}
