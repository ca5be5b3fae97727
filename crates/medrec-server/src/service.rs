//! Validating services in front of the repositories.
//!
//! A service assigns defaults, runs the resource's validation rules and only
//! then calls the store. Child services also check that the parent exists.

use std::sync::Arc;

use medrec_api::ApiError;
use medrec_core::{IdError, Validate, ValidationError, validate_fhir_id};
use medrec_storage::{
    ChildRepository, ChildResource, DynRepository, Page, PageRequest, Resource, StorageError,
    StorageResult, TenantContext,
};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidId(#[from] IdError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => e.into(),
            ServiceError::InvalidId(e) => ApiError::bad_request(e.to_string()),
            ServiceError::Storage(e) => e.into(),
        }
    }
}

/// CRUD and search for one resource type.
pub struct ResourceService<R: Resource> {
    repo: DynRepository<R>,
}

impl<R: Resource> Clone for ResourceService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: Resource + Validate> ResourceService<R> {
    pub fn new(repo: DynRepository<R>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, ctx: &TenantContext, mut resource: R) -> ServiceResult<R> {
        if let Some(fhir_id) = resource.meta().fhir_id.as_deref() {
            validate_fhir_id(fhir_id)?;
        }
        prepare(&mut resource)?;
        resource.stamp(None);
        Ok(self.repo.create(ctx, resource).await?)
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> ServiceResult<R> {
        Ok(self.repo.get(ctx, id).await?)
    }

    pub async fn get_by_fhir_id(&self, ctx: &TenantContext, fhir_id: &str) -> ServiceResult<R> {
        validate_fhir_id(fhir_id)?;
        Ok(self.repo.get_by_fhir_id(ctx, fhir_id).await?)
    }

    /// Replaces the record stored under `id`; any id in the body is ignored.
    ///
    /// Server-stamped timestamps missing from the body keep their stored
    /// values.
    pub async fn update(&self, ctx: &TenantContext, id: Uuid, mut resource: R) -> ServiceResult<R> {
        resource.meta_mut().id = Some(id);
        prepare(&mut resource)?;
        let stored = self.repo.get(ctx, id).await?;
        resource.stamp(Some(&stored));
        Ok(self.repo.update(ctx, resource).await?)
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> ServiceResult<()> {
        Ok(self.repo.delete(ctx, id).await?)
    }

    pub async fn search(
        &self,
        ctx: &TenantContext,
        filters: &[R::Filter],
        page: PageRequest,
    ) -> ServiceResult<Page<R>> {
        Ok(self.repo.search(ctx, filters, page).await?)
    }
}

fn prepare<T: Validate>(value: &mut T) -> Result<(), ValidationError> {
    value.apply_defaults();
    value.validate()
}

/// Operations on a collection owned by a parent resource.
pub struct ChildService<C: ChildResource> {
    parents: DynRepository<C::Parent>,
    children: Arc<dyn ChildRepository<C>>,
}

impl<C: ChildResource> Clone for ChildService<C> {
    fn clone(&self) -> Self {
        Self {
            parents: Arc::clone(&self.parents),
            children: Arc::clone(&self.children),
        }
    }
}

impl<C: ChildResource + Validate> ChildService<C> {
    pub fn new(parents: DynRepository<C::Parent>, children: Arc<dyn ChildRepository<C>>) -> Self {
        Self { parents, children }
    }

    pub async fn add(&self, ctx: &TenantContext, parent_id: Uuid, mut child: C) -> ServiceResult<C> {
        self.ensure_parent(ctx, parent_id).await?;
        child.attach(parent_id);
        prepare(&mut child)?;
        child.stamp(None);
        Ok(self.children.add(ctx, parent_id, child).await?)
    }

    pub async fn list(&self, ctx: &TenantContext, parent_id: Uuid) -> ServiceResult<Vec<C>> {
        self.ensure_parent(ctx, parent_id).await?;
        Ok(self.children.list(ctx, parent_id).await?)
    }

    pub async fn remove(
        &self,
        ctx: &TenantContext,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> ServiceResult<()> {
        self.ensure_parent(ctx, parent_id).await?;
        Ok(self.children.remove(ctx, parent_id, child_id).await?)
    }

    async fn ensure_parent(&self, ctx: &TenantContext, parent_id: Uuid) -> StorageResult<()> {
        self.parents.get(ctx, parent_id).await.map(|_| ()).inspect_err(|e| {
            debug!(
                parent = <C::Parent as Resource>::RESOURCE_TYPE,
                child = C::RESOURCE_TYPE,
                %parent_id,
                error = %e,
                "parent lookup failed"
            );
        })
    }
}
