//! Storage traits implemented by every MedRec backend.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::StorageResult;
use crate::filter::SearchFilter;
use crate::tenant::TenantContext;
use crate::types::{Page, PageRequest, RecordMeta};

/// A top-level record with its own identity and lifecycle.
pub trait Resource: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Name used in error messages and logs, e.g. `"ServiceRequest"`.
    const RESOURCE_TYPE: &'static str;

    type Filter: SearchFilter;

    fn meta(&self) -> &RecordMeta;

    fn meta_mut(&mut self) -> &mut RecordMeta;

    fn id(&self) -> Option<Uuid> {
        self.meta().id
    }
}

/// Resources that reference a patient and can be listed per patient.
pub trait PatientScoped: Resource {
    fn patient_filter(patient_id: Uuid) -> Self::Filter;
}

/// Resources that reference an encounter and can be listed per encounter.
pub trait EncounterScoped: Resource {
    fn encounter_filter(encounter_id: Uuid) -> Self::Filter;
}

/// A row owned by a parent resource and removed with it.
pub trait ChildResource: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    const RESOURCE_TYPE: &'static str;

    type Parent: Resource;

    fn id(&self) -> Option<Uuid>;

    fn parent_id(&self) -> Option<Uuid>;

    /// Points the child at `parent_id`, overriding any value from the body.
    fn attach(&mut self, parent_id: Uuid);
}

/// CRUD and search over one resource type, always within a tenant.
///
/// # Errors
///
/// Every method returns `StorageError::UnknownTenant` when the tenant has no
/// schema. Writes return `StorageError::Integrity` when a reference does not
/// resolve and `StorageError::Conflict` on a duplicate `fhir_id`.
#[async_trait]
pub trait Repository<R: Resource>: Send + Sync {
    /// Inserts `resource`, assigning `id` and `fhir_id` when unset.
    async fn create(&self, ctx: &TenantContext, resource: R) -> StorageResult<R>;

    async fn get(&self, ctx: &TenantContext, id: Uuid) -> StorageResult<R>;

    async fn get_by_fhir_id(&self, ctx: &TenantContext, fhir_id: &str) -> StorageResult<R>;

    /// Overwrites every mutable column of the row identified by `resource.id`.
    ///
    /// `fhir_id` and `created_at` keep their stored values.
    async fn update(&self, ctx: &TenantContext, resource: R) -> StorageResult<R>;

    async fn delete(&self, ctx: &TenantContext, id: Uuid) -> StorageResult<()>;

    /// Returns rows matching every filter, plus the total match count.
    async fn search(
        &self,
        ctx: &TenantContext,
        filters: &[R::Filter],
        page: PageRequest,
    ) -> StorageResult<Page<R>>;

    async fn list(&self, ctx: &TenantContext, page: PageRequest) -> StorageResult<Page<R>> {
        self.search(ctx, &[], page).await
    }
}

/// Lists the resources referencing `patient_id`.
pub async fn list_by_patient<R: PatientScoped>(
    repo: &dyn Repository<R>,
    ctx: &TenantContext,
    patient_id: Uuid,
    page: PageRequest,
) -> StorageResult<Page<R>> {
    repo.search(ctx, &[R::patient_filter(patient_id)], page).await
}

/// Lists the resources referencing `encounter_id`.
pub async fn list_by_encounter<R: EncounterScoped>(
    repo: &dyn Repository<R>,
    ctx: &TenantContext,
    encounter_id: Uuid,
    page: PageRequest,
) -> StorageResult<Page<R>> {
    repo.search(ctx, &[R::encounter_filter(encounter_id)], page).await
}

/// Child collection access, always scoped to one parent.
#[async_trait]
pub trait ChildRepository<C: ChildResource>: Send + Sync {
    async fn add(&self, ctx: &TenantContext, parent_id: Uuid, child: C) -> StorageResult<C>;

    /// Children in their collection order.
    async fn list(&self, ctx: &TenantContext, parent_id: Uuid) -> StorageResult<Vec<C>>;

    /// Fails with not-found when the child does not belong to `parent_id`.
    async fn remove(&self, ctx: &TenantContext, parent_id: Uuid, child_id: Uuid)
    -> StorageResult<()>;
}
