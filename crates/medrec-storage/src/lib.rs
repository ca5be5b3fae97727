//! # medrec-storage
//!
//! Storage abstraction layer for the MedRec EHR backend.
//!
//! This crate defines the contracts every storage backend implements. It
//! contains no database code; the PostgreSQL backend lives in
//! `medrec-db-postgres`.
//!
//! ## Overview
//!
//! - [`Resource`] and [`ChildResource`] describe what can be stored.
//! - [`Repository`] is CRUD plus filtered search for one resource type.
//! - [`ChildRepository`] manages a collection owned by a parent resource.
//! - Every call takes a [`TenantContext`]; there is no tenant-less access.
//!
//! ## Example
//!
//! ```ignore
//! use medrec_storage::{PageRequest, Repository, TenantContext};
//!
//! async fn first_page<R: Resource>(repo: &dyn Repository<R>, ctx: &TenantContext) {
//!     let page = repo.list(ctx, PageRequest::default()).await?;
//!     println!("{} of {}", page.items.len(), page.total);
//! }
//! ```

mod error;
pub mod filter;
mod tenant;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use filter::{FilterError, NoFilter, SearchFilter};
pub use tenant::{TenantContext, TenantError, TenantId};
pub use traits::{
    ChildRepository, ChildResource, EncounterScoped, PatientScoped, Repository, Resource,
    list_by_encounter, list_by_patient,
};
pub use types::{PAGINATION_KEYS, Page, PageRequest, RecordMeta, SearchQuery};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Shared handle to a repository trait object.
pub type DynRepository<R> = std::sync::Arc<dyn Repository<R>>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        ChildRepository, ChildResource, EncounterScoped, Page, PageRequest, PatientScoped,
        RecordMeta, Repository, Resource, SearchFilter, StorageError, StorageResult,
        TenantContext, TenantId,
    };
}
