//! PostgreSQL storage backend for the MedRec EHR backend.
//!
//! This crate implements the `medrec-storage` repository traits on top of
//! sqlx, with one schema per tenant.
//!
//! # Example
//!
//! ```ignore
//! use medrec_db_postgres::{PgRepository, PostgresConfig, TenancyOptions, TenantPool, create_pool};
//!
//! let pool = create_pool(&PostgresConfig::new("postgres://medrec@localhost/medrec")).await?;
//! let tenants = TenantPool::new(pool, TenancyOptions::default());
//! tenants.provision(&"north-clinic".parse()?).await?;
//!
//! let patients = PgRepository::<Patient>::new(tenants.clone());
//! ```
//!
//! # Architecture
//!
//! - [`config`]: pool and tenancy settings
//! - [`error`]: SQLSTATE classification into `StorageError`
//! - [`pool`]: connection pool management
//! - [`schema`]: tenant schema provisioning from the embedded DDL
//! - [`tenancy`]: tenant sessions with a transaction-local `search_path`
//! - [`entity`]: table mapping traits and statement builders
//! - [`predicate`]: helpers for rendering search filters
//! - [`repository`]: the generic repositories

pub mod config;
pub mod entity;
pub mod error;
pub mod pool;
pub mod predicate;
pub mod repository;
pub mod schema;
pub mod tenancy;

pub use config::{PostgresConfig, TenancyOptions};
pub use entity::{ColumnValues, PgChild, PgEntity, PgFilter, record_meta};
pub use error::{PostgresError, Result, classify};
pub use pool::{create_lazy_pool, create_pool, mask_password, test_connection};
pub use repository::{PgChildRepository, PgRepository};
pub use tenancy::{TenantPool, TenantSession};

// sqlx types needed by resource row mappings.
pub use sqlx_core::error::Error as SqlxError;
pub use sqlx_core::from_row::FromRow;
pub use sqlx_core::query_builder::QueryBuilder;
pub use sqlx_core::row::Row;
pub use sqlx_postgres::{PgPool, PgRow, Postgres};
