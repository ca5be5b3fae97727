//! Tenant schema provisioning.
//!
//! Each tenant owns one PostgreSQL schema holding the full table set from
//! `sql/tenant_schema.sql`. Provisioning is idempotent; it is not a
//! migration system.

use sqlx_core::executor::Executor;
use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;
use sqlx_core::raw_sql::raw_sql;
use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result};

/// DDL executed inside every tenant schema.
pub const TENANT_SCHEMA_DDL: &str = include_str!("../sql/tenant_schema.sql");

/// Checks whether `schema` exists in the database.
pub async fn schema_exists(pool: &PgPool, schema: &str) -> Result<bool> {
    let exists: bool =
        query_scalar("SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)")
            .bind(schema)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Creates `schema` and its tables if they are missing.
///
/// Concurrent callers for the same schema are serialised with a
/// transaction-scoped advisory lock.
#[instrument(skip(pool))]
pub async fn provision_schema(pool: &PgPool, schema: &str) -> Result<()> {
    if !is_plain_identifier(schema) {
        return Err(PostgresError::provision(schema, "not a plain identifier"));
    }

    let mut tx = pool.begin().await?;

    query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(schema)
        .execute(&mut *tx)
        .await?;

    let create = format!("CREATE SCHEMA IF NOT EXISTS \"{schema}\"");
    (&mut *tx).execute(raw_sql(&create)).await?;

    query("SELECT set_config('search_path', $1, true)")
        .bind(schema)
        .execute(&mut *tx)
        .await?;

    (&mut *tx)
        .execute(raw_sql(TENANT_SCHEMA_DDL))
        .await
        .map_err(|e| PostgresError::provision(schema, e.to_string()))?;

    tx.commit().await?;

    info!(schema, "Tenant schema provisioned");
    Ok(())
}

/// Drops `schema` and everything in it.
#[instrument(skip(pool))]
pub async fn drop_schema(pool: &PgPool, schema: &str) -> Result<()> {
    if !is_plain_identifier(schema) {
        return Err(PostgresError::provision(schema, "not a plain identifier"));
    }
    let drop = format!("DROP SCHEMA IF EXISTS \"{schema}\" CASCADE");
    pool.execute(raw_sql(&drop)).await?;
    info!(schema, "Tenant schema dropped");
    Ok(())
}

/// Lowercase ASCII letters, digits and underscores, starting with a letter.
pub(crate) fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && name.len() <= 63
}
