//! Table mapping for resources stored in PostgreSQL.
//!
//! A resource implements [`PgEntity`] (or [`PgChild`] for owned rows) to name
//! its table and mutable columns, and binds its values through
//! [`ColumnValues`] in the same order. The generic repositories build every
//! statement from that description.

use medrec_storage::{
    ChildResource, NoFilter, RecordMeta, Resource, SearchFilter, StorageError, StorageResult,
};
use sqlx_core::encode::Encode;
use sqlx_core::error::Error as SqlxError;
use sqlx_core::from_row::FromRow;
use sqlx_core::query_builder::{QueryBuilder, Separated};
use sqlx_core::row::Row;
use sqlx_core::types::Type;
use sqlx_postgres::{PgRow, Postgres};
use uuid::Uuid;

/// A top-level resource backed by one table.
///
/// The table has `id`, `fhir_id`, `created_at` and `updated_at` columns in
/// addition to [`PgEntity::COLUMNS`]; those four are managed by the
/// repository.
pub trait PgEntity: Resource<Filter: PgFilter> + for<'r> FromRow<'r, PgRow> + Unpin {
    const TABLE: &'static str;

    /// Mutable columns, in the order [`PgEntity::push_values`] binds them.
    const COLUMNS: &'static [&'static str];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>);
}

/// A child row owned by a parent table.
pub trait PgChild: ChildResource + for<'r> FromRow<'r, PgRow> + Unpin {
    const TABLE: &'static str;

    /// Foreign key column pointing at the parent.
    const PARENT_COLUMN: &'static str;

    /// Mutable columns, excluding `id`, the parent column and `created_at`.
    const COLUMNS: &'static [&'static str];

    /// `ORDER BY` clause for collection reads.
    const ORDER_BY: &'static str = "created_at, id";

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>);
}

/// SQL rendering of a typed search filter.
pub trait PgFilter: SearchFilter {
    /// Pushes one boolean predicate, without a leading `WHERE` or `AND`.
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>);
}

impl PgFilter for NoFilter {
    fn push_predicate<'args>(&'args self, _builder: &mut QueryBuilder<'args, Postgres>) {
        match *self {}
    }
}

/// Binds column values either as an `INSERT` value list or as `SET`
/// assignments.
pub struct ColumnValues<'qb, 'args> {
    inner: Separated<'qb, 'args, Postgres, &'static str>,
    columns: &'static [&'static str],
    assign: bool,
    pushed: usize,
}

impl<'qb, 'args> ColumnValues<'qb, 'args> {
    fn insert(builder: &'qb mut QueryBuilder<'args, Postgres>, columns: &'static [&'static str]) -> Self {
        Self {
            inner: builder.separated(", "),
            columns,
            assign: false,
            pushed: 0,
        }
    }

    fn assign(builder: &'qb mut QueryBuilder<'args, Postgres>, columns: &'static [&'static str]) -> Self {
        Self {
            inner: builder.separated(", "),
            columns,
            assign: true,
            pushed: 0,
        }
    }

    /// Binds the value of the next column.
    pub fn push<T>(&mut self, value: T) -> &mut Self
    where
        T: 'args + Encode<'args, Postgres> + Type<Postgres> + Send,
    {
        match self.columns.get(self.pushed) {
            Some(column) if self.assign => {
                self.inner.push(format!("{column} = "));
                self.inner.push_bind_unseparated(value);
            }
            _ => {
                self.inner.push_bind(value);
            }
        }
        self.pushed += 1;
        self
    }

    fn finish(self, resource_type: &str) -> StorageResult<()> {
        if self.pushed == self.columns.len() {
            Ok(())
        } else {
            Err(StorageError::internal(format!(
                "{resource_type} bound {} values for {} columns",
                self.pushed,
                self.columns.len()
            )))
        }
    }
}

/// `INSERT ... RETURNING *` for a new top-level row.
pub fn insert_statement<'args, E: PgEntity>(
    entity: &'args E,
    id: Uuid,
    fhir_id: &'args str,
) -> StorageResult<QueryBuilder<'args, Postgres>> {
    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {} (id, fhir_id, {}) VALUES (",
        E::TABLE,
        E::COLUMNS.join(", ")
    ));
    builder.push_bind(id).push(", ").push_bind(fhir_id).push(", ");

    let mut values = ColumnValues::insert(&mut builder, E::COLUMNS);
    entity.push_values(&mut values);
    values.finish(E::RESOURCE_TYPE)?;

    builder.push(") RETURNING *");
    Ok(builder)
}

/// `UPDATE ... RETURNING *` overwriting every mutable column of row `id`.
pub fn update_statement<'args, E: PgEntity>(
    entity: &'args E,
    id: Uuid,
) -> StorageResult<QueryBuilder<'args, Postgres>> {
    let mut builder = QueryBuilder::new(format!("UPDATE {} SET ", E::TABLE));

    let mut values = ColumnValues::assign(&mut builder, E::COLUMNS);
    entity.push_values(&mut values);
    values.finish(E::RESOURCE_TYPE)?;

    builder
        .push(", updated_at = now() WHERE id = ")
        .push_bind(id)
        .push(" RETURNING *");
    Ok(builder)
}

/// `INSERT ... RETURNING *` for a child row of `parent_id`.
pub fn child_insert_statement<'args, C: PgChild>(
    child: &'args C,
    id: Uuid,
    parent_id: Uuid,
) -> StorageResult<QueryBuilder<'args, Postgres>> {
    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {} (id, {}, {}) VALUES (",
        C::TABLE,
        C::PARENT_COLUMN,
        C::COLUMNS.join(", ")
    ));
    builder.push_bind(id).push(", ").push_bind(parent_id).push(", ");

    let mut values = ColumnValues::insert(&mut builder, C::COLUMNS);
    child.push_values(&mut values);
    values.finish(C::RESOURCE_TYPE)?;

    builder.push(") RETURNING *");
    Ok(builder)
}

/// Appends `WHERE p1 AND p2 ...`; nothing when `filters` is empty.
pub fn push_where<'args, F: PgFilter>(
    builder: &mut QueryBuilder<'args, Postgres>,
    filters: &'args [F],
) {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        filter.push_predicate(builder);
    }
}

/// Reads the four managed columns of a top-level row.
pub fn record_meta(row: &PgRow) -> Result<RecordMeta, SqlxError> {
    Ok(RecordMeta {
        id: Some(row.try_get("id")?),
        fhir_id: Some(row.try_get("fhir_id")?),
        created_at: Some(row.try_get("created_at")?),
        updated_at: Some(row.try_get("updated_at")?),
    })
}
