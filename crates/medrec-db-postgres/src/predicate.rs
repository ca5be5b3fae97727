//! Building blocks for [`PgFilter`](crate::PgFilter) implementations.
//!
//! Column names are always static; values are always bound.

use sqlx_core::encode::Encode;
use sqlx_core::query_builder::QueryBuilder;
use sqlx_core::types::Type;
use sqlx_postgres::Postgres;

/// `column = $n`
pub fn eq<'args, T>(builder: &mut QueryBuilder<'args, Postgres>, column: &'static str, value: T)
where
    T: 'args + Encode<'args, Postgres> + Type<Postgres> + Send,
{
    builder.push(column).push(" = ").push_bind(value);
}

/// `column >= $n`
pub fn ge<'args, T>(builder: &mut QueryBuilder<'args, Postgres>, column: &'static str, value: T)
where
    T: 'args + Encode<'args, Postgres> + Type<Postgres> + Send,
{
    builder.push(column).push(" >= ").push_bind(value);
}

/// `column <= $n`
pub fn le<'args, T>(builder: &mut QueryBuilder<'args, Postgres>, column: &'static str, value: T)
where
    T: 'args + Encode<'args, Postgres> + Type<Postgres> + Send,
{
    builder.push(column).push(" <= ").push_bind(value);
}

/// Case-insensitive substring match; `%` and `_` in `text` match literally.
pub fn contains(builder: &mut QueryBuilder<'_, Postgres>, column: &'static str, text: &str) {
    builder.push(column).push(" ILIKE ").push_bind(like_pattern(text));
}

fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(like_pattern("smith"), "%smith%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn comparisons_bind_values() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 WHERE ");
        ge(&mut builder, "period_start", 3_i32);
        builder.push(" AND ");
        le(&mut builder, "period_start", 9_i32);
        assert_eq!(
            builder.sql(),
            "SELECT 1 WHERE period_start >= $1 AND period_start <= $2"
        );
    }
}
