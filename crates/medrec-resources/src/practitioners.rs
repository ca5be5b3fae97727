//! Practitioners.

use medrec_core::validation::{Validate, ValidationError, require_text};
use medrec_db_postgres::{ColumnValues, PgEntity, PgFilter, predicate, record_meta};
use medrec_storage::filter::{parse_bool, parse_text};
use medrec_storage::{FilterError, RecordMeta, SearchFilter};
use serde::{Deserialize, Serialize};
use sqlx_core::error::Error as SqlxError;
use sqlx_core::from_row::FromRow;
use sqlx_core::query_builder::QueryBuilder;
use sqlx_core::row::Row;
use sqlx_postgres::{PgRow, Postgres};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Practitioner {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub family_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// National provider identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default = "crate::default_true")]
    pub active: bool,
}

impl Default for Practitioner {
    fn default() -> Self {
        Self {
            meta: RecordMeta::default(),
            family_name: String::new(),
            given_name: None,
            npi: None,
            specialty: None,
            phone: None,
            email: None,
            active: true,
        }
    }
}

impl_resource!(Practitioner, "Practitioner", PractitionerFilter);

#[derive(Debug, Clone, PartialEq)]
pub enum PractitionerFilter {
    Family(String),
    Npi(String),
    Specialty(String),
    Active(bool),
}

impl SearchFilter for PractitionerFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "family" => Self::Family(parse_text(key, value)?),
            "npi" => Self::Npi(parse_text(key, value)?),
            "specialty" => Self::Specialty(parse_text(key, value)?),
            "active" => Self::Active(parse_bool(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for PractitionerFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Family(text) => predicate::contains(builder, "family_name", text),
            Self::Npi(npi) => predicate::eq(builder, "npi", npi),
            Self::Specialty(specialty) => predicate::eq(builder, "specialty", specialty),
            Self::Active(active) => predicate::eq(builder, "active", *active),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Practitioner {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            family_name: row.try_get("family_name")?,
            given_name: row.try_get("given_name")?,
            npi: row.try_get("npi")?,
            specialty: row.try_get("specialty")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
            active: row.try_get("active")?,
        })
    }
}

impl PgEntity for Practitioner {
    const TABLE: &'static str = "practitioner";
    const COLUMNS: &'static [&'static str] = &[
        "family_name",
        "given_name",
        "npi",
        "specialty",
        "phone",
        "email",
        "active",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(&self.family_name)
            .push(&self.given_name)
            .push(&self.npi)
            .push(&self.specialty)
            .push(&self.phone)
            .push(&self.email)
            .push(self.active);
    }
}

impl Validate for Practitioner {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("family_name", &self.family_name)
    }
}
