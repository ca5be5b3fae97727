//! Clinical documents: compositions and their ordered sections.

use chrono::{DateTime, Utc};
use medrec_core::validation::{
    Validate, ValidationError, check_code, check_optional_code, default_code, require, require_text,
};
use medrec_core::{CodeSet, value_set};
use medrec_db_postgres::{ColumnValues, PgChild, PgEntity, PgFilter, predicate, record_meta};
use medrec_storage::filter::{parse_code, parse_instant, parse_text, parse_uuid};
use medrec_storage::{ChildResource, FilterError, RecordMeta, SearchFilter};
use serde::{Deserialize, Serialize};
use sqlx_core::error::Error as SqlxError;
use sqlx_core::from_row::FromRow;
use sqlx_core::query_builder::QueryBuilder;
use sqlx_core::row::Row;
use sqlx_postgres::{PgRow, Postgres};
use uuid::Uuid;

value_set! {
    pub enum CompositionStatus {
        Preliminary => "preliminary",
        Final => "final",
        Amended => "amended",
        EnteredInError => "entered-in-error",
    }
}

value_set! {
    /// HL7 v3 Confidentiality codes.
    pub enum Confidentiality {
        Unrestricted => "U",
        Low => "L",
        Moderate => "M",
        Normal => "N",
        Restricted => "R",
        VeryRestricted => "V",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub status: String,
    /// LOINC document type, e.g. `11506-3` for a progress note.
    #[serde(default)]
    pub type_code: String,
    #[serde(default)]
    pub title: String,
    /// Document date; stamped with the current time when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidentiality: Option<String>,
}

impl_resource!(Composition, "Composition", CompositionFilter);
impl_scopes!(
    Composition,
    patient = CompositionFilter::Patient,
    encounter = CompositionFilter::Encounter
);

#[derive(Debug, Clone, PartialEq)]
pub enum CompositionFilter {
    Patient(Uuid),
    Encounter(Uuid),
    Author(Uuid),
    Status(CompositionStatus),
    Type(String),
    Title(String),
    DateFrom(DateTime<Utc>),
    DateTo(DateTime<Utc>),
}

impl SearchFilter for CompositionFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "patient" => Self::Patient(parse_uuid(key, value)?),
            "encounter" => Self::Encounter(parse_uuid(key, value)?),
            "author" => Self::Author(parse_uuid(key, value)?),
            "status" => Self::Status(parse_code(key, value)?),
            "type" => Self::Type(parse_text(key, value)?),
            "title" => Self::Title(parse_text(key, value)?),
            "date_from" => Self::DateFrom(parse_instant(key, value)?),
            "date_to" => Self::DateTo(parse_instant(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for CompositionFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Patient(id) => predicate::eq(builder, "patient_id", *id),
            Self::Encounter(id) => predicate::eq(builder, "encounter_id", *id),
            Self::Author(id) => predicate::eq(builder, "author_id", *id),
            Self::Status(status) => predicate::eq(builder, "status", status.as_str()),
            Self::Type(code) => predicate::eq(builder, "type_code", code),
            Self::Title(text) => predicate::contains(builder, "title", text),
            Self::DateFrom(at) => predicate::ge(builder, "date", *at),
            Self::DateTo(at) => predicate::le(builder, "date", *at),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Composition {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            patient_id: row.try_get("patient_id")?,
            encounter_id: row.try_get("encounter_id")?,
            author_id: row.try_get("author_id")?,
            status: row.try_get("status")?,
            type_code: row.try_get("type_code")?,
            title: row.try_get("title")?,
            date: row.try_get("date")?,
            confidentiality: row.try_get("confidentiality")?,
        })
    }
}

impl PgEntity for Composition {
    const TABLE: &'static str = "composition";
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "encounter_id",
        "author_id",
        "status",
        "type_code",
        "title",
        "date",
        "confidentiality",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.patient_id)
            .push(self.encounter_id)
            .push(self.author_id)
            .push(&self.status)
            .push(&self.type_code)
            .push(&self.title)
            .push(self.date)
            .push(&self.confidentiality);
    }
}

impl Validate for Composition {
    fn apply_defaults(&mut self) {
        default_code(&mut self.status, CompositionStatus::Preliminary);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("patient_id", &self.patient_id)?;
        check_code::<CompositionStatus>("status", &self.status)?;
        require_text("type_code", &self.type_code)?;
        require_text("title", &self.title)?;
        check_optional_code::<Confidentiality>("confidentiality", self.confidentiality.as_deref())?;
        Ok(())
    }

    fn stamp(&mut self, stored: Option<&Self>) {
        if self.date.is_none() {
            self.date = stored.and_then(|s| s.date).or_else(|| Some(Utc::now()));
        }
    }
}

/// One section of a composition, listed by `sort_order`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositionSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChildResource for CompositionSection {
    const RESOURCE_TYPE: &'static str = "CompositionSection";
    type Parent = Composition;

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.composition_id
    }

    fn attach(&mut self, parent_id: Uuid) {
        self.composition_id = Some(parent_id);
    }
}

impl<'r> FromRow<'r, PgRow> for CompositionSection {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            id: row.try_get("id")?,
            composition_id: row.try_get("composition_id")?,
            title: row.try_get("title")?,
            code: row.try_get("code")?,
            text: row.try_get("text")?,
            sort_order: row.try_get("sort_order")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl PgChild for CompositionSection {
    const TABLE: &'static str = "composition_section";
    const PARENT_COLUMN: &'static str = "composition_id";
    const COLUMNS: &'static [&'static str] = &["title", "code", "text", "sort_order"];
    const ORDER_BY: &'static str = "sort_order, created_at, id";

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(&self.title)
            .push(&self.code)
            .push(&self.text)
            .push(self.sort_order);
    }
}

impl Validate for CompositionSection {
    fn validate(&self) -> Result<(), ValidationError> {
        let blank = |s: &Option<String>| s.as_deref().is_none_or(|s| s.trim().is_empty());
        if blank(&self.title) && blank(&self.text) {
            return Err(ValidationError::required("title"));
        }
        if self.sort_order < 0 {
            return Err(ValidationError::invalid("sort_order", "must not be negative"));
        }
        Ok(())
    }
}
