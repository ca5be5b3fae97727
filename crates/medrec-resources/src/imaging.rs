//! Imaging studies.

use chrono::{DateTime, Utc};
use medrec_core::validation::{Validate, ValidationError, check_code, default_code, require};
use medrec_core::{CodeSet, value_set};
use medrec_db_postgres::{ColumnValues, PgEntity, PgFilter, predicate, record_meta};
use medrec_storage::filter::{parse_code, parse_text, parse_uuid};
use medrec_storage::{FilterError, RecordMeta, SearchFilter};
use serde::{Deserialize, Serialize};
use sqlx_core::error::Error as SqlxError;
use sqlx_core::from_row::FromRow;
use sqlx_core::query_builder::QueryBuilder;
use sqlx_core::row::Row;
use sqlx_postgres::{PgRow, Postgres};
use uuid::Uuid;

value_set! {
    pub enum ImagingStudyStatus {
        Registered => "registered",
        Available => "available",
        Cancelled => "cancelled",
        EnteredInError => "entered-in-error",
        Unknown => "unknown",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagingStudy {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_request_id: Option<Uuid>,
    #[serde(default)]
    pub status: String,
    /// DICOM modality code, e.g. `CT` or `MR`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,
    /// DICOM Study Instance UID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_series: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_instances: Option<i32>,
}

impl_resource!(ImagingStudy, "ImagingStudy", ImagingStudyFilter);
impl_scopes!(ImagingStudy, patient = ImagingStudyFilter::Patient);

#[derive(Debug, Clone, PartialEq)]
pub enum ImagingStudyFilter {
    Patient(Uuid),
    Encounter(Uuid),
    Status(ImagingStudyStatus),
    Modality(String),
    StudyUid(String),
}

impl SearchFilter for ImagingStudyFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "patient" => Self::Patient(parse_uuid(key, value)?),
            "encounter" => Self::Encounter(parse_uuid(key, value)?),
            "status" => Self::Status(parse_code(key, value)?),
            "modality" => Self::Modality(parse_text(key, value)?),
            "study_uid" => Self::StudyUid(parse_text(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for ImagingStudyFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Patient(id) => predicate::eq(builder, "patient_id", *id),
            Self::Encounter(id) => predicate::eq(builder, "encounter_id", *id),
            Self::Status(status) => predicate::eq(builder, "status", status.as_str()),
            Self::Modality(modality) => predicate::eq(builder, "modality", modality),
            Self::StudyUid(uid) => predicate::eq(builder, "study_uid", uid),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for ImagingStudy {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            patient_id: row.try_get("patient_id")?,
            encounter_id: row.try_get("encounter_id")?,
            service_request_id: row.try_get("service_request_id")?,
            status: row.try_get("status")?,
            modality: row.try_get("modality")?,
            study_uid: row.try_get("study_uid")?,
            description: row.try_get("description")?,
            started_at: row.try_get("started_at")?,
            number_of_series: row.try_get("number_of_series")?,
            number_of_instances: row.try_get("number_of_instances")?,
        })
    }
}

impl PgEntity for ImagingStudy {
    const TABLE: &'static str = "imaging_study";
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "encounter_id",
        "service_request_id",
        "status",
        "modality",
        "study_uid",
        "description",
        "started_at",
        "number_of_series",
        "number_of_instances",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.patient_id)
            .push(self.encounter_id)
            .push(self.service_request_id)
            .push(&self.status)
            .push(&self.modality)
            .push(&self.study_uid)
            .push(&self.description)
            .push(self.started_at)
            .push(self.number_of_series)
            .push(self.number_of_instances);
    }
}

impl Validate for ImagingStudy {
    fn apply_defaults(&mut self) {
        default_code(&mut self.status, ImagingStudyStatus::Registered);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("patient_id", &self.patient_id)?;
        check_code::<ImagingStudyStatus>("status", &self.status)?;
        for (field, count) in [
            ("number_of_series", self.number_of_series),
            ("number_of_instances", self.number_of_instances),
        ] {
            if count.is_some_and(|n| n < 0) {
                return Err(ValidationError::invalid(field, "must not be negative"));
            }
        }
        Ok(())
    }
}
