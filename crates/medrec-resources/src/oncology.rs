//! Oncology: cancer diagnoses and chemotherapy protocols with their cycles.

use chrono::{DateTime, NaiveDate, Utc};
use medrec_core::validation::{
    Validate, ValidationError, check_code, check_range, default_code, require, require_text,
};
use medrec_core::{CodeSet, value_set};
use medrec_db_postgres::{ColumnValues, PgChild, PgEntity, PgFilter, predicate, record_meta};
use medrec_storage::filter::{parse_code, parse_text, parse_uuid};
use medrec_storage::{ChildResource, FilterError, RecordMeta, SearchFilter};
use serde::{Deserialize, Serialize};
use sqlx_core::error::Error as SqlxError;
use sqlx_core::from_row::FromRow;
use sqlx_core::query_builder::QueryBuilder;
use sqlx_core::row::Row;
use sqlx_postgres::{PgRow, Postgres};
use uuid::Uuid;

/// Initial `clinical_status` of a diagnosis. The field itself is free text.
pub const DEFAULT_CLINICAL_STATUS: &str = "active";

value_set! {
    pub enum ChemoProtocolStatus {
        Planned => "planned",
        Active => "active",
        OnHold => "on-hold",
        Completed => "completed",
        Stopped => "stopped",
    }
}

value_set! {
    pub enum ChemoCycleStatus {
        Scheduled => "scheduled",
        InProgress => "in-progress",
        Completed => "completed",
        Delayed => "delayed",
        Cancelled => "cancelled",
    }
}

// ==================== Diagnoses ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CancerDiagnosis {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosed_by_id: Option<Uuid>,
    #[serde(default)]
    pub clinical_status: String,
    /// ICD-O-3 topography code.
    #[serde(default)]
    pub primary_site_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_site_display: Option<String>,
    /// ICD-O-3 morphology code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histology_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub laterality: Option<String>,
    /// Staging system, e.g. `AJCC8`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosed_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl_resource!(CancerDiagnosis, "CancerDiagnosis", CancerDiagnosisFilter);
impl_scopes!(CancerDiagnosis, patient = CancerDiagnosisFilter::Patient);

#[derive(Debug, Clone, PartialEq)]
pub enum CancerDiagnosisFilter {
    Patient(Uuid),
    ClinicalStatus(String),
    PrimarySite(String),
    StageGroup(String),
}

impl SearchFilter for CancerDiagnosisFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "patient" => Self::Patient(parse_uuid(key, value)?),
            "clinical_status" => Self::ClinicalStatus(parse_text(key, value)?),
            "primary_site" => Self::PrimarySite(parse_text(key, value)?),
            "stage_group" => Self::StageGroup(parse_text(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for CancerDiagnosisFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Patient(id) => predicate::eq(builder, "patient_id", *id),
            Self::ClinicalStatus(status) => predicate::eq(builder, "clinical_status", status),
            Self::PrimarySite(code) => predicate::eq(builder, "primary_site_code", code),
            Self::StageGroup(group) => predicate::eq(builder, "stage_group", group),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for CancerDiagnosis {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            patient_id: row.try_get("patient_id")?,
            diagnosed_by_id: row.try_get("diagnosed_by_id")?,
            clinical_status: row.try_get("clinical_status")?,
            primary_site_code: row.try_get("primary_site_code")?,
            primary_site_display: row.try_get("primary_site_display")?,
            histology_code: row.try_get("histology_code")?,
            laterality: row.try_get("laterality")?,
            stage_system: row.try_get("stage_system")?,
            stage_group: row.try_get("stage_group")?,
            t_category: row.try_get("t_category")?,
            n_category: row.try_get("n_category")?,
            m_category: row.try_get("m_category")?,
            diagnosed_on: row.try_get("diagnosed_on")?,
            note: row.try_get("note")?,
        })
    }
}

impl PgEntity for CancerDiagnosis {
    const TABLE: &'static str = "cancer_diagnosis";
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "diagnosed_by_id",
        "clinical_status",
        "primary_site_code",
        "primary_site_display",
        "histology_code",
        "laterality",
        "stage_system",
        "stage_group",
        "t_category",
        "n_category",
        "m_category",
        "diagnosed_on",
        "note",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.patient_id)
            .push(self.diagnosed_by_id)
            .push(&self.clinical_status)
            .push(&self.primary_site_code)
            .push(&self.primary_site_display)
            .push(&self.histology_code)
            .push(&self.laterality)
            .push(&self.stage_system)
            .push(&self.stage_group)
            .push(&self.t_category)
            .push(&self.n_category)
            .push(&self.m_category)
            .push(self.diagnosed_on)
            .push(&self.note);
    }
}

impl Validate for CancerDiagnosis {
    fn apply_defaults(&mut self) {
        if self.clinical_status.is_empty() {
            self.clinical_status = DEFAULT_CLINICAL_STATUS.to_string();
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("patient_id", &self.patient_id)?;
        require_text("primary_site_code", &self.primary_site_code)?;
        Ok(())
    }
}

// ==================== Protocols ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChemoProtocol {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancer_diagnosis_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescriber_id: Option<Uuid>,
    /// Regimen name, e.g. `FOLFOX`.
    #[serde(default)]
    pub protocol_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_cycles: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_length_days: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl_resource!(ChemoProtocol, "ChemoProtocol", ChemoProtocolFilter);
impl_scopes!(ChemoProtocol, patient = ChemoProtocolFilter::Patient);

#[derive(Debug, Clone, PartialEq)]
pub enum ChemoProtocolFilter {
    Patient(Uuid),
    Diagnosis(Uuid),
    Prescriber(Uuid),
    Status(ChemoProtocolStatus),
    Name(String),
}

impl SearchFilter for ChemoProtocolFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "patient" => Self::Patient(parse_uuid(key, value)?),
            "diagnosis" => Self::Diagnosis(parse_uuid(key, value)?),
            "prescriber" => Self::Prescriber(parse_uuid(key, value)?),
            "status" => Self::Status(parse_code(key, value)?),
            "name" => Self::Name(parse_text(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for ChemoProtocolFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Patient(id) => predicate::eq(builder, "patient_id", *id),
            Self::Diagnosis(id) => predicate::eq(builder, "cancer_diagnosis_id", *id),
            Self::Prescriber(id) => predicate::eq(builder, "prescriber_id", *id),
            Self::Status(status) => predicate::eq(builder, "status", status.as_str()),
            Self::Name(text) => predicate::contains(builder, "protocol_name", text),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for ChemoProtocol {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            patient_id: row.try_get("patient_id")?,
            cancer_diagnosis_id: row.try_get("cancer_diagnosis_id")?,
            prescriber_id: row.try_get("prescriber_id")?,
            protocol_name: row.try_get("protocol_name")?,
            status: row.try_get("status")?,
            planned_cycles: row.try_get("planned_cycles")?,
            cycle_length_days: row.try_get("cycle_length_days")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            note: row.try_get("note")?,
        })
    }
}

impl PgEntity for ChemoProtocol {
    const TABLE: &'static str = "chemo_protocol";
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "cancer_diagnosis_id",
        "prescriber_id",
        "protocol_name",
        "status",
        "planned_cycles",
        "cycle_length_days",
        "start_date",
        "end_date",
        "note",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.patient_id)
            .push(self.cancer_diagnosis_id)
            .push(self.prescriber_id)
            .push(&self.protocol_name)
            .push(&self.status)
            .push(self.planned_cycles)
            .push(self.cycle_length_days)
            .push(self.start_date)
            .push(self.end_date)
            .push(&self.note);
    }
}

impl Validate for ChemoProtocol {
    fn apply_defaults(&mut self) {
        default_code(&mut self.status, ChemoProtocolStatus::Planned);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("patient_id", &self.patient_id)?;
        require_text("protocol_name", &self.protocol_name)?;
        check_code::<ChemoProtocolStatus>("status", &self.status)?;
        for (field, value) in [
            ("planned_cycles", self.planned_cycles),
            ("cycle_length_days", self.cycle_length_days),
        ] {
            if value.is_some_and(|n| n <= 0) {
                return Err(ValidationError::invalid(field, "must be positive"));
            }
        }
        check_range("period", self.start_date.as_ref(), self.end_date.as_ref())?;
        Ok(())
    }
}

// ==================== Cycles ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChemoCycle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chemo_protocol_id: Option<Uuid>,
    #[serde(default)]
    pub cycle_number: i32,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose_modification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChildResource for ChemoCycle {
    const RESOURCE_TYPE: &'static str = "ChemoCycle";
    type Parent = ChemoProtocol;

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.chemo_protocol_id
    }

    fn attach(&mut self, parent_id: Uuid) {
        self.chemo_protocol_id = Some(parent_id);
    }
}

impl<'r> FromRow<'r, PgRow> for ChemoCycle {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            id: row.try_get("id")?,
            chemo_protocol_id: row.try_get("chemo_protocol_id")?,
            cycle_number: row.try_get("cycle_number")?,
            status: row.try_get("status")?,
            planned_start: row.try_get("planned_start")?,
            actual_start: row.try_get("actual_start")?,
            dose_modification: row.try_get("dose_modification")?,
            note: row.try_get("note")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl PgChild for ChemoCycle {
    const TABLE: &'static str = "chemo_cycle";
    const PARENT_COLUMN: &'static str = "chemo_protocol_id";
    const COLUMNS: &'static [&'static str] = &[
        "cycle_number",
        "status",
        "planned_start",
        "actual_start",
        "dose_modification",
        "note",
    ];
    const ORDER_BY: &'static str = "cycle_number";

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.cycle_number)
            .push(&self.status)
            .push(self.planned_start)
            .push(self.actual_start)
            .push(&self.dose_modification)
            .push(&self.note);
    }
}

impl Validate for ChemoCycle {
    fn apply_defaults(&mut self) {
        default_code(&mut self.status, ChemoCycleStatus::Scheduled);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.cycle_number < 1 {
            return Err(ValidationError::invalid("cycle_number", "must be at least 1"));
        }
        check_code::<ChemoCycleStatus>("status", &self.status)?;
        Ok(())
    }
}
