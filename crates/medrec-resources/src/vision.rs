//! Vision prescriptions and their per-eye lens specifications.

use chrono::{DateTime, Utc};
use medrec_core::validation::{Validate, ValidationError, check_code, default_code, require};
use medrec_core::{CodeSet, value_set};
use medrec_db_postgres::{ColumnValues, PgChild, PgEntity, PgFilter, predicate, record_meta};
use medrec_storage::filter::{parse_code, parse_instant, parse_uuid};
use medrec_storage::{ChildResource, FilterError, RecordMeta, SearchFilter};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx_core::error::Error as SqlxError;
use sqlx_core::from_row::FromRow;
use sqlx_core::query_builder::QueryBuilder;
use sqlx_core::row::Row;
use sqlx_postgres::{PgRow, Postgres};
use uuid::Uuid;

value_set! {
    pub enum VisionPrescriptionStatus {
        Draft => "draft",
        Active => "active",
        Cancelled => "cancelled",
        EnteredInError => "entered-in-error",
    }
}

value_set! {
    pub enum Eye {
        Right => "right",
        Left => "left",
    }
}

value_set! {
    pub enum LensProduct {
        Lens => "lens",
        Contact => "contact",
    }
}

value_set! {
    pub enum PrismBase {
        Up => "up",
        Down => "down",
        In => "in",
        Out => "out",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionPrescription {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescriber_id: Option<Uuid>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_written: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl_resource!(VisionPrescription, "VisionPrescription", VisionPrescriptionFilter);
impl_scopes!(VisionPrescription, patient = VisionPrescriptionFilter::Patient);

#[derive(Debug, Clone, PartialEq)]
pub enum VisionPrescriptionFilter {
    Patient(Uuid),
    Encounter(Uuid),
    Prescriber(Uuid),
    Status(VisionPrescriptionStatus),
    WrittenFrom(DateTime<Utc>),
    WrittenTo(DateTime<Utc>),
}

impl SearchFilter for VisionPrescriptionFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "patient" => Self::Patient(parse_uuid(key, value)?),
            "encounter" => Self::Encounter(parse_uuid(key, value)?),
            "prescriber" => Self::Prescriber(parse_uuid(key, value)?),
            "status" => Self::Status(parse_code(key, value)?),
            "written_from" => Self::WrittenFrom(parse_instant(key, value)?),
            "written_to" => Self::WrittenTo(parse_instant(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for VisionPrescriptionFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Patient(id) => predicate::eq(builder, "patient_id", *id),
            Self::Encounter(id) => predicate::eq(builder, "encounter_id", *id),
            Self::Prescriber(id) => predicate::eq(builder, "prescriber_id", *id),
            Self::Status(status) => predicate::eq(builder, "status", status.as_str()),
            Self::WrittenFrom(at) => predicate::ge(builder, "date_written", *at),
            Self::WrittenTo(at) => predicate::le(builder, "date_written", *at),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for VisionPrescription {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            patient_id: row.try_get("patient_id")?,
            encounter_id: row.try_get("encounter_id")?,
            prescriber_id: row.try_get("prescriber_id")?,
            status: row.try_get("status")?,
            date_written: row.try_get("date_written")?,
            note: row.try_get("note")?,
        })
    }
}

impl PgEntity for VisionPrescription {
    const TABLE: &'static str = "vision_prescription";
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "encounter_id",
        "prescriber_id",
        "status",
        "date_written",
        "note",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.patient_id)
            .push(self.encounter_id)
            .push(self.prescriber_id)
            .push(&self.status)
            .push(self.date_written)
            .push(&self.note);
    }
}

impl Validate for VisionPrescription {
    fn apply_defaults(&mut self) {
        default_code(&mut self.status, VisionPrescriptionStatus::Draft);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("patient_id", &self.patient_id)?;
        check_code::<VisionPrescriptionStatus>("status", &self.status)?;
        Ok(())
    }

    fn stamp(&mut self, stored: Option<&Self>) {
        if self.date_written.is_none() {
            self.date_written = stored
                .and_then(|s| s.date_written)
                .or_else(|| Some(Utc::now()));
        }
    }
}

// ==================== Lens specifications ====================

/// Refraction for one eye. Powers are in diopters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionLensSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision_prescription_id: Option<Uuid>,
    #[serde(default)]
    pub eye: String,
    #[serde(default)]
    pub product: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sphere: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cylinder: Option<Decimal>,
    /// Cylinder axis in degrees, 0 to 180.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_power: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prism: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prism_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChildResource for VisionLensSpec {
    const RESOURCE_TYPE: &'static str = "VisionLensSpec";
    type Parent = VisionPrescription;

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.vision_prescription_id
    }

    fn attach(&mut self, parent_id: Uuid) {
        self.vision_prescription_id = Some(parent_id);
    }
}

impl<'r> FromRow<'r, PgRow> for VisionLensSpec {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            id: row.try_get("id")?,
            vision_prescription_id: row.try_get("vision_prescription_id")?,
            eye: row.try_get("eye")?,
            product: row.try_get("product")?,
            sphere: row.try_get("sphere")?,
            cylinder: row.try_get("cylinder")?,
            axis: row.try_get("axis")?,
            add_power: row.try_get("add_power")?,
            prism: row.try_get("prism")?,
            prism_base: row.try_get("prism_base")?,
            note: row.try_get("note")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl PgChild for VisionLensSpec {
    const TABLE: &'static str = "vision_lens_spec";
    const PARENT_COLUMN: &'static str = "vision_prescription_id";
    const COLUMNS: &'static [&'static str] = &[
        "eye",
        "product",
        "sphere",
        "cylinder",
        "axis",
        "add_power",
        "prism",
        "prism_base",
        "note",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(&self.eye)
            .push(&self.product)
            .push(self.sphere)
            .push(self.cylinder)
            .push(self.axis)
            .push(self.add_power)
            .push(self.prism)
            .push(&self.prism_base)
            .push(&self.note);
    }
}

impl Validate for VisionLensSpec {
    fn validate(&self) -> Result<(), ValidationError> {
        check_code::<Eye>("eye", &self.eye)?;
        check_code::<LensProduct>("product", &self.product)?;
        if self.axis.is_some_and(|axis| !(0..=180).contains(&axis)) {
            return Err(ValidationError::invalid("axis", "must be between 0 and 180"));
        }
        if let Some(base) = self.prism_base.as_deref() {
            check_code::<PrismBase>("prism_base", base)?;
        }
        Ok(())
    }
}
