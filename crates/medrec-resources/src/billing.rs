//! Claims with their line items, diagnoses and procedures.

use chrono::{DateTime, NaiveDate, Utc};
use medrec_core::validation::{
    Validate, ValidationError, check_code, check_range, default_code, require, require_text,
};
use medrec_core::{CodeSet, value_set};
use medrec_db_postgres::{ColumnValues, PgChild, PgEntity, PgFilter, predicate, record_meta};
use medrec_storage::filter::{parse_code, parse_date, parse_text, parse_uuid};
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
    pub enum ClaimStatus {
        Draft => "draft",
        Active => "active",
        Cancelled => "cancelled",
        EnteredInError => "entered-in-error",
    }
}

value_set! {
    pub enum ClaimUse {
        Claim => "claim",
        Preauthorization => "preauthorization",
        Predetermination => "predetermination",
    }
}

value_set! {
    pub enum ClaimType {
        Institutional => "institutional",
        Oral => "oral",
        Pharmacy => "pharmacy",
        Professional => "professional",
        Vision => "vision",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<Uuid>,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "use", default)]
    pub use_code: String,
    #[serde(default)]
    pub type_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billable_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billable_end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,
    /// ISO 4217 code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl_resource!(Claim, "Claim", ClaimFilter);
impl_scopes!(Claim, patient = ClaimFilter::Patient);

#[derive(Debug, Clone, PartialEq)]
pub enum ClaimFilter {
    Patient(Uuid),
    Provider(Uuid),
    Encounter(Uuid),
    Status(ClaimStatus),
    Use(ClaimUse),
    Type(ClaimType),
    Insurer(String),
    /// Billable period starts on or after.
    BillableFrom(NaiveDate),
    /// Billable period starts on or before.
    BillableTo(NaiveDate),
}

impl SearchFilter for ClaimFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "patient" => Self::Patient(parse_uuid(key, value)?),
            "provider" => Self::Provider(parse_uuid(key, value)?),
            "encounter" => Self::Encounter(parse_uuid(key, value)?),
            "status" => Self::Status(parse_code(key, value)?),
            "use" => Self::Use(parse_code(key, value)?),
            "type" => Self::Type(parse_code(key, value)?),
            "insurer" => Self::Insurer(parse_text(key, value)?),
            "billable_from" => Self::BillableFrom(parse_date(key, value)?),
            "billable_to" => Self::BillableTo(parse_date(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for ClaimFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Patient(id) => predicate::eq(builder, "patient_id", *id),
            Self::Provider(id) => predicate::eq(builder, "provider_id", *id),
            Self::Encounter(id) => predicate::eq(builder, "encounter_id", *id),
            Self::Status(status) => predicate::eq(builder, "status", status.as_str()),
            Self::Use(code) => predicate::eq(builder, "use_code", code.as_str()),
            Self::Type(code) => predicate::eq(builder, "type_code", code.as_str()),
            Self::Insurer(text) => predicate::contains(builder, "insurer", text),
            Self::BillableFrom(date) => predicate::ge(builder, "billable_start", *date),
            Self::BillableTo(date) => predicate::le(builder, "billable_start", *date),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Claim {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            patient_id: row.try_get("patient_id")?,
            provider_id: row.try_get("provider_id")?,
            encounter_id: row.try_get("encounter_id")?,
            status: row.try_get("status")?,
            use_code: row.try_get("use_code")?,
            type_code: row.try_get("type_code")?,
            insurer: row.try_get("insurer")?,
            billable_start: row.try_get("billable_start")?,
            billable_end: row.try_get("billable_end")?,
            total_amount: row.try_get("total_amount")?,
            currency: row.try_get("currency")?,
        })
    }
}

impl PgEntity for Claim {
    const TABLE: &'static str = "claim";
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "provider_id",
        "encounter_id",
        "status",
        "use_code",
        "type_code",
        "insurer",
        "billable_start",
        "billable_end",
        "total_amount",
        "currency",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.patient_id)
            .push(self.provider_id)
            .push(self.encounter_id)
            .push(&self.status)
            .push(&self.use_code)
            .push(&self.type_code)
            .push(&self.insurer)
            .push(self.billable_start)
            .push(self.billable_end)
            .push(self.total_amount)
            .push(&self.currency);
    }
}

impl Validate for Claim {
    fn apply_defaults(&mut self) {
        default_code(&mut self.status, ClaimStatus::Draft);
        default_code(&mut self.use_code, ClaimUse::Claim);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("patient_id", &self.patient_id)?;
        check_code::<ClaimStatus>("status", &self.status)?;
        check_code::<ClaimUse>("use", &self.use_code)?;
        check_code::<ClaimType>("type_code", &self.type_code)?;
        check_range(
            "billable_period",
            self.billable_start.as_ref(),
            self.billable_end.as_ref(),
        )?;
        check_non_negative("total_amount", self.total_amount)?;
        Ok(())
    }
}

fn check_non_negative(field: &'static str, amount: Option<Decimal>) -> Result<(), ValidationError> {
    match amount {
        Some(amount) if amount < Decimal::ZERO => {
            Err(ValidationError::invalid(field, "must not be negative"))
        }
        _ => Ok(()),
    }
}

fn check_sequence(sequence: i32) -> Result<(), ValidationError> {
    if sequence < 1 {
        return Err(ValidationError::invalid("sequence", "must be at least 1"));
    }
    Ok(())
}

// ==================== Line items ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<Uuid>,
    #[serde(default)]
    pub sequence: i32,
    /// Billing code, usually CPT or HCPCS.
    #[serde(default)]
    pub product_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serviced_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChildResource for ClaimItem {
    const RESOURCE_TYPE: &'static str = "ClaimItem";
    type Parent = Claim;

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.claim_id
    }

    fn attach(&mut self, parent_id: Uuid) {
        self.claim_id = Some(parent_id);
    }
}

impl<'r> FromRow<'r, PgRow> for ClaimItem {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            id: row.try_get("id")?,
            claim_id: row.try_get("claim_id")?,
            sequence: row.try_get("sequence")?,
            product_code: row.try_get("product_code")?,
            description: row.try_get("description")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            net_amount: row.try_get("net_amount")?,
            serviced_on: row.try_get("serviced_on")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl PgChild for ClaimItem {
    const TABLE: &'static str = "claim_item";
    const PARENT_COLUMN: &'static str = "claim_id";
    const COLUMNS: &'static [&'static str] = &[
        "sequence",
        "product_code",
        "description",
        "quantity",
        "unit_price",
        "net_amount",
        "serviced_on",
    ];
    const ORDER_BY: &'static str = "sequence";

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.sequence)
            .push(&self.product_code)
            .push(&self.description)
            .push(self.quantity)
            .push(self.unit_price)
            .push(self.net_amount)
            .push(self.serviced_on);
    }
}

impl Validate for ClaimItem {
    fn validate(&self) -> Result<(), ValidationError> {
        check_sequence(self.sequence)?;
        require_text("product_code", &self.product_code)?;
        check_non_negative("quantity", self.quantity)?;
        check_non_negative("unit_price", self.unit_price)?;
        check_non_negative("net_amount", self.net_amount)?;
        Ok(())
    }
}

// ==================== Diagnoses ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimDiagnosis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<Uuid>,
    #[serde(default)]
    pub sequence: i32,
    /// ICD-10 code.
    #[serde(default)]
    pub diagnosis_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChildResource for ClaimDiagnosis {
    const RESOURCE_TYPE: &'static str = "ClaimDiagnosis";
    type Parent = Claim;

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.claim_id
    }

    fn attach(&mut self, parent_id: Uuid) {
        self.claim_id = Some(parent_id);
    }
}

impl<'r> FromRow<'r, PgRow> for ClaimDiagnosis {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            id: row.try_get("id")?,
            claim_id: row.try_get("claim_id")?,
            sequence: row.try_get("sequence")?,
            diagnosis_code: row.try_get("diagnosis_code")?,
            diagnosis_display: row.try_get("diagnosis_display")?,
            type_code: row.try_get("type_code")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl PgChild for ClaimDiagnosis {
    const TABLE: &'static str = "claim_diagnosis";
    const PARENT_COLUMN: &'static str = "claim_id";
    const COLUMNS: &'static [&'static str] =
        &["sequence", "diagnosis_code", "diagnosis_display", "type_code"];
    const ORDER_BY: &'static str = "sequence";

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.sequence)
            .push(&self.diagnosis_code)
            .push(&self.diagnosis_display)
            .push(&self.type_code);
    }
}

impl Validate for ClaimDiagnosis {
    fn validate(&self) -> Result<(), ValidationError> {
        check_sequence(self.sequence)?;
        require_text("diagnosis_code", &self.diagnosis_code)
    }
}

// ==================== Procedures ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimProcedure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<Uuid>,
    #[serde(default)]
    pub sequence: i32,
    #[serde(default)]
    pub procedure_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performed_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChildResource for ClaimProcedure {
    const RESOURCE_TYPE: &'static str = "ClaimProcedure";
    type Parent = Claim;

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.claim_id
    }

    fn attach(&mut self, parent_id: Uuid) {
        self.claim_id = Some(parent_id);
    }
}

impl<'r> FromRow<'r, PgRow> for ClaimProcedure {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            id: row.try_get("id")?,
            claim_id: row.try_get("claim_id")?,
            sequence: row.try_get("sequence")?,
            procedure_code: row.try_get("procedure_code")?,
            procedure_display: row.try_get("procedure_display")?,
            performed_on: row.try_get("performed_on")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl PgChild for ClaimProcedure {
    const TABLE: &'static str = "claim_procedure";
    const PARENT_COLUMN: &'static str = "claim_id";
    const COLUMNS: &'static [&'static str] =
        &["sequence", "procedure_code", "procedure_display", "performed_on"];
    const ORDER_BY: &'static str = "sequence";

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.sequence)
            .push(&self.procedure_code)
            .push(&self.procedure_display)
            .push(self.performed_on);
    }
}

impl Validate for ClaimProcedure {
    fn validate(&self) -> Result<(), ValidationError> {
        check_sequence(self.sequence)?;
        require_text("procedure_code", &self.procedure_code)
    }
}
