//! Diagnostic orders, the specimens collected for them and the resulting
//! reports.

use chrono::{DateTime, Utc};
use medrec_core::validation::{
    Validate, ValidationError, check_code, check_optional_code, default_code, require,
    require_text,
};
use medrec_core::{CodeSet, value_set};
use medrec_db_postgres::{ColumnValues, PgEntity, PgFilter, predicate, record_meta};
use medrec_storage::filter::{parse_code, parse_instant, parse_text, parse_uuid};
use medrec_storage::{FilterError, RecordMeta, SearchFilter};
use serde::{Deserialize, Serialize};
use sqlx_core::error::Error as SqlxError;
use sqlx_core::from_row::FromRow;
use sqlx_core::query_builder::QueryBuilder;
use sqlx_core::row::Row;
use sqlx_postgres::{PgRow, Postgres};
use uuid::Uuid;

// ==================== ServiceRequest ====================

value_set! {
    pub enum ServiceRequestStatus {
        Draft => "draft",
        Active => "active",
        OnHold => "on-hold",
        Revoked => "revoked",
        Completed => "completed",
        EnteredInError => "entered-in-error",
        Unknown => "unknown",
    }
}

value_set! {
    pub enum RequestIntent {
        Proposal => "proposal",
        Plan => "plan",
        Directive => "directive",
        Order => "order",
        OriginalOrder => "original-order",
        ReflexOrder => "reflex-order",
        FillerOrder => "filler-order",
        InstanceOrder => "instance-order",
        OptionOrder => "option",
    }
}

value_set! {
    pub enum RequestPriority {
        Routine => "routine",
        Urgent => "urgent",
        Asap => "asap",
        Stat => "stat",
    }
}

/// An order for a lab test, imaging study or other diagnostic service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<Uuid>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// What is being requested, e.g. a LOINC code.
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authored_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl_resource!(ServiceRequest, "ServiceRequest", ServiceRequestFilter);
impl_scopes!(
    ServiceRequest,
    patient = ServiceRequestFilter::Patient,
    encounter = ServiceRequestFilter::Encounter
);

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceRequestFilter {
    Patient(Uuid),
    Encounter(Uuid),
    Requester(Uuid),
    Status(ServiceRequestStatus),
    Intent(RequestIntent),
    Priority(RequestPriority),
    Code(String),
    Category(String),
    AuthoredFrom(DateTime<Utc>),
    AuthoredTo(DateTime<Utc>),
}

impl SearchFilter for ServiceRequestFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "patient" => Self::Patient(parse_uuid(key, value)?),
            "encounter" => Self::Encounter(parse_uuid(key, value)?),
            "requester" => Self::Requester(parse_uuid(key, value)?),
            "status" => Self::Status(parse_code(key, value)?),
            "intent" => Self::Intent(parse_code(key, value)?),
            "priority" => Self::Priority(parse_code(key, value)?),
            "code" => Self::Code(parse_text(key, value)?),
            "category" => Self::Category(parse_text(key, value)?),
            "authored_from" => Self::AuthoredFrom(parse_instant(key, value)?),
            "authored_to" => Self::AuthoredTo(parse_instant(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for ServiceRequestFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Patient(id) => predicate::eq(builder, "patient_id", *id),
            Self::Encounter(id) => predicate::eq(builder, "encounter_id", *id),
            Self::Requester(id) => predicate::eq(builder, "requester_id", *id),
            Self::Status(status) => predicate::eq(builder, "status", status.as_str()),
            Self::Intent(intent) => predicate::eq(builder, "intent", intent.as_str()),
            Self::Priority(priority) => predicate::eq(builder, "priority", priority.as_str()),
            Self::Code(code) => predicate::eq(builder, "code", code),
            Self::Category(category) => predicate::eq(builder, "category", category),
            Self::AuthoredFrom(at) => predicate::ge(builder, "authored_on", *at),
            Self::AuthoredTo(at) => predicate::le(builder, "authored_on", *at),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for ServiceRequest {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            patient_id: row.try_get("patient_id")?,
            encounter_id: row.try_get("encounter_id")?,
            requester_id: row.try_get("requester_id")?,
            status: row.try_get("status")?,
            intent: row.try_get("intent")?,
            priority: row.try_get("priority")?,
            code: row.try_get("code")?,
            code_display: row.try_get("code_display")?,
            category: row.try_get("category")?,
            authored_on: row.try_get("authored_on")?,
            occurrence_at: row.try_get("occurrence_at")?,
            note: row.try_get("note")?,
        })
    }
}

impl PgEntity for ServiceRequest {
    const TABLE: &'static str = "service_request";
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "encounter_id",
        "requester_id",
        "status",
        "intent",
        "priority",
        "code",
        "code_display",
        "category",
        "authored_on",
        "occurrence_at",
        "note",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.patient_id)
            .push(self.encounter_id)
            .push(self.requester_id)
            .push(&self.status)
            .push(&self.intent)
            .push(&self.priority)
            .push(&self.code)
            .push(&self.code_display)
            .push(&self.category)
            .push(self.authored_on)
            .push(self.occurrence_at)
            .push(&self.note);
    }
}

impl Validate for ServiceRequest {
    fn apply_defaults(&mut self) {
        default_code(&mut self.status, ServiceRequestStatus::Draft);
        default_code(&mut self.intent, RequestIntent::Order);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("patient_id", &self.patient_id)?;
        require_text("code", &self.code)?;
        check_code::<ServiceRequestStatus>("status", &self.status)?;
        check_code::<RequestIntent>("intent", &self.intent)?;
        check_optional_code::<RequestPriority>("priority", self.priority.as_deref())?;
        Ok(())
    }
}

// ==================== Specimen ====================

value_set! {
    pub enum SpecimenStatus {
        Available => "available",
        Unavailable => "unavailable",
        Unsatisfactory => "unsatisfactory",
        EnteredInError => "entered-in-error",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Specimen {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_request_id: Option<Uuid>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl_resource!(Specimen, "Specimen", SpecimenFilter);
impl_scopes!(Specimen, patient = SpecimenFilter::Patient);

#[derive(Debug, Clone, PartialEq)]
pub enum SpecimenFilter {
    Patient(Uuid),
    ServiceRequest(Uuid),
    Status(SpecimenStatus),
    Type(String),
    CollectedFrom(DateTime<Utc>),
    CollectedTo(DateTime<Utc>),
}

impl SearchFilter for SpecimenFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "patient" => Self::Patient(parse_uuid(key, value)?),
            "service_request" => Self::ServiceRequest(parse_uuid(key, value)?),
            "status" => Self::Status(parse_code(key, value)?),
            "type" => Self::Type(parse_text(key, value)?),
            "collected_from" => Self::CollectedFrom(parse_instant(key, value)?),
            "collected_to" => Self::CollectedTo(parse_instant(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for SpecimenFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Patient(id) => predicate::eq(builder, "patient_id", *id),
            Self::ServiceRequest(id) => predicate::eq(builder, "service_request_id", *id),
            Self::Status(status) => predicate::eq(builder, "status", status.as_str()),
            Self::Type(code) => predicate::eq(builder, "type_code", code),
            Self::CollectedFrom(at) => predicate::ge(builder, "collected_at", *at),
            Self::CollectedTo(at) => predicate::le(builder, "collected_at", *at),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Specimen {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            patient_id: row.try_get("patient_id")?,
            service_request_id: row.try_get("service_request_id")?,
            status: row.try_get("status")?,
            type_code: row.try_get("type_code")?,
            type_display: row.try_get("type_display")?,
            collection_method: row.try_get("collection_method")?,
            body_site: row.try_get("body_site")?,
            collected_at: row.try_get("collected_at")?,
            received_at: row.try_get("received_at")?,
            note: row.try_get("note")?,
        })
    }
}

impl PgEntity for Specimen {
    const TABLE: &'static str = "specimen";
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "service_request_id",
        "status",
        "type_code",
        "type_display",
        "collection_method",
        "body_site",
        "collected_at",
        "received_at",
        "note",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.patient_id)
            .push(self.service_request_id)
            .push(&self.status)
            .push(&self.type_code)
            .push(&self.type_display)
            .push(&self.collection_method)
            .push(&self.body_site)
            .push(self.collected_at)
            .push(self.received_at)
            .push(&self.note);
    }
}

impl Validate for Specimen {
    fn apply_defaults(&mut self) {
        default_code(&mut self.status, SpecimenStatus::Available);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("patient_id", &self.patient_id)?;
        check_code::<SpecimenStatus>("status", &self.status)?;
        Ok(())
    }
}

// ==================== DiagnosticReport ====================

value_set! {
    pub enum DiagnosticReportStatus {
        Registered => "registered",
        Partial => "partial",
        Preliminary => "preliminary",
        Final => "final",
        Amended => "amended",
        Corrected => "corrected",
        Appended => "appended",
        Cancelled => "cancelled",
        EnteredInError => "entered-in-error",
        Unknown => "unknown",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<Uuid>,
    /// The order this report fulfils.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_request_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performer_id: Option<Uuid>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
}

impl_resource!(DiagnosticReport, "DiagnosticReport", DiagnosticReportFilter);
impl_scopes!(
    DiagnosticReport,
    patient = DiagnosticReportFilter::Patient,
    encounter = DiagnosticReportFilter::Encounter
);

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticReportFilter {
    Patient(Uuid),
    Encounter(Uuid),
    ServiceRequest(Uuid),
    Performer(Uuid),
    Status(DiagnosticReportStatus),
    Code(String),
    Category(String),
    IssuedFrom(DateTime<Utc>),
    IssuedTo(DateTime<Utc>),
}

impl SearchFilter for DiagnosticReportFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "patient" => Self::Patient(parse_uuid(key, value)?),
            "encounter" => Self::Encounter(parse_uuid(key, value)?),
            "service_request" => Self::ServiceRequest(parse_uuid(key, value)?),
            "performer" => Self::Performer(parse_uuid(key, value)?),
            "status" => Self::Status(parse_code(key, value)?),
            "code" => Self::Code(parse_text(key, value)?),
            "category" => Self::Category(parse_text(key, value)?),
            "issued_from" => Self::IssuedFrom(parse_instant(key, value)?),
            "issued_to" => Self::IssuedTo(parse_instant(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for DiagnosticReportFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Patient(id) => predicate::eq(builder, "patient_id", *id),
            Self::Encounter(id) => predicate::eq(builder, "encounter_id", *id),
            Self::ServiceRequest(id) => predicate::eq(builder, "service_request_id", *id),
            Self::Performer(id) => predicate::eq(builder, "performer_id", *id),
            Self::Status(status) => predicate::eq(builder, "status", status.as_str()),
            Self::Code(code) => predicate::eq(builder, "code", code),
            Self::Category(category) => predicate::eq(builder, "category", category),
            Self::IssuedFrom(at) => predicate::ge(builder, "issued_at", *at),
            Self::IssuedTo(at) => predicate::le(builder, "issued_at", *at),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for DiagnosticReport {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            patient_id: row.try_get("patient_id")?,
            encounter_id: row.try_get("encounter_id")?,
            service_request_id: row.try_get("service_request_id")?,
            performer_id: row.try_get("performer_id")?,
            status: row.try_get("status")?,
            code: row.try_get("code")?,
            code_display: row.try_get("code_display")?,
            category: row.try_get("category")?,
            effective_at: row.try_get("effective_at")?,
            issued_at: row.try_get("issued_at")?,
            conclusion: row.try_get("conclusion")?,
        })
    }
}

impl PgEntity for DiagnosticReport {
    const TABLE: &'static str = "diagnostic_report";
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "encounter_id",
        "service_request_id",
        "performer_id",
        "status",
        "code",
        "code_display",
        "category",
        "effective_at",
        "issued_at",
        "conclusion",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.patient_id)
            .push(self.encounter_id)
            .push(self.service_request_id)
            .push(self.performer_id)
            .push(&self.status)
            .push(&self.code)
            .push(&self.code_display)
            .push(&self.category)
            .push(self.effective_at)
            .push(self.issued_at)
            .push(&self.conclusion);
    }
}

impl Validate for DiagnosticReport {
    fn apply_defaults(&mut self) {
        default_code(&mut self.status, DiagnosticReportStatus::Registered);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("patient_id", &self.patient_id)?;
        require_text("code", &self.code)?;
        check_code::<DiagnosticReportStatus>("status", &self.status)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> ServiceRequest {
        ServiceRequest {
            patient_id: Some(Uuid::new_v4()),
            code: "2951-2".into(),
            ..Default::default()
        }
    }

    #[test]
    fn service_request_defaults() {
        let mut request = order();
        request.apply_defaults();
        assert_eq!(request.status, "draft");
        assert_eq!(request.intent, "order");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn service_request_keeps_supplied_codes() {
        let mut request = ServiceRequest {
            status: "active".into(),
            intent: "plan".into(),
            ..order()
        };
        request.apply_defaults();
        assert_eq!(request.status, "active");
        assert_eq!(request.intent, "plan");
    }

    #[test]
    fn service_request_required_fields() {
        let mut request = ServiceRequest::default();
        request.apply_defaults();
        assert_eq!(request.validate().unwrap_err().to_string(), "patient_id is required");

        request.patient_id = Some(Uuid::new_v4());
        assert_eq!(request.validate().unwrap_err().to_string(), "code is required");
    }

    #[test]
    fn service_request_codes_are_closed() {
        let mut request = ServiceRequest {
            status: "finished".into(),
            ..order()
        };
        request.apply_defaults();
        assert_eq!(request.validate().unwrap_err().to_string(), "invalid status: finished");

        let mut request = ServiceRequest {
            priority: Some("whenever".into()),
            ..order()
        };
        request.apply_defaults();
        assert_eq!(request.validate().unwrap_err().to_string(), "invalid priority: whenever");
    }

    #[test]
    fn service_request_filters() {
        let patient = Uuid::new_v4();
        assert_eq!(
            ServiceRequestFilter::parse("patient", &patient.to_string()).unwrap(),
            Some(ServiceRequestFilter::Patient(patient))
        );
        assert_eq!(
            ServiceRequestFilter::parse("status", "on-hold").unwrap(),
            Some(ServiceRequestFilter::Status(ServiceRequestStatus::OnHold))
        );
        assert!(ServiceRequestFilter::parse("status", "paused").is_err());
        assert_eq!(ServiceRequestFilter::parse("_sort", "code").unwrap(), None);
    }

    #[test]
    fn specimen_status_default_and_check() {
        let mut specimen = Specimen {
            patient_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        specimen.apply_defaults();
        assert_eq!(specimen.status, "available");

        specimen.status = "lost".into();
        assert_eq!(specimen.validate().unwrap_err().to_string(), "invalid status: lost");
    }

    #[test]
    fn diagnostic_report_defaults_to_registered() {
        let mut report = DiagnosticReport {
            patient_id: Some(Uuid::new_v4()),
            code: "58410-2".into(),
            ..Default::default()
        };
        report.apply_defaults();
        assert_eq!(report.status, "registered");
        assert!(report.validate().is_ok());
    }

    #[test]
    fn wire_shape_omits_absent_fields() {
        let mut request = order();
        request.apply_defaults();
        let json = serde_json::to_value(&request).unwrap();
        let object = json.as_object().unwrap();
        assert!(object.contains_key("patient_id"));
        assert!(!object.contains_key("priority"));
        assert!(!object.contains_key("id"));
    }
}
