//! Surgical cases with their team and intra-operative time events.

use chrono::{DateTime, Utc};
use medrec_core::validation::{
    Validate, ValidationError, check_code, check_optional_code, check_range, default_code,
    require, require_text,
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
    pub enum SurgicalCaseStatus {
        Scheduled => "scheduled",
        InProgress => "in-progress",
        Completed => "completed",
        Cancelled => "cancelled",
        Postponed => "postponed",
    }
}

value_set! {
    pub enum SurgicalPriority {
        Elective => "elective",
        Urgent => "urgent",
        Emergency => "emergency",
    }
}

value_set! {
    pub enum SurgicalRole {
        PrimarySurgeon => "primary-surgeon",
        AssistantSurgeon => "assistant-surgeon",
        Anesthesiologist => "anesthesiologist",
        ScrubNurse => "scrub-nurse",
        CirculatingNurse => "circulating-nurse",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurgicalCase {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_surgeon_id: Option<Uuid>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_code: Option<String>,
    #[serde(default)]
    pub procedure_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anesthesia_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl_resource!(SurgicalCase, "SurgicalCase", SurgicalCaseFilter);
impl_scopes!(SurgicalCase, patient = SurgicalCaseFilter::Patient);

#[derive(Debug, Clone, PartialEq)]
pub enum SurgicalCaseFilter {
    Patient(Uuid),
    Encounter(Uuid),
    Surgeon(Uuid),
    Status(SurgicalCaseStatus),
    Priority(SurgicalPriority),
    OperatingRoom(String),
    /// Scheduled to start at or after.
    ScheduledFrom(DateTime<Utc>),
    /// Scheduled to start at or before.
    ScheduledTo(DateTime<Utc>),
}

impl SearchFilter for SurgicalCaseFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "patient" => Self::Patient(parse_uuid(key, value)?),
            "encounter" => Self::Encounter(parse_uuid(key, value)?),
            "surgeon" => Self::Surgeon(parse_uuid(key, value)?),
            "status" => Self::Status(parse_code(key, value)?),
            "priority" => Self::Priority(parse_code(key, value)?),
            "operating_room" => Self::OperatingRoom(parse_text(key, value)?),
            "scheduled_from" => Self::ScheduledFrom(parse_instant(key, value)?),
            "scheduled_to" => Self::ScheduledTo(parse_instant(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for SurgicalCaseFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Patient(id) => predicate::eq(builder, "patient_id", *id),
            Self::Encounter(id) => predicate::eq(builder, "encounter_id", *id),
            Self::Surgeon(id) => predicate::eq(builder, "primary_surgeon_id", *id),
            Self::Status(status) => predicate::eq(builder, "status", status.as_str()),
            Self::Priority(priority) => predicate::eq(builder, "priority", priority.as_str()),
            Self::OperatingRoom(room) => predicate::eq(builder, "operating_room", room),
            Self::ScheduledFrom(at) => predicate::ge(builder, "scheduled_start", *at),
            Self::ScheduledTo(at) => predicate::le(builder, "scheduled_start", *at),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for SurgicalCase {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            patient_id: row.try_get("patient_id")?,
            encounter_id: row.try_get("encounter_id")?,
            primary_surgeon_id: row.try_get("primary_surgeon_id")?,
            status: row.try_get("status")?,
            priority: row.try_get("priority")?,
            procedure_code: row.try_get("procedure_code")?,
            procedure_text: row.try_get("procedure_text")?,
            operating_room: row.try_get("operating_room")?,
            anesthesia_type: row.try_get("anesthesia_type")?,
            scheduled_start: row.try_get("scheduled_start")?,
            scheduled_end: row.try_get("scheduled_end")?,
            actual_start: row.try_get("actual_start")?,
            actual_end: row.try_get("actual_end")?,
            note: row.try_get("note")?,
        })
    }
}

impl PgEntity for SurgicalCase {
    const TABLE: &'static str = "surgical_case";
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "encounter_id",
        "primary_surgeon_id",
        "status",
        "priority",
        "procedure_code",
        "procedure_text",
        "operating_room",
        "anesthesia_type",
        "scheduled_start",
        "scheduled_end",
        "actual_start",
        "actual_end",
        "note",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.patient_id)
            .push(self.encounter_id)
            .push(self.primary_surgeon_id)
            .push(&self.status)
            .push(&self.priority)
            .push(&self.procedure_code)
            .push(&self.procedure_text)
            .push(&self.operating_room)
            .push(&self.anesthesia_type)
            .push(self.scheduled_start)
            .push(self.scheduled_end)
            .push(self.actual_start)
            .push(self.actual_end)
            .push(&self.note);
    }
}

impl Validate for SurgicalCase {
    fn apply_defaults(&mut self) {
        default_code(&mut self.status, SurgicalCaseStatus::Scheduled);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("patient_id", &self.patient_id)?;
        check_code::<SurgicalCaseStatus>("status", &self.status)?;
        check_optional_code::<SurgicalPriority>("priority", self.priority.as_deref())?;
        require_text("procedure_text", &self.procedure_text)?;
        require("scheduled_start", &self.scheduled_start)?;
        check_range(
            "scheduled",
            self.scheduled_start.as_ref(),
            self.scheduled_end.as_ref(),
        )?;
        check_range("actual", self.actual_start.as_ref(), self.actual_end.as_ref())?;
        Ok(())
    }
}

// ==================== Team ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurgicalTeamMember {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surgical_case_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practitioner_id: Option<Uuid>,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChildResource for SurgicalTeamMember {
    const RESOURCE_TYPE: &'static str = "SurgicalTeamMember";
    type Parent = SurgicalCase;

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.surgical_case_id
    }

    fn attach(&mut self, parent_id: Uuid) {
        self.surgical_case_id = Some(parent_id);
    }
}

impl<'r> FromRow<'r, PgRow> for SurgicalTeamMember {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            id: row.try_get("id")?,
            surgical_case_id: row.try_get("surgical_case_id")?,
            practitioner_id: row.try_get("practitioner_id")?,
            role: row.try_get("role")?,
            note: row.try_get("note")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl PgChild for SurgicalTeamMember {
    const TABLE: &'static str = "surgical_team_member";
    const PARENT_COLUMN: &'static str = "surgical_case_id";
    const COLUMNS: &'static [&'static str] = &["practitioner_id", "role", "note"];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.practitioner_id)
            .push(&self.role)
            .push(&self.note);
    }
}

impl Validate for SurgicalTeamMember {
    fn validate(&self) -> Result<(), ValidationError> {
        require("practitioner_id", &self.practitioner_id)?;
        check_code::<SurgicalRole>("role", &self.role)?;
        Ok(())
    }
}

// ==================== Time events ====================

/// A timestamped milestone such as incision or closure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurgicalTimeEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surgical_case_id: Option<Uuid>,
    #[serde(default)]
    pub event_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChildResource for SurgicalTimeEvent {
    const RESOURCE_TYPE: &'static str = "SurgicalTimeEvent";
    type Parent = SurgicalCase;

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.surgical_case_id
    }

    fn attach(&mut self, parent_id: Uuid) {
        self.surgical_case_id = Some(parent_id);
    }
}

impl<'r> FromRow<'r, PgRow> for SurgicalTimeEvent {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            id: row.try_get("id")?,
            surgical_case_id: row.try_get("surgical_case_id")?,
            event_code: row.try_get("event_code")?,
            occurred_at: row.try_get("occurred_at")?,
            note: row.try_get("note")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl PgChild for SurgicalTimeEvent {
    const TABLE: &'static str = "surgical_time_event";
    const PARENT_COLUMN: &'static str = "surgical_case_id";
    const COLUMNS: &'static [&'static str] = &["event_code", "occurred_at", "note"];
    const ORDER_BY: &'static str = "occurred_at, id";

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(&self.event_code)
            .push(self.occurred_at)
            .push(&self.note);
    }
}

impl Validate for SurgicalTimeEvent {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("event_code", &self.event_code)?;
        require("occurred_at", &self.occurred_at)?;
        Ok(())
    }
}
