//! Encounters between a patient and the care team.

use chrono::{DateTime, Utc};
use medrec_core::validation::{
    Validate, ValidationError, check_code, check_optional_code, check_range, default_code, require,
};
use medrec_core::{CodeSet, value_set};
use medrec_db_postgres::{ColumnValues, PgEntity, PgFilter, predicate, record_meta};
use medrec_storage::filter::{parse_code, parse_instant, parse_uuid};
use medrec_storage::{FilterError, RecordMeta, SearchFilter};
use serde::{Deserialize, Serialize};
use sqlx_core::error::Error as SqlxError;
use sqlx_core::from_row::FromRow;
use sqlx_core::query_builder::QueryBuilder;
use sqlx_core::row::Row;
use sqlx_postgres::{PgRow, Postgres};
use uuid::Uuid;

value_set! {
    pub enum EncounterStatus {
        Planned => "planned",
        Arrived => "arrived",
        Triaged => "triaged",
        InProgress => "in-progress",
        OnLeave => "onleave",
        Finished => "finished",
        Cancelled => "cancelled",
        EnteredInError => "entered-in-error",
        Unknown => "unknown",
    }
}

value_set! {
    /// HL7 v3 ActEncounterCode.
    pub enum EncounterClass {
        Ambulatory => "AMB",
        Emergency => "EMER",
        Field => "FLD",
        HomeHealth => "HH",
        Inpatient => "IMP",
        InpatientAcute => "ACUTE",
        InpatientNonAcute => "NONAC",
        Observation => "OBSENC",
        PreAdmission => "PRENC",
        ShortStay => "SS",
        Virtual => "VR",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practitioner_id: Option<Uuid>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_end: Option<DateTime<Utc>>,
}

impl_resource!(Encounter, "Encounter", EncounterFilter);
impl_scopes!(Encounter, patient = EncounterFilter::Patient);

#[derive(Debug, Clone, PartialEq)]
pub enum EncounterFilter {
    Patient(Uuid),
    Practitioner(Uuid),
    Status(EncounterStatus),
    Class(EncounterClass),
    /// Started at or after.
    DateFrom(DateTime<Utc>),
    /// Started at or before.
    DateTo(DateTime<Utc>),
}

impl SearchFilter for EncounterFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "patient" => Self::Patient(parse_uuid(key, value)?),
            "practitioner" => Self::Practitioner(parse_uuid(key, value)?),
            "status" => Self::Status(parse_code(key, value)?),
            "class" => Self::Class(parse_code(key, value)?),
            "date_from" => Self::DateFrom(parse_instant(key, value)?),
            "date_to" => Self::DateTo(parse_instant(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for EncounterFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Patient(id) => predicate::eq(builder, "patient_id", *id),
            Self::Practitioner(id) => predicate::eq(builder, "practitioner_id", *id),
            Self::Status(status) => predicate::eq(builder, "status", status.as_str()),
            Self::Class(class) => predicate::eq(builder, "class_code", class.as_str()),
            Self::DateFrom(at) => predicate::ge(builder, "period_start", *at),
            Self::DateTo(at) => predicate::le(builder, "period_start", *at),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Encounter {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            patient_id: row.try_get("patient_id")?,
            practitioner_id: row.try_get("practitioner_id")?,
            status: row.try_get("status")?,
            class_code: row.try_get("class_code")?,
            type_text: row.try_get("type_text")?,
            reason_text: row.try_get("reason_text")?,
            location: row.try_get("location")?,
            period_start: row.try_get("period_start")?,
            period_end: row.try_get("period_end")?,
        })
    }
}

impl PgEntity for Encounter {
    const TABLE: &'static str = "encounter";
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "practitioner_id",
        "status",
        "class_code",
        "type_text",
        "reason_text",
        "location",
        "period_start",
        "period_end",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.patient_id)
            .push(self.practitioner_id)
            .push(&self.status)
            .push(&self.class_code)
            .push(&self.type_text)
            .push(&self.reason_text)
            .push(&self.location)
            .push(self.period_start)
            .push(self.period_end);
    }
}

impl Validate for Encounter {
    fn apply_defaults(&mut self) {
        default_code(&mut self.status, EncounterStatus::Planned);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("patient_id", &self.patient_id)?;
        check_code::<EncounterStatus>("status", &self.status)?;
        check_optional_code::<EncounterClass>("class_code", self.class_code.as_deref())?;
        check_range("period", self.period_start.as_ref(), self.period_end.as_ref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn encounter() -> Encounter {
        Encounter {
            patient_id: Some(Uuid::new_v4()),
            ..Default::default()
        }
    }

    #[test]
    fn status_defaults_to_planned() {
        let mut encounter = encounter();
        encounter.apply_defaults();
        assert_eq!(encounter.status, "planned");
        assert!(encounter.validate().is_ok());
    }

    #[test]
    fn class_codes_are_case_sensitive() {
        let mut encounter = encounter();
        encounter.apply_defaults();
        encounter.class_code = Some("amb".into());
        assert_eq!(
            encounter.validate().unwrap_err().to_string(),
            "invalid class_code: amb"
        );
        encounter.class_code = Some("AMB".into());
        assert!(encounter.validate().is_ok());
    }

    #[test]
    fn period_must_not_run_backwards() {
        let mut encounter = encounter();
        encounter.apply_defaults();
        encounter.period_start = Some(Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap());
        encounter.period_end = Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
        assert_eq!(encounter.validate().unwrap_err().field(), "period");
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut encounter = encounter();
        encounter.status = "done".into();
        assert_eq!(encounter.validate().unwrap_err().to_string(), "invalid status: done");
    }
}
