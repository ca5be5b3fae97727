//! Patients.

use chrono::NaiveDate;
use medrec_core::validation::{ValidationError, Validate, check_optional_code, require_text};
use medrec_core::{CodeSet, value_set};
use medrec_db_postgres::{ColumnValues, PgEntity, PgFilter, predicate, record_meta};
use medrec_storage::filter::{parse_bool, parse_code, parse_date, parse_text};
use medrec_storage::{FilterError, RecordMeta, SearchFilter};
use serde::{Deserialize, Serialize};
use sqlx_core::error::Error as SqlxError;
use sqlx_core::from_row::FromRow;
use sqlx_core::query_builder::QueryBuilder;
use sqlx_core::row::Row;
use sqlx_postgres::{PgRow, Postgres};

value_set! {
    pub enum AdministrativeGender {
        Male => "male",
        Female => "female",
        Other => "other",
        Unknown => "unknown",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub family_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Medical record number assigned by the facility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default = "crate::default_true")]
    pub active: bool,
}

impl Default for Patient {
    fn default() -> Self {
        Self {
            meta: RecordMeta::default(),
            family_name: String::new(),
            given_name: None,
            birth_date: None,
            gender: None,
            mrn: None,
            phone: None,
            email: None,
            active: true,
        }
    }
}

impl_resource!(Patient, "Patient", PatientFilter);

#[derive(Debug, Clone, PartialEq)]
pub enum PatientFilter {
    /// Substring of the family name.
    Family(String),
    Given(String),
    Gender(AdministrativeGender),
    BirthDate(NaiveDate),
    Mrn(String),
    Active(bool),
}

impl SearchFilter for PatientFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "family" => Self::Family(parse_text(key, value)?),
            "given" => Self::Given(parse_text(key, value)?),
            "gender" => Self::Gender(parse_code(key, value)?),
            "birth_date" => Self::BirthDate(parse_date(key, value)?),
            "mrn" => Self::Mrn(parse_text(key, value)?),
            "active" => Self::Active(parse_bool(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for PatientFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Family(text) => predicate::contains(builder, "family_name", text),
            Self::Given(text) => predicate::contains(builder, "given_name", text),
            Self::Gender(gender) => predicate::eq(builder, "gender", gender.as_str()),
            Self::BirthDate(date) => predicate::eq(builder, "birth_date", *date),
            Self::Mrn(mrn) => predicate::eq(builder, "mrn", mrn),
            Self::Active(active) => predicate::eq(builder, "active", *active),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Patient {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            family_name: row.try_get("family_name")?,
            given_name: row.try_get("given_name")?,
            birth_date: row.try_get("birth_date")?,
            gender: row.try_get("gender")?,
            mrn: row.try_get("mrn")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
            active: row.try_get("active")?,
        })
    }
}

impl PgEntity for Patient {
    const TABLE: &'static str = "patient";
    const COLUMNS: &'static [&'static str] = &[
        "family_name",
        "given_name",
        "birth_date",
        "gender",
        "mrn",
        "phone",
        "email",
        "active",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(&self.family_name)
            .push(&self.given_name)
            .push(self.birth_date)
            .push(&self.gender)
            .push(&self.mrn)
            .push(&self.phone)
            .push(&self.email)
            .push(self.active);
    }
}

impl Validate for Patient {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("family_name", &self.family_name)?;
        check_optional_code::<AdministrativeGender>("gender", self.gender.as_deref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_defaults_to_true_when_omitted() {
        let patient: Patient = serde_json::from_value(serde_json::json!({
            "family_name": "Nakamura"
        }))
        .unwrap();
        assert!(patient.active);
        assert!(patient.validate().is_ok());
    }

    #[test]
    fn family_name_is_required() {
        let err = Patient::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "family_name is required");
    }

    #[test]
    fn gender_must_be_known() {
        let patient = Patient {
            family_name: "Nakamura".into(),
            gender: Some("robot".into()),
            ..Default::default()
        };
        assert_eq!(patient.validate().unwrap_err().to_string(), "invalid gender: robot");
    }

    #[test]
    fn absent_fields_are_omitted() {
        let patient = Patient {
            family_name: "Nakamura".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&patient).unwrap();
        assert_eq!(json, serde_json::json!({"family_name": "Nakamura", "active": true}));
    }

    #[test]
    fn filters_parse_known_keys() {
        assert_eq!(
            PatientFilter::parse("gender", "female").unwrap(),
            Some(PatientFilter::Gender(AdministrativeGender::Female))
        );
        assert_eq!(PatientFilter::parse("shoe_size", "9").unwrap(), None);
        assert!(PatientFilter::parse("birth_date", "12/01/1990").is_err());
    }
}
