//! Patient consents.

use chrono::{DateTime, Utc};
use medrec_core::validation::{
    Validate, ValidationError, check_code, check_range, default_code, require,
};
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
    pub enum ConsentStatus {
        Draft => "draft",
        Proposed => "proposed",
        Active => "active",
        Rejected => "rejected",
        Inactive => "inactive",
        EnteredInError => "entered-in-error",
    }
}

value_set! {
    pub enum ConsentScope {
        AdvanceDirective => "adr",
        Research => "research",
        PatientPrivacy => "patient-privacy",
        Treatment => "treatment",
    }
}

value_set! {
    pub enum ConsentDecision {
        Permit => "permit",
        Deny => "deny",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Consent {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub decision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_uri: Option<String>,
    /// Organization the consent is granted to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_end: Option<DateTime<Utc>>,
}

impl_resource!(Consent, "Consent", ConsentFilter);
impl_scopes!(Consent, patient = ConsentFilter::Patient);

#[derive(Debug, Clone, PartialEq)]
pub enum ConsentFilter {
    Patient(Uuid),
    Status(ConsentStatus),
    Scope(ConsentScope),
    Decision(ConsentDecision),
    Category(String),
}

impl SearchFilter for ConsentFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "patient" => Self::Patient(parse_uuid(key, value)?),
            "status" => Self::Status(parse_code(key, value)?),
            "scope" => Self::Scope(parse_code(key, value)?),
            "decision" => Self::Decision(parse_code(key, value)?),
            "category" => Self::Category(parse_text(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for ConsentFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Patient(id) => predicate::eq(builder, "patient_id", *id),
            Self::Status(status) => predicate::eq(builder, "status", status.as_str()),
            Self::Scope(scope) => predicate::eq(builder, "scope", scope.as_str()),
            Self::Decision(decision) => predicate::eq(builder, "decision", decision.as_str()),
            Self::Category(category) => predicate::eq(builder, "category", category),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Consent {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            patient_id: row.try_get("patient_id")?,
            status: row.try_get("status")?,
            scope: row.try_get("scope")?,
            decision: row.try_get("decision")?,
            category: row.try_get("category")?,
            policy_uri: row.try_get("policy_uri")?,
            organization: row.try_get("organization")?,
            recorded_at: row.try_get("recorded_at")?,
            period_start: row.try_get("period_start")?,
            period_end: row.try_get("period_end")?,
        })
    }
}

impl PgEntity for Consent {
    const TABLE: &'static str = "consent";
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "status",
        "scope",
        "decision",
        "category",
        "policy_uri",
        "organization",
        "recorded_at",
        "period_start",
        "period_end",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.patient_id)
            .push(&self.status)
            .push(&self.scope)
            .push(&self.decision)
            .push(&self.category)
            .push(&self.policy_uri)
            .push(&self.organization)
            .push(self.recorded_at)
            .push(self.period_start)
            .push(self.period_end);
    }
}

impl Validate for Consent {
    fn apply_defaults(&mut self) {
        default_code(&mut self.status, ConsentStatus::Draft);
        default_code(&mut self.decision, ConsentDecision::Permit);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("patient_id", &self.patient_id)?;
        check_code::<ConsentScope>("scope", &self.scope)?;
        check_code::<ConsentStatus>("status", &self.status)?;
        check_code::<ConsentDecision>("decision", &self.decision)?;
        check_range("period", self.period_start.as_ref(), self.period_end.as_ref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consent() -> Consent {
        Consent {
            patient_id: Some(Uuid::new_v4()),
            scope: "research".into(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_draft_and_permit() {
        let mut consent = consent();
        consent.apply_defaults();
        assert_eq!((consent.status.as_str(), consent.decision.as_str()), ("draft", "permit"));
        assert!(consent.validate().is_ok());
    }

    #[test]
    fn scope_is_required_and_closed() {
        let mut consent = Consent {
            scope: String::new(),
            ..consent()
        };
        consent.apply_defaults();
        assert_eq!(consent.validate().unwrap_err().to_string(), "scope is required");

        consent.scope = "marketing".into();
        assert_eq!(consent.validate().unwrap_err().to_string(), "invalid scope: marketing");
    }

    #[test]
    fn decision_is_closed() {
        let mut consent = Consent {
            decision: "maybe".into(),
            ..consent()
        };
        consent.apply_defaults();
        assert_eq!(consent.validate().unwrap_err().to_string(), "invalid decision: maybe");
    }
}
