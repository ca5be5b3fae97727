//! Quality measure reports.

use chrono::{DateTime, Utc};
use medrec_core::validation::{
    Validate, ValidationError, check_code, check_range, default_code, require, require_text,
};
use medrec_core::{CodeSet, value_set};
use medrec_db_postgres::{ColumnValues, PgEntity, PgFilter, predicate, record_meta};
use medrec_storage::filter::{parse_code, parse_instant, parse_text, parse_uuid};
use medrec_storage::{FilterError, RecordMeta, SearchFilter};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx_core::error::Error as SqlxError;
use sqlx_core::from_row::FromRow;
use sqlx_core::query_builder::QueryBuilder;
use sqlx_core::row::Row;
use sqlx_postgres::{PgRow, Postgres};
use uuid::Uuid;

value_set! {
    pub enum MeasureReportStatus {
        Complete => "complete",
        Pending => "pending",
        Error => "error",
    }
}

value_set! {
    pub enum MeasureReportType {
        Individual => "individual",
        SubjectList => "subject-list",
        Summary => "summary",
        DataExchange => "data-exchange",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasureReport {
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Canonical URL of the measure definition.
    #[serde(default)]
    pub measure_url: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub report_type: String,
    /// Set for `individual` reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl_resource!(MeasureReport, "MeasureReport", MeasureReportFilter);

#[derive(Debug, Clone, PartialEq)]
pub enum MeasureReportFilter {
    Measure(String),
    Status(MeasureReportStatus),
    Type(MeasureReportType),
    Subject(Uuid),
    /// Period starts at or after.
    PeriodFrom(DateTime<Utc>),
    /// Period ends at or before.
    PeriodTo(DateTime<Utc>),
}

impl SearchFilter for MeasureReportFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "measure" => Self::Measure(parse_text(key, value)?),
            "status" => Self::Status(parse_code(key, value)?),
            "type" => Self::Type(parse_code(key, value)?),
            "subject" => Self::Subject(parse_uuid(key, value)?),
            "period_from" => Self::PeriodFrom(parse_instant(key, value)?),
            "period_to" => Self::PeriodTo(parse_instant(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for MeasureReportFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Measure(url) => predicate::eq(builder, "measure_url", url),
            Self::Status(status) => predicate::eq(builder, "status", status.as_str()),
            Self::Type(kind) => predicate::eq(builder, "report_type", kind.as_str()),
            Self::Subject(id) => predicate::eq(builder, "subject_patient_id", *id),
            Self::PeriodFrom(at) => predicate::ge(builder, "period_start", *at),
            Self::PeriodTo(at) => predicate::le(builder, "period_end", *at),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for MeasureReport {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            measure_url: row.try_get("measure_url")?,
            status: row.try_get("status")?,
            report_type: row.try_get("report_type")?,
            subject_patient_id: row.try_get("subject_patient_id")?,
            reporter: row.try_get("reporter")?,
            period_start: row.try_get("period_start")?,
            period_end: row.try_get("period_end")?,
            score: row.try_get("score")?,
            generated_at: row.try_get("generated_at")?,
        })
    }
}

impl PgEntity for MeasureReport {
    const TABLE: &'static str = "measure_report";
    const COLUMNS: &'static [&'static str] = &[
        "measure_url",
        "status",
        "report_type",
        "subject_patient_id",
        "reporter",
        "period_start",
        "period_end",
        "score",
        "generated_at",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(&self.measure_url)
            .push(&self.status)
            .push(&self.report_type)
            .push(self.subject_patient_id)
            .push(&self.reporter)
            .push(self.period_start)
            .push(self.period_end)
            .push(self.score)
            .push(self.generated_at);
    }
}

impl Validate for MeasureReport {
    fn apply_defaults(&mut self) {
        default_code(&mut self.report_type, MeasureReportType::Summary);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("measure_url", &self.measure_url)?;
        check_code::<MeasureReportStatus>("status", &self.status)?;
        check_code::<MeasureReportType>("report_type", &self.report_type)?;
        require("period_start", &self.period_start)?;
        require("period_end", &self.period_end)?;
        check_range("period", self.period_start.as_ref(), self.period_end.as_ref())?;
        Ok(())
    }
}
