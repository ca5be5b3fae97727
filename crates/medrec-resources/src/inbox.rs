//! Clinician inbox messages.

use chrono::{DateTime, Utc};
use medrec_core::validation::{
    Validate, ValidationError, check_code, default_code, require, require_text,
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
    pub enum MessageStatus {
        Unread => "unread",
        Read => "read",
        Archived => "archived",
    }
}

value_set! {
    pub enum MessagePriority {
        Normal => "normal",
        High => "high",
        Urgent => "urgent",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboxMessage {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<Uuid>,
    /// Patient the message is about, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default)]
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Free-text routing category such as `lab-result` or `refill`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

impl_resource!(InboxMessage, "InboxMessage", InboxMessageFilter);

#[derive(Debug, Clone, PartialEq)]
pub enum InboxMessageFilter {
    Recipient(Uuid),
    Sender(Uuid),
    Patient(Uuid),
    Status(MessageStatus),
    Priority(MessagePriority),
    Category(String),
}

impl SearchFilter for InboxMessageFilter {
    fn parse(key: &str, value: &str) -> Result<Option<Self>, FilterError> {
        Ok(Some(match key {
            "recipient" => Self::Recipient(parse_uuid(key, value)?),
            "sender" => Self::Sender(parse_uuid(key, value)?),
            "patient" => Self::Patient(parse_uuid(key, value)?),
            "status" => Self::Status(parse_code(key, value)?),
            "priority" => Self::Priority(parse_code(key, value)?),
            "category" => Self::Category(parse_text(key, value)?),
            _ => return Ok(None),
        }))
    }
}

impl PgFilter for InboxMessageFilter {
    fn push_predicate<'args>(&'args self, builder: &mut QueryBuilder<'args, Postgres>) {
        match self {
            Self::Recipient(id) => predicate::eq(builder, "recipient_id", *id),
            Self::Sender(id) => predicate::eq(builder, "sender_id", *id),
            Self::Patient(id) => predicate::eq(builder, "patient_id", *id),
            Self::Status(status) => predicate::eq(builder, "status", status.as_str()),
            Self::Priority(priority) => predicate::eq(builder, "priority", priority.as_str()),
            Self::Category(category) => predicate::eq(builder, "category", category),
        }
    }
}

impl<'r> FromRow<'r, PgRow> for InboxMessage {
    fn from_row(row: &'r PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            meta: record_meta(row)?,
            recipient_id: row.try_get("recipient_id")?,
            sender_id: row.try_get("sender_id")?,
            patient_id: row.try_get("patient_id")?,
            subject: row.try_get("subject")?,
            body: row.try_get("body")?,
            category: row.try_get("category")?,
            priority: row.try_get("priority")?,
            status: row.try_get("status")?,
            sent_at: row.try_get("sent_at")?,
            read_at: row.try_get("read_at")?,
        })
    }
}

impl PgEntity for InboxMessage {
    const TABLE: &'static str = "inbox_message";
    const COLUMNS: &'static [&'static str] = &[
        "recipient_id",
        "sender_id",
        "patient_id",
        "subject",
        "body",
        "category",
        "priority",
        "status",
        "sent_at",
        "read_at",
    ];

    fn push_values<'args>(&'args self, values: &mut ColumnValues<'_, 'args>) {
        values
            .push(self.recipient_id)
            .push(self.sender_id)
            .push(self.patient_id)
            .push(&self.subject)
            .push(&self.body)
            .push(&self.category)
            .push(&self.priority)
            .push(&self.status)
            .push(self.sent_at)
            .push(self.read_at);
    }
}

impl Validate for InboxMessage {
    fn apply_defaults(&mut self) {
        default_code(&mut self.status, MessageStatus::Unread);
        default_code(&mut self.priority, MessagePriority::Normal);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("recipient_id", &self.recipient_id)?;
        require_text("subject", &self.subject)?;
        check_code::<MessageStatus>("status", &self.status)?;
        check_code::<MessagePriority>("priority", &self.priority)?;
        Ok(())
    }

    fn stamp(&mut self, stored: Option<&Self>) {
        let now = Utc::now();
        if self.sent_at.is_none() {
            self.sent_at = stored.and_then(|s| s.sent_at).or(Some(now));
        }
        if self.status == MessageStatus::Read.as_str() && self.read_at.is_none() {
            self.read_at = stored.and_then(|s| s.read_at).or(Some(now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> InboxMessage {
        InboxMessage {
            recipient_id: Some(Uuid::new_v4()),
            subject: "Potassium 6.1".into(),
            ..Default::default()
        }
    }

    #[test]
    fn new_message_is_unread_normal_and_sent_now() {
        let mut message = message();
        message.apply_defaults();
        assert!(message.validate().is_ok());
        message.stamp(None);
        assert_eq!(message.status, "unread");
        assert_eq!(message.priority, "normal");
        assert!(message.sent_at.is_some());
        assert!(message.read_at.is_none());
        assert!(message.validate().is_ok());
    }

    #[test]
    fn marking_read_stamps_read_at() {
        let mut message = InboxMessage {
            status: "read".into(),
            ..message()
        };
        message.apply_defaults();
        message.stamp(None);
        assert!(message.read_at.is_some());
    }

    #[test]
    fn update_keeps_stored_stamps() {
        let mut stored = InboxMessage {
            status: "read".into(),
            ..message()
        };
        stored.apply_defaults();
        stored.stamp(None);

        let mut first = InboxMessage {
            status: "read".into(),
            ..message()
        };
        first.apply_defaults();
        first.stamp(Some(&stored));
        assert_eq!(first.sent_at, stored.sent_at);
        assert_eq!(first.read_at, stored.read_at);
    }

    #[test]
    fn first_read_on_update_stamps_read_at() {
        let mut stored = message();
        stored.apply_defaults();
        stored.stamp(None);
        assert!(stored.read_at.is_none());

        let mut update = InboxMessage {
            status: "read".into(),
            ..message()
        };
        update.apply_defaults();
        update.stamp(Some(&stored));
        assert_eq!(update.sent_at, stored.sent_at);
        assert!(update.read_at.is_some());
    }

    #[test]
    fn category_is_free_text() {
        let mut message = InboxMessage {
            category: Some("anything-goes".into()),
            ..message()
        };
        message.apply_defaults();
        assert!(message.validate().is_ok());
    }

    #[test]
    fn recipient_is_required() {
        let mut message = InboxMessage {
            recipient_id: None,
            ..message()
        };
        message.apply_defaults();
        assert_eq!(message.validate().unwrap_err().field(), "recipient_id");
    }
}
