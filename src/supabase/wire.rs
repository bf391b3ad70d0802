//! JSON shapes exchanged with the hosted table.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    message::{Message, MessageId},
    sync::StoreError,
};

/// Insert body. `id` and `created_at` are filled in by the database.
#[derive(Debug, Serialize)]
pub struct InsertRow<'a> {
    pub username: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageRow {
    id: RowId,
    username: String,
    content: String,
    created_at: String,
}

/// Tables keyed by `uuid` send strings, `bigserial` tables send numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowId {
    Text(String),
    Number(i64),
}

impl RowId {
    fn into_message_id(self) -> MessageId {
        match self {
            Self::Text(value) => MessageId::new(value),
            Self::Number(value) => MessageId::new(value.to_string()),
        }
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into_message_id(),
            created_at: parse_timestamp(&row.created_at)?,
            username: row.username,
            content: row.content,
        })
    }
}

pub fn decode_rows(body: &str) -> Result<Vec<Message>, StoreError> {
    let rows: Vec<MessageRow> = serde_json::from_str(body)
        .map_err(|error| StoreError::InvalidData(format!("message rows: {error}")))?;

    rows.into_iter().map(Message::try_from).collect()
}

pub fn decode_row(value: Value) -> Result<Message, StoreError> {
    let row: MessageRow = serde_json::from_value(value)
        .map_err(|error| StoreError::InvalidData(format!("message row: {error}")))?;

    Message::try_from(row)
}

/// Accepts RFC 3339, Postgres' `+00` offsets, and offset-less values as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"] {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Ok(parsed.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(parsed.and_utc());
        }
    }

    Err(StoreError::InvalidData(format!(
        "unrecognized timestamp `{raw}`"
    )))
}

/// Pulls the human-readable part out of a PostgREST error body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}
