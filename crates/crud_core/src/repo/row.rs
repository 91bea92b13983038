//! Column encoding helpers shared by entity `from_row`/`column_values`
//! implementations.
//!
//! Timestamps are stored as RFC 3339 UTC text with microsecond precision so
//! lexical order equals chronological order.

use crate::model::audit::AuditFields;
use crate::model::soft_delete::DeletionState;
use crate::model::user::UserId;
use crate::repo::{RepoError, RepoResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::Row;
use uuid::Uuid;

pub fn timestamp_to_db(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn optional_timestamp_to_db(value: Option<DateTime<Utc>>) -> SqlValue {
    value.map_or(SqlValue::Null, |at| SqlValue::Text(timestamp_to_db(at)))
}

pub fn bool_to_db(value: bool) -> SqlValue {
    SqlValue::Integer(i64::from(value))
}

pub fn actor_to_db(value: Option<UserId>) -> SqlValue {
    value.map_or(SqlValue::Null, |id| SqlValue::Integer(id.0))
}

pub fn read_uuid(row: &Row<'_>, column: &str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    parse_uuid(&text, column)
}

pub fn read_optional_uuid(row: &Row<'_>, column: &str) -> RepoResult<Option<Uuid>> {
    row.get::<_, Option<String>>(column)?
        .map(|text| parse_uuid(&text, column))
        .transpose()
}

pub fn read_timestamp(row: &Row<'_>, column: &str) -> RepoResult<DateTime<Utc>> {
    let text: String = row.get(column)?;
    parse_timestamp(&text, column)
}

pub fn read_optional_timestamp(row: &Row<'_>, column: &str) -> RepoResult<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(column)?
        .map(|text| parse_timestamp(&text, column))
        .transpose()
}

pub fn read_bool(row: &Row<'_>, column: &str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in column {column}"
        ))),
    }
}

pub fn read_actor(row: &Row<'_>, column: &str) -> RepoResult<Option<UserId>> {
    Ok(row.get::<_, Option<i64>>(column)?.map(UserId))
}

/// Reads a JSON text column; NULL reads as `Value::Null`.
pub fn read_json(row: &Row<'_>, column: &str) -> RepoResult<serde_json::Value> {
    match row.get::<_, Option<String>>(column)? {
        Some(text) => serde_json::from_str(&text).map_err(|err| {
            RepoError::InvalidData(format!("invalid json in column {column}: {err}"))
        }),
        None => Ok(serde_json::Value::Null),
    }
}

pub fn json_to_db(value: &serde_json::Value) -> SqlValue {
    SqlValue::Text(value.to_string())
}

fn parse_uuid(text: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in {column}")))
}

fn parse_timestamp(text: &str, column: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| {
            RepoError::InvalidData(format!("invalid timestamp value `{text}` in {column}"))
        })
}

impl AuditFields {
    /// Reads and validates the audit columns of a persisted row.
    pub fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let audit = Self::persisted(
            read_uuid(row, "uuid")?,
            read_timestamp(row, "created_at")?,
            read_actor(row, "created_by")?,
            read_timestamp(row, "modified_at")?,
            read_actor(row, "modified_by")?,
        );
        audit.validate()?;
        Ok(audit)
    }

    pub fn column_values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("uuid", SqlValue::Text(self.uuid().to_string())),
            ("created_at", optional_timestamp_to_db(self.created_at())),
            ("created_by", actor_to_db(self.created_by())),
            ("modified_at", optional_timestamp_to_db(self.modified_at())),
            ("modified_by", actor_to_db(self.modified_by())),
        ]
    }
}

impl DeletionState {
    /// Reads and validates the deletion columns; `uuid` is used for errors.
    pub fn from_row(row: &Row<'_>, uuid: Uuid) -> RepoResult<Self> {
        let state = Self::persisted(
            read_bool(row, "is_deleted")?,
            read_optional_timestamp(row, "deleted_at")?,
            read_actor(row, "deleted_by")?,
        );
        state.validate(uuid)?;
        Ok(state)
    }

    pub fn column_values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("is_deleted", bool_to_db(self.is_deleted())),
            ("deleted_at", optional_timestamp_to_db(self.deleted_at())),
            ("deleted_by", actor_to_db(self.deleted_by())),
        ]
    }
}
