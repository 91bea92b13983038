//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Persist audited and soft-deletable entities described by an
//!   `EntitySchema`.
//! - Make the active/unfiltered distinction explicit (`find_active` vs
//!   `find_all`) instead of rewriting every query implicitly.
//! - Persist the actor (`users`) table.
//!
//! # Invariants
//! - Write paths validate entity state before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Soft delete never removes rows; only `hard_delete` does.

pub mod entity_repo;
pub mod row;
pub mod user_repo;

use crate::db::DbError;
use crate::model::audit::ModelValidationError;
use crate::model::user::UserId;
use crate::schema::{create_table_sql, EntitySchema, SchemaError};
use log::{error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entity, user and serialization operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ModelValidationError),
    Schema(SchemaError),
    Db(DbError),
    NotFound(Uuid),
    UserNotFound(UserId),
    AlreadyPersisted(Uuid),
    UnknownField {
        entity: &'static str,
        field: String,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Schema(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::AlreadyPersisted(id) => write!(f, "record {id} is already persisted"),
            Self::UnknownField { entity, field } => {
                write!(f, "entity `{entity}` has no field `{field}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Schema(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_)
            | Self::UserNotFound(_)
            | Self::AlreadyPersisted(_)
            | Self::UnknownField { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<SchemaError> for RepoError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Creates the entity table and its indices when missing.
pub fn ensure_table(conn: &Connection, schema: &EntitySchema) -> RepoResult<()> {
    let sql = create_table_sql(schema)?;
    if let Err(err) = conn.execute_batch(&sql) {
        error!(
            "event=ensure_table module=repo status=error table={} error={}",
            schema.table, err
        );
        return Err(err.into());
    }
    info!(
        "event=ensure_table module=repo status=ok table={}",
        schema.table
    );
    Ok(())
}
