//! Field accessors for the embedded audit/deletion components and for
//! relation fields of concrete entities.

use super::{FieldAccess, FieldValue, ForeignObject, Marshalled};
use crate::model::audit::AuditFields;
use crate::model::soft_delete::DeletionState;
use crate::model::user::UserId;
use crate::repo::entity_repo::{
    Entity, EntityRepository, SoftDeleteEntity, SoftDeleteRepository, SqliteEntityRepository,
};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::RepoResult;
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use uuid::Uuid;

impl AuditFields {
    /// Audit fields plus the `is_transient` property; `Unknown` otherwise.
    pub fn field(&self, name: &str, conn: &Connection) -> RepoResult<FieldAccess> {
        match name {
            "uuid" => Ok(FieldAccess::scalar(self.uuid().to_string())),
            "created_at" => Ok(FieldAccess::timestamp(self.created_at())),
            "created_by" => actor_field(conn, self.created_by()),
            "modified_at" => Ok(FieldAccess::timestamp(self.modified_at())),
            "modified_by" => actor_field(conn, self.modified_by()),
            "is_transient" => Ok(FieldAccess::scalar(self.is_transient())),
            _ => Ok(FieldAccess::Unknown),
        }
    }
}

impl DeletionState {
    pub fn field(&self, name: &str, conn: &Connection) -> RepoResult<FieldAccess> {
        match name {
            "is_deleted" => Ok(FieldAccess::scalar(self.is_deleted())),
            "deleted_at" => Ok(FieldAccess::timestamp(self.deleted_at())),
            "deleted_by" => actor_field(conn, self.deleted_by()),
            _ => Ok(FieldAccess::Unknown),
        }
    }
}

/// Loads the referenced user for an actor column.
pub fn actor_field(conn: &Connection, id: Option<UserId>) -> RepoResult<FieldAccess> {
    let Some(id) = id else {
        return Ok(FieldAccess::null());
    };
    match SqliteUserRepository::new(conn).get_user(id)? {
        Some(user) => Ok(FieldAccess::Found(FieldValue::Foreign(ForeignObject::user(
            &user,
        )))),
        None => Ok(FieldAccess::MissingReference),
    }
}

/// Loads the entity a to-one column points at, deleted or not.
pub fn to_one_field<E: Entity>(conn: &Connection, target: Option<Uuid>) -> RepoResult<FieldAccess> {
    let Some(target) = target else {
        return Ok(FieldAccess::null());
    };
    match SqliteEntityRepository::<E>::new(conn).get(target)? {
        Some(entity) => Ok(FieldAccess::Found(FieldValue::Entity(Box::new(entity)))),
        None => Ok(FieldAccess::MissingReference),
    }
}

/// Loads every `E` whose `column` references `owner`.
pub fn related_field<E: Entity>(
    conn: &Connection,
    owner: &AuditFields,
    column: &str,
) -> RepoResult<FieldAccess> {
    if owner.is_transient() {
        return Ok(FieldAccess::EmptyRelation);
    }
    let children = SqliteEntityRepository::<E>::new(conn)
        .find_by(column, SqlValue::Text(owner.uuid().to_string()))?;
    Ok(boxed_related(children))
}

/// Like [`related_field`], restricted to children that are not deleted.
pub fn active_related_field<E: SoftDeleteEntity>(
    conn: &Connection,
    owner: &AuditFields,
    column: &str,
) -> RepoResult<FieldAccess> {
    if owner.is_transient() {
        return Ok(FieldAccess::EmptyRelation);
    }
    let children = SqliteEntityRepository::<E>::new(conn)
        .find_active_by(column, SqlValue::Text(owner.uuid().to_string()))?;
    Ok(boxed_related(children))
}

fn boxed_related<E: Entity>(children: Vec<E>) -> FieldAccess {
    FieldAccess::Found(FieldValue::Related(
        children
            .into_iter()
            .map(|child| Box::new(child) as Box<dyn Marshalled>)
            .collect(),
    ))
}
