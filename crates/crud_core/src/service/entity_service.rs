//! Entity use-case service.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - List payloads only ever contain active (not deleted) entities.

use crate::marshal::{serialize, SerializeOptions};
use crate::model::user::{resolve_actor, RequestContext, User};
use crate::repo::entity_repo::{
    Entity, EntityRepository, SoftDeleteEntity, SoftDeleteRepository, SqliteEntityRepository,
};
use crate::repo::RepoResult;
use rusqlite::Connection;
use serde_json::{Map, Value};
use uuid::Uuid;

pub struct EntityService<'conn, E: Entity> {
    conn: &'conn Connection,
    repo: SqliteEntityRepository<'conn, E>,
}

impl<'conn, E: Entity> EntityService<'conn, E> {
    /// Creates the service and the entity table when missing.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Ok(Self {
            conn,
            repo: SqliteEntityRepository::try_new(conn)?,
        })
    }

    pub fn repository(&self) -> &SqliteEntityRepository<'conn, E> {
        &self.repo
    }

    /// Persists a new entity, attributing it to the request's user.
    pub fn create(&self, entity: &mut E, request: Option<&RequestContext>) -> RepoResult<Uuid> {
        self.repo.create(entity, resolve_actor(request, None))
    }

    /// Saves an entity, attributing the change to the request's user.
    pub fn save(&self, entity: &mut E, request: Option<&RequestContext>) -> RepoResult<()> {
        self.repo.save(entity, resolve_actor(request, None))
    }

    pub fn serialize(&self, entity: &E, options: &SerializeOptions) -> RepoResult<Map<String, Value>> {
        serialize(entity, self.conn, options)
    }

    /// Serializes one entity by UUID, deleted ones included.
    pub fn detail(
        &self,
        id: Uuid,
        options: &SerializeOptions,
    ) -> RepoResult<Option<Map<String, Value>>> {
        self.repo
            .get(id)?
            .map(|entity| self.serialize(&entity, options))
            .transpose()
    }
}

impl<E: SoftDeleteEntity> EntityService<'_, E> {
    /// Soft-deletes; `user` takes precedence over the request's user.
    pub fn delete(
        &self,
        entity: &mut E,
        request: Option<&RequestContext>,
        user: Option<&User>,
    ) -> RepoResult<()> {
        self.repo.delete(entity, request, user)
    }

    pub fn restore(&self, entity: &mut E) -> RepoResult<()> {
        self.repo.restore(entity)
    }

    /// Serializes every active entity, in insertion order.
    pub fn list_serialized(&self, options: &SerializeOptions) -> RepoResult<Vec<Map<String, Value>>> {
        self.repo
            .find_active()?
            .iter()
            .map(|entity| self.serialize(entity, options))
            .collect()
    }
}
