//! Generic repositories for audited and soft-deletable entities.
//!
//! # Responsibility
//! - Stamp audit fields on create/save and keep them monotonic.
//! - Implement soft delete as an update of exactly the three deletion
//!   columns, and physical removal as a separate `hard_delete`.
//!
//! # Invariants
//! - `uuid`, `created_at` and `created_by` are never part of an UPDATE.
//! - In-memory audit/deletion state is only replaced after the write
//!   succeeded.

use crate::marshal::Marshalled;
use crate::model::audit::{now_utc, AuditFields, ModelValidationError};
use crate::model::soft_delete::DeletionState;
use crate::model::user::{resolve_actor, RequestContext, User};
use crate::repo::{ensure_table, RepoError, RepoResult};
use crate::schema::EntitySchema;
use log::{debug, info};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use std::marker::PhantomData;
use uuid::Uuid;

const IMMUTABLE_COLUMNS: &[&str] = &["uuid", "created_at", "created_by"];

/// A persisted entity composed of `AuditFields` plus its own columns.
pub trait Entity: Marshalled + Sized + 'static {
    fn entity_schema() -> &'static EntitySchema;

    fn audit(&self) -> &AuditFields;

    fn audit_mut(&mut self) -> &mut AuditFields;

    /// Every column value, including the embedded audit (and deletion)
    /// columns.
    fn column_values(&self) -> Vec<(&'static str, SqlValue)>;

    fn from_row(row: &rusqlite::Row<'_>) -> RepoResult<Self>;

    fn validate(&self) -> Result<(), ModelValidationError> {
        self.audit().validate()
    }
}

/// An entity that additionally embeds `DeletionState`.
pub trait SoftDeleteEntity: Entity {
    fn deletion(&self) -> &DeletionState;

    fn deletion_mut(&mut self) -> &mut DeletionState;
}

/// Unfiltered persistence operations.
pub trait EntityRepository<E: Entity> {
    /// Inserts a transient entity, stamping created/modified fields.
    fn create(&self, entity: &mut E, actor: Option<&User>) -> RepoResult<Uuid>;
    /// Creates transient entities, updates persisted ones.
    fn save(&self, entity: &mut E, actor: Option<&User>) -> RepoResult<()>;
    /// Gets one entity by UUID regardless of deletion state.
    fn get(&self, id: Uuid) -> RepoResult<Option<E>>;
    /// Lists every row, deleted ones included.
    fn find_all(&self) -> RepoResult<Vec<E>>;
    fn find_by(&self, column: &str, value: SqlValue) -> RepoResult<Vec<E>>;
    /// Physically removes the row.
    fn hard_delete(&self, id: Uuid) -> RepoResult<()>;
}

/// Operations that honour the deleted flag.
pub trait SoftDeleteRepository<E: SoftDeleteEntity>: EntityRepository<E> {
    fn find_active(&self) -> RepoResult<Vec<E>>;
    fn get_active(&self, id: Uuid) -> RepoResult<Option<E>>;
    fn find_active_by(&self, column: &str, value: SqlValue) -> RepoResult<Vec<E>>;
    /// Tombstones the entity. An explicit `user` wins over the request's
    /// authenticated user.
    fn delete(
        &self,
        entity: &mut E,
        request: Option<&RequestContext>,
        user: Option<&User>,
    ) -> RepoResult<()>;
    fn restore(&self, entity: &mut E) -> RepoResult<()>;
}

/// SQLite-backed repository for one entity type.
pub struct SqliteEntityRepository<'conn, E> {
    conn: &'conn Connection,
    _entity: PhantomData<fn() -> E>,
}

impl<'conn, E: Entity> SqliteEntityRepository<'conn, E> {
    /// Wraps a connection whose entity table already exists.
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    /// Wraps a connection and creates the entity table when missing.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table(conn, E::entity_schema())?;
        Ok(Self::new(conn))
    }

    fn schema(&self) -> &'static EntitySchema {
        E::entity_schema()
    }

    fn checked_column<'a>(&self, column: &'a str) -> RepoResult<&'a str> {
        if self.schema().has_column(column) {
            Ok(column)
        } else {
            Err(RepoError::UnknownField {
                entity: self.schema().name,
                field: column.to_string(),
            })
        }
    }

    fn select(&self, filter: &str, bind_values: Vec<SqlValue>) -> RepoResult<Vec<E>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {filter} ORDER BY rowid ASC;",
            self.schema().table
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(E::from_row(row)?);
        }
        Ok(entities)
    }

    fn select_one(&self, filter: &str, bind_values: Vec<SqlValue>) -> RepoResult<Option<E>> {
        Ok(self.select(filter, bind_values)?.into_iter().next())
    }

    fn insert(&self, entity: &E) -> RepoResult<()> {
        let values = entity.column_values();
        let mut names = Vec::with_capacity(values.len());
        let mut bind_values = Vec::with_capacity(values.len());
        for (name, value) in values {
            names.push(self.checked_column(name)?);
            bind_values.push(value);
        }
        let placeholders = (1..=names.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            self.schema().table,
            names.join(", ")
        );
        self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(())
    }

    fn update(&self, uuid: Uuid, values: Vec<(&'static str, SqlValue)>) -> RepoResult<()> {
        let mut assignments = Vec::with_capacity(values.len());
        let mut bind_values = Vec::with_capacity(values.len() + 1);
        for (name, value) in values {
            if IMMUTABLE_COLUMNS.contains(&name) {
                continue;
            }
            let name = self.checked_column(name)?;
            bind_values.push(value);
            assignments.push(format!("{name} = ?{}", bind_values.len()));
        }
        bind_values.push(SqlValue::Text(uuid.to_string()));
        let sql = format!(
            "UPDATE {} SET {} WHERE uuid = ?{};",
            self.schema().table,
            assignments.join(", "),
            bind_values.len()
        );

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::NotFound(uuid));
        }
        Ok(())
    }

    fn require_soft_delete(&self) -> RepoResult<()> {
        if self.schema().soft_delete {
            Ok(())
        } else {
            Err(RepoError::UnknownField {
                entity: self.schema().name,
                field: "is_deleted".to_string(),
            })
        }
    }

    fn write_deletion(&self, uuid: Uuid, next: &DeletionState) -> RepoResult<()> {
        self.require_soft_delete()?;
        next.validate(uuid)?;
        self.update(uuid, next.column_values())
    }
}

impl<E: Entity> EntityRepository<E> for SqliteEntityRepository<'_, E> {
    fn create(&self, entity: &mut E, actor: Option<&User>) -> RepoResult<Uuid> {
        let uuid = entity.audit().uuid();
        if !entity.audit().is_transient() {
            return Err(RepoError::AlreadyPersisted(uuid));
        }

        let previous = entity.audit().clone();
        entity
            .audit_mut()
            .mark_created(now_utc(), actor.map(|user| user.id));
        let written = match entity.validate() {
            Ok(()) => self.insert(entity),
            Err(err) => Err(err.into()),
        };
        if let Err(err) = written {
            *entity.audit_mut() = previous;
            return Err(err);
        }

        info!(
            "event=entity_create module=repo status=ok table={} uuid={uuid}",
            self.schema().table
        );
        Ok(uuid)
    }

    fn save(&self, entity: &mut E, actor: Option<&User>) -> RepoResult<()> {
        if entity.audit().is_transient() {
            return self.create(entity, actor).map(|_| ());
        }

        let uuid = entity.audit().uuid();
        let previous = entity.audit().clone();
        entity
            .audit_mut()
            .mark_modified(now_utc(), actor.map(|user| user.id));
        let written = match entity.validate() {
            Ok(()) => self.update(uuid, entity.column_values()),
            Err(err) => Err(err.into()),
        };
        if let Err(err) = written {
            *entity.audit_mut() = previous;
            return Err(err);
        }

        debug!(
            "event=entity_save module=repo status=ok table={} uuid={uuid}",
            self.schema().table
        );
        Ok(())
    }

    fn get(&self, id: Uuid) -> RepoResult<Option<E>> {
        self.select_one("uuid = ?1", vec![SqlValue::Text(id.to_string())])
    }

    fn find_all(&self) -> RepoResult<Vec<E>> {
        self.select("1 = 1", Vec::new())
    }

    fn find_by(&self, column: &str, value: SqlValue) -> RepoResult<Vec<E>> {
        let column = self.checked_column(column)?;
        self.select(&format!("{column} = ?1"), vec![value])
    }

    fn hard_delete(&self, id: Uuid) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE uuid = ?1;", self.schema().table),
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        info!(
            "event=entity_hard_delete module=repo status=ok table={} uuid={id}",
            self.schema().table
        );
        Ok(())
    }
}

impl<E: SoftDeleteEntity> SoftDeleteRepository<E> for SqliteEntityRepository<'_, E> {
    fn find_active(&self) -> RepoResult<Vec<E>> {
        self.require_soft_delete()?;
        self.select("is_deleted = 0", Vec::new())
    }

    fn get_active(&self, id: Uuid) -> RepoResult<Option<E>> {
        self.require_soft_delete()?;
        self.select_one(
            "uuid = ?1 AND is_deleted = 0",
            vec![SqlValue::Text(id.to_string())],
        )
    }

    fn find_active_by(&self, column: &str, value: SqlValue) -> RepoResult<Vec<E>> {
        self.require_soft_delete()?;
        let column = self.checked_column(column)?;
        self.select(&format!("{column} = ?1 AND is_deleted = 0"), vec![value])
    }

    fn delete(
        &self,
        entity: &mut E,
        request: Option<&RequestContext>,
        user: Option<&User>,
    ) -> RepoResult<()> {
        let uuid = entity.audit().uuid();
        let actor = resolve_actor(request, user).map(|actor| actor.id);
        let mut next = entity.deletion().clone();
        next.mark_deleted(now_utc(), actor);

        self.write_deletion(uuid, &next)?;
        *entity.deletion_mut() = next;

        info!(
            "event=entity_soft_delete module=repo status=ok table={} uuid={uuid} actor={}",
            self.schema().table,
            actor.map_or_else(|| "none".to_string(), |id| id.to_string())
        );
        Ok(())
    }

    fn restore(&self, entity: &mut E) -> RepoResult<()> {
        let uuid = entity.audit().uuid();
        let mut next = entity.deletion().clone();
        next.clear();

        self.write_deletion(uuid, &next)?;
        *entity.deletion_mut() = next;

        info!(
            "event=entity_restore module=repo status=ok table={} uuid={uuid}",
            self.schema().table
        );
        Ok(())
    }
}
