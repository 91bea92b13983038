//! Entities shared by the integration tests.
#![allow(dead_code)]

use crud_core::marshal::{active_related_field, actor_field, to_one_field};
use crud_core::repo::row::{actor_to_db, json_to_db, read_actor, read_json, read_optional_uuid};
use crud_core::{
    AuditFields, DeletionState, Entity, EntitySchema, FieldAccess, FieldDescriptor, FieldKind,
    FieldValue, Marshall, Marshalled, NewUser, RepoError, RepoResult, SequenceItem,
    SoftDeleteEntity, SqliteUserRepository, User, UserId, UserRepository,
};
use once_cell::sync::Lazy;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Row};
use serde_json::{Map, Value};
use uuid::Uuid;

crud_core::value_store! {
    pub struct ProjectStatus: i64 {
        PLANNED = 0,
        ACTIVE = 1,
        ARCHIVED = 2,
    }
}

static PROJECT_SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::soft_deletable("project", "projects")
        .field(FieldDescriptor::new("title", FieldKind::Text))
        .field(FieldDescriptor::new("status", FieldKind::Integer).indexed())
        .field(FieldDescriptor::new("settings", FieldKind::Json))
        .field(FieldDescriptor::new("labels", FieldKind::Json))
        .field(FieldDescriptor::new("owner", FieldKind::Actor).nullable())
        .field(FieldDescriptor::new("api_key", FieldKind::Text).nullable())
        .field(FieldDescriptor::new("tasks", FieldKind::ToMany { target: "tasks" }))
        .marshall(
            Marshall::new(["uuid", "title", "status"])
                .details([
                    "created_at",
                    "modified_at",
                    "is_transient",
                    "settings",
                    "labels",
                    "tasks",
                ])
                .privates([
                    "created_by",
                    "modified_by",
                    "owner",
                    "is_deleted",
                    "deleted_at",
                    "deleted_by",
                ])
                .secrets(["api_key"]),
        )
});

static TASK_SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::soft_deletable("task", "tasks")
        .field(FieldDescriptor::new("title", FieldKind::Text))
        .field(
            FieldDescriptor::new("project", FieldKind::ToOne { target: "projects" })
                .nullable()
                .indexed(),
        )
        .marshall(
            Marshall::new(["uuid", "title", "project"])
                .details(["created_at", "modified_at"])
                .privates(["created_by"]),
        )
});

static ATTACHMENT_SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::audited("attachment", "attachments")
        .field(FieldDescriptor::new("name", FieldKind::Text))
});

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub audit: AuditFields,
    pub deletion: DeletionState,
    pub title: String,
    pub status: i64,
    pub settings: Map<String, Value>,
    pub labels: Vec<String>,
    pub owner: Option<UserId>,
    pub api_key: Option<String>,
}

impl Project {
    pub fn new(title: &str) -> Self {
        Self {
            audit: AuditFields::new(),
            deletion: DeletionState::default(),
            title: title.to_string(),
            status: ProjectStatus::PLANNED,
            settings: Map::new(),
            labels: Vec::new(),
            owner: None,
            api_key: None,
        }
    }
}

impl Marshalled for Project {
    fn schema(&self) -> &EntitySchema {
        &PROJECT_SCHEMA
    }

    fn field(&self, name: &str, conn: &Connection) -> RepoResult<FieldAccess> {
        match name {
            "title" => Ok(FieldAccess::scalar(self.title.as_str())),
            "status" => Ok(FieldAccess::scalar(self.status)),
            "settings" => Ok(FieldAccess::Found(FieldValue::Map(self.settings.clone()))),
            "labels" => Ok(FieldAccess::Found(FieldValue::Sequence(
                self.labels
                    .iter()
                    .map(|label| SequenceItem::Plain(Value::from(label.as_str())))
                    .collect(),
            ))),
            "owner" => actor_field(conn, self.owner),
            "api_key" => Ok(FieldAccess::scalar(self.api_key.clone())),
            "tasks" => active_related_field::<Task>(conn, &self.audit, "project"),
            _ => match self.deletion.field(name, conn)? {
                FieldAccess::Unknown => self.audit.field(name, conn),
                access => Ok(access),
            },
        }
    }
}

impl Entity for Project {
    fn entity_schema() -> &'static EntitySchema {
        &PROJECT_SCHEMA
    }

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn column_values(&self) -> Vec<(&'static str, SqlValue)> {
        let mut values = self.audit.column_values();
        values.extend(self.deletion.column_values());
        values.extend([
            ("title", SqlValue::Text(self.title.clone())),
            ("status", SqlValue::Integer(self.status)),
            ("settings", json_to_db(&Value::Object(self.settings.clone()))),
            ("labels", json_to_db(&Value::from(self.labels.clone()))),
            ("owner", actor_to_db(self.owner)),
            ("api_key", self.api_key.clone().map_or(SqlValue::Null, SqlValue::Text)),
        ]);
        values
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let audit = AuditFields::from_row(row)?;
        let deletion = DeletionState::from_row(row, audit.uuid())?;
        let settings = match read_json(row, "settings")? {
            Value::Object(map) => map,
            other => {
                return Err(RepoError::InvalidData(format!(
                    "projects.settings must be an object, got {other}"
                )))
            }
        };
        let labels = serde_json::from_value(read_json(row, "labels")?)
            .map_err(|err| RepoError::InvalidData(format!("projects.labels: {err}")))?;
        Ok(Self {
            audit,
            deletion,
            title: row.get("title")?,
            status: row.get("status")?,
            settings,
            labels,
            owner: read_actor(row, "owner")?,
            api_key: row.get("api_key")?,
        })
    }
}

impl SoftDeleteEntity for Project {
    fn deletion(&self) -> &DeletionState {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut DeletionState {
        &mut self.deletion
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub audit: AuditFields,
    pub deletion: DeletionState,
    pub title: String,
    pub project: Option<Uuid>,
}

impl Task {
    pub fn new(title: &str, project: Option<&Project>) -> Self {
        Self {
            audit: AuditFields::new(),
            deletion: DeletionState::default(),
            title: title.to_string(),
            project: project.map(|project| project.audit.uuid()),
        }
    }
}

impl Marshalled for Task {
    fn schema(&self) -> &EntitySchema {
        &TASK_SCHEMA
    }

    fn field(&self, name: &str, conn: &Connection) -> RepoResult<FieldAccess> {
        match name {
            "title" => Ok(FieldAccess::scalar(self.title.as_str())),
            "project" => to_one_field::<Project>(conn, self.project),
            _ => match self.deletion.field(name, conn)? {
                FieldAccess::Unknown => self.audit.field(name, conn),
                access => Ok(access),
            },
        }
    }
}

impl Entity for Task {
    fn entity_schema() -> &'static EntitySchema {
        &TASK_SCHEMA
    }

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn column_values(&self) -> Vec<(&'static str, SqlValue)> {
        let mut values = self.audit.column_values();
        values.extend(self.deletion.column_values());
        values.push(("title", SqlValue::Text(self.title.clone())));
        values.push((
            "project",
            self.project
                .map_or(SqlValue::Null, |uuid| SqlValue::Text(uuid.to_string())),
        ));
        values
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let audit = AuditFields::from_row(row)?;
        let deletion = DeletionState::from_row(row, audit.uuid())?;
        Ok(Self {
            audit,
            deletion,
            title: row.get("title")?,
            project: read_optional_uuid(row, "project")?,
        })
    }
}

impl SoftDeleteEntity for Task {
    fn deletion(&self) -> &DeletionState {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut DeletionState {
        &mut self.deletion
    }
}

/// Audit-only entity using the default marshall.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub audit: AuditFields,
    pub name: String,
}

impl Attachment {
    pub fn new(name: &str) -> Self {
        Self {
            audit: AuditFields::new(),
            name: name.to_string(),
        }
    }
}

impl Marshalled for Attachment {
    fn schema(&self) -> &EntitySchema {
        &ATTACHMENT_SCHEMA
    }

    fn field(&self, name: &str, conn: &Connection) -> RepoResult<FieldAccess> {
        match name {
            "name" => Ok(FieldAccess::scalar(self.name.as_str())),
            _ => self.audit.field(name, conn),
        }
    }
}

impl Entity for Attachment {
    fn entity_schema() -> &'static EntitySchema {
        &ATTACHMENT_SCHEMA
    }

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn column_values(&self) -> Vec<(&'static str, SqlValue)> {
        let mut values = self.audit.column_values();
        values.push(("name", SqlValue::Text(self.name.clone())));
        values
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            audit: AuditFields::from_row(row)?,
            name: row.get("name")?,
        })
    }
}

pub fn create_user(conn: &Connection, username: &str, first: &str, last: &str) -> User {
    SqliteUserRepository::new(conn)
        .create_user(&NewUser::new(username).named(first, last))
        .unwrap()
}
