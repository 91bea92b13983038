//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise one full entity lifecycle (create, soft delete, serialize)
//!   against an in-memory database or the path given as first argument.
//! - Write rolling logs when `CRUD_LOG_DIR` names an absolute directory.
//! - Keep output deterministic apart from generated UUIDs and timestamps.

use crud_core::db::{open_db, open_db_in_memory};
use crud_core::marshal::actor_field;
use crud_core::repo::row::{actor_to_db, read_actor};
use crud_core::{
    AuditFields, DeletionState, Entity, EntitySchema, EntityService, FieldAccess,
    FieldDescriptor, FieldKind, Marshall, Marshalled, NewUser, RepoResult, RequestContext,
    SerializeOptions, SoftDeleteEntity, SqliteUserRepository, UserId, UserRepository, ValueStore,
};
use log::info;
use once_cell::sync::Lazy;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Row};
use std::error::Error;

crud_core::value_store! {
    struct ArticleState: i64 {
        DRAFT = 0,
        PUBLISHED = 1,
    }
}

static ARTICLE_SCHEMA: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::soft_deletable("article", "articles")
        .field(FieldDescriptor::new("headline", FieldKind::Text))
        .field(FieldDescriptor::new("state", FieldKind::Integer))
        .field(FieldDescriptor::new("author", FieldKind::Actor).nullable())
        .marshall(
            Marshall::new(["uuid", "headline", "state"])
                .details(["created_at", "modified_at"])
                .privates(["author", "is_deleted", "deleted_at", "deleted_by"]),
        )
});

struct Article {
    audit: AuditFields,
    deletion: DeletionState,
    headline: String,
    state: i64,
    author: Option<UserId>,
}

impl Marshalled for Article {
    fn schema(&self) -> &EntitySchema {
        &ARTICLE_SCHEMA
    }

    fn field(&self, name: &str, conn: &Connection) -> RepoResult<FieldAccess> {
        match name {
            "headline" => Ok(FieldAccess::scalar(self.headline.as_str())),
            "state" => Ok(FieldAccess::scalar(self.state)),
            "author" => actor_field(conn, self.author),
            _ => match self.deletion.field(name, conn)? {
                FieldAccess::Unknown => self.audit.field(name, conn),
                access => Ok(access),
            },
        }
    }
}

impl Entity for Article {
    fn entity_schema() -> &'static EntitySchema {
        &ARTICLE_SCHEMA
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
        values.push(("headline", SqlValue::Text(self.headline.clone())));
        values.push(("state", SqlValue::Integer(self.state)));
        values.push(("author", actor_to_db(self.author)));
        values
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let audit = AuditFields::from_row(row)?;
        let deletion = DeletionState::from_row(row, audit.uuid())?;
        Ok(Self {
            audit,
            deletion,
            headline: row.get("headline")?,
            state: row.get("state")?,
            author: read_actor(row, "author")?,
        })
    }
}

impl SoftDeleteEntity for Article {
    fn deletion(&self) -> &DeletionState {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut DeletionState {
        &mut self.deletion
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("crud_core version={}", crud_core::core_version());
    if let Ok(log_dir) = std::env::var("CRUD_LOG_DIR") {
        crud_core::init_logging(crud_core::default_log_level(), &log_dir)?;
    }

    let conn = match std::env::args().nth(1) {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };

    let users = SqliteUserRepository::new(&conn);
    let author = match users.get_user_by_username("smoke")? {
        Some(user) => user,
        None => users.create_user(&NewUser::new("smoke").named("Smoke", "Test"))?,
    };
    let request = RequestContext::authenticated(author.clone());

    let service = EntityService::<Article>::try_new(&conn)?;
    let mut article = Article {
        audit: AuditFields::new(),
        deletion: DeletionState::default(),
        headline: "Hello, audit trail".to_string(),
        state: ArticleState::PUBLISHED,
        author: Some(author.id),
    };
    let id = service.create(&mut article, Some(&request))?;
    service.delete(&mut article, Some(&request), None)?;
    info!("event=cli_smoke module=cli status=ok uuid={id}");

    let options = SerializeOptions::new()
        .details(true)
        .privates(true)
        .recurse(1);
    let payload = service.detail(id, &options)?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    println!(
        "active={} states={}",
        service.list_serialized(&options)?.len(),
        serde_json::to_string(&ArticleState::serialize())?
    );

    Ok(())
}
