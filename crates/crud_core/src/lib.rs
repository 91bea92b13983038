//! Audited, soft-deletable entities with access-tiered serialization.
//!
//! Entities compose [`AuditFields`] (and [`DeletionState`] for soft delete),
//! describe themselves with an [`EntitySchema`], expose their fields through
//! [`Marshalled`], and are persisted by [`SqliteEntityRepository`].

pub mod db;
pub mod logging;
pub mod marshal;
pub mod model;
pub mod repo;
pub mod schema;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use marshal::{
    serialize, FieldAccess, FieldValue, ForeignObject, Marshalled, SequenceItem,
    SerializeOptions,
};
pub use model::audit::{AuditFields, ModelValidationError};
pub use model::soft_delete::DeletionState;
pub use model::user::{resolve_actor, user_projection, NewUser, RequestContext, User, UserId};
pub use model::value_store::{Choice, ValueStore};
pub use repo::entity_repo::{
    Entity, EntityRepository, SoftDeleteEntity, SoftDeleteRepository, SqliteEntityRepository,
};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{ensure_table, RepoError, RepoResult};
pub use schema::{EntitySchema, FieldDescriptor, FieldKind, Marshall, SchemaError};
pub use service::entity_service::EntityService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
