//! Access-tiered, depth-bounded serialization of entity graphs.
//!
//! # Responsibility
//! - Define the typed field accessor every serializable entity implements.
//! - Walk an entity and its relations into nested JSON mappings, exposing
//!   only the tiers requested and following relations only as deep as the
//!   recursion budgets allow.
//!
//! # Invariants
//! - Serialization performs no writes; relation access may issue lazy reads.
//! - Missing metadata, unloaded relations and dangling references are
//!   recovered locally; every other error propagates.

mod access;
mod serializer;

pub use access::{actor_field, active_related_field, related_field, to_one_field};
pub use serializer::{serialize, SerializeOptions};

use crate::model::user::{user_projection, User};
use crate::repo::RepoResult;
use crate::schema::EntitySchema;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use serde_json::{Map, Value};
use std::fmt::Display;

/// An entity the serializer can walk.
pub trait Marshalled {
    fn schema(&self) -> &EntitySchema;

    /// Resolves the current value of `name`. Relations may be read lazily
    /// through `conn`.
    fn field(&self, name: &str, conn: &Connection) -> RepoResult<FieldAccess>;
}

/// Outcome of reading one field.
pub enum FieldAccess {
    Found(FieldValue),
    /// The relation cannot be read yet (e.g. the owner is not persisted).
    EmptyRelation,
    /// A to-one reference points at a row that no longer exists.
    MissingReference,
    /// The entity has no such field or property.
    Unknown,
}

impl FieldAccess {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::Found(FieldValue::Scalar(value.into()))
    }

    pub fn null() -> Self {
        Self::Found(FieldValue::Scalar(Value::Null))
    }

    /// Timestamp value, or null when not stamped yet.
    pub fn timestamp(value: Option<DateTime<Utc>>) -> Self {
        value.map_or_else(Self::null, |at| Self::Found(FieldValue::DateTime(at)))
    }
}

/// Shape of a field value, which decides how it is rendered.
pub enum FieldValue {
    /// JSON-safe value passed through unchanged.
    Scalar(Value),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    /// Mapping passed through unchanged.
    Map(Map<String, Value>),
    /// Nested entity serialized recursively.
    Entity(Box<dyn Marshalled>),
    /// Nested object that is not itself walkable (e.g. a user).
    Foreign(ForeignObject),
    /// To-many relation.
    Related(Vec<Box<dyn Marshalled>>),
    /// Any other sequence.
    Sequence(Vec<SequenceItem>),
}

/// Element of a `FieldValue::Sequence`.
pub enum SequenceItem {
    Entity(Box<dyn Marshalled>),
    Plain(Value),
}

/// Non-walkable nested object: rendered through its own projection when it
/// has one, otherwise through its display string.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignObject {
    projection: Option<Map<String, Value>>,
    display: String,
}

impl ForeignObject {
    pub fn with_projection(projection: Map<String, Value>, display: impl Display) -> Self {
        Self {
            projection: Some(projection),
            display: display.to_string(),
        }
    }

    pub fn display_only(display: impl Display) -> Self {
        Self {
            projection: None,
            display: display.to_string(),
        }
    }

    pub fn user(user: &User) -> Self {
        Self::with_projection(user_projection(user), user)
    }

    fn render(self) -> Value {
        match self.projection {
            Some(projection) => Value::Object(projection),
            None => Value::String(self.display),
        }
    }
}
