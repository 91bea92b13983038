//! Explicit per-entity schema descriptors.
//!
//! # Responsibility
//! - Declare the fields an entity exposes, their storage kind and relation
//!   metadata, and the entity's serialization tiers (`Marshall`).
//! - Provide the metadata lookup consulted by the serializer and the DDL
//!   used by repositories.
//!
//! # Invariants
//! - Table, field and marshall names are plain lowercase identifiers; they
//!   are interpolated into SQL.
//! - Field names are unique within one schema.
//! - Audit fields are always declared first, deletion fields second.

mod ddl;

pub use ddl::create_table_sql;

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid identifier regex"));

/// Storage and relation kind of one declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Uuid,
    Text,
    Integer,
    Real,
    Boolean,
    /// UTC timestamp stored as RFC 3339 text.
    Timestamp,
    /// Mapping or sequence stored as JSON text.
    Json,
    /// Nullable reference to a row in `users`.
    Actor,
    /// Nullable reference to another entity table, keyed by its `uuid`.
    ToOne { target: &'static str },
    /// Reverse side of a `ToOne`; has no column of its own.
    ToMany { target: &'static str },
}

impl FieldKind {
    pub fn is_relation(self) -> bool {
        matches!(self, Self::Actor | Self::ToOne { .. } | Self::ToMany { .. })
    }

    pub fn has_column(self) -> bool {
        !matches!(self, Self::ToMany { .. })
    }
}

/// One declared field of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    pub indexed: bool,
    pub unique: bool,
}

impl FieldDescriptor {
    /// Non-null, unindexed field.
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            indexed: false,
            unique: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn is_relation(&self) -> bool {
        self.kind.is_relation()
    }
}

/// Access-tier configuration: which fields are visible at which tier.
///
/// The list tier is always present. A missing optional tier differs from an
/// empty one: requesting a missing tier also switches it off for nested
/// entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marshall {
    pub list_fields: Vec<&'static str>,
    pub detail_fields: Option<Vec<&'static str>>,
    pub private_fields: Option<Vec<&'static str>>,
    pub secret_fields: Option<Vec<&'static str>>,
}

impl Marshall {
    /// Policy with only a list tier declared.
    pub fn new(list_fields: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            list_fields: list_fields.into_iter().collect(),
            detail_fields: None,
            private_fields: None,
            secret_fields: None,
        }
    }

    /// Policy shared by every audited entity that does not declare its own.
    pub fn audit_default() -> Self {
        Self::new(["uuid"])
            .details(["created_at", "modified_at", "is_transient"])
            .privates(["created_by", "modified_by"])
            .secrets([])
    }

    pub fn details(mut self, fields: impl IntoIterator<Item = &'static str>) -> Self {
        self.detail_fields = Some(fields.into_iter().collect());
        self
    }

    pub fn privates(mut self, fields: impl IntoIterator<Item = &'static str>) -> Self {
        self.private_fields = Some(fields.into_iter().collect());
        self
    }

    pub fn secrets(mut self, fields: impl IntoIterator<Item = &'static str>) -> Self {
        self.secret_fields = Some(fields.into_iter().collect());
        self
    }

    fn all_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.list_fields
            .iter()
            .chain(self.detail_fields.iter().flatten())
            .chain(self.private_fields.iter().flatten())
            .chain(self.secret_fields.iter().flatten())
            .copied()
    }
}

/// Full descriptor of one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub name: &'static str,
    pub table: &'static str,
    pub soft_delete: bool,
    pub fields: Vec<FieldDescriptor>,
    pub marshall: Marshall,
}

impl EntitySchema {
    /// Schema with the audit fields and the default audit marshall.
    pub fn audited(name: &'static str, table: &'static str) -> Self {
        Self {
            name,
            table,
            soft_delete: false,
            fields: vec![
                FieldDescriptor::new("uuid", FieldKind::Uuid).unique().indexed(),
                FieldDescriptor::new("created_at", FieldKind::Timestamp),
                FieldDescriptor::new("created_by", FieldKind::Actor).nullable(),
                FieldDescriptor::new("modified_at", FieldKind::Timestamp),
                FieldDescriptor::new("modified_by", FieldKind::Actor).nullable(),
            ],
            marshall: Marshall::audit_default(),
        }
    }

    /// Audited schema that additionally carries the deletion fields.
    pub fn soft_deletable(name: &'static str, table: &'static str) -> Self {
        let mut schema = Self::audited(name, table);
        schema.soft_delete = true;
        schema.fields.extend([
            FieldDescriptor::new("is_deleted", FieldKind::Boolean).indexed(),
            FieldDescriptor::new("deleted_at", FieldKind::Timestamp).nullable(),
            FieldDescriptor::new("deleted_by", FieldKind::Actor).nullable(),
        ]);
        schema
    }

    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    /// Replaces the marshall policy; tiers are not merged with the default.
    pub fn marshall(mut self, marshall: Marshall) -> Self {
        self.marshall = marshall;
        self
    }

    /// Looks up field metadata. `None` for computed properties.
    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Fields that are stored in a column, in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| field.kind.has_column())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.get_field(name)
            .is_some_and(|field| field.kind.has_column())
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        check_identifier(self.table)?;
        for (index, field) in self.fields.iter().enumerate() {
            check_identifier(field.name)?;
            if let FieldKind::ToOne { target } | FieldKind::ToMany { target } = field.kind {
                check_identifier(target)?;
            }
            if self.fields[..index].iter().any(|seen| seen.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    entity: self.name,
                    field: field.name,
                });
            }
        }
        for name in self.marshall.all_names() {
            check_identifier(name)?;
        }
        Ok(())
    }
}

fn check_identifier(value: &'static str) -> Result<(), SchemaError> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    InvalidIdentifier(&'static str),
    DuplicateField {
        entity: &'static str,
        field: &'static str,
    },
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(value) => {
                write!(f, "`{value}` is not a valid lowercase identifier")
            }
            Self::DuplicateField { entity, field } => {
                write!(f, "field `{field}` declared twice on entity `{entity}`")
            }
        }
    }
}

impl Error for SchemaError {}
