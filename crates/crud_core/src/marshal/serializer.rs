//! The recursive, access-tiered serializer.

use super::{FieldAccess, FieldValue, Marshalled, SequenceItem};
use crate::repo::{RepoError, RepoResult};
use crate::schema::Marshall;
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use rusqlite::Connection;
use serde_json::{Map, Value};

/// Tier flags and recursion budgets of one serialization call.
///
/// `recurse` bounds how deep relations are followed; `recurse_properties`
/// bounds how deep the detail/private/secret tiers stay enabled. A negative
/// `recurse_properties` disables every non-list tier, zero still allows them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    pub details: bool,
    pub privates: bool,
    pub secrets: bool,
    pub recurse: i32,
    pub recurse_properties: i32,
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn details(mut self, enabled: bool) -> Self {
        self.details = enabled;
        self
    }

    pub fn privates(mut self, enabled: bool) -> Self {
        self.privates = enabled;
        self
    }

    pub fn secrets(mut self, enabled: bool) -> Self {
        self.secrets = enabled;
        self
    }

    pub fn recurse(mut self, depth: i32) -> Self {
        self.recurse = depth;
        self
    }

    pub fn recurse_properties(mut self, depth: i32) -> Self {
        self.recurse_properties = depth;
        self
    }

    fn nested(self) -> Self {
        Self {
            recurse: self.recurse - 1,
            recurse_properties: self.recurse_properties - 1,
            ..self
        }
    }
}

/// Serializes `entity` into a mapping from field name to JSON value.
///
/// Fields whose relation budget is exhausted are omitted, not emitted as
/// null.
///
/// # Errors
/// - `RepoError::UnknownField` when the marshall names a field the entity
///   cannot resolve.
/// - Persistence errors raised by lazy relation reads.
pub fn serialize(
    entity: &dyn Marshalled,
    conn: &Connection,
    options: &SerializeOptions,
) -> RepoResult<Map<String, Value>> {
    let schema = entity.schema();
    let (included, effective) = included_fields(&schema.marshall, *options);
    let mut obj = Map::new();

    for name in included {
        let descriptor = schema.get_field(name);
        if descriptor.is_none() {
            debug!(
                "event=serialize_field module=marshal status=fallback entity={} field={name} reason=no_metadata",
                schema.name
            );
        }
        let relational = descriptor.is_some_and(|field| field.is_relation());

        let value = match entity.field(name, conn)? {
            FieldAccess::Found(value) => value,
            FieldAccess::EmptyRelation => {
                debug!(
                    "event=serialize_field module=marshal status=fallback entity={} field={name} reason=empty_relation",
                    schema.name
                );
                if relational {
                    FieldValue::Sequence(Vec::new())
                } else {
                    FieldValue::Scalar(Value::Null)
                }
            }
            FieldAccess::MissingReference => {
                debug!(
                    "event=serialize_field module=marshal status=fallback entity={} field={name} reason=missing_reference",
                    schema.name
                );
                FieldValue::Scalar(Value::Null)
            }
            FieldAccess::Unknown => {
                return Err(RepoError::UnknownField {
                    entity: schema.name,
                    field: name.to_string(),
                });
            }
        };

        if let Some(rendered) = render(value, relational, conn, &effective)? {
            obj.insert(name.to_string(), rendered);
        }
    }

    Ok(obj)
}

/// Resolves the field list and the flags handed down to nested entities.
fn included_fields(
    marshall: &Marshall,
    options: SerializeOptions,
) -> (Vec<&'static str>, SerializeOptions) {
    let tiers_open = options.recurse_properties >= 0;
    let mut included = marshall.list_fields.clone();
    let mut effective = options;

    effective.details = extend_tier(
        &mut included,
        options.details && tiers_open,
        marshall.detail_fields.as_deref(),
    );
    effective.privates = extend_tier(
        &mut included,
        options.privates && tiers_open,
        marshall.private_fields.as_deref(),
    );
    effective.secrets = extend_tier(
        &mut included,
        options.secrets && tiers_open,
        marshall.secret_fields.as_deref(),
    );

    (included, effective)
}

fn extend_tier(
    included: &mut Vec<&'static str>,
    requested: bool,
    tier: Option<&[&'static str]>,
) -> bool {
    match tier {
        Some(fields) if requested => {
            included.extend_from_slice(fields);
            true
        }
        _ => false,
    }
}

fn render(
    value: FieldValue,
    relational: bool,
    conn: &Connection,
    options: &SerializeOptions,
) -> RepoResult<Option<Value>> {
    let nested = options.nested();
    let rendered = match value {
        FieldValue::Scalar(value) => Some(value),
        FieldValue::DateTime(at) => Some(Value::String(iso_datetime(at))),
        FieldValue::Date(date) => Some(Value::String(date.format("%Y-%m-%d").to_string())),
        FieldValue::Map(map) => Some(Value::Object(map)),
        FieldValue::Entity(child) if options.recurse > 0 => {
            Some(Value::Object(serialize(child.as_ref(), conn, &nested)?))
        }
        FieldValue::Foreign(object) if options.recurse > 0 => Some(object.render()),
        FieldValue::Entity(_) | FieldValue::Foreign(_) => None,
        FieldValue::Related(children) if relational => {
            if options.recurse > 0 {
                let serialized = children
                    .iter()
                    .map(|child| serialize(child.as_ref(), conn, &nested).map(Value::Object))
                    .collect::<RepoResult<Vec<_>>>()?;
                Some(Value::Array(serialized))
            } else {
                None
            }
        }
        FieldValue::Related(children) => render_sequence(
            children.into_iter().map(SequenceItem::Entity).collect(),
            conn,
            options,
        )?,
        FieldValue::Sequence(items) => render_sequence(items, conn, options)?,
    };
    Ok(rendered)
}

fn render_sequence(
    items: Vec<SequenceItem>,
    conn: &Connection,
    options: &SerializeOptions,
) -> RepoResult<Option<Value>> {
    if options.recurse < 0 {
        return Ok(None);
    }
    let nested = options.nested();
    let rendered = items
        .into_iter()
        .map(|item| match item {
            SequenceItem::Entity(child) => {
                serialize(child.as_ref(), conn, &nested).map(Value::Object)
            }
            SequenceItem::Plain(value) => Ok(value),
        })
        .collect::<RepoResult<Vec<_>>>()?;
    Ok(Some(Value::Array(rendered)))
}

/// ISO 8601 with an explicit `+00:00` offset; fractional seconds only when
/// present.
fn iso_datetime(at: DateTime<Utc>) -> String {
    let format = if at.timestamp_subsec_micros() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    at.to_rfc3339_opts(format, false)
}
