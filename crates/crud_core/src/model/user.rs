//! Actor entity, request context and the user display adapter.
//!
//! # Responsibility
//! - Model the external user referenced by audit columns.
//! - Resolve the acting user of an operation from explicit input or request.
//! - Project a user into its public mapping for serialized payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// Row id of a user in the `users` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// First and last name separated by a space, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl Display for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.username)
    }
}

/// Input for creating a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl NewUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }
}

/// Public projection of a user embedded into serialized entities.
pub fn user_projection(user: &User) -> Map<String, Value> {
    let mut projection = Map::new();
    projection.insert("username".to_string(), Value::from(user.username.as_str()));
    projection.insert("full_name".to_string(), Value::from(user.full_name()));
    projection.insert(
        "first_name".to_string(),
        Value::from(user.first_name.as_str()),
    );
    projection.insert("last_name".to_string(), Value::from(user.last_name.as_str()));
    projection
}

/// Request-scoped caller information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    user: Option<User>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn authenticated_user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

/// Picks the acting user: an explicit `user` wins over the request's user.
pub fn resolve_actor<'a>(
    request: Option<&'a RequestContext>,
    user: Option<&'a User>,
) -> Option<&'a User> {
    user.or_else(|| request.and_then(RequestContext::authenticated_user))
}
