//! Soft-delete component.
//!
//! # Invariants
//! - `is_deleted == true` implies `deleted_at.is_some()`.
//! - State only changes through repository `delete`/`restore`.

use crate::model::audit::ModelValidationError;
use crate::model::user::UserId;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Deleted flag, deletion timestamp and deletion actor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionState {
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    deleted_by: Option<UserId>,
}

impl DeletionState {
    pub(crate) fn persisted(
        is_deleted: bool,
        deleted_at: Option<DateTime<Utc>>,
        deleted_by: Option<UserId>,
    ) -> Self {
        Self {
            is_deleted,
            deleted_at,
            deleted_by,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn deleted_by(&self) -> Option<UserId> {
        self.deleted_by
    }

    /// Tombstones the record. Without an actor the previous `deleted_by`
    /// is kept.
    pub(crate) fn mark_deleted(&mut self, at: DateTime<Utc>, actor: Option<UserId>) {
        self.is_deleted = true;
        self.deleted_at = Some(at);
        if actor.is_some() {
            self.deleted_by = actor;
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn validate(&self, uuid: Uuid) -> Result<(), ModelValidationError> {
        if self.is_deleted && self.deleted_at.is_none() {
            return Err(ModelValidationError::DeletedWithoutTimestamp(uuid));
        }
        Ok(())
    }
}
