//! Identity and audit component.
//!
//! # Invariants
//! - `uuid` is assigned once at construction and has no setter.
//! - `created_at` is stamped once, at first persist.
//! - `modified_at` never moves backwards and never precedes `created_at`.

use crate::model::user::UserId;
use chrono::{DateTime, SubsecRound, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Current UTC time at the precision timestamps are stored with.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Invariant violations detected on audit or deletion state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    NilUuid,
    ModifiedBeforeCreated {
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    },
    DeletedWithoutTimestamp(Uuid),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilUuid => write!(f, "uuid must not be nil"),
            Self::ModifiedBeforeCreated {
                created_at,
                modified_at,
            } => write!(
                f,
                "modified_at ({modified_at}) must be >= created_at ({created_at})"
            ),
            Self::DeletedWithoutTimestamp(uuid) => {
                write!(f, "record {uuid} is deleted but has no deleted_at")
            }
        }
    }
}

impl Error for ModelValidationError {}

/// UUID identity plus created/modified provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFields {
    uuid: Uuid,
    created_at: Option<DateTime<Utc>>,
    created_by: Option<UserId>,
    modified_at: Option<DateTime<Utc>>,
    modified_by: Option<UserId>,
    transient: bool,
}

impl AuditFields {
    /// Fresh, not yet persisted identity with a random v4 UUID.
    pub fn new() -> Self {
        Self::unpersisted(Uuid::new_v4())
    }

    /// Fresh identity with a caller-provided UUID (import paths).
    pub fn with_uuid(uuid: Uuid) -> Result<Self, ModelValidationError> {
        if uuid.is_nil() {
            return Err(ModelValidationError::NilUuid);
        }
        Ok(Self::unpersisted(uuid))
    }

    fn unpersisted(uuid: Uuid) -> Self {
        Self {
            uuid,
            created_at: None,
            created_by: None,
            modified_at: None,
            modified_by: None,
            transient: true,
        }
    }

    /// State read back from storage.
    pub(crate) fn persisted(
        uuid: Uuid,
        created_at: DateTime<Utc>,
        created_by: Option<UserId>,
        modified_at: DateTime<Utc>,
        modified_by: Option<UserId>,
    ) -> Self {
        Self {
            uuid,
            created_at: Some(created_at),
            created_by,
            modified_at: Some(modified_at),
            modified_by,
            transient: false,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn modified_by(&self) -> Option<UserId> {
        self.modified_by
    }

    /// True until the record has been written to or read from storage.
    pub fn is_transient(&self) -> bool {
        self.transient
    }

    pub(crate) fn mark_created(&mut self, at: DateTime<Utc>, actor: Option<UserId>) {
        self.created_at = Some(at);
        self.modified_at = Some(at);
        if actor.is_some() {
            self.created_by = actor;
            self.modified_by = actor;
        }
        self.transient = false;
    }

    pub(crate) fn mark_modified(&mut self, at: DateTime<Utc>, actor: Option<UserId>) {
        let floor = self.modified_at.max(self.created_at);
        self.modified_at = Some(match floor {
            Some(previous) if previous > at => previous,
            _ => at,
        });
        if actor.is_some() {
            self.modified_by = actor;
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.uuid.is_nil() {
            return Err(ModelValidationError::NilUuid);
        }
        if let (Some(created_at), Some(modified_at)) = (self.created_at, self.modified_at) {
            if modified_at < created_at {
                return Err(ModelValidationError::ModifiedBeforeCreated {
                    created_at,
                    modified_at,
                });
            }
        }
        Ok(())
    }
}

impl Default for AuditFields {
    fn default() -> Self {
        Self::new()
    }
}
