//! Audit, soft-delete and actor building blocks composed into entities.
//!
//! # Responsibility
//! - Define the identity/audit and deletion components an entity embeds.
//! - Define the actor (`User`) and request abstractions used for provenance.
//! - Provide the declarative choice-value store.
//!
//! # Invariants
//! - Every entity is identified by a stable, non-nil UUID.
//! - Deletion is represented by soft-delete tombstones; physical removal is a
//!   separate, explicitly named repository operation.

pub mod audit;
pub mod soft_delete;
pub mod user;
pub mod value_store;
