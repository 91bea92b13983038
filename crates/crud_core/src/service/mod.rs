//! Request-aware use-case services.
//!
//! # Responsibility
//! - Resolve the acting user from a request before delegating to
//!   repositories.
//! - Produce serialized payloads for API layers.

pub mod entity_service;
