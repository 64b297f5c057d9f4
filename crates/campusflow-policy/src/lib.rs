//! Campusflow Policy
//!
//! This crate contains the serializable transition policy types for Campusflow.
//! A transition policy is per-tenant, per-entity-type configuration: which
//! status a record may move to next, and which preconditions must hold before
//! a record may enter a status.
//!
//! Policies can be loaded from:
//! - JSON payloads (admin settings surface, CLI `policy set`)
//! - Database storage (as JSON blobs)
//!
//! All status keys are normalized (trimmed, lower-cased, deduplicated) at this
//! boundary so downstream consumers only ever see canonical keys.

mod document_types;
mod entity_type;
mod error;
mod policy;

pub use document_types::{DEFAULT_DOCUMENT_TYPES, normalize_document_types};
pub use entity_type::EntityType;
pub use error::PolicyError;
pub use policy::{TransitionPolicy, normalize_status_key};
