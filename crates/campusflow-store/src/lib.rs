//! Campusflow Store
//!
//! This crate provides the storage trait and sqlite implementation for tenant
//! policies and workflowable entity records. Data is persisted to a database
//! as ordinary structured rows with JSON columns; no wire-specific format.
//!
//! The [`Store`] trait defines operations for:
//! - Loading and saving per-tenant transition policies (full replace)
//! - Creating and reading entity records
//! - Committing status changes with an optimistic-concurrency check
//! - Provisioning student records (the admission side effect target)
//! - Appending audit entries
//!
//! Status commits are a compare-and-swap on the current status: the write is
//! conditioned on the status being unchanged since the caller read it, and a
//! lost race surfaces as [`Error::ConcurrentModification`] so the caller
//! re-fetches instead of overwriting.

mod sqlite;
mod types;

pub use sqlite::SqliteStore;
// Re-exported so callers building records don't need a direct sqlx dependency.
pub use sqlx::types::Json;
pub use types::{AuditEntry, DocumentRecord, EntityRecord, StudentRecord};

use async_trait::async_trait;
use campusflow_policy::{EntityType, TransitionPolicy};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// The conditioned status write lost a race; re-read and re-evaluate.
  #[error("concurrent modification: status changed since it was read")]
  ConcurrentModification,

  /// A stored JSON column failed to decode.
  #[error("corrupt stored value: {0}")]
  Corrupt(#[from] serde_json::Error),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

/// Storage trait for tenant policies and workflowable entities.
#[async_trait]
pub trait Store: Send + Sync {
  /// Load the saved policy for a tenant and entity type. `None` is a valid,
  /// expected result meaning "no configuration yet".
  async fn load_policy(
    &self,
    tenant_id: &str,
    entity_type: EntityType,
  ) -> Result<Option<TransitionPolicy>, Error>;

  /// Persist a policy, replacing any previous one wholesale.
  async fn save_policy(
    &self,
    tenant_id: &str,
    entity_type: EntityType,
    policy: &TransitionPolicy,
  ) -> Result<(), Error>;

  /// Load the tenant's configured document type list, if any.
  async fn load_document_types(&self, tenant_id: &str) -> Result<Option<Vec<String>>, Error>;

  /// Persist the tenant's document type list, replacing any previous one.
  async fn save_document_types(
    &self,
    tenant_id: &str,
    document_types: &[String],
  ) -> Result<(), Error>;

  /// Create a new entity record.
  async fn create_entity(&self, record: &EntityRecord) -> Result<(), Error>;

  /// Get an entity by id within a tenant.
  async fn get_entity(&self, tenant_id: &str, entity_id: &str) -> Result<EntityRecord, Error>;

  /// List entities of one type for a tenant, optionally filtered by status.
  async fn list_entities(
    &self,
    tenant_id: &str,
    entity_type: EntityType,
    status: Option<&str>,
  ) -> Result<Vec<EntityRecord>, Error>;

  /// Commit a status change conditioned on `expected_status` still being the
  /// stored status. Fails with [`Error::ConcurrentModification`] when another
  /// writer got there first.
  async fn update_entity_status(
    &self,
    tenant_id: &str,
    entity_id: &str,
    expected_status: &str,
    new_status: &str,
  ) -> Result<(), Error>;

  /// Replace the entity's attached document list.
  async fn update_entity_documents(
    &self,
    tenant_id: &str,
    entity_id: &str,
    documents: &[DocumentRecord],
  ) -> Result<(), Error>;

  /// Mark the entity's processing fee as paid.
  async fn update_entity_fee(
    &self,
    tenant_id: &str,
    entity_id: &str,
    amount: i64,
    payment_reference: Option<&str>,
  ) -> Result<(), Error>;

  /// Assign a reference number if none is set yet. Returns `true` when this
  /// call performed the assignment, `false` when a number already existed.
  async fn assign_reference_number(
    &self,
    tenant_id: &str,
    entity_id: &str,
    reference_number: &str,
  ) -> Result<bool, Error>;

  /// Create a student record. Returns `false` when a student with the same
  /// admission number already exists for the tenant, which is what makes the
  /// admission side effect idempotent.
  async fn create_student(&self, student: &StudentRecord) -> Result<bool, Error>;

  /// Find a student by admission number within a tenant.
  async fn find_student(
    &self,
    tenant_id: &str,
    admission_number: &str,
  ) -> Result<Option<StudentRecord>, Error>;

  /// Append an audit entry.
  async fn append_audit(&self, entry: &AuditEntry) -> Result<(), Error>;

  /// List audit entries for one resource, newest first.
  async fn list_audit(&self, tenant_id: &str, resource_id: &str)
  -> Result<Vec<AuditEntry>, Error>;
}
