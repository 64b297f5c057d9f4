use campusflow_engine::EntityState;
use campusflow_policy::normalize_status_key;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// A document attached to an entity (admission applications in practice).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
  #[serde(rename = "type")]
  pub document_type: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  pub attached_at: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub attached_by: Option<String>,
}

/// A workflowable entity as stored in the database.
///
/// `entity_type` is kept as its string form here; services parse it back to
/// [`campusflow_policy::EntityType`] where they need the vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EntityRecord {
  pub id: String,
  pub tenant_id: String,
  pub entity_type: String,
  pub status: String,
  pub reference_number: Option<String>,
  pub payload: Json<serde_json::Value>,
  pub documents: Json<Vec<DocumentRecord>>,
  pub processing_fee_status: Option<String>,
  pub processing_fee_amount: Option<i64>,
  pub payment_reference: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl EntityRecord {
  /// Snapshot the record into the normalized shape the engine decides over.
  /// Nullable columns collapse to plain optional strings here, once.
  pub fn to_state(&self) -> EntityState {
    EntityState {
      status: normalize_status_key(&self.status),
      document_types: self
        .documents
        .0
        .iter()
        .map(|d| d.document_type.clone())
        .collect(),
      processing_fee_status: self
        .processing_fee_status
        .as_deref()
        .map(|s| s.trim().to_lowercase()),
    }
  }
}

/// A provisioned student, the target of the admission "admitted" side effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StudentRecord {
  pub id: String,
  pub tenant_id: String,
  pub admission_number: String,
  pub full_name: String,
  pub section_id: String,
  pub status: String,
  pub created_at: DateTime<Utc>,
}

/// One audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuditEntry {
  pub id: String,
  pub tenant_id: String,
  pub actor_id: Option<String>,
  pub action: String,
  pub resource_type: String,
  pub resource_id: String,
  pub detail: Json<serde_json::Value>,
  pub created_at: DateTime<Utc>,
}
