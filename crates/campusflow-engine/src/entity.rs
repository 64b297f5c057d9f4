use campusflow_policy::normalize_status_key;
use serde::{Deserialize, Serialize};

/// The snapshot of an entity the engine decides over.
///
/// Built once at the data-access boundary from whatever loose shape the
/// record was stored in (nullable columns, untyped JSON payloads); the engine
/// and evaluators only ever see plain normalized strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityState {
  /// Current status key, normalized.
  pub status: String,
  /// Types of the documents attached to the entity.
  #[serde(default)]
  pub document_types: Vec<String>,
  /// Processing fee state, if the entity carries one (`paid` when settled).
  #[serde(default)]
  pub processing_fee_status: Option<String>,
}

impl EntityState {
  pub fn new(status: &str) -> Self {
    Self {
      status: normalize_status_key(status),
      document_types: Vec::new(),
      processing_fee_status: None,
    }
  }

  pub fn with_document(mut self, document_type: &str) -> Self {
    self.document_types.push(document_type.to_string());
    self
  }

  pub fn with_fee_status(mut self, fee_status: &str) -> Self {
    self.processing_fee_status = Some(fee_status.to_string());
    self
  }

  /// Case-insensitive membership test against the attached document types.
  pub fn has_document(&self, document_type: &str) -> bool {
    let wanted = document_type.trim().to_lowercase();
    self
      .document_types
      .iter()
      .any(|t| t.trim().to_lowercase() == wanted)
  }
}
