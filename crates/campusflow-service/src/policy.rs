use std::sync::Arc;

use campusflow_policy::{
  DEFAULT_DOCUMENT_TYPES, EntityType, TransitionPolicy, normalize_document_types,
};
use campusflow_store::Store;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::ServiceError;
use crate::transition::{audit_entry, effective_policy};

/// Admin settings surface for tenant workflow configuration.
pub struct PolicyService<S> {
  store: Arc<S>,
}

impl<S: Store> PolicyService<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }

  /// The policy transitions are currently decided under: the tenant's saved
  /// policy when it has content, the built-in default otherwise.
  pub async fn load(
    &self,
    tenant_id: &str,
    entity_type: EntityType,
  ) -> Result<TransitionPolicy, ServiceError> {
    effective_policy(self.store.as_ref(), tenant_id, entity_type).await
  }

  /// Validate, normalize, and persist a policy payload as a full replace.
  /// Malformed payloads are rejected before anything is written.
  #[instrument(skip(self, payload), fields(tenant_id, entity_type = %entity_type))]
  pub async fn save(
    &self,
    tenant_id: &str,
    entity_type: EntityType,
    payload: &Value,
    actor_id: Option<&str>,
  ) -> Result<TransitionPolicy, ServiceError> {
    let policy = TransitionPolicy::from_value(payload)?;
    self
      .store
      .save_policy(tenant_id, entity_type, &policy)
      .await?;

    self
      .store
      .append_audit(&audit_entry(
        tenant_id,
        actor_id,
        "WORKFLOW_POLICY_UPDATED",
        "tenant_config",
        entity_type.as_str(),
        json!({ "policy": policy }),
      ))
      .await?;

    Ok(policy)
  }

  /// The tenant's document type list, or the built-in defaults.
  pub async fn document_types(&self, tenant_id: &str) -> Result<Vec<String>, ServiceError> {
    match self.store.load_document_types(tenant_id).await? {
      Some(types) if !types.is_empty() => Ok(types),
      _ => Ok(DEFAULT_DOCUMENT_TYPES.iter().map(|s| s.to_string()).collect()),
    }
  }

  /// Normalize and persist the document type list, rejecting an empty result.
  #[instrument(skip(self, document_types), fields(tenant_id))]
  pub async fn save_document_types(
    &self,
    tenant_id: &str,
    document_types: &[String],
    actor_id: Option<&str>,
  ) -> Result<Vec<String>, ServiceError> {
    let normalized = normalize_document_types(document_types)?;
    self
      .store
      .save_document_types(tenant_id, &normalized)
      .await?;

    self
      .store
      .append_audit(&audit_entry(
        tenant_id,
        actor_id,
        "DOCUMENT_TYPES_UPDATED",
        "tenant_config",
        "document_types",
        json!({ "document_types": normalized }),
      ))
      .await?;

    Ok(normalized)
  }
}
