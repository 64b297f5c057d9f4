use campusflow_engine::{EvaluatorRegistry, TransitionResult, request_transition};
use campusflow_policy::{EntityType, TransitionPolicy};
use campusflow_store::{AuditEntry, EntityRecord, Json, Store};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of a committed (or no-op) transition at the service boundary.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
  /// The entity after the call. For a no-op this is the unchanged record.
  pub entity: EntityRecord,
  /// Whether a status change was committed.
  pub changed: bool,
}

/// The engine's verdict together with the record it was taken against.
pub(crate) struct Decision {
  pub record: EntityRecord,
  /// `Some(normalized_target)` for an accepted transition, `None` for a
  /// no-op. Rejections never produce a `Decision`.
  pub accepted: Option<String>,
}

/// The policy a tenant's transitions are decided under: the saved one when it
/// has content, the entity type's built-in default otherwise. Absence of
/// configuration is a valid state, never a hard error.
pub(crate) async fn effective_policy<S: Store + ?Sized>(
  store: &S,
  tenant_id: &str,
  entity_type: EntityType,
) -> Result<TransitionPolicy, crate::ServiceError> {
  match store.load_policy(tenant_id, entity_type).await? {
    Some(policy) if !policy.is_empty() => Ok(policy.normalized()),
    _ => Ok(entity_type.default_policy()),
  }
}

/// Fresh-read the entity and ask the engine about `target_status`.
pub(crate) async fn decide<S: Store + ?Sized>(
  store: &S,
  registry: &EvaluatorRegistry,
  tenant_id: &str,
  entity_type: EntityType,
  entity_id: &str,
  target_status: &str,
) -> Result<Decision, crate::ServiceError> {
  let policy = effective_policy(store, tenant_id, entity_type).await?;
  let record = store.get_entity(tenant_id, entity_id).await?;
  if record.entity_type != entity_type.as_str() {
    return Err(crate::ServiceError::Validation(format!(
      "entity {entity_id} is not a {entity_type}"
    )));
  }

  let state = record.to_state();
  match request_transition(&state, target_status, &policy, registry) {
    TransitionResult::Accepted { status } => Ok(Decision {
      record,
      accepted: Some(status),
    }),
    TransitionResult::NoOp => Ok(Decision {
      record,
      accepted: None,
    }),
    TransitionResult::Rejected(rejection) => {
      warn!(
        tenant_id,
        entity_id,
        target = target_status,
        %rejection,
        "transition rejected"
      );
      Err(crate::ServiceError::TransitionRejected(rejection))
    }
  }
}

/// Commit an accepted decision: compare-and-swap the status against what was
/// read, append the audit entry, and return the refreshed record.
///
/// A lost race surfaces as `Error::ConcurrentModification`; the caller is
/// expected to re-fetch and re-evaluate, never to force the write.
pub(crate) async fn commit<S: Store + ?Sized>(
  store: &S,
  record: &EntityRecord,
  new_status: &str,
  actor_id: Option<&str>,
  action: &str,
) -> Result<TransitionOutcome, crate::ServiceError> {
  store
    .update_entity_status(&record.tenant_id, &record.id, &record.status, new_status)
    .await?;

  store
    .append_audit(&audit_entry(
      &record.tenant_id,
      actor_id,
      action,
      &record.entity_type,
      &record.id,
      json!({ "from": record.status, "to": new_status }),
    ))
    .await?;

  info!(
    tenant_id = %record.tenant_id,
    entity_id = %record.id,
    from = %record.status,
    to = new_status,
    "status committed"
  );

  let entity = store.get_entity(&record.tenant_id, &record.id).await?;
  Ok(TransitionOutcome {
    entity,
    changed: true,
  })
}

pub(crate) fn audit_entry(
  tenant_id: &str,
  actor_id: Option<&str>,
  action: &str,
  resource_type: &str,
  resource_id: &str,
  detail: serde_json::Value,
) -> AuditEntry {
  AuditEntry {
    id: Uuid::new_v4().to_string(),
    tenant_id: tenant_id.to_string(),
    actor_id: actor_id.map(str::to_string),
    action: action.to_string(),
    resource_type: resource_type.to_string(),
    resource_id: resource_id.to_string(),
    detail: Json(detail),
    created_at: Utc::now(),
  }
}
