use std::sync::Arc;

use campusflow_engine::EvaluatorRegistry;
use campusflow_policy::EntityType;
use campusflow_store::{EntityRecord, Json, Store};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::transition::{TransitionOutcome, audit_entry, commit, decide};

/// Intake fields for a new platform incident.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateIncidentParams {
  pub title: String,
  /// `minor`, `major`, or `critical`. Defaults to `minor`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub severity: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub scope: Option<String>,
}

/// Service for platform incidents (status page entries).
pub struct IncidentService<S> {
  store: Arc<S>,
  registry: Arc<EvaluatorRegistry>,
}

impl<S: Store> IncidentService<S> {
  pub fn new(store: Arc<S>, registry: Arc<EvaluatorRegistry>) -> Self {
    Self { store, registry }
  }

  #[instrument(skip(self, params), fields(tenant_id))]
  pub async fn create(
    &self,
    tenant_id: &str,
    params: CreateIncidentParams,
    actor_id: Option<&str>,
  ) -> Result<EntityRecord, ServiceError> {
    if params.title.trim().is_empty() {
      return Err(ServiceError::Validation("title is required".to_string()));
    }
    let severity = normalize_severity(params.severity.as_deref())?;

    let now = Utc::now();
    let record = EntityRecord {
      id: Uuid::new_v4().to_string(),
      tenant_id: tenant_id.to_string(),
      entity_type: EntityType::PlatformIncident.as_str().to_string(),
      status: EntityType::PlatformIncident.initial_status().to_string(),
      reference_number: None,
      payload: Json(json!({
        "title": params.title,
        "severity": severity,
        "scope": params.scope,
      })),
      documents: Json(vec![]),
      processing_fee_status: None,
      processing_fee_amount: None,
      payment_reference: None,
      created_at: now,
      updated_at: now,
    };
    self.store.create_entity(&record).await?;

    self
      .store
      .append_audit(&audit_entry(
        tenant_id,
        actor_id,
        "CREATE_INCIDENT",
        EntityType::PlatformIncident.as_str(),
        &record.id,
        json!({ "title": params.title, "severity": severity }),
      ))
      .await?;

    Ok(record)
  }

  pub async fn list(
    &self,
    tenant_id: &str,
    status: Option<&str>,
  ) -> Result<Vec<EntityRecord>, ServiceError> {
    Ok(
      self
        .store
        .list_entities(tenant_id, EntityType::PlatformIncident, status)
        .await?,
    )
  }

  #[instrument(skip(self), fields(tenant_id, incident_id, target_status))]
  pub async fn set_status(
    &self,
    tenant_id: &str,
    incident_id: &str,
    target_status: &str,
    actor_id: Option<&str>,
  ) -> Result<TransitionOutcome, ServiceError> {
    let decision = decide(
      self.store.as_ref(),
      &self.registry,
      tenant_id,
      EntityType::PlatformIncident,
      incident_id,
      target_status,
    )
    .await?;

    let Some(new_status) = decision.accepted else {
      return Ok(TransitionOutcome {
        entity: decision.record,
        changed: false,
      });
    };

    commit(
      self.store.as_ref(),
      &decision.record,
      &new_status,
      actor_id,
      "UPDATE_INCIDENT_STATUS",
    )
    .await
  }
}

fn normalize_severity(raw: Option<&str>) -> Result<String, ServiceError> {
  let severity = raw.unwrap_or("").trim().to_lowercase();
  if severity.is_empty() {
    return Ok("minor".to_string());
  }
  match severity.as_str() {
    "minor" | "major" | "critical" => Ok(severity),
    other => Err(ServiceError::Validation(format!(
      "unknown severity: {other}"
    ))),
  }
}
