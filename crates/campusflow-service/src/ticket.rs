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

/// Intake fields for a new support ticket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTicketParams {
  pub subject: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub requester: Option<String>,
}

/// Service for support desk tickets. Transitions are purely policy-driven;
/// there is no entity-specific side effect.
pub struct SupportTicketService<S> {
  store: Arc<S>,
  registry: Arc<EvaluatorRegistry>,
}

impl<S: Store> SupportTicketService<S> {
  pub fn new(store: Arc<S>, registry: Arc<EvaluatorRegistry>) -> Self {
    Self { store, registry }
  }

  #[instrument(skip(self, params), fields(tenant_id))]
  pub async fn create(
    &self,
    tenant_id: &str,
    params: CreateTicketParams,
    actor_id: Option<&str>,
  ) -> Result<EntityRecord, ServiceError> {
    if params.subject.trim().is_empty() {
      return Err(ServiceError::Validation("subject is required".to_string()));
    }

    let now = Utc::now();
    let record = EntityRecord {
      id: Uuid::new_v4().to_string(),
      tenant_id: tenant_id.to_string(),
      entity_type: EntityType::SupportTicket.as_str().to_string(),
      status: EntityType::SupportTicket.initial_status().to_string(),
      reference_number: None,
      payload: Json(serde_json::to_value(&params).unwrap_or_else(|_| json!({}))),
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
        "CREATE_SUPPORT_TICKET",
        EntityType::SupportTicket.as_str(),
        &record.id,
        json!({ "subject": params.subject }),
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
        .list_entities(tenant_id, EntityType::SupportTicket, status)
        .await?,
    )
  }

  #[instrument(skip(self), fields(tenant_id, ticket_id, target_status))]
  pub async fn set_status(
    &self,
    tenant_id: &str,
    ticket_id: &str,
    target_status: &str,
    actor_id: Option<&str>,
  ) -> Result<TransitionOutcome, ServiceError> {
    let decision = decide(
      self.store.as_ref(),
      &self.registry,
      tenant_id,
      EntityType::SupportTicket,
      ticket_id,
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
      "UPDATE_TICKET_STATUS",
    )
    .await
  }
}
