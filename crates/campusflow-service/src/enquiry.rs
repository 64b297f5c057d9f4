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

/// Intake fields for a new admission enquiry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEnquiryParams {
  pub student_name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parent_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub grade_interested: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub academic_year: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub contact_phone: Option<String>,
}

/// Service for the admission enquiry pipeline.
pub struct EnquiryService<S> {
  store: Arc<S>,
  registry: Arc<EvaluatorRegistry>,
}

impl<S: Store> EnquiryService<S> {
  pub fn new(store: Arc<S>, registry: Arc<EvaluatorRegistry>) -> Self {
    Self { store, registry }
  }

  #[instrument(skip(self, params), fields(tenant_id))]
  pub async fn create(
    &self,
    tenant_id: &str,
    params: CreateEnquiryParams,
    actor_id: Option<&str>,
  ) -> Result<EntityRecord, ServiceError> {
    if params.student_name.trim().is_empty() {
      return Err(ServiceError::Validation(
        "student_name is required".to_string(),
      ));
    }

    let now = Utc::now();
    let record = EntityRecord {
      id: Uuid::new_v4().to_string(),
      tenant_id: tenant_id.to_string(),
      entity_type: EntityType::Enquiry.as_str().to_string(),
      status: EntityType::Enquiry.initial_status().to_string(),
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
        "CREATE_ENQUIRY",
        EntityType::Enquiry.as_str(),
        &record.id,
        json!({ "student_name": params.student_name }),
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
        .list_entities(tenant_id, EntityType::Enquiry, status)
        .await?,
    )
  }

  #[instrument(skip(self), fields(tenant_id, enquiry_id, target_status))]
  pub async fn set_status(
    &self,
    tenant_id: &str,
    enquiry_id: &str,
    target_status: &str,
    actor_id: Option<&str>,
  ) -> Result<TransitionOutcome, ServiceError> {
    let decision = decide(
      self.store.as_ref(),
      &self.registry,
      tenant_id,
      EntityType::Enquiry,
      enquiry_id,
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
      "UPDATE_ENQUIRY_STATUS",
    )
    .await
  }
}
