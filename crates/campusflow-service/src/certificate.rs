use std::sync::Arc;

use campusflow_engine::EvaluatorRegistry;
use campusflow_policy::EntityType;
use campusflow_store::{EntityRecord, Json, Store};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::reference::reference_number;
use crate::transition::{TransitionOutcome, audit_entry, commit, decide};

/// Intake fields for a new certificate request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCertificateParams {
  pub student_name: String,
  pub certificate_type: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub purpose: Option<String>,
}

/// Service for certificate requests. Entering `issued` assigns the
/// certificate number, exactly once.
pub struct CertificateService<S> {
  store: Arc<S>,
  registry: Arc<EvaluatorRegistry>,
}

impl<S: Store> CertificateService<S> {
  pub fn new(store: Arc<S>, registry: Arc<EvaluatorRegistry>) -> Self {
    Self { store, registry }
  }

  #[instrument(skip(self, params), fields(tenant_id))]
  pub async fn create_request(
    &self,
    tenant_id: &str,
    params: CreateCertificateParams,
    actor_id: Option<&str>,
  ) -> Result<EntityRecord, ServiceError> {
    if params.student_name.trim().is_empty() {
      return Err(ServiceError::Validation(
        "student_name is required".to_string(),
      ));
    }
    if params.certificate_type.trim().is_empty() {
      return Err(ServiceError::Validation(
        "certificate_type is required".to_string(),
      ));
    }

    let now = Utc::now();
    let record = EntityRecord {
      id: Uuid::new_v4().to_string(),
      tenant_id: tenant_id.to_string(),
      entity_type: EntityType::CertificateRequest.as_str().to_string(),
      status: EntityType::CertificateRequest.initial_status().to_string(),
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
        "CREATE_CERTIFICATE_REQUEST",
        EntityType::CertificateRequest.as_str(),
        &record.id,
        json!({ "certificate_type": params.certificate_type }),
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
        .list_entities(tenant_id, EntityType::CertificateRequest, status)
        .await?,
    )
  }

  #[instrument(skip(self), fields(tenant_id, request_id, target_status))]
  pub async fn set_status(
    &self,
    tenant_id: &str,
    request_id: &str,
    target_status: &str,
    actor_id: Option<&str>,
  ) -> Result<TransitionOutcome, ServiceError> {
    let decision = decide(
      self.store.as_ref(),
      &self.registry,
      tenant_id,
      EntityType::CertificateRequest,
      request_id,
      target_status,
    )
    .await?;

    let Some(new_status) = decision.accepted else {
      return Ok(TransitionOutcome {
        entity: decision.record,
        changed: false,
      });
    };

    // Issuing assigns the certificate number. The store only writes when no
    // number exists, so a retried issue keeps the original number.
    if new_status == "issued" && decision.record.reference_number.is_none() {
      let number = reference_number("CERT", Utc::now());
      if self
        .store
        .assign_reference_number(tenant_id, request_id, &number)
        .await?
      {
        info!(tenant_id, request_id, certificate_number = %number, "certificate number assigned");
        self
          .store
          .append_audit(&audit_entry(
            tenant_id,
            actor_id,
            "ISSUE_CERTIFICATE",
            EntityType::CertificateRequest.as_str(),
            request_id,
            json!({ "certificate_number": number }),
          ))
          .await?;
      }
    }

    commit(
      self.store.as_ref(),
      &decision.record,
      &new_status,
      actor_id,
      "UPDATE_CERTIFICATE_STATUS",
    )
    .await
  }
}
