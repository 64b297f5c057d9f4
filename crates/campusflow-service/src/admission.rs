use std::sync::Arc;

use campusflow_engine::EvaluatorRegistry;
use campusflow_policy::EntityType;
use campusflow_store::{DocumentRecord, EntityRecord, Json, Store, StudentRecord};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::reference::reference_number;
use crate::transition::{TransitionOutcome, audit_entry, commit, decide};

/// Fields for creating an application out of an enquiry. Anything left unset
/// is inherited from the enquiry's intake payload.
#[derive(Debug, Clone, Default)]
pub struct CreateApplicationParams {
  pub enquiry_id: String,
  /// Extra form data merged into the application payload.
  pub form_data: Option<Value>,
}

/// Service for admission applications: intake, documents, fee payment,
/// status transitions, and the admit side effect (student provisioning).
pub struct AdmissionService<S> {
  store: Arc<S>,
  registry: Arc<EvaluatorRegistry>,
}

impl<S: Store> AdmissionService<S> {
  pub fn new(store: Arc<S>, registry: Arc<EvaluatorRegistry>) -> Self {
    Self { store, registry }
  }

  #[instrument(skip(self, params), fields(tenant_id, enquiry_id = %params.enquiry_id))]
  pub async fn create_application(
    &self,
    tenant_id: &str,
    params: CreateApplicationParams,
    actor_id: Option<&str>,
  ) -> Result<EntityRecord, ServiceError> {
    if params.enquiry_id.trim().is_empty() {
      return Err(ServiceError::Validation(
        "enquiry_id is required".to_string(),
      ));
    }

    let enquiry = self
      .store
      .get_entity(tenant_id, params.enquiry_id.trim())
      .await?;
    if enquiry.entity_type != EntityType::Enquiry.as_str() {
      return Err(ServiceError::Validation(format!(
        "entity {} is not an enquiry",
        params.enquiry_id
      )));
    }

    let mut form = match params.form_data {
      Some(Value::Object(map)) => map,
      Some(Value::Null) | None => serde_json::Map::new(),
      Some(_) => {
        return Err(ServiceError::Validation(
          "form_data must be a JSON object".to_string(),
        ));
      }
    };
    // Inherit intake fields the form did not override.
    for field in [
      "student_name",
      "parent_name",
      "grade_interested",
      "academic_year",
    ] {
      if !form.contains_key(field)
        && let Some(value) = enquiry.payload.0.get(field)
      {
        form.insert(field.to_string(), value.clone());
      }
    }
    form.insert("enquiry_id".to_string(), json!(enquiry.id));

    let now = Utc::now();
    let record = EntityRecord {
      id: Uuid::new_v4().to_string(),
      tenant_id: tenant_id.to_string(),
      entity_type: EntityType::AdmissionApplication.as_str().to_string(),
      status: EntityType::AdmissionApplication.initial_status().to_string(),
      reference_number: Some(reference_number("APP", now)),
      payload: Json(Value::Object(form)),
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
        "CREATE_APPLICATION",
        EntityType::AdmissionApplication.as_str(),
        &record.id,
        json!({ "enquiry_id": enquiry.id, "application_number": record.reference_number }),
      ))
      .await?;

    Ok(record)
  }

  pub async fn get(
    &self,
    tenant_id: &str,
    application_id: &str,
  ) -> Result<EntityRecord, ServiceError> {
    let record = self.store.get_entity(tenant_id, application_id).await?;
    if record.entity_type != EntityType::AdmissionApplication.as_str() {
      return Err(ServiceError::Validation(format!(
        "entity {application_id} is not an admission application"
      )));
    }
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
        .list_entities(tenant_id, EntityType::AdmissionApplication, status)
        .await?,
    )
  }

  #[instrument(skip(self, url), fields(tenant_id, application_id, document_type))]
  pub async fn attach_document(
    &self,
    tenant_id: &str,
    application_id: &str,
    document_type: &str,
    url: Option<&str>,
    actor_id: Option<&str>,
  ) -> Result<EntityRecord, ServiceError> {
    let document_type = document_type.trim();
    if document_type.is_empty() {
      return Err(ServiceError::Validation(
        "document type is required".to_string(),
      ));
    }

    let record = self.get(tenant_id, application_id).await?;
    let mut documents = record.documents.0.clone();
    documents.push(DocumentRecord {
      document_type: document_type.to_string(),
      url: url.map(str::to_string),
      attached_at: Utc::now(),
      attached_by: actor_id.map(str::to_string),
    });
    self
      .store
      .update_entity_documents(tenant_id, application_id, &documents)
      .await?;

    self
      .store
      .append_audit(&audit_entry(
        tenant_id,
        actor_id,
        "ATTACH_ADMISSION_DOC",
        EntityType::AdmissionApplication.as_str(),
        application_id,
        json!({ "type": document_type, "url": url }),
      ))
      .await?;

    self.get(tenant_id, application_id).await
  }

  #[instrument(skip(self), fields(tenant_id, application_id, index))]
  pub async fn remove_document(
    &self,
    tenant_id: &str,
    application_id: &str,
    index: usize,
    actor_id: Option<&str>,
  ) -> Result<EntityRecord, ServiceError> {
    let record = self.get(tenant_id, application_id).await?;
    let mut documents = record.documents.0.clone();
    if index >= documents.len() {
      return Err(ServiceError::Validation(
        "document index out of range".to_string(),
      ));
    }
    let removed = documents.remove(index);
    self
      .store
      .update_entity_documents(tenant_id, application_id, &documents)
      .await?;

    self
      .store
      .append_audit(&audit_entry(
        tenant_id,
        actor_id,
        "REMOVE_ADMISSION_DOC",
        EntityType::AdmissionApplication.as_str(),
        application_id,
        json!({ "removed": removed.document_type, "index": index }),
      ))
      .await?;

    self.get(tenant_id, application_id).await
  }

  #[instrument(skip(self), fields(tenant_id, application_id, amount))]
  pub async fn record_fee_payment(
    &self,
    tenant_id: &str,
    application_id: &str,
    amount: i64,
    payment_reference: Option<&str>,
    actor_id: Option<&str>,
  ) -> Result<EntityRecord, ServiceError> {
    if amount <= 0 {
      return Err(ServiceError::Validation(
        "amount must be greater than zero".to_string(),
      ));
    }

    // Validates the id refers to an application before touching the row.
    self.get(tenant_id, application_id).await?;

    let reference = payment_reference.map(str::trim).filter(|r| !r.is_empty());
    self
      .store
      .update_entity_fee(tenant_id, application_id, amount, reference)
      .await?;

    self
      .store
      .append_audit(&audit_entry(
        tenant_id,
        actor_id,
        "RECORD_FEE_PAYMENT",
        EntityType::AdmissionApplication.as_str(),
        application_id,
        json!({ "amount": amount, "reference": reference }),
      ))
      .await?;

    self.get(tenant_id, application_id).await
  }

  /// Generic policy-driven status change with no extra side effect. Moving
  /// to `admitted` through [`AdmissionService::accept`] is the route that
  /// provisions the student record.
  #[instrument(skip(self), fields(tenant_id, application_id, target_status))]
  pub async fn set_status(
    &self,
    tenant_id: &str,
    application_id: &str,
    target_status: &str,
    actor_id: Option<&str>,
  ) -> Result<TransitionOutcome, ServiceError> {
    let decision = decide(
      self.store.as_ref(),
      &self.registry,
      tenant_id,
      EntityType::AdmissionApplication,
      application_id,
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
      "UPDATE_APPLICATION_STATUS",
    )
    .await
  }

  /// Admit the application: provision the student record, then commit the
  /// `admitted` status through the same engine path as any other transition.
  ///
  /// The side effect runs before the commit and is idempotent (keyed on the
  /// application number), so a retry after a failed commit cannot create a
  /// second student. Re-running against an already admitted application is a
  /// no-op.
  #[instrument(skip(self), fields(tenant_id, application_id, section_id))]
  pub async fn accept(
    &self,
    tenant_id: &str,
    application_id: &str,
    section_id: &str,
    actor_id: Option<&str>,
  ) -> Result<TransitionOutcome, ServiceError> {
    if section_id.trim().is_empty() {
      return Err(ServiceError::Validation("section is required".to_string()));
    }

    let decision = decide(
      self.store.as_ref(),
      &self.registry,
      tenant_id,
      EntityType::AdmissionApplication,
      application_id,
      "admitted",
    )
    .await?;

    let Some(new_status) = decision.accepted else {
      return Ok(TransitionOutcome {
        entity: decision.record,
        changed: false,
      });
    };

    let record = &decision.record;
    let student_name = record
      .payload
      .0
      .get("student_name")
      .and_then(Value::as_str)
      .map(str::trim)
      .filter(|name| !name.is_empty())
      .ok_or_else(|| {
        ServiceError::Validation("student name missing in application".to_string())
      })?;
    let admission_number = record
      .reference_number
      .clone()
      .unwrap_or_else(|| record.id.clone());

    let student = StudentRecord {
      id: Uuid::new_v4().to_string(),
      tenant_id: tenant_id.to_string(),
      admission_number: admission_number.clone(),
      full_name: student_name.to_string(),
      section_id: section_id.trim().to_string(),
      status: "active".to_string(),
      created_at: Utc::now(),
    };
    if self.store.create_student(&student).await? {
      info!(tenant_id, admission_number = %admission_number, "student provisioned");
      self
        .store
        .append_audit(&audit_entry(
          tenant_id,
          actor_id,
          "PROVISION_STUDENT",
          EntityType::AdmissionApplication.as_str(),
          application_id,
          json!({ "admission_number": admission_number, "section_id": section_id }),
        ))
        .await?;
    }

    commit(
      self.store.as_ref(),
      record,
      &new_status,
      actor_id,
      "UPDATE_APPLICATION_STATUS",
    )
    .await
  }
}
