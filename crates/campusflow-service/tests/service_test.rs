//! End-to-end tests for the entity services over an in-memory sqlite store.

use std::sync::Arc;

use campusflow_engine::{EvaluatorRegistry, Rejection};
use campusflow_policy::EntityType;
use campusflow_service::{
  AdmissionService, CertificateService, CreateApplicationParams, CreateCertificateParams,
  CreateEnquiryParams, CreateIncidentParams, CreateTicketParams, EnquiryService, IncidentService,
  PolicyService, ServiceError, SupportTicketService,
};
use campusflow_store::{SqliteStore, Store};
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;

struct Harness {
  store: Arc<SqliteStore>,
  registry: Arc<EvaluatorRegistry>,
}

impl Harness {
  async fn new() -> Self {
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .connect("sqlite::memory:")
      .await
      .expect("failed to open in-memory sqlite");
    let store = SqliteStore::new(pool);
    store.migrate().await.expect("migrations failed");
    Self {
      store: Arc::new(store),
      registry: Arc::new(EvaluatorRegistry::builtin()),
    }
  }

  fn enquiries(&self) -> EnquiryService<SqliteStore> {
    EnquiryService::new(self.store.clone(), self.registry.clone())
  }

  fn admissions(&self) -> AdmissionService<SqliteStore> {
    AdmissionService::new(self.store.clone(), self.registry.clone())
  }

  fn certificates(&self) -> CertificateService<SqliteStore> {
    CertificateService::new(self.store.clone(), self.registry.clone())
  }

  fn tickets(&self) -> SupportTicketService<SqliteStore> {
    SupportTicketService::new(self.store.clone(), self.registry.clone())
  }

  fn incidents(&self) -> IncidentService<SqliteStore> {
    IncidentService::new(self.store.clone(), self.registry.clone())
  }

  fn policies(&self) -> PolicyService<SqliteStore> {
    PolicyService::new(self.store.clone())
  }

  async fn application(&self) -> String {
    let enquiry = self
      .enquiries()
      .create(
        "tenant-a",
        CreateEnquiryParams {
          student_name: "Asha Rao".to_string(),
          parent_name: Some("Vikram Rao".to_string()),
          grade_interested: Some("Grade 5".to_string()),
          academic_year: Some("2026-27".to_string()),
          contact_phone: None,
        },
        Some("admin-1"),
      )
      .await
      .unwrap();

    self
      .admissions()
      .create_application(
        "tenant-a",
        CreateApplicationParams {
          enquiry_id: enquiry.id,
          form_data: None,
        },
        Some("admin-1"),
      )
      .await
      .unwrap()
      .id
  }
}

#[tokio::test]
async fn application_inherits_enquiry_fields_and_gets_a_number() {
  let h = Harness::new().await;
  let app_id = h.application().await;

  let app = h.admissions().get("tenant-a", &app_id).await.unwrap();
  assert_eq!(app.status, "submitted");
  assert_eq!(app.payload.0["student_name"], "Asha Rao");
  assert_eq!(app.payload.0["grade_interested"], "Grade 5");
  assert!(app.reference_number.unwrap().starts_with("APP-"));
}

#[tokio::test]
async fn missing_document_blocks_review_until_attached() {
  let h = Harness::new().await;
  h.policies()
    .save(
      "tenant-a",
      EntityType::AdmissionApplication,
      &json!({
        "allowed_transitions": { "submitted": ["review", "declined"] },
        "required_preconditions": { "review": ["doc:id_proof"] }
      }),
      Some("admin-1"),
    )
    .await
    .unwrap();
  let app_id = h.application().await;

  let err = h
    .admissions()
    .set_status("tenant-a", &app_id, "review", Some("admin-1"))
    .await
    .unwrap_err();
  assert_eq!(
    err.rejection(),
    Some(&Rejection::PreconditionFailed {
      status: "review".to_string(),
      missing: vec!["doc:id_proof".to_string()],
    })
  );

  h.admissions()
    .attach_document("tenant-a", &app_id, "id_proof", None, Some("admin-1"))
    .await
    .unwrap();

  let outcome = h
    .admissions()
    .set_status("tenant-a", &app_id, "review", Some("admin-1"))
    .await
    .unwrap();
  assert!(outcome.changed);
  assert_eq!(outcome.entity.status, "review");
}

#[tokio::test]
async fn illegal_transition_is_surfaced_verbatim() {
  let h = Harness::new().await;
  h.policies()
    .save(
      "tenant-a",
      EntityType::AdmissionApplication,
      &json!({
        "allowed_transitions": { "submitted": ["review", "declined"] }
      }),
      Some("admin-1"),
    )
    .await
    .unwrap();
  let app_id = h.application().await;

  let err = h
    .admissions()
    .set_status("tenant-a", &app_id, "admitted", Some("admin-1"))
    .await
    .unwrap_err();
  assert_eq!(
    err.rejection(),
    Some(&Rejection::IllegalTransition {
      from: "submitted".to_string(),
      to: "admitted".to_string(),
    })
  );
}

#[tokio::test]
async fn transition_to_the_current_status_is_a_noop() {
  let h = Harness::new().await;
  let app_id = h.application().await;

  let outcome = h
    .admissions()
    .set_status("tenant-a", &app_id, " Submitted ", Some("admin-1"))
    .await
    .unwrap();
  assert!(!outcome.changed);
  assert_eq!(outcome.entity.status, "submitted");
}

#[tokio::test]
async fn all_missing_preconditions_are_listed_in_one_rejection() {
  let h = Harness::new().await;
  h.policies()
    .save(
      "tenant-a",
      EntityType::AdmissionApplication,
      &json!({
        "allowed_transitions": { "submitted": ["offered"] },
        "required_preconditions": { "offered": ["doc:id_proof", "fee:paid"] }
      }),
      Some("admin-1"),
    )
    .await
    .unwrap();
  let app_id = h.application().await;

  let err = h
    .admissions()
    .set_status("tenant-a", &app_id, "offered", Some("admin-1"))
    .await
    .unwrap_err();
  assert_eq!(
    err.rejection(),
    Some(&Rejection::PreconditionFailed {
      status: "offered".to_string(),
      missing: vec!["doc:id_proof".to_string(), "fee:paid".to_string()],
    })
  );

  // Resolve both and the same request goes through.
  h.admissions()
    .attach_document("tenant-a", &app_id, "id_proof", None, Some("admin-1"))
    .await
    .unwrap();
  h.admissions()
    .record_fee_payment("tenant-a", &app_id, 2500, Some("TXN-1"), Some("admin-1"))
    .await
    .unwrap();

  let outcome = h
    .admissions()
    .set_status("tenant-a", &app_id, "offered", Some("admin-1"))
    .await
    .unwrap();
  assert_eq!(outcome.entity.status, "offered");
}

#[tokio::test]
async fn fee_payment_rejects_non_positive_amounts() {
  let h = Harness::new().await;
  let app_id = h.application().await;

  let err = h
    .admissions()
    .record_fee_payment("tenant-a", &app_id, 0, None, None)
    .await
    .unwrap_err();
  assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn accept_provisions_exactly_one_student() {
  let h = Harness::new().await;
  h.policies()
    .save(
      "tenant-a",
      EntityType::AdmissionApplication,
      &json!({
        "allowed_transitions": { "submitted": ["admitted", "declined"] }
      }),
      Some("admin-1"),
    )
    .await
    .unwrap();
  let app_id = h.application().await;

  let outcome = h
    .admissions()
    .accept("tenant-a", &app_id, "sec-5a", Some("admin-1"))
    .await
    .unwrap();
  assert!(outcome.changed);
  assert_eq!(outcome.entity.status, "admitted");

  let admission_number = outcome.entity.reference_number.clone().unwrap();
  let student = h
    .store
    .find_student("tenant-a", &admission_number)
    .await
    .unwrap()
    .expect("student should be provisioned");
  assert_eq!(student.full_name, "Asha Rao");
  assert_eq!(student.section_id, "sec-5a");

  // Re-running the accepted transition is a no-op and provisions nothing new.
  let again = h
    .admissions()
    .accept("tenant-a", &app_id, "sec-5a", Some("admin-1"))
    .await
    .unwrap();
  assert!(!again.changed);
  let still_there = h
    .store
    .find_student("tenant-a", &admission_number)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(still_there.id, student.id);
}

#[tokio::test]
async fn accept_requires_a_section() {
  let h = Harness::new().await;
  let app_id = h.application().await;

  let err = h
    .admissions()
    .accept("tenant-a", &app_id, "  ", None)
    .await
    .unwrap_err();
  assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn certificate_number_is_assigned_once_on_issue() {
  let h = Harness::new().await;
  let certs = h.certificates();
  let request = certs
    .create_request(
      "tenant-a",
      CreateCertificateParams {
        student_name: "Asha Rao".to_string(),
        certificate_type: "Transfer Certificate".to_string(),
        purpose: None,
      },
      Some("admin-1"),
    )
    .await
    .unwrap();

  // Default policy: requested -> approved -> issued.
  certs
    .set_status("tenant-a", &request.id, "approved", Some("admin-1"))
    .await
    .unwrap();
  let issued = certs
    .set_status("tenant-a", &request.id, "issued", Some("admin-1"))
    .await
    .unwrap();
  let number = issued.entity.reference_number.clone().unwrap();
  assert!(number.starts_with("CERT-"));

  // Issuing again is a no-op; the number does not change.
  let again = certs
    .set_status("tenant-a", &request.id, "issued", Some("admin-1"))
    .await
    .unwrap();
  assert!(!again.changed);
  assert_eq!(again.entity.reference_number.as_deref(), Some(number.as_str()));
}

#[tokio::test]
async fn certificate_cannot_jump_straight_to_issued() {
  let h = Harness::new().await;
  let request = h
    .certificates()
    .create_request(
      "tenant-a",
      CreateCertificateParams {
        student_name: "Asha Rao".to_string(),
        certificate_type: "Bonafide".to_string(),
        purpose: None,
      },
      None,
    )
    .await
    .unwrap();

  let err = h
    .certificates()
    .set_status("tenant-a", &request.id, "issued", None)
    .await
    .unwrap_err();
  assert!(matches!(
    err.rejection(),
    Some(Rejection::IllegalTransition { .. })
  ));
}

#[tokio::test]
async fn ticket_walks_its_default_lifecycle() {
  let h = Harness::new().await;
  let tickets = h.tickets();
  let ticket = tickets
    .create(
      "tenant-a",
      CreateTicketParams {
        subject: "Fee receipt not downloading".to_string(),
        priority: Some("high".to_string()),
        requester: None,
      },
      None,
    )
    .await
    .unwrap();
  assert_eq!(ticket.status, "open");

  for status in ["in_progress", "resolved", "closed"] {
    let outcome = tickets
      .set_status("tenant-a", &ticket.id, status, None)
      .await
      .unwrap();
    assert_eq!(outcome.entity.status, status);
  }
}

#[tokio::test]
async fn incident_lifecycle_and_severity_validation() {
  let h = Harness::new().await;
  let incidents = h.incidents();

  let err = incidents
    .create(
      "tenant-a",
      CreateIncidentParams {
        title: "API latency".to_string(),
        severity: Some("apocalyptic".to_string()),
        scope: None,
      },
      None,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, ServiceError::Validation(_)));

  let incident = incidents
    .create(
      "tenant-a",
      CreateIncidentParams {
        title: "API latency".to_string(),
        severity: None,
        scope: Some("platform".to_string()),
      },
      None,
    )
    .await
    .unwrap();
  assert_eq!(incident.status, "investigating");
  assert_eq!(incident.payload.0["severity"], "minor");

  let outcome = incidents
    .set_status("tenant-a", &incident.id, "identified", None)
    .await
    .unwrap();
  assert_eq!(outcome.entity.status, "identified");
}

#[tokio::test]
async fn malformed_policy_payload_is_rejected_before_persistence() {
  let h = Harness::new().await;
  let err = h
    .policies()
    .save(
      "tenant-a",
      EntityType::SupportTicket,
      &json!({ "allowed_transitions": { "open": "closed" } }),
      None,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, ServiceError::Policy(_)));

  // Nothing was written; the effective policy is still the default.
  let policy = h
    .policies()
    .load("tenant-a", EntityType::SupportTicket)
    .await
    .unwrap();
  assert_eq!(policy, EntityType::SupportTicket.default_policy());
}

#[tokio::test]
async fn saved_policy_is_immediately_effective() {
  let h = Harness::new().await;
  let saved = h
    .policies()
    .save(
      "tenant-a",
      EntityType::SupportTicket,
      &json!({ "allowed_transitions": { "Open": ["Closed"] } }),
      None,
    )
    .await
    .unwrap();
  assert_eq!(saved.allowed_transitions["open"], vec!["closed"]);

  let loaded = h
    .policies()
    .load("tenant-a", EntityType::SupportTicket)
    .await
    .unwrap();
  assert_eq!(loaded, saved);

  // The tighter policy now governs transitions.
  let ticket = h
    .tickets()
    .create(
      "tenant-a",
      CreateTicketParams {
        subject: "Login loop".to_string(),
        priority: None,
        requester: None,
      },
      None,
    )
    .await
    .unwrap();
  let err = h
    .tickets()
    .set_status("tenant-a", &ticket.id, "in_progress", None)
    .await
    .unwrap_err();
  assert!(matches!(
    err.rejection(),
    Some(Rejection::IllegalTransition { .. })
  ));
}

#[tokio::test]
async fn policies_are_scoped_per_tenant() {
  let h = Harness::new().await;
  h.policies()
    .save(
      "tenant-a",
      EntityType::SupportTicket,
      &json!({ "allowed_transitions": { "open": ["closed"] } }),
      None,
    )
    .await
    .unwrap();

  // Another tenant still gets the default.
  let policy = h
    .policies()
    .load("tenant-b", EntityType::SupportTicket)
    .await
    .unwrap();
  assert_eq!(policy, EntityType::SupportTicket.default_policy());
}

#[tokio::test]
async fn document_type_settings_fall_back_to_defaults() {
  let h = Harness::new().await;
  let defaults = h.policies().document_types("tenant-a").await.unwrap();
  assert!(defaults.contains(&"ID Proof".to_string()));

  let saved = h
    .policies()
    .save_document_types(
      "tenant-a",
      &[" Aadhaar Card ".to_string(), "aadhaar card".to_string()],
      None,
    )
    .await
    .unwrap();
  assert_eq!(saved, vec!["Aadhaar Card"]);

  let loaded = h.policies().document_types("tenant-a").await.unwrap();
  assert_eq!(loaded, saved);
}

#[tokio::test]
async fn remove_document_checks_bounds() {
  let h = Harness::new().await;
  let app_id = h.application().await;

  let err = h
    .admissions()
    .remove_document("tenant-a", &app_id, 0, None)
    .await
    .unwrap_err();
  assert!(matches!(err, ServiceError::Validation(_)));

  h.admissions()
    .attach_document("tenant-a", &app_id, "ID Proof", None, None)
    .await
    .unwrap();
  let record = h
    .admissions()
    .remove_document("tenant-a", &app_id, 0, None)
    .await
    .unwrap();
  assert!(record.documents.0.is_empty());
}

#[tokio::test]
async fn audit_trail_records_status_changes() {
  let h = Harness::new().await;
  let app_id = h.application().await;

  h.admissions()
    .set_status("tenant-a", &app_id, "review", None)
    .await
    .unwrap();

  let entries = h.store.list_audit("tenant-a", &app_id).await.unwrap();
  assert!(
    entries
      .iter()
      .any(|e| e.action == "UPDATE_APPLICATION_STATUS")
  );
}
