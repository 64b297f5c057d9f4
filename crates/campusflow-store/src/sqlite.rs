use campusflow_policy::{EntityType, TransitionPolicy};
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::types::Json;

use crate::types::{AuditEntry, DocumentRecord, EntityRecord, StudentRecord};
use crate::{Error, Store};

/// SQLite-based store implementation.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await
  }
}

#[async_trait::async_trait]
impl Store for SqliteStore {
  async fn load_policy(
    &self,
    tenant_id: &str,
    entity_type: EntityType,
  ) -> Result<Option<TransitionPolicy>, Error> {
    let row: Option<(String,)> = sqlx::query_as(
      r#"
            SELECT policy
            FROM tenant_policies
            WHERE tenant_id = ? AND entity_type = ?
            "#,
    )
    .bind(tenant_id)
    .bind(entity_type.as_str())
    .fetch_optional(&self.pool)
    .await?;

    match row {
      Some((text,)) => Ok(Some(serde_json::from_str(&text)?)),
      None => Ok(None),
    }
  }

  async fn save_policy(
    &self,
    tenant_id: &str,
    entity_type: EntityType,
    policy: &TransitionPolicy,
  ) -> Result<(), Error> {
    let text = serde_json::to_string(policy)?;
    sqlx::query(
      r#"
            INSERT INTO tenant_policies (tenant_id, entity_type, policy, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (tenant_id, entity_type) DO UPDATE SET
              policy = excluded.policy,
              updated_at = excluded.updated_at
            "#,
    )
    .bind(tenant_id)
    .bind(entity_type.as_str())
    .bind(&text)
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn load_document_types(&self, tenant_id: &str) -> Result<Option<Vec<String>>, Error> {
    let row: Option<(String,)> = sqlx::query_as(
      r#"
            SELECT document_types
            FROM tenant_document_types
            WHERE tenant_id = ?
            "#,
    )
    .bind(tenant_id)
    .fetch_optional(&self.pool)
    .await?;

    match row {
      Some((text,)) => Ok(Some(serde_json::from_str(&text)?)),
      None => Ok(None),
    }
  }

  async fn save_document_types(
    &self,
    tenant_id: &str,
    document_types: &[String],
  ) -> Result<(), Error> {
    let text = serde_json::to_string(document_types)?;
    sqlx::query(
      r#"
            INSERT INTO tenant_document_types (tenant_id, document_types, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (tenant_id) DO UPDATE SET
              document_types = excluded.document_types,
              updated_at = excluded.updated_at
            "#,
    )
    .bind(tenant_id)
    .bind(&text)
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn create_entity(&self, record: &EntityRecord) -> Result<(), Error> {
    sqlx::query(
            r#"
            INSERT INTO entities (id, tenant_id, entity_type, status, reference_number, payload, documents,
                                  processing_fee_status, processing_fee_amount, payment_reference, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.tenant_id)
        .bind(&record.entity_type)
        .bind(&record.status)
        .bind(&record.reference_number)
        .bind(&record.payload)
        .bind(&record.documents)
        .bind(&record.processing_fee_status)
        .bind(record.processing_fee_amount)
        .bind(&record.payment_reference)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

    Ok(())
  }

  async fn get_entity(&self, tenant_id: &str, entity_id: &str) -> Result<EntityRecord, Error> {
    sqlx::query_as(
            r#"
            SELECT id, tenant_id, entity_type, status, reference_number, payload, documents,
                   processing_fee_status, processing_fee_amount, payment_reference, created_at, updated_at
            FROM entities
            WHERE id = ? AND tenant_id = ?
            "#,
        )
        .bind(entity_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("entity {entity_id}")))
  }

  async fn list_entities(
    &self,
    tenant_id: &str,
    entity_type: EntityType,
    status: Option<&str>,
  ) -> Result<Vec<EntityRecord>, Error> {
    let rows = sqlx::query_as(
            r#"
            SELECT id, tenant_id, entity_type, status, reference_number, payload, documents,
                   processing_fee_status, processing_fee_amount, payment_reference, created_at, updated_at
            FROM entities
            WHERE tenant_id = ? AND entity_type = ? AND (? IS NULL OR status = ?)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(entity_type.as_str())
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

    Ok(rows)
  }

  async fn update_entity_status(
    &self,
    tenant_id: &str,
    entity_id: &str,
    expected_status: &str,
    new_status: &str,
  ) -> Result<(), Error> {
    let result = sqlx::query(
      r#"
            UPDATE entities
            SET status = ?, updated_at = ?
            WHERE id = ? AND tenant_id = ? AND status = ?
            "#,
    )
    .bind(new_status)
    .bind(Utc::now())
    .bind(entity_id)
    .bind(tenant_id)
    .bind(expected_status)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      // Zero rows is either a stale expected status or a missing row.
      let exists: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM entities WHERE id = ? AND tenant_id = ?")
          .bind(entity_id)
          .bind(tenant_id)
          .fetch_optional(&self.pool)
          .await?;
      return match exists {
        Some(_) => Err(Error::ConcurrentModification),
        None => Err(Error::NotFound(format!("entity {entity_id}"))),
      };
    }

    Ok(())
  }

  async fn update_entity_documents(
    &self,
    tenant_id: &str,
    entity_id: &str,
    documents: &[DocumentRecord],
  ) -> Result<(), Error> {
    let result = sqlx::query(
      r#"
            UPDATE entities
            SET documents = ?, updated_at = ?
            WHERE id = ? AND tenant_id = ?
            "#,
    )
    .bind(Json(documents.to_vec()))
    .bind(Utc::now())
    .bind(entity_id)
    .bind(tenant_id)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      return Err(Error::NotFound(format!("entity {entity_id}")));
    }
    Ok(())
  }

  async fn update_entity_fee(
    &self,
    tenant_id: &str,
    entity_id: &str,
    amount: i64,
    payment_reference: Option<&str>,
  ) -> Result<(), Error> {
    let result = sqlx::query(
      r#"
            UPDATE entities
            SET processing_fee_status = 'paid', processing_fee_amount = ?, payment_reference = ?, updated_at = ?
            WHERE id = ? AND tenant_id = ?
            "#,
    )
    .bind(amount)
    .bind(payment_reference)
    .bind(Utc::now())
    .bind(entity_id)
    .bind(tenant_id)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      return Err(Error::NotFound(format!("entity {entity_id}")));
    }
    Ok(())
  }

  async fn assign_reference_number(
    &self,
    tenant_id: &str,
    entity_id: &str,
    reference_number: &str,
  ) -> Result<bool, Error> {
    let result = sqlx::query(
      r#"
            UPDATE entities
            SET reference_number = ?, updated_at = ?
            WHERE id = ? AND tenant_id = ? AND reference_number IS NULL
            "#,
    )
    .bind(reference_number)
    .bind(Utc::now())
    .bind(entity_id)
    .bind(tenant_id)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected() == 1)
  }

  async fn create_student(&self, student: &StudentRecord) -> Result<bool, Error> {
    let result = sqlx::query(
      r#"
            INSERT INTO students (id, tenant_id, admission_number, full_name, section_id, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (tenant_id, admission_number) DO NOTHING
            "#,
    )
    .bind(&student.id)
    .bind(&student.tenant_id)
    .bind(&student.admission_number)
    .bind(&student.full_name)
    .bind(&student.section_id)
    .bind(&student.status)
    .bind(student.created_at)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected() == 1)
  }

  async fn find_student(
    &self,
    tenant_id: &str,
    admission_number: &str,
  ) -> Result<Option<StudentRecord>, Error> {
    let row = sqlx::query_as(
      r#"
            SELECT id, tenant_id, admission_number, full_name, section_id, status, created_at
            FROM students
            WHERE tenant_id = ? AND admission_number = ?
            "#,
    )
    .bind(tenant_id)
    .bind(admission_number)
    .fetch_optional(&self.pool)
    .await?;

    Ok(row)
  }

  async fn append_audit(&self, entry: &AuditEntry) -> Result<(), Error> {
    sqlx::query(
            r#"
            INSERT INTO audit_log (id, tenant_id, actor_id, action, resource_type, resource_id, detail, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.tenant_id)
        .bind(&entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(&entry.detail)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

    Ok(())
  }

  async fn list_audit(
    &self,
    tenant_id: &str,
    resource_id: &str,
  ) -> Result<Vec<AuditEntry>, Error> {
    let rows = sqlx::query_as(
      r#"
            SELECT id, tenant_id, actor_id, action, resource_type, resource_id, detail, created_at
            FROM audit_log
            WHERE tenant_id = ? AND resource_id = ?
            ORDER BY created_at DESC
            "#,
    )
    .bind(tenant_id)
    .bind(resource_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(rows)
  }
}
