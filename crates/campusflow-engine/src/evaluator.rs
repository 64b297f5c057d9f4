use std::collections::HashMap;

use crate::entity::EntityState;

/// A named boolean fact about an entity, gating entry into a status.
///
/// Implementations must be side-effect free and safe to call repeatedly and
/// concurrently; they are pure reads of the entity snapshot.
pub trait PreconditionEvaluator: Send + Sync {
  fn evaluate(&self, entity: &EntityState, precondition_id: &str) -> bool;
}

/// Registry of evaluators keyed by namespace prefix.
///
/// A precondition id like `doc:id_proof` is routed to the evaluator
/// registered under `doc`. Ids with no matching evaluator are treated as not
/// satisfied (fail-closed): a misconfigured policy blocks the one transition
/// that required it instead of crashing.
pub struct EvaluatorRegistry {
  evaluators: HashMap<String, Box<dyn PreconditionEvaluator>>,
}

impl EvaluatorRegistry {
  pub fn new() -> Self {
    Self {
      evaluators: HashMap::new(),
    }
  }

  /// The built-in evaluator set: `doc:` document presence and `fee:` payment
  /// state. The set of kinds is closed for this system; no dynamic scripting.
  pub fn builtin() -> Self {
    let mut registry = Self::new();
    registry.register("doc", Box::new(DocumentPresenceEvaluator));
    registry.register("fee", Box::new(FeePaidEvaluator));
    registry
  }

  pub fn register(&mut self, prefix: &str, evaluator: Box<dyn PreconditionEvaluator>) {
    self.evaluators.insert(prefix.to_string(), evaluator);
  }

  /// Answer whether `precondition_id` holds for `entity`.
  pub fn evaluate(&self, entity: &EntityState, precondition_id: &str) -> bool {
    let id = precondition_id.trim();
    let prefix = id.split_once(':').map(|(p, _)| p).unwrap_or(id);
    match self.evaluators.get(prefix) {
      Some(evaluator) => evaluator.evaluate(entity, id),
      None => false,
    }
  }
}

impl Default for EvaluatorRegistry {
  fn default() -> Self {
    Self::builtin()
  }
}

/// True iff the entity carries a document whose type matches the id suffix,
/// case-insensitively. `doc:id_proof` matches a document of type `ID Proof`
/// only when the stored type uses the same spelling modulo case; tenants
/// configure both sides, so that is their contract to keep.
pub struct DocumentPresenceEvaluator;

impl PreconditionEvaluator for DocumentPresenceEvaluator {
  fn evaluate(&self, entity: &EntityState, precondition_id: &str) -> bool {
    match precondition_id.split_once(':') {
      Some((_, document_type)) if !document_type.trim().is_empty() => {
        entity.has_document(document_type)
      }
      _ => false,
    }
  }
}

/// True iff the entity's processing fee is marked paid. Only `fee:paid` is a
/// recognized suffix; anything else fails closed.
pub struct FeePaidEvaluator;

impl PreconditionEvaluator for FeePaidEvaluator {
  fn evaluate(&self, entity: &EntityState, precondition_id: &str) -> bool {
    if precondition_id.split_once(':').map(|(_, s)| s.trim()) != Some("paid") {
      return false;
    }
    entity.processing_fee_status.as_deref() == Some("paid")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_document_presence_is_case_insensitive() {
    let registry = EvaluatorRegistry::builtin();
    let entity = EntityState::new("submitted").with_document("ID Proof");

    assert!(registry.evaluate(&entity, "doc:id proof"));
    assert!(registry.evaluate(&entity, "doc:ID PROOF"));
    assert!(!registry.evaluate(&entity, "doc:birth certificate"));
  }

  #[test]
  fn test_fee_paid() {
    let registry = EvaluatorRegistry::builtin();
    let unpaid = EntityState::new("submitted");
    let pending = EntityState::new("submitted").with_fee_status("pending");
    let paid = EntityState::new("submitted").with_fee_status("paid");

    assert!(!registry.evaluate(&unpaid, "fee:paid"));
    assert!(!registry.evaluate(&pending, "fee:paid"));
    assert!(registry.evaluate(&paid, "fee:paid"));
    assert!(!registry.evaluate(&paid, "fee:waived"));
  }

  #[test]
  fn test_unknown_id_fails_closed() {
    let registry = EvaluatorRegistry::builtin();
    let entity = EntityState::new("submitted");

    assert!(!registry.evaluate(&entity, "sms:verified"));
    assert!(!registry.evaluate(&entity, "no-namespace"));
    assert!(!registry.evaluate(&entity, "doc:"));
  }
}
