use campusflow_policy::{TransitionPolicy, normalize_status_key};

use crate::entity::EntityState;
use crate::evaluator::EvaluatorRegistry;
use crate::result::{Rejection, TransitionResult};

/// Decide whether `entity` may move to `target_status` under `policy`.
///
/// The decision is deterministic: identical inputs always produce the same
/// result, which is what makes transitions auditable and replayable.
///
/// Legality rules:
/// - target equal to the current status is a [`TransitionResult::NoOp`];
/// - a non-empty `allowed_transitions` entry for the current status is an
///   exhaustive list of reachable targets;
/// - an empty or absent entry places no restriction of its own, so any
///   status known to the policy is reachable (unconfigured tenants stay
///   usable);
/// - a legal transition is still refused while any required precondition for
///   the target is unmet, and every unmet precondition is reported.
pub fn request_transition(
  entity: &EntityState,
  target_status: &str,
  policy: &TransitionPolicy,
  registry: &EvaluatorRegistry,
) -> TransitionResult {
  let current = normalize_status_key(&entity.status);
  let target = normalize_status_key(target_status);

  if target == current {
    return TransitionResult::NoOp;
  }

  let legal = match policy.allowed_transitions.get(&current) {
    Some(next) if !next.is_empty() => next
      .iter()
      .any(|candidate| normalize_status_key(candidate) == target),
    _ => policy.known_statuses().contains(&target),
  };
  if !legal {
    return TransitionResult::Rejected(Rejection::IllegalTransition {
      from: current,
      to: target,
    });
  }

  let missing: Vec<String> = policy
    .preconditions_for(&target)
    .iter()
    .filter(|id| !registry.evaluate(entity, id))
    .cloned()
    .collect();
  if !missing.is_empty() {
    return TransitionResult::Rejected(Rejection::PreconditionFailed {
      status: target,
      missing,
    });
  }

  TransitionResult::Accepted { status: target }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn policy(value: serde_json::Value) -> TransitionPolicy {
    TransitionPolicy::from_value(&value).unwrap()
  }

  #[test]
  fn test_same_status_is_noop_regardless_of_policy() {
    let registry = EvaluatorRegistry::builtin();
    let entity = EntityState::new("submitted");
    let locked = policy(json!({
      "allowed_transitions": { "submitted": ["declined"] },
      "required_preconditions": { "submitted": ["doc:id_proof"] }
    }));

    assert_eq!(
      request_transition(&entity, "submitted", &locked, &registry),
      TransitionResult::NoOp
    );
    assert_eq!(
      request_transition(&entity, " Submitted ", &TransitionPolicy::default(), &registry),
      TransitionResult::NoOp
    );
  }

  #[test]
  fn test_permissive_fallback_for_unconfigured_source() {
    let registry = EvaluatorRegistry::builtin();
    // "offered" has no entry of its own; any known status is reachable.
    let p = policy(json!({
      "allowed_transitions": { "submitted": ["review", "offered"] }
    }));
    let entity = EntityState::new("offered");

    assert_eq!(
      request_transition(&entity, "review", &p, &registry),
      TransitionResult::Accepted {
        status: "review".to_string()
      }
    );
    // ...but an unknown status is not.
    assert_eq!(
      request_transition(&entity, "archived", &p, &registry),
      TransitionResult::Rejected(Rejection::IllegalTransition {
        from: "offered".to_string(),
        to: "archived".to_string(),
      })
    );
  }
}
