use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PolicyError;

/// Canonical form of a status key: trimmed and lower-cased.
pub fn normalize_status_key(raw: &str) -> String {
  raw.trim().to_lowercase()
}

/// Per-tenant, per-entity-type transition configuration.
///
/// `allowed_transitions` maps a status to the statuses directly reachable from
/// it. `required_preconditions` maps a status to the precondition ids (e.g.
/// `doc:id_proof`, `fee:paid`) that must hold before a record may enter it.
///
/// A status with an empty or absent `allowed_transitions` entry places no
/// restriction of its own: any status known to the policy is reachable from
/// it. Terminality is therefore a property of the saved policy, not of the
/// types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPolicy {
  #[serde(default)]
  pub allowed_transitions: BTreeMap<String, Vec<String>>,
  #[serde(default)]
  pub required_preconditions: BTreeMap<String, Vec<String>>,
}

impl TransitionPolicy {
  /// Build a policy from static transition pairs. Used for built-in defaults.
  pub fn from_pairs(transitions: &[(&str, &[&str])]) -> Self {
    let allowed_transitions = transitions
      .iter()
      .map(|(from, to)| {
        (
          (*from).to_string(),
          to.iter().map(|s| (*s).to_string()).collect(),
        )
      })
      .collect();

    Self {
      allowed_transitions,
      required_preconditions: BTreeMap::new(),
    }
  }

  /// Parse a policy out of an untyped JSON payload, rejecting anything that
  /// is not a map of string to list of strings for both fields.
  ///
  /// The result is already normalized; a failed parse leaves nothing behind
  /// to persist.
  pub fn from_value(value: &Value) -> Result<Self, PolicyError> {
    let object = value.as_object().ok_or(PolicyError::NotAnObject)?;

    let allowed_transitions = parse_string_list_map(object, "allowed_transitions")?;
    let required_preconditions = parse_string_list_map(object, "required_preconditions")?;

    Ok(
      Self {
        allowed_transitions,
        required_preconditions,
      }
      .normalized(),
    )
  }

  /// Canonicalize every key and value: trim, lower-case, drop empties, and
  /// deduplicate case-insensitively while preserving first-seen order.
  pub fn normalized(&self) -> Self {
    Self {
      allowed_transitions: normalize_map(&self.allowed_transitions),
      required_preconditions: normalize_map(&self.required_preconditions),
    }
  }

  /// Every status the policy knows about: transition sources, transition
  /// targets, and precondition map keys.
  pub fn known_statuses(&self) -> BTreeSet<String> {
    let mut statuses = BTreeSet::new();
    for (from, to) in &self.allowed_transitions {
      statuses.insert(normalize_status_key(from));
      for target in to {
        statuses.insert(normalize_status_key(target));
      }
    }
    for status in self.required_preconditions.keys() {
      statuses.insert(normalize_status_key(status));
    }
    statuses
  }

  /// Precondition ids required before entering `status`.
  pub fn preconditions_for(&self, status: &str) -> &[String] {
    self
      .required_preconditions
      .get(status)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  pub fn is_empty(&self) -> bool {
    self.allowed_transitions.is_empty() && self.required_preconditions.is_empty()
  }
}

fn normalize_map(input: &BTreeMap<String, Vec<String>>) -> BTreeMap<String, Vec<String>> {
  let mut out = BTreeMap::new();
  for (key, values) in input {
    let key = normalize_status_key(key);
    if key.is_empty() {
      continue;
    }

    let mut seen = BTreeSet::new();
    let mut uniq = Vec::with_capacity(values.len());
    for value in values {
      let value = normalize_status_key(value);
      if value.is_empty() || !seen.insert(value.clone()) {
        continue;
      }
      uniq.push(value);
    }
    out.insert(key, uniq);
  }
  out
}

fn parse_string_list_map(
  object: &serde_json::Map<String, Value>,
  field: &'static str,
) -> Result<BTreeMap<String, Vec<String>>, PolicyError> {
  let Some(raw) = object.get(field) else {
    return Ok(BTreeMap::new());
  };

  let map = raw
    .as_object()
    .ok_or(PolicyError::InvalidShape { field })?;

  let mut out = BTreeMap::new();
  for (key, values) in map {
    let list = values
      .as_array()
      .ok_or(PolicyError::InvalidShape { field })?;
    let mut items = Vec::with_capacity(list.len());
    for item in list {
      let text = item
        .as_str()
        .ok_or(PolicyError::InvalidShape { field })?;
      items.push(text.to_string());
    }
    out.insert(key.clone(), items);
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_normalize_trims_lowercases_and_dedups() {
    let mut allowed = BTreeMap::new();
    allowed.insert(
      " Submitted ".to_string(),
      vec![
        "Review".to_string(),
        " review".to_string(),
        "DECLINED".to_string(),
        "".to_string(),
      ],
    );
    let policy = TransitionPolicy {
      allowed_transitions: allowed,
      required_preconditions: BTreeMap::new(),
    }
    .normalized();

    assert_eq!(
      policy.allowed_transitions.get("submitted").unwrap(),
      &vec!["review".to_string(), "declined".to_string()]
    );
  }

  #[test]
  fn test_normalize_drops_empty_keys() {
    let mut allowed = BTreeMap::new();
    allowed.insert("   ".to_string(), vec!["review".to_string()]);
    let policy = TransitionPolicy {
      allowed_transitions: allowed,
      required_preconditions: BTreeMap::new(),
    }
    .normalized();

    assert!(policy.allowed_transitions.is_empty());
  }

  #[test]
  fn test_from_value_round_trip_is_casing_invariant() {
    let first = TransitionPolicy::from_value(&json!({
      "allowed_transitions": { "Submitted": ["Review", "Declined"] },
      "required_preconditions": { "Review": ["doc:ID_Proof"] }
    }))
    .unwrap();
    let second = TransitionPolicy::from_value(&json!({
      "allowed_transitions": { " submitted ": ["review", "declined", "REVIEW"] },
      "required_preconditions": { "review": ["doc:id_proof"] }
    }))
    .unwrap();

    assert_eq!(first, second);
  }

  #[test]
  fn test_from_value_rejects_non_object() {
    assert_eq!(
      TransitionPolicy::from_value(&json!([1, 2])),
      Err(PolicyError::NotAnObject)
    );
  }

  #[test]
  fn test_from_value_rejects_wrong_shape() {
    let result = TransitionPolicy::from_value(&json!({
      "allowed_transitions": { "submitted": "review" }
    }));
    assert_eq!(
      result,
      Err(PolicyError::InvalidShape {
        field: "allowed_transitions"
      })
    );

    let result = TransitionPolicy::from_value(&json!({
      "required_preconditions": { "review": [1, 2] }
    }));
    assert_eq!(
      result,
      Err(PolicyError::InvalidShape {
        field: "required_preconditions"
      })
    );
  }

  #[test]
  fn test_from_value_missing_fields_default_to_empty() {
    let policy = TransitionPolicy::from_value(&json!({})).unwrap();
    assert!(policy.is_empty());
  }

  #[test]
  fn test_known_statuses_covers_sources_targets_and_precondition_keys() {
    let policy = TransitionPolicy::from_value(&json!({
      "allowed_transitions": { "submitted": ["review"] },
      "required_preconditions": { "offered": ["fee:paid"] }
    }))
    .unwrap();

    let known = policy.known_statuses();
    assert!(known.contains("submitted"));
    assert!(known.contains("review"));
    assert!(known.contains("offered"));
    assert_eq!(known.len(), 3);
  }

  #[test]
  fn test_serde_round_trip() {
    let policy = TransitionPolicy::from_value(&json!({
      "allowed_transitions": { "submitted": ["review", "declined"] },
      "required_preconditions": { "review": ["doc:id_proof"] }
    }))
    .unwrap();

    let text = serde_json::to_string(&policy).unwrap();
    let back: TransitionPolicy = serde_json::from_str(&text).unwrap();
    assert_eq!(policy, back);
  }
}
