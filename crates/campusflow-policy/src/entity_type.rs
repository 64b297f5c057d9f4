use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::policy::TransitionPolicy;

/// A workflowable record type.
///
/// Each entity type carries its own status vocabulary: a built-in default
/// policy used until a tenant saves one, and the status a newly created
/// record starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
  AdmissionApplication,
  CertificateRequest,
  SupportTicket,
  Enquiry,
  PlatformIncident,
}

impl EntityType {
  pub const ALL: [EntityType; 5] = [
    EntityType::AdmissionApplication,
    EntityType::CertificateRequest,
    EntityType::SupportTicket,
    EntityType::Enquiry,
    EntityType::PlatformIncident,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      EntityType::AdmissionApplication => "admission_application",
      EntityType::CertificateRequest => "certificate_request",
      EntityType::SupportTicket => "support_ticket",
      EntityType::Enquiry => "enquiry",
      EntityType::PlatformIncident => "platform_incident",
    }
  }

  /// The status a newly created record of this type starts in.
  pub fn initial_status(&self) -> &'static str {
    match self {
      EntityType::AdmissionApplication => "submitted",
      EntityType::CertificateRequest => "requested",
      EntityType::SupportTicket => "open",
      EntityType::Enquiry => "open",
      EntityType::PlatformIncident => "investigating",
    }
  }

  /// The built-in policy used for tenants that have not saved one.
  ///
  /// Default policies carry no preconditions, so any transition along the
  /// default sequence succeeds out of the box.
  pub fn default_policy(&self) -> TransitionPolicy {
    let transitions: &[(&str, &[&str])] = match self {
      EntityType::AdmissionApplication => &[
        ("submitted", &["review", "declined"]),
        ("review", &["assessment", "offered", "declined"]),
        ("assessment", &["offered", "declined"]),
        ("offered", &["admitted", "declined"]),
        ("admitted", &[]),
        ("declined", &[]),
      ],
      EntityType::CertificateRequest => &[
        ("requested", &["approved", "rejected"]),
        ("approved", &["issued", "rejected"]),
        ("issued", &[]),
        ("rejected", &[]),
      ],
      EntityType::SupportTicket => &[
        ("open", &["in_progress", "resolved", "closed"]),
        ("in_progress", &["resolved", "closed"]),
        ("resolved", &["closed", "open"]),
        ("closed", &[]),
      ],
      EntityType::Enquiry => &[
        (
          "open",
          &["contacted", "interview_scheduled", "converted", "rejected"],
        ),
        (
          "contacted",
          &["interview_scheduled", "converted", "rejected"],
        ),
        ("interview_scheduled", &["converted", "rejected"]),
        ("converted", &[]),
        ("rejected", &[]),
      ],
      EntityType::PlatformIncident => &[
        ("investigating", &["identified", "monitoring", "resolved"]),
        ("identified", &["monitoring", "resolved"]),
        ("monitoring", &["resolved", "investigating"]),
        ("resolved", &[]),
      ],
    };

    TransitionPolicy::from_pairs(transitions)
  }
}

impl fmt::Display for EntityType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for EntityType {
  type Err = PolicyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "admission_application" => Ok(EntityType::AdmissionApplication),
      "certificate_request" => Ok(EntityType::CertificateRequest),
      "support_ticket" => Ok(EntityType::SupportTicket),
      "enquiry" => Ok(EntityType::Enquiry),
      "platform_incident" => Ok(EntityType::PlatformIncident),
      other => Err(PolicyError::UnknownEntityType(other.to_string())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_initial_status_is_known_in_default_policy() {
    for entity_type in EntityType::ALL {
      let policy = entity_type.default_policy();
      assert!(
        policy
          .known_statuses()
          .contains(entity_type.initial_status()),
        "{entity_type}"
      );
    }
  }

  #[test]
  fn test_parse_round_trip() {
    for entity_type in EntityType::ALL {
      assert_eq!(entity_type.as_str().parse::<EntityType>(), Ok(entity_type));
    }
  }

  #[test]
  fn test_parse_unknown() {
    assert_eq!(
      "homework".parse::<EntityType>(),
      Err(PolicyError::UnknownEntityType("homework".to_string()))
    );
  }
}
