use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of a transition request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionResult {
  /// The transition is legal and all preconditions hold. `status` is the
  /// normalized target the caller should commit.
  Accepted { status: String },
  /// Target equals the current status. Success with zero side effects.
  NoOp,
  /// The transition was refused; the reason is surfaced verbatim.
  Rejected(Rejection),
}

/// Why a transition was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
  #[error("status transition not allowed: {from} -> {to}")]
  IllegalTransition { from: String, to: String },

  /// Every unmet precondition is listed, not just the first, so the caller
  /// can present a complete remediation list.
  #[error("missing preconditions for {status}: {}", missing.join(", "))]
  PreconditionFailed { status: String, missing: Vec<String> },
}
