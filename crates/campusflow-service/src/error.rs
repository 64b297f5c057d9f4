use campusflow_engine::Rejection;
use campusflow_policy::PolicyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
  /// The engine refused the transition. Carried verbatim so the caller can
  /// render the reason (including the full missing-precondition list).
  #[error("transition rejected: {0}")]
  TransitionRejected(Rejection),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error(transparent)]
  Policy(#[from] PolicyError),

  #[error(transparent)]
  Store(#[from] campusflow_store::Error),
}

impl ServiceError {
  /// The structured rejection, when this error is one.
  pub fn rejection(&self) -> Option<&Rejection> {
    match self {
      ServiceError::TransitionRejected(rejection) => Some(rejection),
      _ => None,
    }
  }
}
