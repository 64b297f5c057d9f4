use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
  #[error("policy field `{field}` must be a map of status to a list of strings")]
  InvalidShape { field: &'static str },

  #[error("policy payload must be a JSON object")]
  NotAnObject,

  #[error("unknown entity type: {0}")]
  UnknownEntityType(String),

  #[error("at least one document type is required")]
  EmptyDocumentTypes,
}
