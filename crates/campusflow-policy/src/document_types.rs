use crate::error::PolicyError;

/// Document types offered to tenants that have not configured their own list.
pub const DEFAULT_DOCUMENT_TYPES: [&str; 5] = [
  "ID Proof",
  "Birth Certificate",
  "Previous Report Card",
  "Transfer Certificate",
  "Others",
];

/// Normalize an admin-entered document type list: trim each entry, drop
/// empties, deduplicate case-insensitively while keeping the first-seen
/// casing for display. An empty result is rejected.
pub fn normalize_document_types(input: &[String]) -> Result<Vec<String>, PolicyError> {
  let mut seen = std::collections::BTreeSet::new();
  let mut out = Vec::with_capacity(input.len());
  for item in input {
    let trimmed = item.trim();
    if trimmed.is_empty() || !seen.insert(trimmed.to_lowercase()) {
      continue;
    }
    out.push(trimmed.to_string());
  }

  if out.is_empty() {
    return Err(PolicyError::EmptyDocumentTypes);
  }
  Ok(out)
}
