use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a human-scannable reference number like `APP-20260830-0F12AB`.
pub(crate) fn reference_number(prefix: &str, now: DateTime<Utc>) -> String {
  let suffix: String = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
  format!("{prefix}-{}-{suffix}", now.format("%Y%m%d"))
}
