use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub id: u64,
  pub actor_user_name: String,
  pub action: String,
  pub timestamp: DateTime<Utc>,
}

/// Orders a freshly fetched list newest-first. Ties keep server order.
pub fn newest_first(notifications: &mut [Notification]) {
  notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_camel_case_and_sorts() {
    let mut list: Vec<Notification> = serde_json::from_str(
      r#"[
        {"id": 1, "actorUserName": "ana", "action": "followed you", "timestamp": "2024-01-01T10:00:00Z"},
        {"id": 2, "actorUserName": "bo", "action": "liked your post", "timestamp": "2024-01-02T10:00:00Z"}
      ]"#,
    )
    .unwrap();
    newest_first(&mut list);
    assert_eq!(list[0].id, 2);
    assert_eq!(list[1].actor_user_name, "ana");
  }
}
