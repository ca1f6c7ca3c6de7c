use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{listed::Listed, user_handle::UserHandle};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
  pub id: u64,
  pub title: String,
  #[serde(default)]
  pub caption: Option<String>,
  #[serde(default)]
  pub author: Option<UserHandle>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}
impl Listed for Post {
  fn list_id(&self) -> Cow<'_, str> {
    Cow::Owned(self.id.to_string())
  }

  fn display_name(&self) -> &str {
    &self.title
  }
}
