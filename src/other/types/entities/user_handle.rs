use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::listed::Listed;
use crate::UserName;

/// Read-only snapshot of another account, as embedded in list pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHandle {
  #[serde(default)]
  pub id: u64,
  pub user_name: UserName, // PK
  #[serde(default)]
  pub profile_pic: Option<String>,
  #[serde(default)]
  pub role: Option<String>,
}
impl Listed for UserHandle {
  fn list_id(&self) -> Cow<'_, str> {
    Cow::Borrowed(&self.user_name)
  }

  fn display_name(&self) -> &str {
    &self.user_name
  }
}
