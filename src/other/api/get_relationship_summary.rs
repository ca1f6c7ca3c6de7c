use reqwest::Method;
use types::RelationshipSummaryData;

use crate::{ApiReq, Error, HttpBackend};

/// Counts and follow status of `user_name`, from the viewer's perspective.
///
/// # Errors
///
/// Will return any unhandled request errors.
pub async fn act(http: &HttpBackend, user_name: &str) -> Result<RelationshipSummaryData, Error> {
  Request { user_name }.act(http).await
}

struct Request<'a> {
  user_name: &'a str,
}
impl ApiReq for Request<'_> {
  type Output = RelationshipSummaryData;
  const IDEMPOTENT: bool = true;

  fn method(&self) -> Method {
    Method::GET
  }

  fn path(&self) -> String {
    format!("relationship-summary/{}", crate::segment(self.user_name))
  }

  fn parse(body: &str) -> Result<Self::Output, Error> {
    crate::decode_json(body)
  }
}
