use reqwest::Method;
use types::Notification;

use crate::{ApiReq, Error, HttpBackend};

/// # Errors
///
/// Will return any unhandled request errors.
pub async fn act(http: &HttpBackend, user_name: &str) -> Result<Vec<Notification>, Error> {
  Request { user_name }.act(http).await
}

struct Request<'a> {
  user_name: &'a str,
}
impl ApiReq for Request<'_> {
  type Output = Vec<Notification>;
  const IDEMPOTENT: bool = true;

  fn method(&self) -> Method {
    Method::GET
  }

  fn path(&self) -> String {
    format!("notifications/{}", crate::segment(self.user_name))
  }

  fn parse(body: &str) -> Result<Self::Output, Error> {
    crate::decode_json(body)
  }
}
