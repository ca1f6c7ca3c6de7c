use reqwest::Method;
use serde_json::{json, Value};

use crate::{ApiReq, Error, HttpBackend};

/// # Errors
///
/// Will return any unhandled request errors.
pub async fn act(http: &HttpBackend, user_name: &str) -> Result<(), Error> {
  Request { user_name }.act(http).await
}

struct Request<'a> {
  user_name: &'a str,
}
impl ApiReq for Request<'_> {
  type Output = ();
  // Clearing twice leaves the same empty list.
  const IDEMPOTENT: bool = true;

  fn method(&self) -> Method {
    Method::POST
  }

  fn path(&self) -> String {
    "clear-notifications".to_string()
  }

  fn body(&self) -> Option<Value> {
    Some(json!({ "userName": self.user_name }))
  }

  fn parse(_body: &str) -> Result<Self::Output, Error> {
    Ok(())
  }
}
