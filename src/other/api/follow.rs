use reqwest::Method;

use crate::{ApiReq, Error, HttpBackend};

/// Toggles the viewer's follow of `user_name`.
///
/// The body is plain text (`Followed` / `Unfollowed`) and is returned as is;
/// interpreting it is up to the caller.
///
/// # Errors
///
/// Will return any unhandled request errors.
pub async fn act(http: &HttpBackend, user_name: &str) -> Result<String, Error> {
  Request { user_name }.act(http).await
}

struct Request<'a> {
  user_name: &'a str,
}
impl ApiReq for Request<'_> {
  type Output = String;
  // A toggle is not safe to replay.
  const IDEMPOTENT: bool = false;

  fn method(&self) -> Method {
    Method::POST
  }

  fn path(&self) -> String {
    format!("follow/{}", crate::segment(self.user_name))
  }

  fn parse(body: &str) -> Result<Self::Output, Error> {
    Ok(body.to_string())
  }
}
