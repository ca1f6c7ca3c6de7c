use reqwest::Method;
use serde_json::Value;
use types::{ListKey, ListKind};

use crate::{envelope, ApiReq, Error, HttpBackend, Page};

/// One page of followers, following, posts, featured-on or search results.
///
/// # Errors
///
/// Will return any unhandled request errors, or `InvalidServerResult` when
/// the envelope cannot be normalized.
pub async fn act(
  http: &HttpBackend,
  key: &ListKey,
  page: usize,
  size: usize,
) -> Result<Page<Value>, Error> {
  Request { key, page, size }.act(http).await
}

struct Request<'a> {
  key: &'a ListKey,
  page: usize,
  size: usize,
}
impl ApiReq for Request<'_> {
  type Output = Page<Value>;
  const IDEMPOTENT: bool = true;

  fn method(&self) -> Method {
    Method::GET
  }

  fn path(&self) -> String {
    let resource = match self.key.kind {
      ListKind::Followers => "followers",
      ListKind::Following => "following",
      ListKind::Posts => "posts",
      ListKind::FeaturedOn => "featured-on",
      ListKind::Search => "search",
    };
    format!("{resource}/{}", crate::segment(&self.key.owner))
  }

  fn query(&self) -> Vec<(&'static str, String)> {
    vec![("page", self.page.to_string()), ("size", self.size.to_string())]
  }

  fn parse(body: &str) -> Result<Self::Output, Error> {
    envelope::normalize(body)
  }
}
