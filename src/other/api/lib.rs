use std::{future::Future, sync::Arc, time::Duration};

use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use thiserror::Error as ThisError;
use tokio::time::sleep;
use tracing::{event, Level};
use types::{ListKey, Notification, RelationshipSummaryData};

pub mod clear_notifications;
pub mod envelope;
pub mod follow;
pub mod get_list_page;
pub mod get_notifications;
pub mod get_relationship_summary;

#[cfg(any(test, feature = "fake"))]
pub mod fake;
#[cfg(any(test, feature = "fake"))]
pub use fake::{Call, FakeBackend};

pub use envelope::Page;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// Transport or server failure. Reads may be retried by the caller.
  #[error("Network failure: {0}")]
  Network(String),
  /// The server answered, but with a payload we cannot use.
  #[error("Invalid server result: {0}")]
  InvalidServerResult(String),
}

/// The REST collaborators this layer consumes.
///
/// Implemented by `HttpBackend` for the real service and by `FakeBackend`
/// in tests.
pub trait Backend: Send + Sync + 'static {
  /// `GET relationship-summary/{userName}`
  fn relationship_summary(
    &self,
    user_name: &str,
  ) -> impl Future<Output = Result<RelationshipSummaryData, Error>> + Send;

  /// One page of any paged list, already normalized to a single envelope.
  fn list_page(
    &self,
    key: &ListKey,
    page: usize,
    size: usize,
  ) -> impl Future<Output = Result<Page<Value>, Error>> + Send;

  /// `POST follow/{userName}`. Returns the raw text result.
  fn follow(&self, user_name: &str) -> impl Future<Output = Result<String, Error>> + Send;

  /// `GET notifications/{userName}`
  fn notifications(
    &self,
    user_name: &str,
  ) -> impl Future<Output = Result<Vec<Notification>, Error>> + Send;

  /// `POST clear-notifications`
  fn clear_notifications(&self, user_name: &str) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Reqwest-backed client for the social REST service.
#[derive(Debug, Clone)]
pub struct HttpBackend {
  client: Client,
  base_url: Arc<str>,
  max_retries: u8,
}
impl HttpBackend {
  /// # Errors
  ///
  /// If the HTTP client cannot be built (e.g. TLS backend failure).
  pub fn new(base_url: &str, max_retries: u8) -> Result<Self, Error> {
    let client = Client::builder()
      .build()
      .map_err(|e| Error::Network(e.to_string()))?;
    Ok(Self {
      client,
      base_url: Arc::from(base_url.trim_end_matches('/')),
      max_retries,
    })
  }

  /// Builds a client from `API_BASE_URL` and `API_MAX_RETRIES`.
  ///
  /// # Errors
  ///
  /// If the HTTP client cannot be built.
  pub fn from_env() -> Result<Self, Error> {
    Self::new(*environment::API_BASE_URL, *environment::API_MAX_RETRIES)
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{path}", self.base_url)
  }
}
impl Backend for HttpBackend {
  async fn relationship_summary(&self, user_name: &str) -> Result<RelationshipSummaryData, Error> {
    get_relationship_summary::act(self, user_name).await
  }

  async fn list_page(&self, key: &ListKey, page: usize, size: usize) -> Result<Page<Value>, Error> {
    get_list_page::act(self, key, page, size).await
  }

  async fn follow(&self, user_name: &str) -> Result<String, Error> {
    follow::act(self, user_name).await
  }

  async fn notifications(&self, user_name: &str) -> Result<Vec<Notification>, Error> {
    get_notifications::act(self, user_name).await
  }

  async fn clear_notifications(&self, user_name: &str) -> Result<(), Error> {
    clear_notifications::act(self, user_name).await
  }
}

static RETRY_DELAY: u64 = 250; // 250 Milliseconds, multiplied by the attempt

/// One REST call: where it goes, what it sends, how its body is read.
trait ApiReq {
  type Output;

  /// Only idempotent requests are retried on gateway errors.
  const IDEMPOTENT: bool;

  fn method(&self) -> Method;
  fn path(&self) -> String;
  fn query(&self) -> Vec<(&'static str, String)> {
    Vec::new()
  }
  fn body(&self) -> Option<Value> {
    None
  }
  fn parse(body: &str) -> Result<Self::Output, Error>;

  async fn act(self, http: &HttpBackend) -> Result<Self::Output, Error>
  where
    Self: Sized,
  {
    let mut failed_attempts = 0;
    loop {
      let attempt = self.attempt(http).await;
      match attempt {
        Err(Retry::Transient(reason)) if Self::IDEMPOTENT && failed_attempts < http.max_retries => {
          failed_attempts += 1;
          event!(
            Level::DEBUG,
            "Retrying {} ({failed_attempts}/{}): {reason}",
            self.path(),
            http.max_retries
          );
          sleep(Duration::from_millis(RETRY_DELAY * u64::from(failed_attempts))).await;
        }
        Err(Retry::Transient(reason)) => return Err(Error::Network(reason)),
        Err(Retry::Fatal(err)) => return Err(err),
        Ok(output) => return Ok(output),
      }
    }
  }

  async fn attempt(&self, http: &HttpBackend) -> Result<Self::Output, Retry> {
    let mut request = http
      .client
      .request(self.method(), http.url(&self.path()))
      .query(&self.query());
    if let Some(body) = self.body() {
      request = request.json(&body);
    }

    let response = request.send().await.map_err(|e| {
      event!(Level::WARN, "Failed to issue request, transport error: {e}");
      if e.is_connect() || e.is_timeout() {
        Retry::Transient(e.to_string())
      } else {
        Retry::Fatal(Error::Network(e.to_string()))
      }
    })?;

    let status = response.status();
    if !status.is_success() {
      event!(
        Level::WARN,
        "Failed to issue request, API Error. Status Code: {status}. Path: {}.",
        self.path()
      );
      let reason = format!("status {status}");
      return Err(
        if matches!(
          status,
          StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
        ) {
          Retry::Transient(reason)
        } else {
          Retry::Fatal(Error::Network(reason))
        },
      );
    }

    let text = response
      .text()
      .await
      .map_err(|e| Retry::Fatal(Error::Network(e.to_string())))?;
    Self::parse(&text).map_err(|e| {
      event!(Level::WARN, "(Notice) Unusable response for {}: {e}", self.path());
      Retry::Fatal(e)
    })
  }
}

enum Retry {
  Transient(String),
  Fatal(Error),
}

/// Percent-encodes a single path segment.
fn segment(raw: &str) -> String {
  urlencoding::encode(raw).into_owned()
}

fn decode_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, Error> {
  serde_json::from_str(body).map_err(|e| Error::InvalidServerResult(e.to_string()))
}
