//! Scripted in-memory `Backend` for tests.
//!
//! Unscripted reads fail with `Error::Network`. Unscripted `follow` calls
//! flip the stored summary the way the real service does. Replies are
//! computed when the call arrives; a gated fake then holds them until
//! `release` hands out a permit, in call order.

use std::{
  collections::{HashMap, VecDeque},
  sync::{Mutex, MutexGuard, PoisonError},
};

use serde_json::{json, Value};
use tokio::sync::Semaphore;
use types::{ListKey, Notification, RelationshipSummaryData};

use crate::{envelope, Backend, Error, Page};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
  RelationshipSummary(String),
  ListPage(ListKey, usize),
  Follow(String),
  Notifications(String),
  ClearNotifications(String),
}

#[derive(Default)]
struct Script {
  summaries: HashMap<String, Result<RelationshipSummaryData, Error>>,
  pages: HashMap<(ListKey, usize), Result<String, Error>>,
  follow_replies: VecDeque<Result<String, Error>>,
  notifications: HashMap<String, Result<Vec<Notification>, Error>>,
  clear_replies: VecDeque<Result<(), Error>>,
  calls: Vec<Call>,
}

struct Gate {
  permits: Semaphore,
  holds: fn(&Call) -> bool,
}

#[derive(Default)]
pub struct FakeBackend {
  script: Mutex<Script>,
  gate: Option<Gate>,
}
impl FakeBackend {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Every response waits for a `release`d permit.
  #[must_use]
  pub fn gated() -> Self {
    Self::gated_only(|_| true)
  }

  /// Only responses to calls matching `holds` wait for a permit.
  #[must_use]
  pub fn gated_only(holds: fn(&Call) -> bool) -> Self {
    Self {
      script: Mutex::default(),
      gate: Some(Gate {
        permits: Semaphore::new(0),
        holds,
      }),
    }
  }

  /// Lets `count` held responses through.
  pub fn release(&self, count: usize) {
    if let Some(gate) = &self.gate {
      gate.permits.add_permits(count);
    }
  }

  pub fn set_summary(&self, user_name: &str, followers: i64, following: i64, is_following: bool) {
    self.lock().summaries.insert(
      user_name.to_string(),
      Ok(RelationshipSummaryData {
        followers_count: followers,
        following_count: following,
        is_following,
      }),
    );
  }

  pub fn fail_summary(&self, user_name: &str, err: Error) {
    self.lock().summaries.insert(user_name.to_string(), Err(err));
  }

  /// Scripts a raw response body for one page.
  pub fn set_page_body(&self, key: &ListKey, page: usize, body: impl Into<String>) {
    self.lock().pages.insert((key.clone(), page), Ok(body.into()));
  }

  /// Scripts a page of user handles in the nested `page.totalPages` shape.
  pub fn set_users_page(&self, key: &ListKey, page: usize, user_names: &[&str], total_pages: usize) {
    let content: Vec<Value> = user_names
      .iter()
      .map(|name| json!({ "id": 0, "userName": name }))
      .collect();
    let body = json!({ "content": content, "page": { "totalPages": total_pages } });
    self.set_page_body(key, page, body.to_string());
  }

  pub fn fail_page(&self, key: &ListKey, page: usize, err: Error) {
    self.lock().pages.insert((key.clone(), page), Err(err));
  }

  /// Queues a reply for the next `follow` call instead of flipping state.
  pub fn push_follow_reply(&self, reply: Result<&str, Error>) {
    self
      .lock()
      .follow_replies
      .push_back(reply.map(str::to_string));
  }

  pub fn set_notifications(&self, user_name: &str, notifications: Vec<Notification>) {
    self
      .lock()
      .notifications
      .insert(user_name.to_string(), Ok(notifications));
  }

  pub fn fail_notifications(&self, user_name: &str, err: Error) {
    self.lock().notifications.insert(user_name.to_string(), Err(err));
  }

  pub fn push_clear_reply(&self, reply: Result<(), Error>) {
    self.lock().clear_replies.push_back(reply);
  }

  #[must_use]
  pub fn calls(&self) -> Vec<Call> {
    let script = self.lock();
    let calls = script.calls.clone();
    drop(script);
    calls
  }

  #[must_use]
  pub fn count_calls(&self, matches: impl Fn(&Call) -> bool) -> usize {
    let script = self.lock();
    let count = script.calls.iter().filter(|call| matches(call)).count();
    drop(script);
    count
  }

  fn lock(&self) -> MutexGuard<'_, Script> {
    self.script.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn record(&self, call: &Call) {
    self.lock().calls.push(call.clone());
  }

  async fn deliver<T>(&self, call: &Call, reply: T) -> T {
    if let Some(gate) = self.gate.as_ref().filter(|gate| (gate.holds)(call)) {
      if let Ok(permit) = gate.permits.acquire().await {
        permit.forget();
      }
    }
    reply
  }

  fn follow_reply(&self, user_name: &str) -> Result<String, Error> {
    let mut script = self.lock();
    if let Some(reply) = script.follow_replies.pop_front() {
      return reply;
    }
    let reply = match script.summaries.get_mut(user_name) {
      Some(Ok(data)) => {
        data.is_following = !data.is_following;
        data.followers_count += if data.is_following { 1 } else { -1 };
        Ok(if data.is_following { "Followed" } else { "Unfollowed" }.to_string())
      }
      _ => Err(Error::Network(format!("No such user: {user_name}"))),
    };
    drop(script);
    reply
  }
}
impl Backend for FakeBackend {
  async fn relationship_summary(&self, user_name: &str) -> Result<RelationshipSummaryData, Error> {
    let call = Call::RelationshipSummary(user_name.to_string());
    self.record(&call);
    let reply = {
      let script = self.lock();
      script
        .summaries
        .get(user_name)
        .cloned()
        .unwrap_or_else(|| Err(Error::Network(format!("No summary for {user_name}"))))
    };
    self.deliver(&call, reply).await
  }

  async fn list_page(&self, key: &ListKey, page: usize, _size: usize) -> Result<Page<Value>, Error> {
    let call = Call::ListPage(key.clone(), page);
    self.record(&call);
    let body = {
      let script = self.lock();
      script
        .pages
        .get(&(key.clone(), page))
        .cloned()
        .unwrap_or_else(|| Err(Error::Network(format!("No page {page} for {key}"))))
    };
    let reply = body.and_then(|body| envelope::normalize(&body));
    self.deliver(&call, reply).await
  }

  async fn follow(&self, user_name: &str) -> Result<String, Error> {
    let call = Call::Follow(user_name.to_string());
    self.record(&call);
    let reply = self.follow_reply(user_name);
    self.deliver(&call, reply).await
  }

  async fn notifications(&self, user_name: &str) -> Result<Vec<Notification>, Error> {
    let call = Call::Notifications(user_name.to_string());
    self.record(&call);
    let reply = {
      let script = self.lock();
      script
        .notifications
        .get(user_name)
        .cloned()
        .unwrap_or_else(|| Ok(Vec::new()))
    };
    self.deliver(&call, reply).await
  }

  async fn clear_notifications(&self, user_name: &str) -> Result<(), Error> {
    let call = Call::ClearNotifications(user_name.to_string());
    self.record(&call);
    let reply = {
      let mut script = self.lock();
      let reply = script.clear_replies.pop_front().unwrap_or(Ok(()));
      if reply.is_ok() {
        script.notifications.insert(user_name.to_string(), Ok(Vec::new()));
      }
      reply
    };
    self.deliver(&call, reply).await
  }
}

#[cfg(test)]
mod tests {
  use types::ListKind;

  use super::*;

  #[tokio::test]
  async fn follow_flips_the_stored_summary() {
    let fake = FakeBackend::new();
    fake.set_summary("ana", 0, 2, false);

    assert_eq!(fake.follow("ana").await.unwrap(), "Followed");
    let data = fake.relationship_summary("ana").await.unwrap();
    assert_eq!(data.followers_count, 1);
    assert!(data.is_following);

    assert_eq!(fake.follow("ana").await.unwrap(), "Unfollowed");
    assert_eq!(fake.count_calls(|c| matches!(c, Call::Follow(_))), 2);
  }

  #[tokio::test]
  async fn serves_scripted_pages_through_the_envelope() {
    let fake = FakeBackend::new();
    let key = ListKey::new("ana", ListKind::Followers);
    fake.set_users_page(&key, 0, &["bo", "cy"], 2);
    fake.set_page_body(&key, 1, r#"{"content": [{"userName": "di"}], "totalPages": 2}"#);

    let first = fake.list_page(&key, 0, 20).await.unwrap();
    let second = fake.list_page(&key, 1, 20).await.unwrap();
    assert_eq!(first.content.len(), 2);
    assert_eq!(second.total_pages, 2);
    assert!(fake.list_page(&key, 2, 20).await.is_err());
  }
}
