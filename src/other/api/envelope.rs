//! The paged endpoints do not agree on where `totalPages` lives: some nest it
//! under `page`, others put it at the top level. Everything past this module
//! only ever sees `Page`.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::Error;

/// One normalized page of a list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
  pub content: Vec<T>,
  pub total_pages: usize,
}
impl Page<Value> {
  /// Decodes every item into `T`.
  ///
  /// # Errors
  ///
  /// `InvalidServerResult` when any item does not match `T`.
  pub fn decode<T: DeserializeOwned>(self) -> Result<Page<T>, Error> {
    let content = self
      .content
      .into_iter()
      .map(serde_json::from_value)
      .collect::<Result<Vec<T>, _>>()
      .map_err(|e| Error::InvalidServerResult(format!("Bad list item: {e}")))?;
    Ok(Page {
      content,
      total_pages: self.total_pages,
    })
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
  content: Option<Vec<Value>>,
  page: Option<PageInfo>,
  total_pages: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
  total_pages: Option<i64>,
}

/// Parses either envelope shape into a `Page`.
///
/// # Errors
///
/// `InvalidServerResult` when the body is not JSON, has no `content`, or
/// carries `totalPages` in neither place.
pub fn normalize(body: &str) -> Result<Page<Value>, Error> {
  let envelope: Envelope = crate::decode_json(body)?;
  let content = envelope
    .content
    .ok_or_else(|| Error::InvalidServerResult("Paged response has no content".to_string()))?;
  let total_pages = envelope
    .page
    .and_then(|page| page.total_pages)
    .or(envelope.total_pages)
    .ok_or_else(|| Error::InvalidServerResult("Paged response has no totalPages".to_string()))?;

  Ok(Page {
    content,
    total_pages: usize::try_from(total_pages).unwrap_or(0),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_nested_total_pages() {
    let page = normalize(r#"{"content": [{"userName": "ana"}], "page": {"totalPages": 3}}"#).unwrap();
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.content.len(), 1);
  }

  #[test]
  fn accepts_top_level_total_pages() {
    let page = normalize(r#"{"content": [], "totalPages": 2}"#).unwrap();
    assert_eq!(page.total_pages, 2);
    assert!(page.content.is_empty());
  }

  #[test]
  fn rejects_missing_total_pages() {
    assert!(matches!(
      normalize(r#"{"content": []}"#),
      Err(Error::InvalidServerResult(_))
    ));
    assert!(matches!(
      normalize(r#"{"totalPages": 1}"#),
      Err(Error::InvalidServerResult(_))
    ));
  }

  #[test]
  fn decodes_items() {
    let page = normalize(r#"{"content": [{"userName": "ana", "id": 7}], "totalPages": 1}"#)
      .unwrap()
      .decode::<types::UserHandle>()
      .unwrap();
    assert_eq!(&*page.content[0].user_name, "ana");
    assert_eq!(page.content[0].id, 7);

    let bad = normalize(r#"{"content": [{"nope": true}], "totalPages": 1}"#)
      .unwrap()
      .decode::<types::UserHandle>();
    assert!(matches!(bad, Err(Error::InvalidServerResult(_))));
  }
}
