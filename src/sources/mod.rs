//! Pluggable mailbox sources.
//!
//! A source lists the ids of recent messages and fetches each one as an
//! untyped `serde_json::Value` tree. It also says how part bodies are encoded
//! so the extractor can decode them.
//!
//! Implementations:
//!   * `GmailSource`: Gmail REST API v1 with a bearer token (base64url bodies)
//!   * `FileSource`: a local JSON dump of messages (plain-text bodies)
//!
//! Usage:
//! ```ignore
//! let source = FileSource::from_path("messages.json")?;
//! for id in source.list_message_ids(50).await? {
//!     let msg = source.fetch_message(&id).await?;
//! }
//! ```

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{IoResultExt, Result, UnsubscriberError};
use crate::extract::BodyEncoding;

mod gmail;

pub use gmail::GmailSource;

/// Uniform interface over message providers.
#[async_trait]
pub trait MailboxSource: Send + Sync {
    /// Short label for logs and reports.
    fn name(&self) -> &'static str;

    /// Encoding of `payload.parts[].body.data`.
    fn body_encoding(&self) -> BodyEncoding;

    /// Ids of at most `max` recent messages, newest first.
    async fn list_message_ids(&self, max: usize) -> Result<Vec<String>>;

    /// Full message tree for one id.
    async fn fetch_message(&self, id: &str) -> Result<Value>;
}

/* ---- Source Implementations ---- */

/// Messages loaded from a JSON file: either an array of message objects or
/// an object with a `messages` array. Ids are positions in that array.
#[derive(Debug, Clone)]
pub struct FileSource {
    origin: String,
    messages: Vec<Value>,
}

impl FileSource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let content = std::fs::read_to_string(path).with_path(&origin, "read messages")?;
        Self::from_json_str(&content, origin)
    }

    pub fn from_json_str(content: &str, origin: impl Into<String>) -> Result<Self> {
        let origin = origin.into();
        let root: Value = serde_json::from_str(content)
            .map_err(|e| UnsubscriberError::message_file(&origin, e.to_string()))?;
        let messages = match root {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("messages") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(UnsubscriberError::message_file(
                        &origin,
                        "expected an array of messages or an object with a 'messages' array",
                    ));
                }
            },
            _ => {
                return Err(UnsubscriberError::message_file(
                    &origin,
                    "expected an array of messages or an object with a 'messages' array",
                ));
            }
        };
        Ok(Self { origin, messages })
    }

    pub fn from_messages(messages: Vec<Value>) -> Self {
        Self {
            origin: "<memory>".to_string(),
            messages,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[async_trait]
impl MailboxSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn body_encoding(&self) -> BodyEncoding {
        BodyEncoding::Plain
    }

    async fn list_message_ids(&self, max: usize) -> Result<Vec<String>> {
        Ok((0..self.messages.len().min(max))
            .map(|i| i.to_string())
            .collect())
    }

    async fn fetch_message(&self, id: &str) -> Result<Value> {
        id.parse::<usize>()
            .ok()
            .and_then(|i| self.messages.get(i))
            .cloned()
            .ok_or_else(|| {
                UnsubscriberError::message_file(&self.origin, format!("no message with id '{id}'"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[tokio::test]
    async fn file_source_array_and_limit() {
        let src = FileSource::from_json_str(r#"[{"id":"a"},{"id":"b"},null]"#, "t").unwrap();
        assert_eq!(src.len(), 3);
        assert_eq!(src.list_message_ids(2).await.unwrap(), vec!["0", "1"]);
        assert_eq!(src.list_message_ids(10).await.unwrap().len(), 3);
        assert_eq!(src.fetch_message("1").await.unwrap(), json!({"id": "b"}));
        assert_eq!(src.fetch_message("2").await.unwrap(), Value::Null);
        assert!(src.fetch_message("9").await.is_err());
        assert!(src.fetch_message("x").await.is_err());
    }

    #[tokio::test]
    async fn file_source_wrapped_object() {
        let src = FileSource::from_json_str(r#"{"messages":[{"id":"a"}]}"#, "t").unwrap();
        assert_eq!(src.list_message_ids(150).await.unwrap(), vec!["0"]);
        assert_eq!(src.body_encoding(), BodyEncoding::Plain);
    }

    #[test]
    fn file_source_rejects_bad_roots() {
        for bad in ["42", r#"{"items":[]}"#, "not json"] {
            let err = FileSource::from_json_str(bad, "bad.json").unwrap_err();
            assert!(matches!(err, UnsubscriberError::MessageFile { .. }));
            assert!(err.to_string().contains("bad.json"));
        }
    }

    #[test]
    fn file_source_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        let src = FileSource::from_path(file.path()).unwrap();
        assert!(src.is_empty());

        let err = FileSource::from_path("/nonexistent/messages.json").unwrap_err();
        assert!(matches!(err, UnsubscriberError::Io { .. }));
    }
}
