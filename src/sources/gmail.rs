//! Gmail REST API v1 source.
//!
//! Lists `users/me/messages?maxResults=N` and fetches each message with
//! `format=full`. Transient failures go through the retry executor. The
//! access token is supplied by the caller; obtaining or refreshing it is not
//! handled here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use super::MailboxSource;
use crate::errors::{Result, UnsubscriberError};
use crate::extract::BodyEncoding;
use crate::retry::{MailboxRetryPolicy, RetryConfig, RetryExecutor};

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListMessagesResponse {
    #[serde(default)]
    messages: Option<Vec<MessageRef>>,
}

pub struct GmailSource {
    client: Client,
    api_base: Url,
    access_token: String,
    timeout: Duration,
    retry: RetryExecutor,
}

impl GmailSource {
    pub fn new(
        api_base: &str,
        access_token: impl Into<String>,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self> {
        let api_base = Url::parse(api_base).map_err(|e| {
            UnsubscriberError::configuration(format!("invalid Gmail API base '{api_base}': {e}"))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(UnsubscriberError::configuration(format!(
                "invalid Gmail API base '{api_base}'"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("unsubscriber/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UnsubscriberError::internal_with("failed to build HTTP client", e))?;

        Ok(Self {
            client,
            api_base,
            access_token: access_token.into(),
            timeout,
            retry: RetryExecutor::new(retry),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["users", "me", "messages"]).extend(segments);
        }
        url
    }

    /// One GET attempt; maps transport, status and body failures.
    async fn get_json(&self, url: &Url, label: &str) -> Result<Value> {
        trace!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UnsubscriberError::timeout(label, self.timeout.as_secs())
                } else {
                    UnsubscriberError::network("GET", label, e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UnsubscriberError::http_status(label, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| UnsubscriberError::network("read body", label, e))?;
        serde_json::from_str(&body).map_err(|e| UnsubscriberError::api_response(label, e.to_string()))
    }

    async fn get_with_retry(&self, url: &Url, label: &str) -> Result<Value> {
        self.retry
            .execute(|| self.get_json(url, label), MailboxRetryPolicy)
            .await
    }
}

#[async_trait]
impl MailboxSource for GmailSource {
    fn name(&self) -> &'static str {
        "gmail"
    }

    fn body_encoding(&self) -> BodyEncoding {
        BodyEncoding::Base64Url
    }

    async fn list_message_ids(&self, max: usize) -> Result<Vec<String>> {
        let mut url = self.endpoint(&[]);
        url.query_pairs_mut()
            .append_pair("maxResults", &max.to_string());

        let body = self.get_with_retry(&url, "messages.list").await?;
        let listed: ListMessagesResponse = serde_json::from_value(body)
            .map_err(|e| UnsubscriberError::api_response("messages.list", e.to_string()))?;
        let ids: Vec<String> = listed
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.id)
            .take(max)
            .collect();
        debug!(count = ids.len(), "listed messages");
        Ok(ids)
    }

    async fn fetch_message(&self, id: &str) -> Result<Value> {
        let mut url = self.endpoint(&[id]);
        url.query_pairs_mut().append_pair("format", "full");
        self.get_with_retry(&url, "messages.get").await
    }
}
