//! Outbound unsubscribe requests.
//!
//! One GET per kept link, sent once, in input order, with bounded
//! concurrency. The response status is reported as-is; nothing checks whether
//! the sender actually honoured the request.

use std::pin::pin;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::ClassifiedLink;
use crate::errors::{Result, UnsubscriberError};

#[derive(Debug, Clone)]
pub struct UnsubscribeOptions {
    pub timeout: Duration,
    pub concurrency: usize,
    pub user_agent: String,
    pub dry_run: bool,
}

impl Default for UnsubscribeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            concurrency: 4,
            user_agent: format!("unsubscriber/{}", env!("CARGO_PKG_VERSION")),
            dry_run: false,
        }
    }
}

impl UnsubscribeOptions {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            timeout: config.unsubscribe_timeout(),
            concurrency: config.unsubscribe.concurrency,
            user_agent: config.unsubscribe.user_agent.clone(),
            dry_run: config.unsubscribe.dry_run,
        }
    }
}

/// What happened when a link was visited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VisitStatus {
    /// The server answered with this HTTP status.
    Responded { status: u16 },
    /// Transport failure (DNS, TLS, timeout, ...).
    Failed { error: String },
    /// Dry run; no request was sent.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitOutcome {
    pub domain: String,
    pub url: String,
    pub status: VisitStatus,
}

impl VisitOutcome {
    pub fn status_code(&self) -> Option<u16> {
        match self.status {
            VisitStatus::Responded { status } => Some(status),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            VisitStatus::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// 2xx or 3xx response.
    pub fn succeeded(&self) -> bool {
        self.status_code().is_some_and(|s| (200..400).contains(&s))
    }
}

pub struct Unsubscriber {
    client: Client,
    opts: UnsubscribeOptions,
}

impl Unsubscriber {
    pub fn new(opts: UnsubscribeOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(opts.timeout)
            .user_agent(opts.user_agent.clone())
            .build()
            .map_err(|e| UnsubscriberError::internal_with("failed to build HTTP client", e))?;
        Ok(Self { client, opts })
    }

    pub fn is_dry_run(&self) -> bool {
        self.opts.dry_run
    }

    /// Visit one link. Never fails; errors become `VisitStatus::Failed`.
    pub async fn visit(&self, link: &ClassifiedLink) -> VisitOutcome {
        let status = if self.opts.dry_run {
            debug!(url = %link.url, "dry run, not visiting");
            VisitStatus::Skipped
        } else {
            match self.client.get(link.url.as_str()).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if response.status().is_success() || response.status().is_redirection() {
                        info!(domain = %link.domain, status, "unsubscribe request sent");
                    } else {
                        warn!(domain = %link.domain, status, url = %link.url, "unsubscribe link returned error status");
                    }
                    VisitStatus::Responded { status }
                }
                Err(e) => {
                    let error = if e.is_timeout() {
                        format!("timed out after {}s", self.opts.timeout.as_secs())
                    } else {
                        e.to_string()
                    };
                    warn!(domain = %link.domain, url = %link.url, "unsubscribe request failed: {error}");
                    VisitStatus::Failed { error }
                }
            }
        };

        VisitOutcome {
            domain: link.domain.clone(),
            url: link.url.clone(),
            status,
        }
    }

    /// Visit every link, reporting each outcome as it completes in input order.
    pub async fn visit_all<F>(&self, links: &[ClassifiedLink], mut on_outcome: F) -> Vec<VisitOutcome>
    where
        F: FnMut(&VisitOutcome),
    {
        let mut visits = pin!(
            stream::iter(links)
                .map(|link| self.visit(link))
                .buffered(self.opts.concurrency.max(1))
        );

        let mut outcomes = Vec::with_capacity(links.len());
        while let Some(outcome) = visits.next().await {
            on_outcome(&outcome);
            outcomes.push(outcome);
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn opts(dry_run: bool) -> UnsubscribeOptions {
        UnsubscribeOptions {
            timeout: Duration::from_secs(5),
            concurrency: 2,
            dry_run,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn reports_status_codes_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/unsubscribe/ok"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/unsubscribe/gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let links = vec![
            ClassifiedLink::new("a.com", format!("{}/unsubscribe/ok", server.uri())),
            ClassifiedLink::new("b.com", format!("{}/unsubscribe/gone", server.uri())),
        ];
        let unsub = Unsubscriber::new(opts(false)).unwrap();
        let mut seen = Vec::new();
        let outcomes = unsub
            .visit_all(&links, |o| seen.push(o.domain.clone()))
            .await;

        assert_eq!(seen, vec!["a.com", "b.com"]);
        assert_eq!(outcomes[0].status_code(), Some(200));
        assert!(outcomes[0].succeeded());
        assert_eq!(outcomes[1].status_code(), Some(404));
        assert!(!outcomes[1].succeeded());
        assert_eq!(outcomes[1].url, links[1].url);
    }

    #[tokio::test]
    async fn dry_run_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let links = vec![ClassifiedLink::new("a.com", format!("{}/u", server.uri()))];
        let unsub = Unsubscriber::new(opts(true)).unwrap();
        let outcomes = unsub.visit_all(&links, |_| {}).await;
        assert_eq!(outcomes[0].status, VisitStatus::Skipped);
        assert!(unsub.is_dry_run());
    }

    #[tokio::test]
    async fn transport_errors_are_reported_not_raised() {
        let links = vec![ClassifiedLink::new("nowhere.invalid", "http://127.0.0.1:1/unsubscribe")];
        let unsub = Unsubscriber::new(opts(false)).unwrap();
        let outcome = unsub.visit(&links[0]).await;
        assert!(outcome.error().is_some());
        assert_eq!(outcome.status_code(), None);
    }
}
