use std::pin::pin;
use std::time::Instant;

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{info, warn};

use crate::classify::{self, Allowlist, ClassifiedLink};
use crate::errors::{RecoveredError, Result};
use crate::extract::{self, Extractor, MessageLinks};
use crate::message::MessageView;
use crate::sources::MailboxSource;

/// Shown in progress when a message has no usable `Subject` header.
pub const NO_SUBJECT: &str = "No Subject";

/// High-level façade providing library-consumable entry points.
///
/// Runs a whole sweep against any `MailboxSource` and returns a normalized
/// `SweepReport`. Printing is left to the caller; progress is reported
/// through a callback.
pub struct Sweeper;

impl Sweeper {
    /// List, fetch, extract, classify and partition one batch.
    ///
    /// Listing failures are fatal. A message that cannot be fetched is
    /// recorded as a warning and skipped.
    pub async fn collect<F>(
        source: &dyn MailboxSource,
        opts: &SweepOptions,
        mut progress: F,
    ) -> Result<SweepReport>
    where
        F: FnMut(Progress<'_>),
    {
        let start = Instant::now();
        let ids = source.list_message_ids(opts.batch_size).await?;
        let total = ids.len();
        if total == 0 {
            info!(source = source.name(), "No emails found.");
        }

        let extractor = Extractor::new(source.body_encoding());
        let mut per_message = Vec::with_capacity(total);
        let mut messages = Vec::with_capacity(total);
        let mut warnings = Vec::new();
        let mut fetch_failures = 0usize;

        let mut fetches = pin!(
            stream::iter(ids.iter().enumerate())
                .map(move |(index, id)| async move { (index, id, source.fetch_message(id).await) })
                .buffered(opts.fetch_concurrency.max(1))
        );

        while let Some((index, id, fetched)) = fetches.next().await {
            let message = match fetched {
                Ok(message) => message,
                Err(e) => {
                    warn!(message_id = %id, "skipping message: {e}");
                    warnings.push(format!("message {id}: {e}"));
                    fetch_failures += 1;
                    continue;
                }
            };

            let view = MessageView::new(&message).ok();
            let subject = view
                .and_then(|v| v.subject())
                .map(|s| truncate_chars(s, opts.subject_width));
            progress(Progress {
                index: index + 1,
                total,
                subject: subject.as_deref().unwrap_or(NO_SUBJECT),
            });

            let extraction = extractor.extract_with_report(&message);
            messages.push(MessageSummary {
                index,
                id: view.and_then(|v| v.id()).unwrap_or(id.as_str()).to_string(),
                subject,
                links_found: extraction.links.len(),
                diagnostics: extraction.diagnostics.len(),
            });
            per_message.push(MessageLinks {
                index,
                message_id: Some(id.clone()),
                extraction,
            });
        }

        let mut report = Self::classify_batch(&per_message, opts);
        report.source = source.name();
        report.messages_listed = total;
        report.messages = messages;
        report.stats.fetch_failures = fetch_failures;
        report.stats.duration_ms = start.elapsed().as_millis() as u64;
        report.warnings = warnings;
        Ok(report)
    }

    /// Aggregate per-message extractions in message order, classify the
    /// aggregate once, optionally dedup, then split on the allowlist.
    pub fn classify_batch(per_message: &[MessageLinks], opts: &SweepOptions) -> SweepReport {
        let (candidate_links, mut diagnostics) = extract::aggregate(per_message);
        let extraction_diagnostics = diagnostics.len();

        let classification = classify::classify(&candidate_links);
        let classification_skipped = classification.skipped_count();
        diagnostics.extend(classification.skipped);

        let before = classification.links.len();
        let classified = if opts.dedup {
            classify::dedup_preserving_order(classification.links)
        } else {
            classification.links
        };
        let duplicates_removed = before - classified.len();

        let (kept, exempted) = classify::partition(&classified, &opts.allowlist);

        SweepReport {
            source: "",
            messages_listed: per_message.len(),
            messages: Vec::new(),
            candidate_links,
            classified,
            kept,
            exempted,
            diagnostics,
            stats: SweepStats {
                extraction_diagnostics,
                classification_skipped,
                duplicates_removed,
                ..Default::default()
            },
            warnings: Vec::new(),
        }
    }
}

/// Options for a sweep.
#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub batch_size: usize,
    pub allowlist: Allowlist,
    pub dedup: bool,
    pub fetch_concurrency: usize,
    pub subject_width: usize,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            batch_size: 150,
            allowlist: Allowlist::builtin(),
            dedup: false,
            fetch_concurrency: 8,
            subject_width: 100,
        }
    }
}

impl SweepOptions {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            batch_size: config.mailbox.batch_size,
            allowlist: config.allowlist(),
            dedup: config.filter.dedup,
            fetch_concurrency: config.mailbox.fetch_concurrency,
            subject_width: config.output.subject_width,
        }
    }
}

/// One progress tick, emitted after each successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress<'a> {
    /// 1-based
    pub index: usize,
    pub total: usize,
    pub subject: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub index: usize,
    pub id: String,
    pub subject: Option<String>,
    pub links_found: usize,
    pub diagnostics: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub extraction_diagnostics: usize,
    pub classification_skipped: usize,
    pub duplicates_removed: usize,
    pub fetch_failures: usize,
    pub duration_ms: u64,
}

/// Normalized result of a sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub source: &'static str,
    pub messages_listed: usize,
    pub messages: Vec<MessageSummary>,
    /// Every extracted URL in message order, duplicates included.
    pub candidate_links: Vec<String>,
    pub classified: Vec<ClassifiedLink>,
    /// Not allowlisted; these get visited.
    pub kept: Vec<ClassifiedLink>,
    pub exempted: Vec<ClassifiedLink>,
    pub diagnostics: Vec<RecoveredError>,
    pub stats: SweepStats,
    pub warnings: Vec<String>,
}

impl SweepReport {
    /// Messages fetched and scanned.
    pub fn emails_ingested(&self) -> usize {
        self.messages.len()
    }

    /// Extracted links, before classification.
    pub fn links_found(&self) -> usize {
        self.candidate_links.len()
    }
}

fn truncate_chars(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}
