//! Structured output module for JSON and YAML serialization.
//!
//! These structures describe a complete run: what was scanned, every link that
//! was found and how it was classified, what happened when kept links were
//! visited, and the problems that were skipped along the way. They are meant
//! to be stable enough for scripts to consume.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::RecoveredError;
use crate::output::RunResults;
use crate::unsubscribe::VisitStatus;

/// Root structure for all unsubscriber output in structured formats
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct UnsubscriberOutput {
    /// Tool version and metadata
    pub metadata: OutputMetadata,

    /// Where the messages came from
    pub input: InputInfo,

    /// Headline counts
    pub summary: RunSummary,

    /// Links outside the allowlist, in discovery order, with visit results
    pub links: Vec<LinkEntry>,

    /// Links whose registrable domain is allowlisted
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub allowlisted: Vec<LinkEntry>,

    /// Items that were skipped instead of aborting the run
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub diagnostics: Vec<Diagnostic>,

    /// Warnings encountered during processing
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
}

/// Tool metadata and versioning information
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct OutputMetadata {
    /// Tool name
    pub tool_name: String,

    /// Tool version
    pub version: String,

    /// Timestamp when the run finished
    pub generated_at: chrono::DateTime<chrono::Utc>,

    /// JSON schema version for this output format
    pub schema_version: String,
}

/// Information about the scanned mailbox
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct InputInfo {
    /// Mailbox source kind ("gmail" or "file")
    pub source: String,

    /// Maximum number of messages requested
    pub batch_size: usize,

    /// Whether unsubscribe requests were suppressed
    pub dry_run: bool,

    /// Allowlisted registrable domains in effect
    pub allowlist: Vec<String>,
}

/// Headline counts for the run
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct RunSummary {
    /// Message ids returned by the listing call
    pub messages_listed: usize,

    /// Messages fetched and scanned
    pub emails_ingested: usize,

    /// Candidate links extracted, duplicates included
    pub links_found: usize,

    /// Links with a registrable domain
    pub links_classified: usize,

    /// Links outside the allowlist
    pub links_kept: usize,

    /// Links left alone because their domain is allowlisted
    pub links_allowlisted: usize,

    /// Duplicate links dropped (only with dedup enabled)
    pub duplicates_removed: usize,

    /// Unsubscribe requests answered with 2xx or 3xx
    pub unsubscribe_succeeded: usize,

    /// Unsubscribe requests that failed or got an error status
    pub unsubscribe_failed: usize,

    /// Messages that could not be fetched
    pub fetch_failures: usize,

    /// Total processing time in milliseconds
    pub duration_ms: u64,
}

/// One classified link
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct LinkEntry {
    /// Registrable domain of the link's host
    pub domain: String,

    /// The link exactly as extracted
    pub url: String,

    /// Visit result, absent for allowlisted links
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub visit: Option<VisitResult>,
}

/// What happened when a link was visited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VisitResult {
    /// The server answered
    Responded {
        /// HTTP status code
        status: u16,
    },
    /// The request could not be completed
    Failed {
        /// Transport error description
        error: String,
    },
    /// Dry run; no request was sent
    Skipped,
}

/// A skipped item
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct Diagnostic {
    /// malformed_input, decode_failure or classification_failure
    pub kind: String,

    /// Human-readable description
    pub message: String,
}

impl From<&VisitStatus> for VisitResult {
    fn from(status: &VisitStatus) -> Self {
        match status {
            VisitStatus::Responded { status } => VisitResult::Responded { status: *status },
            VisitStatus::Failed { error } => VisitResult::Failed {
                error: error.clone(),
            },
            VisitStatus::Skipped => VisitResult::Skipped,
        }
    }
}

impl From<&RecoveredError> for Diagnostic {
    fn from(err: &RecoveredError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

impl UnsubscriberOutput {
    /// Create a new output structure with basic metadata
    pub fn new() -> Self {
        Self {
            metadata: OutputMetadata {
                tool_name: "unsubscriber".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: chrono::Utc::now(),
                schema_version: "1.0.0".to_string(),
            },
            input: InputInfo {
                source: String::new(),
                batch_size: 0,
                dry_run: false,
                allowlist: Vec::new(),
            },
            summary: RunSummary::default(),
            links: Vec::new(),
            allowlisted: Vec::new(),
            diagnostics: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Fill the output from a finished run
    pub fn from_results(results: &RunResults, input: InputInfo) -> Self {
        let report = &results.report;
        let mut output = Self::new();
        output.input = input;

        output.summary = RunSummary {
            messages_listed: report.messages_listed,
            emails_ingested: report.emails_ingested(),
            links_found: report.links_found(),
            links_classified: report.classified.len(),
            links_kept: report.kept.len(),
            links_allowlisted: report.exempted.len(),
            duplicates_removed: report.stats.duplicates_removed,
            unsubscribe_succeeded: results.succeeded(),
            unsubscribe_failed: results.failed(),
            fetch_failures: report.stats.fetch_failures,
            duration_ms: report.stats.duration_ms,
        };

        output.links = results
            .rows()
            .into_iter()
            .map(|row| LinkEntry {
                domain: row.domain.to_string(),
                url: row.url.to_string(),
                visit: row.status.map(VisitResult::from),
            })
            .collect();

        output.allowlisted = report
            .exempted
            .iter()
            .map(|link| LinkEntry {
                domain: link.domain.clone(),
                url: link.url.clone(),
                visit: None,
            })
            .collect();

        output.diagnostics = report.diagnostics.iter().map(Diagnostic::from).collect();
        output.warnings = report.warnings.clone();
        output
    }

    /// Generate JSON schema for this output format
    pub fn generate_json_schema() -> Result<String> {
        let schema = schemars::schema_for!(UnsubscriberOutput);
        Ok(serde_json::to_string_pretty(&schema)?)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl Default for UnsubscriberOutput {
    fn default() -> Self {
        Self::new()
    }
}
