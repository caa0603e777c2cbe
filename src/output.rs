//! Output formatting for sweep results.
//!
//! Human-readable text, `domain:url` batch lines and CSV, all behind one
//! `OutputFormatter` trait. JSON and YAML go through `structured_output`.

use std::io;
use std::path::Path;

use crate::errors::{IoResultExt, Result};
use crate::facade::SweepReport;
use crate::unsubscribe::{VisitOutcome, VisitStatus};

/// A finished run: the sweep plus what happened to each kept link.
#[derive(Debug, Clone, Default)]
pub struct RunResults {
    pub report: SweepReport,

    /// Parallel to `report.kept`; empty when nothing was visited yet.
    pub outcomes: Vec<VisitOutcome>,

    pub dry_run: bool,
}

/// One kept link with its visit result, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow<'a> {
    pub domain: &'a str,
    pub url: &'a str,
    pub status: Option<&'a VisitStatus>,
}

impl RunResults {
    pub fn rows(&self) -> Vec<ResultRow<'_>> {
        self.report
            .kept
            .iter()
            .enumerate()
            .map(|(i, link)| ResultRow {
                domain: &link.domain,
                url: &link.url,
                status: self.outcomes.get(i).map(|o| &o.status),
            })
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !o.succeeded() && o.status != VisitStatus::Skipped)
            .count()
    }
}

/// Output format options
#[derive(Debug, Clone)]
pub enum OutputFormat {
    /// Human-readable text format
    Text {
        /// List allowlisted links, skipped items and warnings
        show_details: bool,
    },

    /// Batch format: domain:url
    Batch,

    /// CSV format
    Csv {
        /// Include header row
        include_header: bool,
    },
}

/// Output formatter trait
pub trait OutputFormatter {
    fn format_results(&self, results: &RunResults) -> io::Result<String>;
}

/// Text output formatter
pub struct TextFormatter {
    show_details: bool,
}

impl TextFormatter {
    pub fn new(show_details: bool) -> Self {
        Self { show_details }
    }
}

impl OutputFormatter for TextFormatter {
    fn format_results(&self, results: &RunResults) -> io::Result<String> {
        let report = &results.report;
        let mut output = String::new();

        output.push_str(&format!("Emails ingested: {}\n", report.emails_ingested()));
        output.push_str(&format!("Unsubscribe Links Found: {}\n", report.links_found()));

        if report.kept.is_empty() {
            output.push_str("No unsubscribe links outside the allowlist.\n");
        } else {
            let verb = if results.dry_run {
                "Would unsubscribe"
            } else {
                "Unsubscribing"
            };
            output.push_str(&format!("\n{verb} ({} link(s)):\n", report.kept.len()));
            for row in results.rows() {
                output.push_str(&format!("  {}\t{}", row.domain, row.url));
                if let Some(status) = row.status {
                    output.push_str(&format!("\t{}", format_status(status)));
                }
                output.push('\n');
            }
        }

        if !report.exempted.is_empty() {
            output.push_str(&format!(
                "\nAllowlisted: {} link(s) left alone\n",
                report.exempted.len()
            ));
            if self.show_details {
                for link in &report.exempted {
                    output.push_str(&format!("  {}\t{}\n", link.domain, link.url));
                }
            }
        }

        if self.show_details && !report.diagnostics.is_empty() {
            output.push_str("\nSkipped:\n");
            for diag in &report.diagnostics {
                output.push_str(&format!("  {}\n", diag));
            }
        }

        if self.show_details && !report.warnings.is_empty() {
            output.push('\n');
            output.push_str("Warnings:\n");
            for warning in &report.warnings {
                output.push_str(&format!("  {}\n", warning));
            }
        }

        Ok(output)
    }
}

/// Batch output formatter
pub struct BatchFormatter;

impl OutputFormatter for BatchFormatter {
    fn format_results(&self, results: &RunResults) -> io::Result<String> {
        let mut output = String::new();
        for link in &results.report.kept {
            output.push_str(&format!("{}:{}\n", link.domain, link.url));
        }
        Ok(output)
    }
}

/// CSV output formatter
pub struct CsvFormatter {
    include_header: bool,
}

impl CsvFormatter {
    pub fn new(include_header: bool) -> Self {
        Self { include_header }
    }
}

impl OutputFormatter for CsvFormatter {
    fn format_results(&self, results: &RunResults) -> io::Result<String> {
        let mut output = String::new();

        if self.include_header {
            output.push_str("domain,url,status,error\n");
        }

        for row in results.rows() {
            let (status, error) = match row.status {
                Some(VisitStatus::Responded { status }) => (status.to_string(), ""),
                Some(VisitStatus::Failed { error }) => (String::new(), error.as_str()),
                Some(VisitStatus::Skipped) => ("skipped".to_string(), ""),
                None => (String::new(), ""),
            };
            output.push_str(&format!(
                "{},{},{},{}\n",
                csv_field(row.domain),
                csv_field(row.url),
                status,
                csv_field(error)
            ));
        }

        Ok(output)
    }
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Format a visit status for human reading
fn format_status(status: &VisitStatus) -> String {
    match status {
        VisitStatus::Responded { status } => format!("HTTP {}", status),
        VisitStatus::Failed { error } => format!("error: {}", error),
        VisitStatus::Skipped => "dry run".to_string(),
    }
}

/// Create a formatter based on the output format
pub fn create_formatter(format: &OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text { show_details } => Box::new(TextFormatter::new(*show_details)),
        OutputFormat::Batch => Box::new(BatchFormatter),
        OutputFormat::Csv { include_header } => Box::new(CsvFormatter::new(*include_header)),
    }
}

/// Utility function to format results to a string
pub fn format_results_to_string(results: &RunResults, format: &OutputFormat) -> io::Result<String> {
    let formatter = create_formatter(format);
    formatter.format_results(results)
}

/// Write the CSV export (with header) to `path`.
pub fn write_csv(path: impl AsRef<Path>, results: &RunResults) -> Result<()> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let csv = CsvFormatter::new(true)
        .format_results(results)
        .with_path(&display, "format csv")?;
    std::fs::write(path, csv).with_path(&display, "write csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassifiedLink;
    use crate::errors::RecoveredError;

    fn create_test_results() -> RunResults {
        let kept = vec![
            ClassifiedLink::new("shop.co.uk", "https://mail.shop.co.uk/unsubscribe?a=1,2"),
            ClassifiedLink::new("news.com", "https://news.com/unsub"),
            ClassifiedLink::new("dead.org", "https://dead.org/unsubscribe"),
        ];
        let outcomes = vec![
            VisitOutcome {
                domain: "shop.co.uk".into(),
                url: kept[0].url.clone(),
                status: VisitStatus::Responded { status: 200 },
            },
            VisitOutcome {
                domain: "news.com".into(),
                url: kept[1].url.clone(),
                status: VisitStatus::Responded { status: 404 },
            },
            VisitOutcome {
                domain: "dead.org".into(),
                url: kept[2].url.clone(),
                status: VisitStatus::Failed {
                    error: "connection refused, \"os error 111\"".into(),
                },
            },
        ];
        RunResults {
            report: SweepReport {
                candidate_links: vec![
                    "https://mail.shop.co.uk/unsubscribe?a=1,2".into(),
                    "https://news.com/unsub".into(),
                    "https://dead.org/unsubscribe".into(),
                    "https://github.com/unsubscribe".into(),
                ],
                kept,
                exempted: vec![ClassifiedLink::new("github.com", "https://github.com/unsubscribe")],
                diagnostics: vec![RecoveredError::classification("http://10.0.0.1/u", "IP host")],
                warnings: vec!["message m9: Request timed out after 30s: messages.get".into()],
                ..Default::default()
            },
            outcomes,
            dry_run: false,
        }
    }

    #[test]
    fn test_text_formatter_simple() {
        let results = create_test_results();
        let text = TextFormatter::new(false).format_results(&results).unwrap();

        assert!(text.contains("Emails ingested: 0"));
        assert!(text.contains("Unsubscribe Links Found: 4"));
        assert!(text.contains("shop.co.uk\thttps://mail.shop.co.uk/unsubscribe?a=1,2\tHTTP 200"));
        assert!(text.contains("HTTP 404"));
        assert!(text.contains("Allowlisted: 1 link(s)"));
        assert!(!text.contains("Warnings:"));
    }

    #[test]
    fn test_text_formatter_with_details() {
        let results = create_test_results();
        let text = TextFormatter::new(true).format_results(&results).unwrap();

        assert!(text.contains("github.com\thttps://github.com/unsubscribe"));
        assert!(text.contains("Skipped:"));
        assert!(text.contains("Warnings:"));
    }

    #[test]
    fn test_dry_run_wording() {
        let mut results = create_test_results();
        results.dry_run = true;
        results.outcomes.clear();
        let text = TextFormatter::new(false).format_results(&results).unwrap();
        assert!(text.contains("Would unsubscribe (3 link(s))"));
    }

    #[test]
    fn test_batch_formatter() {
        let results = create_test_results();
        let text = BatchFormatter.format_results(&results).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "news.com:https://news.com/unsub");
    }

    #[test]
    fn test_csv_formatter() {
        let results = create_test_results();
        let text = CsvFormatter::new(true).format_results(&results).unwrap();

        let lines: Vec<&str> = text.trim().split('\n').collect();
        assert_eq!(lines.len(), 4); // header + 3 links
        assert_eq!(lines[0], "domain,url,status,error");
        assert_eq!(
            lines[1],
            "shop.co.uk,\"https://mail.shop.co.uk/unsubscribe?a=1,2\",200,"
        );
        assert_eq!(lines[2], "news.com,https://news.com/unsub,404,");
        assert_eq!(
            lines[3],
            "dead.org,https://dead.org/unsubscribe,,\"connection refused, \"\"os error 111\"\"\""
        );
    }

    #[test]
    fn test_csv_dry_run_rows() {
        let mut results = create_test_results();
        for o in &mut results.outcomes {
            o.status = VisitStatus::Skipped;
        }
        let text = CsvFormatter::new(false).format_results(&results).unwrap();
        assert!(text.starts_with("shop.co.uk,"));
        assert!(text.lines().all(|l| l.contains(",skipped,")));
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &create_test_results()).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("domain,url,status,error\n"));

        let err = write_csv(dir.path().join("missing/out.csv"), &create_test_results());
        assert!(err.is_err());
    }

    #[test]
    fn test_counts() {
        let results = create_test_results();
        assert_eq!(results.succeeded(), 1);
        assert_eq!(results.failed(), 2);
    }

    #[test]
    fn test_format_dispatch() {
        let results = create_test_results();
        let batch = format_results_to_string(&results, &OutputFormat::Batch).unwrap();
        assert!(batch.starts_with("shop.co.uk:https://"));
        let csv = format_results_to_string(
            &results,
            &OutputFormat::Csv {
                include_header: false,
            },
        )
        .unwrap();
        assert!(csv.starts_with("shop.co.uk,"));
        let text = format_results_to_string(
            &results,
            &OutputFormat::Text {
                show_details: false,
            },
        )
        .unwrap();
        assert!(text.starts_with("Emails ingested: 0\n"));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
