//! High-level application orchestration layer.
//!
//! This module provides the CLI-facing `App` façade. Major steps in
//! `App::run`:
//!   1. Schema generation early-exit
//!   2. Config load / validation
//!   3. Mailbox source selection (message file or Gmail API)
//!   4. Sweep: list, fetch, extract, classify, allowlist
//!   5. Unsubscribe requests (skipped on `--dry-run`)
//!   6. Optional CSV export
//!   7. Structured output (JSON/YAML) or styled/plain/batch/csv rendering
//!
//! Progress goes to stderr so stdout stays clean for piping.

use tracing::{debug, info, warn};

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::errors::{Result, UnsubscriberError};
use crate::facade::{Progress, SweepOptions, SweepReport, Sweeper};
use crate::output::{self, OutputFormat as LegacyOutputFormat, RunResults};
use crate::retry::RetryConfigBuilder;
use crate::sources::{FileSource, GmailSource, MailboxSource};
use crate::structured_output::{InputInfo, UnsubscriberOutput};
use crate::styled_output::StyledFormatter;
use crate::unsubscribe::{UnsubscribeOptions, Unsubscriber};

/// Exit code for configuration and usage problems.
pub const EXIT_USAGE: i32 = 2;

/// Application façade.
pub struct App;

impl App {
    /// Execute the end-to-end sweep.
    ///
    /// Returns: intended process exit code (0 = success, 2 = bad configuration).
    pub async fn run(cli: &Cli) -> Result<i32> {
        if Self::maybe_print_schema(cli)? {
            return Ok(0);
        }
        let Some(config) = Self::load_config(cli) else {
            return Ok(EXIT_USAGE);
        };

        let source = Self::select_source(&config)?;
        info!(source = source.name(), batch_size = config.mailbox.batch_size, "starting sweep");

        let sweep_opts = SweepOptions::from_config(&config);
        let show_progress = config.output.progress;
        let report = Sweeper::collect(source.as_ref(), &sweep_opts, |p| {
            if show_progress {
                Self::print_progress(p);
            }
        })
        .await?;
        if show_progress && report.emails_ingested() > 0 {
            eprintln!();
        }
        if report.messages_listed == 0 && cli.error_enabled() && !cli.is_structured_output() {
            eprintln!("No emails found.");
        }
        Self::summarize_diagnostics(&report);

        let unsub_opts = UnsubscribeOptions::from_config(&config);
        let dry_run = unsub_opts.dry_run;
        let unsubscriber = Unsubscriber::new(unsub_opts)?;
        let outcomes = unsubscriber
            .visit_all(&report.kept, |o| debug!(url = %o.url, status = ?o.status, "visited"))
            .await;

        let results = RunResults {
            report,
            outcomes,
            dry_run,
        };

        if let Some(ref path) = config.output.csv_path {
            output::write_csv(path, &results)?;
            info!(path = %path, "wrote CSV export");
        }

        if Self::maybe_render_structured(cli, &config, &results)? {
            return Ok(0);
        }
        Self::render_human(cli, &results)?;

        Ok(0)
    }
}

/// Source selection and progress.
impl App {
    fn select_source(config: &Config) -> Result<Box<dyn MailboxSource>> {
        if let Some(ref path) = config.mailbox.messages_file {
            let source = FileSource::from_path(path)?;
            debug!(origin = source.origin(), messages = source.len(), "loaded message file");
            return Ok(Box::new(source));
        }

        if let Some(ref token) = config.mailbox.access_token {
            let retry = RetryConfigBuilder::new()
                .max_attempts(config.mailbox.retry_attempts)
                .initial_delay(config.retry_delay())
                .build();
            let source = GmailSource::new(
                &config.mailbox.api_base,
                token.clone(),
                config.mailbox_timeout(),
                retry,
            )?;
            return Ok(Box::new(source));
        }

        Err(UnsubscriberError::NoMailboxSource)
    }

    fn print_progress(p: Progress<'_>) {
        eprint!("{}", Self::progress_line(&p));
    }

    /// Blanks the previous line before printing the next subject.
    fn progress_line(p: &Progress<'_>) -> String {
        format!(
            "\r{}\rProcessing email {}/{}: {}",
            " ".repeat(100),
            p.index,
            p.total,
            p.subject
        )
    }

    fn summarize_diagnostics(report: &SweepReport) {
        if report.diagnostics.is_empty() {
            return;
        }
        warn!(
            skipped = report.diagnostics.len(),
            malformed = report.stats.extraction_diagnostics,
            unclassifiable = report.stats.classification_skipped,
            "some items could not be processed and were skipped"
        );
    }
}

/// Render human-oriented (styled/plain/batch/csv) output after structured path short-circuits.
impl App {
    fn render_human(cli: &Cli, results: &RunResults) -> Result<()> {
        if cli.should_use_styling() && StyledFormatter::new().print_results(results).is_ok() {
            return Ok(());
        }

        let legacy_format = match cli.output_format() {
            OutputFormat::Batch => LegacyOutputFormat::Batch,
            OutputFormat::Csv => LegacyOutputFormat::Csv {
                include_header: true,
            },
            _ => LegacyOutputFormat::Text {
                show_details: cli.info_enabled(),
            },
        };
        let rendered = output::format_results_to_string(results, &legacy_format)
            .map_err(|e| UnsubscriberError::internal_with("failed to format results", e))?;
        print!("{rendered}");
        Ok(())
    }
}

/// Helpers: schema generation, configuration, structured output
impl App {
    fn maybe_print_schema(cli: &Cli) -> Result<bool> {
        if cli.generate_schema {
            match UnsubscriberOutput::generate_json_schema() {
                Ok(schema) => {
                    println!("{schema}");
                }
                Err(e) => {
                    eprintln!("Error generating JSON schema: {e}");
                }
            }
            return Ok(true);
        }
        Ok(false)
    }

    fn load_config(cli: &Cli) -> Option<Config> {
        let config = match Config::load(cli) {
            Ok(config) => config,
            Err(e) => {
                if cli.error_enabled() {
                    eprintln!("Configuration error: {e}");
                }
                return None;
            }
        };
        if let Err(e) = config.validate() {
            if cli.error_enabled() {
                eprintln!("Configuration error: {e}");
            }
            return None;
        }
        Some(config)
    }

    fn maybe_render_structured(cli: &Cli, config: &Config, results: &RunResults) -> Result<bool> {
        if !cli.is_structured_output() {
            return Ok(false);
        }

        let input = InputInfo {
            source: results.report.source.to_string(),
            batch_size: config.mailbox.batch_size,
            dry_run: results.dry_run,
            allowlist: config.allowlist().iter().map(str::to_string).collect(),
        };
        let structured = UnsubscriberOutput::from_results(results, input);

        let rendered = match cli.output_format() {
            OutputFormat::Yaml => structured.to_yaml(),
            _ => structured.to_json(),
        }
        .map_err(|e| UnsubscriberError::internal(format!("failed to serialize report: {e}")))?;
        println!("{rendered}");
        Ok(true)
    }
}
