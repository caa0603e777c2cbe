//! Styled output formatting for unsubscriber using anstyle.
//!
//! Colored terminal rendering of a run: headline counts, the links that were
//! (or would be) visited with their outcome, and a footer with statistics and
//! warnings.

use anstyle::{AnsiColor, Color, Style};
use std::fmt::Write;
use std::io::{self, Write as IoWrite};

use crate::output::RunResults;
use crate::unsubscribe::VisitStatus;

const RULE: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Style definitions for different UI elements
pub struct Styles {
    pub header: Style,
    pub subheader: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    pub muted: Style,
    pub bold: Style,
    pub url: Style,
    pub domain: Style,
}

impl Default for Styles {
    fn default() -> Self {
        Self {
            header: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Blue))),
            subheader: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
            success: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
            warning: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
            error: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
            info: Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue))),
            muted: Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))),
            bold: Style::new().bold(),
            url: Style::new()
                .fg_color(Some(Color::Ansi(AnsiColor::Blue)))
                .underline(),
            domain: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Magenta))),
        }
    }
}

/// Styled output formatter for sweep results
pub struct StyledFormatter {
    styles: Styles,
    use_colors: bool,
}

impl StyledFormatter {
    /// Create a new styled formatter
    pub fn new() -> Self {
        Self {
            styles: Styles::default(),
            use_colors: Self::should_use_colors(),
        }
    }

    /// Create a formatter without colors (for non-interactive use)
    pub fn without_colors() -> Self {
        Self {
            styles: Styles::default(),
            use_colors: false,
        }
    }

    /// Determine if colors should be used based on environment
    pub fn should_use_colors() -> bool {
        atty::is(atty::Stream::Stdout) && std::env::var("NO_COLOR").is_err()
    }

    /// Apply style to text if colors are enabled
    fn styled(&self, text: &str, style: &Style) -> String {
        if self.use_colors {
            format!("{}{}{}", style.render(), text, style.render_reset())
        } else {
            text.to_string()
        }
    }

    /// Format a whole run
    pub fn format_results(&self, results: &RunResults) -> Result<String, std::fmt::Error> {
        let mut output = String::new();

        self.write_header(&mut output, results)?;
        self.write_links(&mut output, results)?;
        self.write_footer(&mut output, results)?;

        Ok(output)
    }

    fn write_header(&self, output: &mut String, results: &RunResults) -> Result<(), std::fmt::Error> {
        let report = &results.report;
        writeln!(output)?;
        writeln!(output, "{}", self.styled(RULE, &self.styles.muted))?;

        let title = if results.dry_run {
            "📭 Unsubscribe Sweep (dry run)"
        } else {
            "📭 Unsubscribe Sweep"
        };
        writeln!(output, "  {}", self.styled(title, &self.styles.header))?;
        writeln!(
            output,
            "  {} Emails ingested: {}",
            self.styled("📧", &self.styles.info),
            self.styled(&report.emails_ingested().to_string(), &self.styles.bold)
        )?;
        writeln!(
            output,
            "  {} Unsubscribe Links Found: {}",
            self.styled("🔗", &self.styles.info),
            self.styled(&report.links_found().to_string(), &self.styles.bold)
        )?;

        writeln!(output, "{}", self.styled(RULE, &self.styles.muted))?;
        Ok(())
    }

    fn write_links(&self, output: &mut String, results: &RunResults) -> Result<(), std::fmt::Error> {
        let report = &results.report;
        writeln!(output)?;

        if report.kept.is_empty() {
            writeln!(
                output,
                "  {} {}",
                self.styled("✓", &self.styles.success),
                self.styled("Nothing to unsubscribe from", &self.styles.success)
            )?;
        } else {
            writeln!(
                output,
                "  {}",
                self.styled("📮 Unsubscribe Links", &self.styles.subheader)
            )?;
            writeln!(output)?;

            let rows = results.rows();
            for (i, row) in rows.iter().enumerate() {
                writeln!(
                    output,
                    "    {} {}",
                    self.styled(&format!("{}.", i + 1), &self.styles.muted),
                    self.styled(row.domain, &self.styles.domain)
                )?;
                let branch = if row.status.is_some() { "├─" } else { "└─" };
                writeln!(
                    output,
                    "       {} {}",
                    self.styled(branch, &self.styles.muted),
                    self.styled(row.url, &self.styles.url)
                )?;
                if let Some(status) = row.status {
                    writeln!(
                        output,
                        "       {} {}",
                        self.styled("└─", &self.styles.muted),
                        self.format_status(status)
                    )?;
                }
                if i < rows.len() - 1 {
                    writeln!(output)?;
                }
            }
        }

        if !report.exempted.is_empty() {
            writeln!(output)?;
            writeln!(
                output,
                "  {} {} allowlisted link(s) left alone",
                self.styled("🛡", &self.styles.info),
                self.styled(&report.exempted.len().to_string(), &self.styles.bold)
            )?;
        }

        Ok(())
    }

    fn write_footer(&self, output: &mut String, results: &RunResults) -> Result<(), std::fmt::Error> {
        let report = &results.report;
        writeln!(output)?;
        writeln!(output, "{}", self.styled(RULE, &self.styles.muted))?;

        writeln!(output, "  {} Statistics:", self.styled("📊", &self.styles.info))?;
        if !results.outcomes.is_empty() && !results.dry_run {
            writeln!(
                output,
                "    {} Unsubscribed: {}  Failed: {}",
                self.styled("├─", &self.styles.muted),
                self.styled(&results.succeeded().to_string(), &self.styles.success),
                self.styled(&results.failed().to_string(), &self.styles.error)
            )?;
        }
        if report.stats.duplicates_removed > 0 {
            writeln!(
                output,
                "    {} Duplicates removed: {}",
                self.styled("├─", &self.styles.muted),
                self.styled(&report.stats.duplicates_removed.to_string(), &self.styles.bold)
            )?;
        }
        writeln!(
            output,
            "    {} Skipped items: {}",
            self.styled("├─", &self.styles.muted),
            self.styled(&report.diagnostics.len().to_string(), &self.styles.bold)
        )?;
        writeln!(
            output,
            "    {} Total time: {}ms",
            self.styled("└─", &self.styles.muted),
            self.styled(&report.stats.duration_ms.to_string(), &self.styles.bold)
        )?;

        if !report.warnings.is_empty() {
            writeln!(output)?;
            writeln!(output, "  {} Warnings:", self.styled("⚠️", &self.styles.warning))?;
            for warning in &report.warnings {
                writeln!(
                    output,
                    "    {} {}",
                    self.styled("•", &self.styles.warning),
                    self.styled(warning, &self.styles.warning)
                )?;
            }
        }

        writeln!(output, "{}", self.styled(RULE, &self.styles.muted))?;
        Ok(())
    }

    fn format_status(&self, status: &VisitStatus) -> String {
        match status {
            VisitStatus::Responded { status } if (200..400).contains(status) => {
                self.styled(&format!("✓ HTTP {status}"), &self.styles.success)
            }
            VisitStatus::Responded { status } => {
                self.styled(&format!("✗ HTTP {status}"), &self.styles.error)
            }
            VisitStatus::Failed { error } => self.styled(&format!("✗ {error}"), &self.styles.error),
            VisitStatus::Skipped => self.styled("dry run, not visited", &self.styles.muted),
        }
    }

    /// Print results to stdout
    pub fn print_results(&self, results: &RunResults) -> io::Result<()> {
        let formatted = self.format_results(results).map_err(io::Error::other)?;
        print!("{}", formatted);
        io::stdout().flush()?;
        Ok(())
    }
}

impl Default for StyledFormatter {
    fn default() -> Self {
        Self::new()
    }
}
