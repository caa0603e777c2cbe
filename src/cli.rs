use clap::{Parser, ValueEnum};

/// Output format selected with `--format`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable summary (styled when the terminal allows)
    #[default]
    Text,
    /// One `domain:url` line per link
    Batch,
    /// `domain,url,status,error` rows
    Csv,
    /// Structured run report as JSON
    Json,
    /// Structured run report as YAML
    Yaml,
}

/// Command-line interface definition.
/// Finds unsubscribe links in recent mail and visits the ones whose
/// registrable domain is not allowlisted.
///
/// Verbosity levels:
/// 0 - silent (only final output)
/// 1 - errors (default)
/// 2 - warnings + errors
/// 3 - info
/// 5 - trace/debug
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Find unsubscribe links in recent mail and unsubscribe from senders you do not allowlist"
)]
pub struct Cli {
    /// Read messages from a JSON file instead of the Gmail API.
    #[arg(long, value_name = "FILE")]
    pub messages: Option<String>,

    /// Gmail OAuth access token (or UNSUBSCRIBER_ACCESS_TOKEN).
    #[arg(long, value_name = "TOKEN", conflicts_with = "messages")]
    pub access_token: Option<String>,

    /// Gmail API base URL.
    #[arg(long, value_name = "URL", hide = true)]
    pub api_base: Option<String>,

    /// Number of recent messages to scan.
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Registrable domain to never unsubscribe from. Repeatable; comma lists accepted.
    #[arg(long = "allowlist", value_name = "DOMAIN", value_delimiter = ',')]
    pub allowlist: Vec<String>,

    /// Replace the built-in allowlist instead of extending it.
    #[arg(long)]
    pub no_default_allowlist: bool,

    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,

    /// Report what would be visited without sending any request.
    #[arg(long)]
    pub dry_run: bool,

    /// Visit each distinct URL once.
    #[arg(long)]
    pub dedup: bool,

    /// Also write results as CSV to this file.
    #[arg(long, value_name = "FILE")]
    pub csv: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Plain text output without styling.
    #[arg(long)]
    pub plain: bool,

    /// Disable colors in styled output.
    #[arg(long)]
    pub no_color: bool,

    /// Do not print per-message progress.
    #[arg(long)]
    pub no_progress: bool,

    /// Verbosity level (0,1,2,3,5)
    #[arg(long, default_value_t = 1)]
    pub verbose: u8,

    /// Maximum concurrent fetches and unsubscribe requests.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Timeout in seconds for each HTTP request.
    #[arg(long, value_name = "SECS")]
    pub http_timeout: Option<u64>,

    /// Print the JSON schema of the structured report and exit.
    #[arg(long)]
    pub generate_schema: bool,
}

impl Cli {
    /// Parse CLI arguments from process args.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Convenience: are we in very verbose/debug mode?
    pub fn is_trace(&self) -> bool {
        self.verbose >= 5
    }

    /// Are info-level messages enabled?
    pub fn info_enabled(&self) -> bool {
        self.verbose >= 3
    }

    /// Are warning-level messages enabled?
    pub fn warn_enabled(&self) -> bool {
        self.verbose >= 2
    }

    /// Are error-level messages enabled?
    pub fn error_enabled(&self) -> bool {
        self.verbose >= 1
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_structured_output(&self) -> bool {
        matches!(self.format, OutputFormat::Json | OutputFormat::Yaml)
    }

    /// Styled output only for text format on a terminal.
    pub fn should_use_styling(&self) -> bool {
        !self.plain
            && !self.no_color
            && self.format == OutputFormat::Text
            && crate::styled_output::StyledFormatter::should_use_colors()
    }

    pub fn show_progress(&self) -> bool {
        !self.no_progress && self.error_enabled() && !self.is_structured_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["unsubscriber", "--messages", "m.json"]).unwrap();
        assert_eq!(cli.messages.as_deref(), Some("m.json"));
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(cli.allowlist.is_empty());
        assert!(!cli.dry_run);
        assert!(cli.error_enabled());
        assert!(!cli.warn_enabled());
    }

    #[test]
    fn allowlist_repeatable_and_comma_separated() {
        let cli = Cli::try_parse_from([
            "unsubscriber",
            "--allowlist",
            "a.com,b.com",
            "--allowlist",
            "c.com",
        ])
        .unwrap();
        assert_eq!(cli.allowlist, vec!["a.com", "b.com", "c.com"]);
    }

    #[test]
    fn structured_formats() {
        let cli = Cli::try_parse_from(["unsubscriber", "--format", "yaml"]).unwrap();
        assert!(cli.is_structured_output());
        assert!(!cli.show_progress());
        let cli = Cli::try_parse_from(["unsubscriber", "--format", "csv"]).unwrap();
        assert!(!cli.is_structured_output());
    }

    #[test]
    fn plain_and_no_color_disable_styling() {
        let cli = Cli::try_parse_from(["unsubscriber", "--plain"]).unwrap();
        assert!(!cli.should_use_styling());
        let cli = Cli::try_parse_from(["unsubscriber", "--no-color"]).unwrap();
        assert!(!cli.should_use_styling());
        let cli = Cli::try_parse_from(["unsubscriber", "--format", "batch"]).unwrap();
        assert!(!cli.should_use_styling());
    }

    #[test]
    fn messages_and_token_conflict() {
        let res = Cli::try_parse_from([
            "unsubscriber",
            "--messages",
            "m.json",
            "--access-token",
            "t",
        ]);
        assert!(res.is_err());
    }
}
