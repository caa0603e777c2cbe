//! Configuration management for the unsubscriber.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `UNSUBSCRIBER_*` environment variables, then command-line flags.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::classify::{Allowlist, DEFAULT_ALLOWLIST};

/// Gmail caps `maxResults` on message listing at this value.
pub const MAX_BATCH_SIZE: usize = 500;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where messages come from
    pub mailbox: MailboxConfig,

    /// Allowlist and deduplication
    pub filter: FilterConfig,

    /// Outbound unsubscribe requests
    pub unsubscribe: UnsubscribeConfig,

    /// Reporting preferences
    pub output: OutputConfig,
}

/// Mailbox access settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MailboxConfig {
    /// Number of recent messages to scan
    pub batch_size: usize,

    /// Gmail REST base, without trailing `/users/...`
    pub api_base: String,

    /// OAuth bearer token; never read from the config file's neighbours
    pub access_token: Option<String>,

    /// Offline message file used instead of the API
    pub messages_file: Option<String>,

    /// Concurrent message fetches
    pub fetch_concurrency: usize,

    /// Per-request timeout for mailbox calls
    pub timeout_secs: u64,

    /// Retry attempts for transient mailbox failures
    pub retry_attempts: u32,

    /// Base delay between retries
    pub retry_delay_ms: u64,
}

/// Allowlist settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Registrable domains never unsubscribed from
    pub allowlist: Vec<String>,

    /// Visit each distinct URL once
    pub dedup: bool,
}

/// Outbound request settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct UnsubscribeConfig {
    pub timeout_secs: u64,

    pub concurrency: usize,

    pub user_agent: String,

    /// Skip the network entirely
    pub dry_run: bool,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// CSV export target
    pub csv_path: Option<String>,

    /// Per-message progress line
    pub progress: bool,

    /// Subject characters shown in progress
    pub subject_width: usize,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            batch_size: 150,
            api_base: "https://gmail.googleapis.com/gmail/v1".to_string(),
            access_token: None,
            messages_file: None,
            fetch_concurrency: 8,
            timeout_secs: 30,
            retry_attempts: 3,
            retry_delay_ms: 500,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            allowlist: DEFAULT_ALLOWLIST.iter().map(|d| d.to_string()).collect(),
            dedup: false,
        }
    }
}

impl Default for UnsubscribeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            concurrency: 4,
            user_agent: format!("unsubscriber/{}", env!("CARGO_PKG_VERSION")),
            dry_run: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: None,
            progress: true,
            subject_width: 100,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileRead {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            format: "TOML".to_string(),
            reason: e.to_string(),
        })
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay `UNSUBSCRIBER_*` variables onto this configuration
    pub fn apply_env(&mut self) {
        if let Ok(size) = std::env::var("UNSUBSCRIBER_BATCH_SIZE")
            && let Ok(n) = size.trim().parse::<usize>()
        {
            self.mailbox.batch_size = n;
        }

        if let Ok(list) = std::env::var("UNSUBSCRIBER_ALLOWLIST") {
            self.filter.allowlist = split_list(&list);
        }

        if let Ok(token) = std::env::var("UNSUBSCRIBER_ACCESS_TOKEN")
            && !token.trim().is_empty()
        {
            self.mailbox.access_token = Some(token.trim().to_string());
        }

        if let Ok(base) = std::env::var("UNSUBSCRIBER_API_BASE")
            && !base.trim().is_empty()
        {
            self.mailbox.api_base = base.trim().to_string();
        }

        if let Ok(timeout) = std::env::var("UNSUBSCRIBER_HTTP_TIMEOUT_SECS")
            && let Ok(secs) = timeout.trim().parse::<u64>()
        {
            self.unsubscribe.timeout_secs = secs;
            self.mailbox.timeout_secs = secs;
        }

        if let Ok(n) = std::env::var("UNSUBSCRIBER_CONCURRENCY")
            && let Ok(n) = n.trim().parse::<usize>()
        {
            self.unsubscribe.concurrency = n;
            self.mailbox.fetch_concurrency = n;
        }
    }

    /// Defaults, then `--config` file, then environment, then CLI flags
    pub fn load(cli: &crate::cli::Cli) -> Result<Self, ConfigError> {
        let mut config = match cli.config {
            Some(ref path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.merge_with_cli(cli);
        Ok(config)
    }

    /// Merge with CLI arguments, giving CLI precedence
    pub fn merge_with_cli(&mut self, cli: &crate::cli::Cli) {
        if let Some(n) = cli.batch_size {
            self.mailbox.batch_size = n;
        }
        if let Some(ref token) = cli.access_token {
            self.mailbox.access_token = Some(token.clone());
        }
        if let Some(ref base) = cli.api_base {
            self.mailbox.api_base = base.clone();
        }
        if let Some(ref path) = cli.messages {
            self.mailbox.messages_file = Some(path.clone());
        }

        if cli.no_default_allowlist {
            self.filter.allowlist = cli.allowlist.clone();
        } else {
            self.filter.allowlist.extend(cli.allowlist.iter().cloned());
        }
        if cli.dedup {
            self.filter.dedup = true;
        }

        if let Some(n) = cli.concurrency {
            self.unsubscribe.concurrency = n;
            self.mailbox.fetch_concurrency = n;
        }
        if let Some(secs) = cli.http_timeout {
            self.unsubscribe.timeout_secs = secs;
            self.mailbox.timeout_secs = secs;
        }
        if cli.dry_run {
            self.unsubscribe.dry_run = true;
        }

        if let Some(ref path) = cli.csv {
            self.output.csv_path = Some(path.clone());
        }
        if !cli.show_progress() {
            self.output.progress = false;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox.batch_size == 0 || self.mailbox.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "mailbox.batch_size".to_string(),
                value: self.mailbox.batch_size.to_string(),
                reason: format!("Batch size must be between 1 and {MAX_BATCH_SIZE}"),
            });
        }

        if url::Url::parse(&self.mailbox.api_base).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "mailbox.api_base".to_string(),
                value: self.mailbox.api_base.clone(),
                reason: "Must be an absolute URL".to_string(),
            });
        }

        if self.mailbox.fetch_concurrency == 0 || self.unsubscribe.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "concurrency".to_string(),
                value: "0".to_string(),
                reason: "Concurrency must be at least 1".to_string(),
            });
        }

        if self.unsubscribe.timeout_secs == 0 || self.mailbox.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        if let Some(bad) = self
            .filter
            .allowlist
            .iter()
            .find(|d| d.contains("://") || d.contains('/') || d.contains('@'))
        {
            return Err(ConfigError::InvalidValue {
                field: "filter.allowlist".to_string(),
                value: bad.clone(),
                reason: "Entries must be bare registrable domains".to_string(),
            });
        }

        Ok(())
    }

    pub fn allowlist(&self) -> Allowlist {
        Allowlist::new(&self.filter.allowlist)
    }

    pub fn unsubscribe_timeout(&self) -> Duration {
        Duration::from_secs(self.unsubscribe.timeout_secs)
    }

    pub fn mailbox_timeout(&self) -> Duration {
        Duration::from_secs(self.mailbox.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.mailbox.retry_delay_ms)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    FileRead {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse configuration format
    Parse { format: String, reason: String },

    /// Invalid configuration value
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path, source)
            }
            ConfigError::Parse { format, reason } => {
                write!(f, "Failed to parse {} config: {}", format, reason)
            }
            ConfigError::InvalidValue {
                field,
                value,
                reason,
            } => {
                write!(f, "Invalid value '{}' for '{}': {}", value, field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::FileRead { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use std::env;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.mailbox.batch_size, 150);
        assert_eq!(
            config.filter.allowlist,
            vec!["linkedin.com", "github.com", "google.com"]
        );
        assert!(!config.filter.dedup);
        assert!(!config.unsubscribe.dry_run);
        assert_eq!(config.output.subject_width, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.mailbox.batch_size = 0;
        assert!(config.validate().is_err());

        config.mailbox.batch_size = MAX_BATCH_SIZE + 1;
        assert!(config.validate().is_err());

        config.mailbox.batch_size = 50;
        config.unsubscribe.concurrency = 0;
        assert!(config.validate().is_err());

        config.unsubscribe.concurrency = 2;
        config.filter.allowlist = vec!["https://example.com".to_string()];
        assert!(config.validate().is_err());

        config.filter.allowlist = vec!["example.com".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_parsing() {
        let config = Config::from_toml(
            r#"
            [mailbox]
            batch_size = 25

            [filter]
            allowlist = ["example.org"]
            dedup = true

            [unsubscribe]
            timeout_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.mailbox.batch_size, 25);
        assert_eq!(config.filter.allowlist, vec!["example.org"]);
        assert!(config.filter.dedup);
        assert_eq!(config.unsubscribe_timeout(), Duration::from_secs(3));
        assert_eq!(config.unsubscribe.concurrency, 4);
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        let err = Config::from_toml("[mailbox]\nbatchsize = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[output]\nprogress = false").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert!(!config.output.progress);

        let missing = Config::from_file("/nonexistent/unsubscriber.toml").unwrap_err();
        assert!(missing.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_env_loading() {
        unsafe {
            env::set_var("UNSUBSCRIBER_BATCH_SIZE", "40");
            env::set_var("UNSUBSCRIBER_ALLOWLIST", "a.com, b.com,,");
            env::set_var("UNSUBSCRIBER_HTTP_TIMEOUT_SECS", "7");
        }

        let config = Config::from_env();
        assert_eq!(config.mailbox.batch_size, 40);
        assert_eq!(config.filter.allowlist, vec!["a.com", "b.com"]);
        assert_eq!(config.unsubscribe_timeout(), Duration::from_secs(7));

        // Clean up
        unsafe {
            env::remove_var("UNSUBSCRIBER_BATCH_SIZE");
            env::remove_var("UNSUBSCRIBER_ALLOWLIST");
            env::remove_var("UNSUBSCRIBER_HTTP_TIMEOUT_SECS");
        }
    }

    #[test]
    fn test_cli_precedence() {
        let cli = Cli::try_parse_from([
            "unsubscriber",
            "--messages",
            "m.json",
            "--batch-size",
            "10",
            "--allowlist",
            "x.com",
            "--dry-run",
            "--concurrency",
            "2",
        ])
        .unwrap();
        let mut config = Config::default();
        config.merge_with_cli(&cli);
        assert_eq!(config.mailbox.batch_size, 10);
        assert_eq!(config.mailbox.messages_file.as_deref(), Some("m.json"));
        assert!(config.unsubscribe.dry_run);
        assert_eq!(config.unsubscribe.concurrency, 2);
        assert!(config.allowlist().contains("x.com"));
        assert!(config.allowlist().contains("github.com"));

        let cli = Cli::try_parse_from([
            "unsubscriber",
            "--no-default-allowlist",
            "--allowlist",
            "x.com",
        ])
        .unwrap();
        let mut config = Config::default();
        config.merge_with_cli(&cli);
        assert_eq!(config.allowlist().len(), 1);
        assert!(!config.allowlist().contains("github.com"));
    }
}
