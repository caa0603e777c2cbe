//! Unsubscriber Library
//!
//! Finds unsubscribe links in mailbox messages and decides which ones to
//! visit. This library provides functionality to:
//!
//! - Extract candidate links from `List-Unsubscribe` headers and text bodies
//! - Reduce each link's host to its registrable domain (Public Suffix List)
//! - Split links on a domain allowlist
//! - Read messages from the Gmail API or a JSON file, and visit kept links
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use unsubscriber::classify::{Allowlist, classify, filter};
//! use unsubscriber::extract::extract;
//!
//! let message = json!({"payload": {"headers": [
//!     {"name": "List-Unsubscribe", "value": "<https://news.example.co.uk/u?id=1>"}
//! ]}});
//!
//! let links = extract(&message);
//! let classified = classify(&links).links;
//! assert_eq!(classified[0].domain, "example.co.uk");
//!
//! let kept = filter(&classified, &Allowlist::new(["github.com"]));
//! assert_eq!(kept.len(), 1);
//! ```

pub mod app;
pub mod classify;
pub mod cli;
pub mod config;
pub mod errors;
pub mod extract;
pub mod facade;
pub mod message;
pub mod output;
pub mod retry;
pub mod sources;
pub mod structured_output;
pub mod styled_output;
pub mod unsubscribe;

// Re-export commonly used types and functions for convenience
pub use classify::{Allowlist, ClassifiedLink, classify, filter};
pub use errors::{RecoveredError, Result, UnsubscriberError};
pub use extract::{Extractor, extract};
pub use facade::{SweepOptions, SweepReport, Sweeper};
pub use output::{OutputFormat, RunResults};
pub use sources::{FileSource, GmailSource, MailboxSource};
pub use styled_output::StyledFormatter;
pub use unsubscribe::{Unsubscriber, VisitOutcome};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
