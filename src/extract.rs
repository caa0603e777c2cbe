//! Unsubscribe link extraction.
//!
//! Turns one untyped message into the candidate unsubscribe URLs it carries:
//!   1. `List-Unsubscribe` headers: every `<http(s)://...>` span. `mailto:`
//!      entries never match.
//!   2. `text/plain` / `text/html` parts: every whitespace-delimited
//!      `http(s)://` token whose lowercase form contains "unsubscribe".
//!
//! Header links come first (header order), then body links (part order).
//! Nothing is deduplicated and URL text is never rewritten.
//!
//! Extraction cannot fail. Unexpected shapes and undecodable parts are
//! skipped and recorded as `RecoveredError` diagnostics on the result.

use std::borrow::Cow;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::RecoveredError;
use crate::message::{BodyData, HeaderView, MessageView, PartView, Shape};

/// Header carrying RFC 2369 unsubscribe targets.
pub const LIST_UNSUBSCRIBE: &str = "List-Unsubscribe";

/// Part MIME types scanned for inline links.
pub const TEXT_MIME_TYPES: &[&str] = &["text/plain", "text/html"];

static HEADER_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(https?://[^>]+)>").expect("header link regex"));

static BODY_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+").expect("body url regex"));

/// Gmail emits base64url, sometimes padded and sometimes not.
const BASE64URL_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// How `body.data` is encoded by the mailbox source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyEncoding {
    /// Data is already text.
    #[default]
    Plain,
    /// Data is base64url (Gmail API `format=full`).
    Base64Url,
}

/// Where a candidate link was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum LinkOrigin {
    Header { header_index: usize },
    Body { part_index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateLink {
    pub url: String,
    pub origin: LinkOrigin,
}

/// Links found in one message plus whatever was skipped along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub links: Vec<CandidateLink>,
    pub diagnostics: Vec<RecoveredError>,
}

impl Extraction {
    pub fn urls(&self) -> Vec<String> {
        self.links.iter().map(|l| l.url.clone()).collect()
    }

    pub fn into_urls(self) -> Vec<String> {
        self.links.into_iter().map(|l| l.url).collect()
    }

    fn skip(&mut self, diag: RecoveredError) {
        debug!(kind = diag.kind(), "{diag}");
        self.diagnostics.push(diag);
    }
}

/// Extraction result tagged with the message's position in its batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLinks {
    pub index: usize,
    pub message_id: Option<String>,
    pub extraction: Extraction,
}

/// Stateless link extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    encoding: BodyEncoding,
}

impl Extractor {
    pub fn new(encoding: BodyEncoding) -> Self {
        Self { encoding }
    }

    /// Candidate URLs only.
    pub fn extract(&self, message: &Value) -> Vec<String> {
        self.extract_with_report(message).into_urls()
    }

    /// Candidate links with their origin, plus diagnostics for skipped units.
    pub fn extract_with_report(&self, message: &Value) -> Extraction {
        let mut out = Extraction::default();

        let view = match MessageView::new(message) {
            Ok(view) => view,
            Err(found) => {
                out.skip(RecoveredError::malformed(
                    "message",
                    format!("expected object, found {found}"),
                ));
                return out;
            }
        };

        let payload = match view.payload() {
            Shape::Found(p) => p,
            Shape::Missing => return out,
            Shape::Mismatch(found) => {
                out.skip(RecoveredError::malformed(
                    "payload",
                    format!("expected object, found {found}"),
                ));
                return out;
            }
        };

        match payload.headers() {
            Shape::Found(headers) => self.scan_headers(headers, &mut out),
            Shape::Missing => {}
            Shape::Mismatch(found) => out.skip(RecoveredError::malformed(
                "payload.headers",
                format!("expected array, found {found}"),
            )),
        }

        match payload.parts() {
            Shape::Found(parts) => self.scan_parts(parts, &mut out),
            Shape::Missing => {}
            Shape::Mismatch(found) => out.skip(RecoveredError::malformed(
                "payload.parts",
                format!("expected array, found {found}"),
            )),
        }

        out
    }

    fn scan_headers(&self, headers: &[Value], out: &mut Extraction) {
        for (i, raw) in headers.iter().enumerate() {
            let header = match HeaderView::new(raw) {
                Ok(h) => h,
                Err(found) => {
                    out.skip(RecoveredError::malformed(
                        format!("payload.headers[{i}]"),
                        format!("expected object, found {found}"),
                    ));
                    continue;
                }
            };

            match header.name() {
                Shape::Found(LIST_UNSUBSCRIBE) => {}
                Shape::Mismatch(found) => {
                    out.skip(RecoveredError::malformed(
                        format!("payload.headers[{i}].name"),
                        format!("expected string, found {found}"),
                    ));
                    continue;
                }
                _ => continue,
            }

            let value = match header.value() {
                Shape::Found(v) => v,
                Shape::Missing => "",
                Shape::Mismatch(found) => {
                    out.skip(RecoveredError::malformed(
                        format!("payload.headers[{i}].value"),
                        format!("expected string, found {found}"),
                    ));
                    continue;
                }
            };

            out.links.extend(header_links(value).map(|url| CandidateLink {
                url: url.to_string(),
                origin: LinkOrigin::Header { header_index: i },
            }));
        }
    }

    fn scan_parts(&self, parts: &[Value], out: &mut Extraction) {
        for (i, raw) in parts.iter().enumerate() {
            let part = match PartView::new(raw) {
                Ok(p) => p,
                Err(found) => {
                    out.skip(RecoveredError::malformed(
                        format!("payload.parts[{i}]"),
                        format!("expected object, found {found}"),
                    ));
                    continue;
                }
            };

            match part.mime_type() {
                Shape::Found(mime) if TEXT_MIME_TYPES.contains(&mime) => {}
                Shape::Mismatch(found) => {
                    out.skip(RecoveredError::malformed(
                        format!("payload.parts[{i}].mimeType"),
                        format!("expected string, found {found}"),
                    ));
                    continue;
                }
                _ => continue,
            }

            let data = match part.body_data() {
                BodyData::Text(data) if !data.is_empty() => data,
                BodyData::Text(_) | BodyData::Absent => continue,
                BodyData::BadBody(found) => {
                    out.skip(RecoveredError::malformed(
                        format!("payload.parts[{i}].body"),
                        format!("expected object, found {found}"),
                    ));
                    continue;
                }
                BodyData::BadData(found) => {
                    out.skip(RecoveredError::malformed(
                        format!("payload.parts[{i}].body.data"),
                        format!("expected string, found {found}"),
                    ));
                    continue;
                }
            };

            let text = match self.decode(data) {
                Ok(text) => text,
                Err(reason) => {
                    out.skip(RecoveredError::decode(
                        format!("payload.parts[{i}].body.data"),
                        reason,
                    ));
                    continue;
                }
            };

            out.links.extend(body_links(&text).map(|url| CandidateLink {
                url: url.to_string(),
                origin: LinkOrigin::Body { part_index: i },
            }));
        }
    }

    fn decode<'a>(&self, data: &'a str) -> Result<Cow<'a, str>, String> {
        match self.encoding {
            BodyEncoding::Plain => Ok(Cow::Borrowed(data)),
            BodyEncoding::Base64Url => {
                let bytes = BASE64URL_LENIENT
                    .decode(data.trim_end())
                    .map_err(|e| format!("invalid base64url: {e}"))?;
                String::from_utf8(bytes)
                    .map(Cow::Owned)
                    .map_err(|e| format!("invalid UTF-8: {e}"))
            }
        }
    }
}

/// Bracketed http(s) targets in a `List-Unsubscribe` value.
pub fn header_links(value: &str) -> impl Iterator<Item = &str> {
    HEADER_LINK_RE
        .captures_iter(value)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// Whitespace-delimited http(s) tokens mentioning "unsubscribe".
pub fn body_links(text: &str) -> impl Iterator<Item = &str> {
    BODY_URL_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|url| url.to_lowercase().contains("unsubscribe"))
}

/// Extract from a message whose body data is plain text.
pub fn extract(message: &Value) -> Vec<String> {
    Extractor::default().extract(message)
}

/// Run the extractor over a batch, tagging each result with its index.
pub fn extract_all<'a, I>(extractor: &Extractor, messages: I) -> Vec<MessageLinks>
where
    I: IntoIterator<Item = &'a Value>,
{
    messages
        .into_iter()
        .enumerate()
        .map(|(index, message)| MessageLinks {
            index,
            message_id: MessageView::new(message)
                .ok()
                .and_then(|v| v.id())
                .map(str::to_string),
            extraction: extractor.extract_with_report(message),
        })
        .collect()
}

/// Rebuild the batch-wide URL list in message order.
pub fn aggregate(results: &[MessageLinks]) -> (Vec<String>, Vec<RecoveredError>) {
    let mut ordered: Vec<&MessageLinks> = results.iter().collect();
    ordered.sort_by_key(|r| r.index);
    let mut urls = Vec::new();
    let mut diagnostics = Vec::new();
    for r in ordered {
        urls.extend(r.extraction.links.iter().map(|l| l.url.clone()));
        diagnostics.extend(r.extraction.diagnostics.iter().cloned());
    }
    (urls, diagnostics)
}
