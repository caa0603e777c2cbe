//! Domain classification with Public Suffix List integration.
//!
//! Every candidate URL is paired with the registrable domain of its host:
//! - mail.example.co.uk -> example.co.uk
//! - news.example.com -> example.com
//! - mysite.github.io -> mysite.github.io (github.io is a public suffix)
//!
//! A host with no registrable domain (IP literal, bare public suffix,
//! unparseable URL) is skipped and reported, never guessed at.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::debug;
use url::{Host, Url};

use crate::errors::RecoveredError;

/// Allowlist used when neither config nor CLI supply one.
pub const DEFAULT_ALLOWLIST: &[&str] = &["linkedin.com", "github.com", "google.com"];

/// Public-suffix view of a hostname.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainInfo {
    /// The host as given, normalized
    pub full_domain: String,
    /// What you can actually register
    pub registrable_domain: Option<String>,
    /// Labels left of the registrable domain
    pub subdomain: Option<String>,
    /// Effective TLD
    pub suffix: Option<String>,
}

impl DomainInfo {
    pub fn parse(domain: &str) -> Option<Self> {
        let domain = clean_domain_input(domain)?;
        let registrable_domain = psl::domain_str(&domain).map(str::to_string);
        let subdomain = registrable_domain
            .as_deref()
            .and_then(|reg| subdomain_for(&domain, reg));
        let suffix = psl::suffix_str(&domain)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Some(DomainInfo {
            full_domain: domain,
            registrable_domain,
            subdomain,
            suffix,
        })
    }
}

/// Registrable domain of a hostname, if the PSL yields one.
pub fn registrable_domain(host: &str) -> Option<String> {
    DomainInfo::parse(host)?.registrable_domain
}

/// Registrable domain of a URL's host.
pub fn registrable_domain_for_url(url: &str) -> Result<String, RecoveredError> {
    let parsed =
        Url::parse(url).map_err(|e| RecoveredError::classification(url, format!("unparseable URL: {e}")))?;

    let host = match parsed.host() {
        Some(Host::Domain(host)) => host,
        Some(Host::Ipv4(ip)) => {
            return Err(RecoveredError::classification(url, format!("IP host {ip}")));
        }
        Some(Host::Ipv6(ip)) => {
            return Err(RecoveredError::classification(url, format!("IP host {ip}")));
        }
        None => return Err(RecoveredError::classification(url, "URL has no host")),
    };

    registrable_domain(host).ok_or_else(|| {
        RecoveredError::classification(url, format!("'{host}' has no registrable domain"))
    })
}

/// A URL paired with its registrable domain. The URL text is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClassifiedLink {
    pub domain: String,
    pub url: String,
}

impl ClassifiedLink {
    pub fn new(domain: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            url: url.into(),
        }
    }
}

/// Output of [`classify`]: pairs in input order plus the skipped URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub links: Vec<ClassifiedLink>,
    pub skipped: Vec<RecoveredError>,
}

impl Classification {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Pair each URL with its registrable domain, preserving order and duplicates.
pub fn classify<I, S>(urls: I) -> Classification
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Classification::default();
    for url in urls {
        let url = url.as_ref();
        match registrable_domain_for_url(url) {
            Ok(domain) => out.links.push(ClassifiedLink::new(domain, url)),
            Err(diag) => {
                debug!(kind = diag.kind(), "{diag}");
                out.skipped.push(diag);
            }
        }
    }
    out
}

/// Registrable domains exempt from unsubscribing. Stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist {
    domains: BTreeSet<String>,
}

impl Allowlist {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .filter_map(|d| clean_domain_input(d.as_ref()))
                .collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(DEFAULT_ALLOWLIST)
    }

    /// Case-insensitive membership.
    pub fn contains(&self, domain: &str) -> bool {
        clean_domain_input(domain).is_some_and(|d| self.domains.contains(&d))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Pairs whose domain is not allowlisted, in their original order.
pub fn filter(classified: &[ClassifiedLink], allowlist: &Allowlist) -> Vec<ClassifiedLink> {
    classified
        .iter()
        .filter(|link| !allowlist.contains(&link.domain))
        .cloned()
        .collect()
}

/// `(kept, exempted)`; both halves keep their original relative order.
pub fn partition(
    classified: &[ClassifiedLink],
    allowlist: &Allowlist,
) -> (Vec<ClassifiedLink>, Vec<ClassifiedLink>) {
    classified
        .iter()
        .cloned()
        .partition(|link| !allowlist.contains(&link.domain))
}

/// Drop repeated URLs, keeping the first occurrence.
pub fn dedup_preserving_order(links: Vec<ClassifiedLink>) -> Vec<ClassifiedLink> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.url.clone()))
        .collect()
}

fn clean_domain_input(domain: &str) -> Option<String> {
    let clean = domain.trim().trim_end_matches('.').to_lowercase();
    if clean.is_empty() {
        return None;
    }
    // Url stores IDN hosts as punycode, so compare in that form.
    match Host::parse(&clean) {
        Ok(Host::Domain(ascii)) => Some(ascii),
        _ => Some(clean),
    }
}

fn subdomain_for(full_domain: &str, registrable: &str) -> Option<String> {
    if full_domain.len() <= registrable.len() + 1 {
        return None;
    }
    let prefix = full_domain.strip_suffix(registrable)?.strip_suffix('.')?;
    (!prefix.is_empty()).then(|| prefix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(pairs: &[(&str, &str)]) -> Vec<ClassifiedLink> {
        pairs
            .iter()
            .map(|(d, u)| ClassifiedLink::new(*d, *u))
            .collect()
    }

    #[test]
    fn test_complex_tld() {
        let info = DomainInfo::parse("subdomain.example.co.uk").unwrap();
        assert_eq!(info.registrable_domain, Some("example.co.uk".to_string()));
        assert_eq!(info.subdomain, Some("subdomain".to_string()));
        assert_eq!(info.suffix, Some("co.uk".to_string()));
    }

    #[test]
    fn test_special_public_suffix() {
        assert_eq!(
            registrable_domain("mysite.github.io").as_deref(),
            Some("mysite.github.io")
        );
        assert_eq!(registrable_domain("github.io"), None);
    }

    #[test]
    fn test_domain_cleaning() {
        let info = DomainInfo::parse("Example.Com.").unwrap();
        assert_eq!(info.full_domain, "example.com");
        assert_eq!(info.registrable_domain.as_deref(), Some("example.com"));
        assert_eq!(info.subdomain, None);
    }

    #[test]
    fn test_multi_level_subdomains() {
        let info = DomainInfo::parse("a.b.c.example.co.uk").unwrap();
        assert_eq!(info.registrable_domain.as_deref(), Some("example.co.uk"));
        assert_eq!(info.subdomain.as_deref(), Some("a.b.c"));
    }

    #[test]
    fn classify_uses_public_suffix_list() {
        let c = classify(["https://mail.shop.co.uk/x"]);
        assert_eq!(c.links, links(&[("shop.co.uk", "https://mail.shop.co.uk/x")]));
        assert_eq!(c.skipped_count(), 0);
    }

    #[test]
    fn classify_keeps_url_text_verbatim() {
        let url = "https://News.Example.COM/UnSub?a=1&b=%20";
        let c = classify([url]);
        assert_eq!(c.links[0].url, url);
        assert_eq!(c.links[0].domain, "example.com");
    }

    #[test]
    fn classify_skips_and_counts_failures() {
        let c = classify([
            "https://a.example.com/u",
            "not a url",
            "http://192.168.1.10/unsubscribe",
            "http://[::1]/unsubscribe",
            "https://co.uk/unsubscribe",
            "https://b.example.org/u",
        ]);
        assert_eq!(
            c.links,
            links(&[
                ("example.com", "https://a.example.com/u"),
                ("example.org", "https://b.example.org/u"),
            ])
        );
        assert_eq!(c.skipped_count(), 4);
        assert!(
            c.skipped
                .iter()
                .all(|d| d.kind() == "classification_failure")
        );
    }

    #[test]
    fn duplicates_are_preserved_by_default() {
        let c = classify(["https://x.com/u", "https://x.com/u"]);
        assert_eq!(c.links.len(), 2);
        assert_eq!(c.links[0], c.links[1]);
    }

    #[test]
    fn dedup_is_opt_in_and_order_preserving() {
        let input = links(&[
            ("x.com", "https://x.com/u"),
            ("y.com", "https://y.com/u"),
            ("x.com", "https://x.com/u"),
        ]);
        let out = dedup_preserving_order(input);
        assert_eq!(
            out,
            links(&[("x.com", "https://x.com/u"), ("y.com", "https://y.com/u")])
        );
    }

    #[test]
    fn filter_removes_allowlisted_case_insensitively() {
        let input = links(&[
            ("a.com", "https://a.com/1"),
            ("linkedin.com", "https://linkedin.com/u"),
            ("b.com", "https://b.com/2"),
            ("LinkedIn.com", "https://LinkedIn.com/u"),
            ("c.com", "https://c.com/3"),
        ]);
        let allow = Allowlist::new(["LINKEDIN.com"]);
        let kept = filter(&input, &allow);
        assert_eq!(
            kept,
            links(&[
                ("a.com", "https://a.com/1"),
                ("b.com", "https://b.com/2"),
                ("c.com", "https://c.com/3"),
            ])
        );
    }

    #[test]
    fn partition_splits_both_ways() {
        let input = links(&[
            ("x.com", "https://x.com/unsub"),
            ("y.com", "https://y.com/unsubscribe"),
        ]);
        let (kept, exempt) = partition(&input, &Allowlist::new(["x.com"]));
        assert_eq!(kept, links(&[("y.com", "https://y.com/unsubscribe")]));
        assert_eq!(exempt, links(&[("x.com", "https://x.com/unsub")]));
    }

    #[test]
    fn builtin_allowlist() {
        let allow = Allowlist::builtin();
        assert_eq!(allow.len(), 3);
        assert!(allow.contains("github.com"));
        assert!(allow.contains("Google.com."));
        assert!(!allow.contains("example.com"));
        assert!(Allowlist::new(["", "  "]).is_empty());
    }

    #[test]
    fn unicode_allowlist_entry_matches_punycode_host() {
        let c = classify(["https://news.bücher.de/unsubscribe"]);
        assert_eq!(c.links[0].domain, "xn--bcher-kva.de");

        let allow = Allowlist::new(["Bücher.de"]);
        assert!(allow.contains("xn--bcher-kva.de"));
        assert!(allow.contains("bücher.de"));
        assert!(filter(&c.links, &allow).is_empty());
    }
}
