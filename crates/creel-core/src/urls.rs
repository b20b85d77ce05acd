//! URL identity rules.
//!
//! A normalized URL drops the fragment and query, removes a trailing slash and
//! collapses the root path, so `https://a.com/`, `https://a.com/?x=1` and
//! `https://a.com#top` all share one key. Domain equality additionally ignores
//! a leading `www.` and everything after the host.

use url::Url;

/// Normalize a URL for identity comparison.
///
/// Unparseable input is returned unchanged.
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let Ok(parsed) = Url::parse(raw.trim()) else {
        return raw.to_string();
    };

    let Some(host) = parsed.host_str() else {
        return raw.to_string();
    };

    let mut authority = host.to_string();
    if let Some(port) = parsed.port() {
        authority.push(':');
        authority.push_str(&port.to_string());
    }

    let path = parsed.path().trim_end_matches('/');
    format!("{}://{}{}", parsed.scheme(), authority, path)
}

/// Host of a URL, lowercased and without a leading `www.`.
#[must_use]
pub fn domain_key(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Whether two URLs point at the same domain, ignoring `www.`.
///
/// Invalid URLs never match.
#[must_use]
pub fn same_domain(a: &str, b: &str) -> bool {
    match (domain_key(a), domain_key(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Resolve a possibly-relative link against the page it appeared on.
#[must_use]
pub fn resolve_link(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    let joined = base.join(href.trim()).ok()?;
    match joined.scheme() {
        "http" | "https" => Some(joined.to_string()),
        _ => None,
    }
}
