//! Domain-level comparison of reported and observed site lists.

use std::collections::HashSet;

use creel_core::urls::{domain_key, normalize_url};

use crate::tabular::Row;

/// Column holding the site URL in the starter table.
pub const REPORTED_URL_COLUMN: &str = "url";
/// Column holding the shop website in a shop export.
pub const OBSERVED_URL_COLUMN: &str = "website";
/// Column flagging shops whose site links to a report.
pub const OBSERVED_FLAG_COLUMN: &str = "has_report";

/// Result of comparing the two lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Every observed domain is already reported
    NothingMissing,
    /// Observed domains absent from the reported list
    Missing {
        /// Observed URLs with no domain-equal reported URL, in input order
        urls: Vec<String>,
        /// Reported rows followed by one `{url}` row per missing URL
        rows: Vec<Row>,
    },
}

/// Domain identity of a table cell, accepting bare hosts like `shop.com`.
fn cell_domain(value: &str) -> Option<String> {
    let value = value.trim();
    if value.contains("://") {
        domain_key(value)
    } else {
        domain_key(&format!("https://{value}"))
    }
}

/// Non-blank values of `column`, de-duplicated by normalized URL in order.
fn unique_urls<'a>(rows: impl Iterator<Item = &'a Row>, column: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.filter_map(|row| row.text(column))
        .filter(|url| seen.insert(normalize_url(url)))
        .collect()
}

/// Find observed sites with a report link that the reported list lacks.
///
/// Observed rows are filtered to those with a truthy
/// [`OBSERVED_FLAG_COLUMN`]. Headers are expected in normalized form.
#[must_use]
pub fn reconcile(reported: &[Row], observed: &[Row]) -> Reconciliation {
    let reported_urls = unique_urls(reported.iter(), REPORTED_URL_COLUMN);
    let observed_urls = unique_urls(
        observed.iter().filter(|row| row.flag(OBSERVED_FLAG_COLUMN)),
        OBSERVED_URL_COLUMN,
    );

    let known: HashSet<String> = reported_urls.iter().filter_map(|u| cell_domain(u)).collect();

    let mut added = HashSet::new();
    let missing: Vec<String> = observed_urls
        .into_iter()
        .filter(|url| match cell_domain(url) {
            Some(domain) => !known.contains(&domain) && added.insert(domain),
            None => {
                tracing::debug!("Skipping unparseable website {}", url);
                false
            }
        })
        .collect();

    tracing::info!(
        "{} reported, {} missing from observed shops",
        reported_urls.len(),
        missing.len()
    );

    if missing.is_empty() {
        return Reconciliation::NothingMissing;
    }

    let mut rows = reported.to_vec();
    rows.extend(
        missing
            .iter()
            .map(|url| Row::new().with(REPORTED_URL_COLUMN, url.as_str())),
    );
    Reconciliation::Missing {
        urls: missing,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reported(urls: &[&str]) -> Vec<Row> {
        urls.iter()
            .map(|u| Row::new().with("url", *u).with("keywords", "report"))
            .collect()
    }

    fn observed(entries: &[(&str, bool)]) -> Vec<Row> {
        entries
            .iter()
            .map(|(u, has_report)| Row::new().with("website", *u).with("has_report", *has_report))
            .collect()
    }

    #[test]
    fn test_nothing_missing_when_domains_match() {
        let reported = reported(&["https://www.bozemanangler.com/reports/", "https://troutfitters.com"]);
        let observed = observed(&[
            ("https://bozemanangler.com/?utm=maps", true),
            ("http://troutfitters.com/shop", true),
        ]);
        assert_eq!(reconcile(&reported, &observed), Reconciliation::NothingMissing);
    }

    #[test]
    fn test_missing_rows_appended_after_reported() {
        let reported = reported(&["https://bozemanangler.com"]);
        let observed = observed(&[
            ("https://riversedge.com/", true),
            ("https://noreports.com", false),
            ("https://www.riversedge.com/fishing-report", true),
            ("https://bozemanangler.com/", true),
            ("https://madisonoutfitters.com", true),
        ]);

        let Reconciliation::Missing { urls, rows } = reconcile(&reported, &observed) else {
            panic!("expected missing urls");
        };
        assert_eq!(urls, vec!["https://riversedge.com/", "https://madisonoutfitters.com"]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], reported[0]);
        assert_eq!(rows[1].text("url").as_deref(), Some("https://riversedge.com/"));
        assert_eq!(rows[2].keys().collect::<Vec<_>>(), vec!["url"]);
    }

    #[test]
    fn test_bare_hosts_compare_by_domain() {
        let reported = reported(&["bozemanangler.com"]);
        let observed = observed(&[("https://www.bozemanangler.com/report", true)]);
        assert_eq!(reconcile(&reported, &observed), Reconciliation::NothingMissing);
    }

    #[test]
    fn test_no_website_placeholder_is_not_missing() {
        let observed = observed(&[("No Website", true), ("", true)]);
        assert_eq!(reconcile(&[], &observed), Reconciliation::NothingMissing);
    }
}
