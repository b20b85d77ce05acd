//! HTML extraction over serialized page content.
//!
//! Everything here is synchronous and works on an owned HTML string, so a
//! parsed document never lives across an await point.

use creel_core::urls::resolve_link;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{Result, ScanError};

/// Words on anchors or buttons that suggest an online store.
pub const SHOP_KEYWORDS: [&str; 6] = ["shop", "store", "buy", "products", "cart", "checkout"];

/// Anchor text that suggests a published fishing report.
pub const REPORT_LINK_KEYWORD: &str = "report";

/// Known social platforms by link domain, in reporting order.
pub const SOCIAL_MEDIA_MAP: [(&str, &str); 10] = [
    ("facebook.com", "Facebook"),
    ("instagram.com", "Instagram"),
    ("linkedin.com", "LinkedIn"),
    ("tiktok.com", "TikTok"),
    ("vimeo.com", "Vimeo"),
    ("whatsapp.com", "WhatsApp"),
    ("wa.me", "WhatsApp"),
    ("x.com", "X (Twitter)"),
    ("twitter.com", "X (Twitter)"),
    ("youtube.com", "YouTube"),
];

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").expect("valid email regex")
});

const SKIPPED_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

const BLOCK_TAGS: [&str; 24] = [
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "li", "main", "p", "section",
];

/// A link on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Absolute URL
    pub href: String,
    /// Anchor text, lowercased and trimmed
    pub text: String,
}

/// Compile a CSS selector.
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScanError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Rendered text of the first element matching `selector`.
///
/// Scripts, styles and hidden elements are skipped, whitespace within a line
/// is collapsed, and blank lines are dropped. Returns `None` when nothing
/// matches or the element has no visible text.
pub fn visible_text(html: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    let element = document.select(selector).next()?;
    render_text(element)
}

/// Every `a[href]` on the page that resolves to an http(s) URL.
pub fn anchors(html: &str, base_url: &str) -> Result<Vec<Anchor>> {
    let document = Html::parse_document(html);
    collect_anchors(&document, base_url)
}

/// Content and outbound links of one crawled page.
#[derive(Debug, Clone, Default)]
pub struct PageExtract {
    /// Visible text of the content element
    pub text: Option<String>,
    /// Links found anywhere on the page
    pub anchors: Vec<Anchor>,
}

/// Extract content text (when `selector` is given) and links in one parse.
pub fn extract_page(html: &str, base_url: &str, selector: Option<&Selector>) -> Result<PageExtract> {
    let document = Html::parse_document(html);
    let text = selector
        .and_then(|selector| document.select(selector).next())
        .and_then(render_text);
    Ok(PageExtract {
        text,
        anchors: collect_anchors(&document, base_url)?,
    })
}

fn collect_anchors(document: &Html, base_url: &str) -> Result<Vec<Anchor>> {
    let selector = parse_selector("a[href]")?;
    Ok(document
        .select(&selector)
        .filter_map(|a| {
            let href = resolve_link(base_url, a.value().attr("href")?)?;
            let text = a.text().collect::<String>().trim().to_lowercase();
            Some(Anchor { href, text })
        })
        .collect())
}

fn is_hidden(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

fn render_text(element: ElementRef<'_>) -> Option<String> {
    if is_hidden(&element) {
        return None;
    }

    let mut raw = String::new();
    walk_text(element, &mut raw);

    let lines: Vec<String> = raw
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn walk_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(inner) => {
                let name = inner.name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_hidden(&child_ref) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name) || matches!(name, "tr" | "table" | "ul" | "ol");
                if block {
                    out.push('\n');
                }
                walk_text(child_ref, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Contact and storefront signals read off a shop's page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShopSignals {
    /// Address from the first `mailto:` link
    pub mailto_email: Option<String>,
    /// First address found in the page text
    pub text_email: Option<String>,
    /// Absolute URL of the first link mentioning "contact"
    pub contact_link: Option<String>,
    /// An anchor or button mentions a shop keyword
    pub sells_online: bool,
    /// An anchor mentions a report
    pub has_report_link: bool,
    /// Recognized social platforms, deduplicated
    pub socials: Vec<String>,
}

impl ShopSignals {
    /// Read every signal from `html`, resolving links against `base_url`.
    pub fn from_html(html: &str, base_url: &str) -> Result<Self> {
        let document = Html::parse_document(html);
        let anchor_sel = parse_selector("a")?;
        let button_sel = parse_selector("button")?;
        let mailto_sel = parse_selector(r#"a[href^="mailto:"]"#)?;
        let contact_sel = parse_selector(r#"a[href*="contact"]"#)?;
        let body_sel = parse_selector("body")?;

        let mailto_email = document
            .select(&mailto_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(email_from_mailto);

        let text_email = document
            .select(&body_sel)
            .next()
            .and_then(render_text)
            .and_then(|text| EMAIL_REGEX.find(&text).map(|m| m.as_str().to_string()));

        let contact_link = document
            .select(&contact_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve_link(base_url, href));

        let anchor_texts: Vec<String> = document
            .select(&anchor_sel)
            .map(|a| a.text().collect::<String>().to_lowercase())
            .collect();
        let button_texts: Vec<String> = document
            .select(&button_sel)
            .map(|b| b.text().collect::<String>().to_lowercase())
            .collect();

        let sells_online = SHOP_KEYWORDS.iter().any(|keyword| {
            anchor_texts
                .iter()
                .chain(button_texts.iter())
                .any(|text| text.contains(keyword))
        });
        let has_report_link = anchor_texts
            .iter()
            .any(|text| text.contains(REPORT_LINK_KEYWORD));

        let hrefs: Vec<String> = document
            .select(&anchor_sel)
            .filter_map(|a| a.value().attr("href"))
            .map(|href| {
                resolve_link(base_url, href)
                    .unwrap_or_else(|| href.to_string())
                    .to_lowercase()
            })
            .collect();
        let mut socials: Vec<String> = Vec::new();
        for (domain, name) in SOCIAL_MEDIA_MAP {
            if hrefs.iter().any(|href| href.contains(domain)) && !socials.iter().any(|s| s == name) {
                socials.push(name.to_string());
            }
        }

        Ok(Self {
            mailto_email,
            text_email,
            contact_link,
            sells_online,
            has_report_link,
            socials,
        })
    }

    /// Best email on the page: a `mailto:` link first, then page text.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.mailto_email.as_deref().or(self.text_email.as_deref())
    }
}

fn email_from_mailto(href: &str) -> Option<String> {
    let address = href.strip_prefix("mailto:")?.split('?').next()?.trim();
    (!address.is_empty()).then(|| address.to_string())
}
