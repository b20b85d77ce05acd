//! Recency and river filtering of crawled reports.
//!
//! Only dates with an explicit four-digit year count. Recognized shapes:
//! `May 12, 2024`, `12 May 2024`, `Sept. 3rd 2024`, `May 2024`,
//! `2024-05-12`, `2024/05/12` and US-style `5/12/2024`.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use creel_scanner::{includes_any, Report};

/// Earliest year a report date is trusted.
pub const MIN_REPORT_YEAR: i32 = 2020;

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?";

static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b{MONTH}\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"
    ))
    .expect("valid month-day-year regex")
});

static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{MONTH},?\s+(\d{{4}})\b"
    ))
    .expect("valid day-month-year regex")
});

static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b{MONTH},?\s+(\d{{4}})\b")).expect("valid month-year regex")
});

static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})\b").expect("valid iso date regex")
});

static US_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{4})\b").expect("valid us date regex")
});

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn ymd(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

/// Every explicit-year date mentioned in `text`.
#[must_use]
pub fn find_dates(text: &str) -> Vec<NaiveDate> {
    let mut dates = Vec::new();

    for caps in MONTH_DAY_YEAR.captures_iter(text) {
        if let Some(date) = month_number(&caps[1]).and_then(|m| ymd(&caps[3], m, &caps[2])) {
            dates.push(date);
        }
    }
    for caps in DAY_MONTH_YEAR.captures_iter(text) {
        if let Some(date) = month_number(&caps[2]).and_then(|m| ymd(&caps[3], m, &caps[1])) {
            dates.push(date);
        }
    }
    for caps in MONTH_YEAR.captures_iter(text) {
        if let Some(date) = month_number(&caps[1]).and_then(|m| ymd(&caps[2], m, "1")) {
            dates.push(date);
        }
    }
    for caps in ISO_DATE.captures_iter(text) {
        if let Some(date) = caps[2].parse().ok().and_then(|m| ymd(&caps[1], m, &caps[3])) {
            dates.push(date);
        }
    }
    for caps in US_DATE.captures_iter(text) {
        if let Some(date) = caps[1].parse().ok().and_then(|m| ymd(&caps[3], m, &caps[2])) {
            dates.push(date);
        }
    }

    dates
}

/// Most recent date in `text` whose year lies in
/// [`MIN_REPORT_YEAR`]..=`today`'s year.
#[must_use]
pub fn extract_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    find_dates(text)
        .into_iter()
        .filter(|date| (MIN_REPORT_YEAR..=today.year()).contains(&date.year()))
        .max()
}

/// Which reports are worth summarizing.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    /// Reports dated more than this many days before today are dropped
    pub max_age_days: i64,
    /// When set, a report must mention one of these (case-insensitive)
    pub rivers: Option<Vec<String>>,
}

impl ReportFilter {
    /// Keep dated, recent, on-topic reports and record their dates.
    #[must_use]
    pub fn apply(&self, reports: Vec<Report>, today: NaiveDate) -> Vec<Report> {
        let before = reports.len();
        let kept: Vec<Report> = reports
            .into_iter()
            .filter_map(|mut report| {
                let rendered = report.render();
                let date = extract_date(&rendered, today)?;
                if (today - date).num_days() > self.max_age_days {
                    return None;
                }
                if let Some(rivers) = &self.rivers {
                    if !includes_any(&rendered, rivers) {
                        return None;
                    }
                }
                report.extracted_date = Some(date);
                Some(report)
            })
            .collect();

        tracing::info!("Kept {} of {} reports after filtering", kept.len(), before);
        kept
    }
}
