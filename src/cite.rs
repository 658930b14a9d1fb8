use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Locale, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::archive::Memento;
use crate::lookup::{Attribute, ReferenceAttributes};

pub const DEFAULT_LOCALE: &str = "en_US";

static AUTHOR_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<first>[\w\s]*) (?P<last>\w*)").expect("author name regex")
});

/// Fields of an English Wikipedia `{{cite web}}` template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Citation {
    pub last: String,
    pub first: String,
    pub title: String,
    pub url: String,
    pub date: String,
    pub work: String,
    pub publisher: String,
    pub archive_url: String,
    pub archive_date: String,
    pub subscription: bool,
}

impl Citation {
    pub fn new(attributes: &ReferenceAttributes, memento: Option<&Memento>) -> Self {
        let locale = match attributes.get(Attribute::Locale) {
            "" => DEFAULT_LOCALE,
            l => l,
        };

        let date = parse_date(attributes.get(Attribute::Date))
            .map(|d| format_long_date(d, locale))
            .unwrap_or_default();
        if date.is_empty() && !attributes.get(Attribute::Date).is_empty() {
            tracing::warn!(
                raw = attributes.get(Attribute::Date),
                "unrecognised date; leaving it out"
            );
        }

        let (first, last) = split_author(attributes.get(Attribute::Authors));

        let (archive_url, archive_date) = match memento {
            Some(m) => (
                m.memento_url.clone(),
                format_long_date(m.timestamp.date(), locale),
            ),
            None => (String::new(), String::new()),
        };

        Self {
            last,
            first,
            title: attributes.get(Attribute::Title).to_string(),
            url: attributes.get(Attribute::Url).to_string(),
            date,
            work: attributes.get(Attribute::Work).to_string(),
            publisher: attributes.get(Attribute::Publisher).to_string(),
            archive_url,
            archive_date,
            subscription: attributes
                .get(Attribute::Access)
                .eq_ignore_ascii_case("false"),
        }
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let access = if self.subscription {
            "|url-access=subscription"
        } else {
            ""
        };
        let raw = format!(
            "{{{{cite web |last={} |first={} |title={} |url={} |date={} |work={} |publisher={} \
             |archive-url={} |archive-date={} |url-status=live {} }}}}",
            escape(&self.last),
            escape(&self.first),
            escape(&self.title),
            escape(&self.url),
            escape(&self.date),
            escape(&self.work),
            escape(&self.publisher),
            escape(&self.archive_url),
            escape(&self.archive_date),
            access,
        );
        // Collapse the gaps left by empty optional parts.
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        f.write_str(&collapsed)
    }
}

/// A bare `|` inside a value would start a new template parameter.
fn escape(value: &str) -> String {
    value.replace('|', "&#124;")
}

/// Splits a display name into `(first, last)`.
///
/// The last word is the surname; a single word is treated as a surname alone.
pub fn split_author(name: &str) -> (String, String) {
    let name = name.trim();
    match AUTHOR_NAME.captures(name) {
        Some(caps) => (
            caps["first"].trim().to_string(),
            caps["last"].trim().to_string(),
        ),
        None => (String::new(), name.to_string()),
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.date_naive());
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%d %B %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Long date form in `locale`, e.g. "January 5, 2021" or "5 janvier 2021".
///
/// Locales chrono has no month names for fall back to ISO 8601.
pub fn format_long_date(date: NaiveDate, locale: &str) -> String {
    let Some((language, locale)) = chrono_locale(locale) else {
        tracing::debug!(locale, "unknown locale; using ISO date");
        return date.format("%Y-%m-%d").to_string();
    };
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .format_localized(long_date_pattern(&language), locale)
        .to_string()
}

/// Accepts `xx_YY`, `xx-YY` and a bare language such as `fr`.
fn chrono_locale(raw: &str) -> Option<(String, Locale)> {
    let normalized = raw.trim().replace('-', "_");
    let (language, region) = match normalized.split_once('_') {
        Some((language, region)) => (language.to_ascii_lowercase(), region.to_ascii_uppercase()),
        None => {
            let language = normalized.to_ascii_lowercase();
            let region = match language.as_str() {
                "en" => "US".to_string(),
                "ja" => "JP".to_string(),
                "zh" => "CN".to_string(),
                "ko" => "KR".to_string(),
                "sv" => "SE".to_string(),
                "da" => "DK".to_string(),
                "nb" => "NO".to_string(),
                "cs" => "CZ".to_string(),
                "uk" => "UA".to_string(),
                "el" => "GR".to_string(),
                other => other.to_ascii_uppercase(),
            };
            (language, region)
        }
    };
    let locale = Locale::try_from(format!("{language}_{region}").as_str()).ok()?;
    Some((language, locale))
}

fn long_date_pattern(language: &str) -> &'static str {
    match language {
        "en" => "%B %-d, %Y",
        "de" | "da" | "nb" | "nn" | "fi" | "cs" | "sk" | "sl" | "hr" => "%-d. %B %Y",
        "hu" => "%Y. %B %-d.",
        "ja" | "zh" => "%Y年%-m月%-d日",
        "ko" => "%Y년 %-m월 %-d일",
        "es" | "pt" => "%-d de %B de %Y",
        _ => "%-d %B %Y",
    }
}
