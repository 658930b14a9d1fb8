use std::collections::BTreeMap;

use serde_json::Value;
use url::Url;

use crate::metadata::{Format, Metadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    Url,
    Title,
    Authors,
    Date,
    Work,
    Publisher,
    Access,
    Locale,
}

impl Attribute {
    pub const ALL: [Attribute; 8] = [
        Attribute::Url,
        Attribute::Title,
        Attribute::Authors,
        Attribute::Date,
        Attribute::Work,
        Attribute::Publisher,
        Attribute::Access,
        Attribute::Locale,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Attribute::Url => "URL",
            Attribute::Title => "Title",
            Attribute::Authors => "Authors",
            Attribute::Date => "Date",
            Attribute::Work => "Work",
            Attribute::Publisher => "Publisher",
            Attribute::Access => "Free access",
            Attribute::Locale => "Locale",
        }
    }

    /// Ordered `(format, key path)` candidates; the first non-empty hit wins.
    pub fn lookups(self) -> &'static [(Format, &'static [&'static str])] {
        match self {
            Attribute::Url => LOOKUP_URL,
            Attribute::Title => LOOKUP_TITLE,
            Attribute::Authors => LOOKUP_AUTHOR,
            Attribute::Date => LOOKUP_DATE,
            Attribute::Work => LOOKUP_WORK,
            Attribute::Publisher => LOOKUP_PUBLISHER,
            Attribute::Access => LOOKUP_ACCESS,
            Attribute::Locale => LOOKUP_LOCALE,
        }
    }
}

pub type Lookup = &'static [(Format, &'static [&'static str])];

const LOOKUP_URL: Lookup = &[(Format::OpenGraph, &["og:url"]), (Format::Rdfa, &["@id"])];

const LOOKUP_AUTHOR: Lookup = &[
    (Format::JsonLd, &["author", "name"]),
    (Format::JsonLd, &["creator", "name"]),
    (Format::OpenGraph, &["article:author"]),
    (Format::Rdfa, &["http://ogp.me/ns/article#author"]),
    (Format::Microdata, &["author", "name"]),
    (Format::DublinCore, &["creator"]),
];

const LOOKUP_TITLE: Lookup = &[
    (Format::JsonLd, &["headline"]),
    (Format::OpenGraph, &["og:title"]),
    (Format::OpenGraph, &["og:site_name"]),
    (Format::Microdata, &["headline"]),
    (Format::DublinCore, &["title"]),
];

const LOOKUP_DATE: Lookup = &[
    (Format::JsonLd, &["datePublished"]),
    (Format::OpenGraph, &["article:published_time"]),
    (Format::OpenGraph, &["og:article:published_time"]),
    (Format::Microdata, &["datePublished"]),
    // Modification time stands in for content without a publication date.
    (Format::OpenGraph, &["article:modified_time"]),
    (Format::OpenGraph, &["og:article:modified_time"]),
    (Format::DublinCore, &["date"]),
];

const LOOKUP_WORK: Lookup = &[(Format::OpenGraph, &["og:site_name"])];

const LOOKUP_PUBLISHER: Lookup = &[(Format::JsonLd, &["publisher", "name"])];

const LOOKUP_ACCESS: Lookup = &[
    (Format::JsonLd, &["isAccessibleForFree"]),
    (Format::JsonLd, &["hasPart", "isAccessibleForFree"]),
    (Format::Rdfa, &["lp:type"]),
];

const LOOKUP_LOCALE: Lookup = &[(Format::OpenGraph, &["og:locale"])];

/// Returns the first non-empty value reachable through `lookups`.
///
/// Only the first item of each format is consulted. Lists met while walking the
/// path resolve to their first element.
pub fn fetch_attribute(lookups: Lookup, metadata: &Metadata) -> Option<String> {
    lookups.iter().find_map(|(format, path)| {
        let first = metadata.items(*format).first()?;
        collect_item(path, first).and_then(scalar_text)
    })
}

fn collect_item<'a>(path: &[&str], value: &'a Value) -> Option<&'a Value> {
    let value = first_of(value)?;
    let Some((key, rest)) = path.split_first() else {
        return Some(value);
    };
    collect_item(rest, value.get(*key)?)
}

fn first_of(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first(),
        other => Some(other),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match first_of(value)? {
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(obj) => {
            return obj
                .get("@value")
                .or_else(|| obj.get("name"))
                .and_then(scalar_text);
        }
        Value::Null | Value::Array(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Reference attributes resolved from one page's metadata.
#[derive(Debug, Clone, Default)]
pub struct ReferenceAttributes {
    values: BTreeMap<Attribute, String>,
}

impl ReferenceAttributes {
    pub fn from_metadata(metadata: &Metadata, fetched_url: &Url) -> Self {
        let mut values = BTreeMap::new();
        for attribute in Attribute::ALL {
            if let Some(v) = fetch_attribute(attribute.lookups(), metadata) {
                tracing::debug!(attribute = attribute.label(), value = %v, "attribute found");
                values.insert(attribute, v);
            }
        }

        if !values.contains_key(&Attribute::Title) {
            if let Some(title) = &metadata.document_title {
                tracing::debug!("no structured title; using <title>");
                values.insert(Attribute::Title, title.clone());
            }
        }
        values
            .entry(Attribute::Url)
            .or_insert_with(|| fetched_url.to_string());

        Self { values }
    }

    pub fn get(&self, attribute: Attribute) -> &str {
        self.values.get(&attribute).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, attribute: Attribute, value: impl Into<String>) {
        self.values.insert(attribute, value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata_with(items: &[(Format, Value)]) -> Metadata {
        let mut md = Metadata::default();
        for (format, item) in items {
            md.push(*format, item.clone());
        }
        md
    }

    #[test]
    fn first_format_with_value_wins() {
        let md = metadata_with(&[
            (Format::JsonLd, json!({"headline": "From JSON-LD"})),
            (Format::OpenGraph, json!({"og:title": "From OG"})),
        ]);
        assert_eq!(
            fetch_attribute(Attribute::Title.lookups(), &md).as_deref(),
            Some("From JSON-LD")
        );
    }

    #[test]
    fn empty_values_fall_through() {
        let md = metadata_with(&[
            (Format::JsonLd, json!({"headline": "  "})),
            (Format::OpenGraph, json!({"og:site_name": "Site"})),
        ]);
        assert_eq!(
            fetch_attribute(Attribute::Title.lookups(), &md).as_deref(),
            Some("Site")
        );
    }

    #[test]
    fn only_first_item_of_a_format_is_read() {
        let md = metadata_with(&[
            (Format::JsonLd, json!({"@type": "WebSite"})),
            (Format::JsonLd, json!({"headline": "second"})),
        ]);
        assert_eq!(fetch_attribute(Attribute::Title.lookups(), &md), None);
    }

    #[test]
    fn lists_resolve_to_first_element() {
        let md = metadata_with(&[(
            Format::JsonLd,
            json!({"author": [{"name": "Ada Lovelace"}, {"name": "Charles Babbage"}]}),
        )]);
        assert_eq!(
            fetch_attribute(Attribute::Authors.lookups(), &md).as_deref(),
            Some("Ada Lovelace")
        );
    }

    #[test]
    fn booleans_are_stringified() {
        let md = metadata_with(&[(
            Format::JsonLd,
            json!({"hasPart": {"isAccessibleForFree": false}}),
        )]);
        assert_eq!(
            fetch_attribute(Attribute::Access.lookups(), &md).as_deref(),
            Some("false")
        );
    }

    #[test]
    fn title_and_url_fallbacks() {
        let mut md = Metadata::default();
        md.document_title = Some("Page title".to_string());
        let url = Url::parse("https://example.com/a").unwrap();
        let attrs = ReferenceAttributes::from_metadata(&md, &url);
        assert_eq!(attrs.get(Attribute::Title), "Page title");
        assert_eq!(attrs.get(Attribute::Url), "https://example.com/a");
        assert_eq!(attrs.get(Attribute::Authors), "");
    }
}
