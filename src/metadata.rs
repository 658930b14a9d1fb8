use std::collections::BTreeMap;

use kuchiki::NodeRef;
use kuchiki::iter::NodeIterator as _;
use kuchiki::traits::TendrilSink as _;
use serde_json::{Map, Value};
use url::Url;

/// Structured-metadata syntaxes recognised in a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Format {
    JsonLd,
    DublinCore,
    Microdata,
    Microformat,
    OpenGraph,
    Rdfa,
}

impl Format {
    pub const ALL: [Format; 6] = [
        Format::JsonLd,
        Format::DublinCore,
        Format::Microdata,
        Format::Microformat,
        Format::OpenGraph,
        Format::Rdfa,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Format::JsonLd => "json-ld",
            Format::DublinCore => "dublincore",
            Format::Microdata => "microdata",
            Format::Microformat => "microformat",
            Format::OpenGraph => "opengraph",
            Format::Rdfa => "rdfa",
        }
    }
}

/// Everything extracted from one HTML document, grouped by syntax.
#[derive(Debug, Default)]
pub struct Metadata {
    items: BTreeMap<Format, Vec<Value>>,
    pub document_title: Option<String>,
}

impl Metadata {
    pub fn items(&self, format: Format) -> &[Value] {
        self.items.get(&format).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn push(&mut self, format: Format, item: Value) {
        self.items.entry(format).or_default().push(item);
    }

    pub fn is_empty(&self) -> bool {
        self.items.values().all(Vec::is_empty)
    }
}

const OG_PREFIXES: [&str; 6] = ["og", "article", "book", "profile", "music", "video"];

pub fn extract(html: &str, response_url: &Url) -> Metadata {
    let doc = kuchiki::parse_html().one(html);
    let base_url = document_base_url(&doc, response_url);

    let mut metadata = Metadata {
        document_title: doc
            .select_first("title")
            .ok()
            .map(|t| collapse_ws(&t.as_node().text_contents()))
            .filter(|t| !t.is_empty()),
        ..Default::default()
    };

    for item in extract_json_ld(&doc) {
        metadata.push(Format::JsonLd, item);
    }
    if let Some(dc) = extract_dublin_core(&doc) {
        metadata.push(Format::DublinCore, dc);
    }
    for item in extract_microdata(&doc) {
        metadata.push(Format::Microdata, item);
    }
    for item in extract_microformats(&doc) {
        metadata.push(Format::Microformat, item);
    }
    if let Some(og) = extract_opengraph(&doc) {
        metadata.push(Format::OpenGraph, og);
    }
    let subject = canonical_url(&doc, &base_url).unwrap_or_else(|| response_url.clone());
    metadata.push(Format::Rdfa, extract_rdfa(&doc, &subject));

    for format in Format::ALL {
        tracing::debug!(
            format = format.name(),
            count = metadata.items(format).len(),
            "metadata extracted"
        );
    }
    metadata
}

fn document_base_url(doc: &NodeRef, response_url: &Url) -> Url {
    let href = doc
        .select_first("base[href]")
        .ok()
        .and_then(|b| b.attributes.borrow().get("href").map(|s| s.trim().to_string()));
    match href {
        Some(h) if !h.is_empty() => response_url.join(&h).unwrap_or_else(|_| response_url.clone()),
        _ => response_url.clone(),
    }
}

fn canonical_url(doc: &NodeRef, base_url: &Url) -> Option<Url> {
    let links = doc.select("link[rel][href]").ok()?;
    for link in links {
        let attrs = link.attributes.borrow();
        let is_canonical = attrs
            .get("rel")
            .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("canonical")));
        if is_canonical {
            return base_url.join(attrs.get("href").unwrap_or("").trim()).ok();
        }
    }
    None
}

fn extract_json_ld(doc: &NodeRef) -> Vec<Value> {
    let mut out = Vec::new();
    let Ok(scripts) = doc.select("script[type]") else {
        return out;
    };
    for script in scripts {
        let is_json_ld = script
            .attributes
            .borrow()
            .get("type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"));
        if !is_json_ld {
            continue;
        }
        let text = script.as_node().text_contents();
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => flatten_json_ld(value, &mut out),
            Err(e) => tracing::debug!(error = %e, "skipping unparsable json-ld block"),
        }
    }
    // Article-like nodes first: attribute lookup reads the first item only.
    out.sort_by_key(|item| !is_article_like(item));
    out
}

fn flatten_json_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_json_ld(item, out);
            }
        }
        Value::Object(mut obj) => match obj.remove("@graph") {
            Some(graph) => flatten_json_ld(graph, out),
            None => out.push(Value::Object(obj)),
        },
        _ => {}
    }
}

fn is_article_like(item: &Value) -> bool {
    let matches = |t: &str| {
        t.ends_with("Article") || t == "BlogPosting" || t == "Report" || t == "WebPage"
    };
    match item.get("@type") {
        Some(Value::String(t)) => matches(t),
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

fn extract_dublin_core(doc: &NodeRef) -> Option<Value> {
    let mut obj = Map::new();
    for meta in doc.select("meta[name][content]").ok()? {
        let attrs = meta.attributes.borrow();
        let name = attrs.get("name").unwrap_or("").trim().to_ascii_lowercase();
        let term = name
            .strip_prefix("dc.")
            .or_else(|| name.strip_prefix("dcterms."));
        let Some(term) = term else { continue };
        let content = attrs.get("content").unwrap_or("").trim();
        insert_multi(&mut obj, term, Value::String(content.to_string()));
    }
    (!obj.is_empty()).then_some(Value::Object(obj))
}

fn extract_opengraph(doc: &NodeRef) -> Option<Value> {
    let mut obj = Map::new();
    for meta in doc.select("meta[property][content]").ok()? {
        let attrs = meta.attributes.borrow();
        let property = attrs.get("property").unwrap_or("").trim();
        let is_og = property
            .split_once(':')
            .is_some_and(|(prefix, _)| OG_PREFIXES.contains(&prefix));
        if !is_og {
            continue;
        }
        let content = attrs.get("content").unwrap_or("").trim();
        insert_multi(&mut obj, property, Value::String(content.to_string()));
    }
    (!obj.is_empty()).then_some(Value::Object(obj))
}

fn extract_rdfa(doc: &NodeRef, subject: &Url) -> Value {
    let mut obj = Map::new();
    obj.insert("@id".to_string(), Value::String(subject.to_string()));
    if let Ok(nodes) = doc.select("[property]") {
        for node in nodes {
            let attrs = node.attributes.borrow();
            let property = attrs.get("property").unwrap_or("").trim().to_string();
            let value = attrs
                .get("content")
                .or_else(|| attrs.get("href"))
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| collapse_ws(&node.as_node().text_contents()));
            drop(attrs);
            for term in property.split_whitespace() {
                insert_multi(&mut obj, &expand_rdfa_term(term), Value::String(value.clone()));
            }
        }
    }
    Value::Object(obj)
}

fn expand_rdfa_term(term: &str) -> String {
    match term.split_once(':') {
        Some(("og", rest)) => format!("http://ogp.me/ns#{rest}"),
        Some(("article", rest)) => format!("http://ogp.me/ns/article#{rest}"),
        _ => term.to_string(),
    }
}

fn extract_microdata(doc: &NodeRef) -> Vec<Value> {
    let Ok(scopes) = doc.select("[itemscope]") else {
        return Vec::new();
    };
    scopes
        .filter(|scope| {
            !scope
                .as_node()
                .ancestors()
                .elements()
                .any(|a| a.attributes.borrow().get("itemscope").is_some())
        })
        .map(|scope| microdata_item(scope.as_node()))
        .collect()
}

fn microdata_item(scope: &NodeRef) -> Value {
    let mut obj = Map::new();
    if let Some(element) = scope.as_element() {
        if let Some(itemtype) = element.attributes.borrow().get("itemtype") {
            let itemtype = itemtype.trim();
            let short = itemtype.rsplit('/').next().unwrap_or(itemtype);
            obj.insert("@type".to_string(), Value::String(short.to_string()));
        }
    }
    collect_microdata_props(scope, &mut obj);
    Value::Object(obj)
}

fn collect_microdata_props(node: &NodeRef, obj: &mut Map<String, Value>) {
    for child in node.children() {
        let Some(element) = child.as_element() else {
            continue;
        };
        let (props, nested) = {
            let attrs = element.attributes.borrow();
            (
                attrs.get("itemprop").map(str::to_string),
                attrs.get("itemscope").is_some(),
            )
        };
        if let Some(props) = props {
            let value = if nested {
                microdata_item(&child)
            } else {
                Value::String(microdata_value(&child))
            };
            for prop in props.split_whitespace() {
                insert_multi(obj, prop, value.clone());
            }
        }
        if !nested {
            collect_microdata_props(&child, obj);
        }
    }
}

fn microdata_value(node: &NodeRef) -> String {
    let Some(element) = node.as_element() else {
        return String::new();
    };
    let attrs = element.attributes.borrow();
    let attr = match &*element.name.local {
        "meta" => "content",
        "a" | "link" | "area" => "href",
        "img" | "audio" | "video" | "source" | "iframe" | "embed" | "track" => "src",
        "time" => "datetime",
        "data" | "meter" => "value",
        "object" => "data",
        _ => "",
    };
    match attrs.get(attr).or_else(|| attrs.get("content")) {
        Some(v) => v.trim().to_string(),
        None => collapse_ws(&node.text_contents()),
    }
}

fn extract_microformats(doc: &NodeRef) -> Vec<Value> {
    let Ok(entries) = doc.select(".h-entry") else {
        return Vec::new();
    };
    entries
        .map(|entry| {
            let node = entry.as_node();
            let mut obj = Map::new();
            obj.insert("@type".to_string(), Value::String("h-entry".to_string()));
            for (key, selector, attr) in [
                ("name", ".p-name", None),
                ("author", ".p-author", None),
                ("published", ".dt-published", Some("datetime")),
                ("url", ".u-url", Some("href")),
            ] {
                let Ok(found) = node.select_first(selector) else {
                    continue;
                };
                let value = attr
                    .and_then(|a| found.attributes.borrow().get(a).map(|s| s.trim().to_string()))
                    .unwrap_or_else(|| collapse_ws(&found.as_node().text_contents()));
                if !value.is_empty() {
                    obj.insert(key.to_string(), Value::String(value));
                }
            }
            Value::Object(obj)
        })
        .collect()
}

/// Insert `value` under `key`; a repeated key turns the entry into an array.
fn insert_multi(obj: &mut Map<String, Value>, key: &str, value: Value) {
    match obj.get_mut(key) {
        None => {
            obj.insert(key.to_string(), value);
        }
        Some(Value::Array(existing)) => existing.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn url() -> Url {
        Url::parse("https://news.example.com/story").unwrap()
    }

    #[test]
    fn json_ld_graph_is_flattened_with_articles_first() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@context": "https://schema.org", "@graph": [
                {"@type": "WebSite", "name": "Example"},
                {"@type": "NewsArticle", "headline": "Big news"}
            ]}
        </script></head></html>"#;
        let md = extract(html, &url());
        let items = md.items(Format::JsonLd);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["headline"], "Big news");
    }

    #[test]
    fn broken_json_ld_is_skipped() {
        let html = r#"<script type="application/ld+json">{not json</script>"#;
        let md = extract(html, &url());
        assert!(md.items(Format::JsonLd).is_empty());
    }

    #[test]
    fn opengraph_repeats_become_arrays() {
        let html = r#"<head>
            <meta property="og:title" content="Title">
            <meta property="article:author" content="Ada Lovelace">
            <meta property="article:author" content="Charles Babbage">
            <meta property="fb:app_id" content="1">
        </head>"#;
        let md = extract(html, &url());
        let og = &md.items(Format::OpenGraph)[0];
        assert_eq!(og["og:title"], "Title");
        assert_eq!(og["article:author"], json!(["Ada Lovelace", "Charles Babbage"]));
        assert!(og.get("fb:app_id").is_none());
    }

    #[test]
    fn rdfa_expands_ogp_terms_and_records_id() {
        let html = r#"<head><meta property="article:author" content="Ada"></head>"#;
        let md = extract(html, &url());
        let rdfa = &md.items(Format::Rdfa)[0];
        assert_eq!(rdfa["@id"], "https://news.example.com/story");
        assert_eq!(rdfa["http://ogp.me/ns/article#author"], "Ada");
    }

    #[test]
    fn canonical_link_resolves_against_base() {
        let html = r#"<head><base href="/base/">
            <link rel="canonical" href="story-1"></head>"#;
        let md = extract(html, &url());
        assert_eq!(
            md.items(Format::Rdfa)[0]["@id"],
            "https://news.example.com/base/story-1"
        );
    }

    #[test]
    fn microdata_nested_scopes() {
        let html = r#"<div itemscope itemtype="https://schema.org/Article">
            <h1 itemprop="headline">Hello</h1>
            <time itemprop="datePublished" datetime="2021-01-05">Jan 5</time>
            <div itemprop="author" itemscope itemtype="https://schema.org/Person">
                <span itemprop="name">Grace Hopper</span>
            </div>
        </div>"#;
        let md = extract(html, &url());
        let items = md.items(Format::Microdata);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["@type"], "Article");
        assert_eq!(items[0]["datePublished"], "2021-01-05");
        assert_eq!(items[0]["author"]["name"], "Grace Hopper");
        assert!(items[0].get("name").is_none());
    }

    #[test]
    fn dublin_core_and_title() {
        let html = r#"<head><title>  Doc
            title </title><meta name="DC.Creator" content="Someone"></head>"#;
        let md = extract(html, &url());
        assert_eq!(md.document_title.as_deref(), Some("Doc title"));
        assert_eq!(md.items(Format::DublinCore)[0]["creator"], "Someone");
        assert!(md.items(Format::Microformat).is_empty());
    }

    #[test]
    fn microformat_entry() {
        let html = r#"<article class="h-entry">
            <h1 class="p-name">Post</h1>
            <time class="dt-published" datetime="2020-02-02T10:00:00Z">Feb</time>
        </article>"#;
        let md = extract(html, &url());
        let entry = &md.items(Format::Microformat)[0];
        assert_eq!(entry["name"], "Post");
        assert_eq!(entry["published"], "2020-02-02T10:00:00Z");
    }
}
