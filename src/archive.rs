use anyhow::Context as _;
use chrono::NaiveDateTime;
use url::Url;

use crate::fetcher::{Fetcher, RetryPolicy};

/// A single archived capture of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memento {
    pub timestamp: NaiveDateTime,
    pub memento_url: String,
}

/// Minimal Wayback Machine client over the CDX search API.
pub struct WaybackClient {
    endpoint: Url,
    fetcher: Fetcher,
}

impl WaybackClient {
    pub fn new(endpoint: Url, fetcher: &Fetcher) -> Self {
        Self {
            endpoint,
            fetcher: fetcher.with_retry(RetryPolicy::ARCHIVE),
        }
    }

    /// Earliest capture of `url`, if the archive has one.
    pub async fn earliest(&self, url: &str) -> anyhow::Result<Option<Memento>> {
        let mut search = self
            .endpoint
            .join("cdx/search/cdx")
            .context("build cdx search url")?;
        search
            .query_pairs_mut()
            .append_pair("url", url)
            .append_pair("output", "json")
            .append_pair("limit", "1");

        let fetched = self.fetcher.get(search.clone()).await?;
        let rows: Vec<Vec<String>> = if fetched.body.iter().all(u8::is_ascii_whitespace) {
            Vec::new()
        } else {
            serde_json::from_slice(&fetched.body)
                .with_context(|| format!("parse cdx response from {}", search))?
        };
        parse_cdx_rows(&self.endpoint, &rows)
    }
}

/// The CDX JSON output is a header row followed by one row per capture.
fn parse_cdx_rows(endpoint: &Url, rows: &[Vec<String>]) -> anyhow::Result<Option<Memento>> {
    let Some((header, captures)) = rows.split_first() else {
        return Ok(None);
    };
    let Some(capture) = captures.first() else {
        return Ok(None);
    };

    let raw_timestamp = cdx_column(header, capture, "timestamp")?;
    let original = cdx_column(header, capture, "original")?;
    let timestamp = NaiveDateTime::parse_from_str(raw_timestamp, "%Y%m%d%H%M%S")
        .with_context(|| format!("parse cdx timestamp {raw_timestamp}"))?;
    let base = endpoint.as_str().trim_end_matches('/');
    let memento_url = format!("{base}/web/{raw_timestamp}/{original}");

    Ok(Some(Memento {
        timestamp,
        memento_url,
    }))
}

fn cdx_column<'a>(header: &[String], row: &'a [String], name: &str) -> anyhow::Result<&'a str> {
    let idx = header
        .iter()
        .position(|h| h == name)
        .with_context(|| format!("cdx header has no `{name}` column"))?;
    row.get(idx)
        .map(String::as_str)
        .with_context(|| format!("cdx row has no `{name}` value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn parses_first_capture() {
        let endpoint = Url::parse("https://web.archive.org").unwrap();
        let data = rows(&[
            &["urlkey", "timestamp", "original", "mimetype", "statuscode", "digest", "length"],
            &[
                "com,example)/",
                "20200102030405",
                "https://example.com/",
                "text/html",
                "200",
                "ABC",
                "123",
            ],
        ]);
        let memento = parse_cdx_rows(&endpoint, &data).unwrap().unwrap();
        assert_eq!(
            memento.memento_url,
            "https://web.archive.org/web/20200102030405/https://example.com/"
        );
        assert_eq!(memento.timestamp.to_string(), "2020-01-02 03:04:05");
    }

    #[test]
    fn header_only_means_no_capture() {
        let endpoint = Url::parse("https://web.archive.org/").unwrap();
        let data = rows(&[&["urlkey", "timestamp", "original"]]);
        assert_eq!(parse_cdx_rows(&endpoint, &data).unwrap(), None);
        assert_eq!(parse_cdx_rows(&endpoint, &[]).unwrap(), None);
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let endpoint = Url::parse("https://web.archive.org/").unwrap();
        let data = rows(&[&["timestamp", "original"], &["yesterday", "https://a/"]]);
        assert!(parse_cdx_rows(&endpoint, &data).is_err());
    }
}
