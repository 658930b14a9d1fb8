use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::{Context as _, anyhow};
use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use url::Url;

use crate::progress::Progress;

/// `<meta charset>` and `http-equiv` declarations both carry a `charset=` token.
static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta[^>]+charset\s*=\s*["']?([a-z0-9_:.-]+)"#).expect("meta charset regex")
});

/// Browsers only look for a meta charset this far into the document.
const META_SNIFF_LIMIT: usize = 1024;

/// A fetched response body together with the URL it was served from after redirects.
pub struct Fetched {
    pub url: Url,
    pub body: Bytes,
    pub headers: HeaderMap,
}

impl Fetched {
    /// Body decoded with the charset declared in `Content-Type`, then in a
    /// `<meta>` tag, then UTF-8. A byte order mark wins over all of them.
    pub fn text(&self) -> String {
        let encoding = header_charset(&self.headers)
            .or_else(|| meta_charset(&self.body))
            .unwrap_or(UTF_8);
        let (text, used, malformed) = encoding.decode(&self.body);
        if malformed {
            tracing::debug!(encoding = used.name(), url = %self.url, "body has malformed sequences");
        }
        text.into_owned()
    }
}

fn header_charset(headers: &HeaderMap) -> Option<&'static Encoding> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let label = content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })?;
    Encoding::for_label(label.as_bytes())
}

fn meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(META_SNIFF_LIMIT)];
    let caps = META_CHARSET.captures(head)?;
    Encoding::for_label(&caps[1])
}

/// How hard a [`Fetcher`] tries when the server throttles it or the
/// connection drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub first_wait: Duration,
    pub max_wait: Duration,
}

impl RetryPolicy {
    /// The page being cited.
    pub const PAGE: Self = Self {
        attempts: 5,
        first_wait: Duration::from_millis(250),
        max_wait: Duration::from_secs(10),
    };

    /// Archive lookups; a miss only costs the archive fields.
    pub const ARCHIVE: Self = Self {
        attempts: 2,
        first_wait: Duration::from_millis(500),
        max_wait: Duration::from_secs(2),
    };

    /// Wait before attempt `attempt + 1`: the server's `Retry-After` if it
    /// sent one, else exponential backoff. Both are capped at `max_wait`.
    fn wait(&self, attempt: usize, headers: Option<&HeaderMap>) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        let backoff = self.first_wait.saturating_mul(factor);
        headers
            .and_then(retry_after)
            .unwrap_or(backoff)
            .min(self.max_wait)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::PAGE
    }
}

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
    progress: Option<Arc<Progress>>,
}

impl Fetcher {
    pub fn new(user_agent: &str, progress: Option<Arc<Progress>>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            client,
            retry: RetryPolicy::default(),
            progress,
        })
    }

    /// Same client and progress display, different retry policy.
    pub fn with_retry(&self, retry: RetryPolicy) -> Self {
        Self {
            retry,
            ..self.clone()
        }
    }

    pub async fn get(&self, url: Url) -> anyhow::Result<Fetched> {
        let attempts = self.retry.attempts.max(1);
        let mut last_failure = String::new();

        for attempt in 1..=attempts {
            if let Some(p) = &self.progress {
                p.set_stage(format!("GET {url}"));
            }
            let resp = match self.client.get(url.clone()).send().await {
                Ok(resp) => resp,
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < attempts => {
                    let wait = self.retry.wait(attempt, None);
                    tracing::warn!(error = %e, attempt, wait_ms = wait.as_millis(), "request failed; retrying");
                    last_failure = e.to_string();
                    tokio::time::sleep(wait).await;
                    continue;
                }
                Err(e) => return Err(e).with_context(|| format!("GET {url}")),
            };

            let status = resp.status();
            let headers = resp.headers().clone();
            let final_url = resp.url().clone();

            if status.is_success() {
                let body = resp.bytes().await.context("read response body")?;
                tracing::debug!(%final_url, bytes = body.len(), "fetched");
                return Ok(Fetched {
                    url: final_url,
                    body,
                    headers,
                });
            }

            if !is_throttled(status) {
                return Err(anyhow!("GET {} failed with status {}", url, status));
            }
            last_failure = format!("status {status}");
            if attempt < attempts {
                let wait = self.retry.wait(attempt, Some(&headers));
                tracing::warn!(%status, attempt, wait_ms = wait.as_millis(), "throttled; backing off");
                tokio::time::sleep(wait).await;
            }
        }

        Err(anyhow!(
            "GET {} failed after {} attempts ({})",
            url,
            attempts,
            last_failure
        ))
    }
}

fn is_throttled(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

/// `Retry-After` as delay-seconds or as an HTTP date.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delta = at.with_timezone(&chrono::Utc) - chrono::Utc::now();
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use reqwest::header::HeaderValue;

    fn fetched(content_type: Option<&'static str>, body: &'static [u8]) -> Fetched {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        Fetched {
            url: Url::parse("https://example.com/").unwrap(),
            body: Bytes::from_static(body),
            headers,
        }
    }

    #[test]
    fn retry_after_forms() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 3 "));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(3)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), Some(Duration::ZERO));

        let later = (chrono::Utc::now() + chrono::TimeDelta::seconds(60)).to_rfc2822();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(&later).unwrap());
        let wait = retry_after(&headers).unwrap();
        assert!(wait > Duration::from_secs(50) && wait <= Duration::from_secs(60));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn waits_grow_and_are_capped() {
        let policy = RetryPolicy::PAGE;
        assert_eq!(policy.wait(1, None), Duration::from_millis(250));
        assert_eq!(policy.wait(2, None), Duration::from_millis(500));
        assert_eq!(policy.wait(3, None), Duration::from_secs(1));
        assert_eq!(policy.wait(40, None), Duration::from_secs(10));

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("120"));
        assert_eq!(RetryPolicy::ARCHIVE.wait(1, Some(&headers)), Duration::from_secs(2));
    }

    #[test]
    fn decodes_declared_charset() {
        let f = fetched(
            Some("text/html; charset=ISO-8859-1"),
            b"<title>Caf\xE9 news</title>",
        );
        assert_eq!(f.text(), "<title>Café news</title>");

        let f = fetched(Some("text/html; charset=\"windows-1251\""), b"\xcf\xf0\xe8");
        assert_eq!(f.text(), "При");
    }

    #[test]
    fn falls_back_to_meta_charset_then_utf8() {
        let f = fetched(
            Some("text/html"),
            b"<html><head><meta charset=\"iso-8859-1\"><title>Caf\xE9</title>",
        );
        assert!(f.text().ends_with("<title>Café</title>"));

        let f = fetched(
            None,
            b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=iso-8859-1\">\xE9",
        );
        assert!(f.text().ends_with('é'));

        let f = fetched(Some("text/html"), "<title>Café</title>".as_bytes());
        assert_eq!(f.text(), "<title>Café</title>");
    }

    #[tokio::test]
    async fn throttled_requests_give_up_after_policy_attempts() {
        let server = MockServer::start();
        let busy = server.mock(|when, then| {
            when.method(GET).path("/busy");
            then.status(429).header("Retry-After", "0");
        });

        let fetcher = Fetcher::new("test-agent", None)
            .unwrap()
            .with_retry(RetryPolicy {
                attempts: 3,
                first_wait: Duration::ZERO,
                max_wait: Duration::ZERO,
            });
        let err = fetcher
            .get(Url::parse(&server.url("/busy")).unwrap())
            .await
            .err()
            .unwrap();
        busy.assert_hits(3);
        assert!(err.to_string().contains("after 3 attempts"), "{err}");
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let server = MockServer::start();
        let gone = server.mock(|when, then| {
            when.method(GET).path("/gone");
            then.status(404);
        });

        let fetcher = Fetcher::new("test-agent", None).unwrap();
        let err = fetcher
            .get(Url::parse(&server.url("/gone")).unwrap())
            .await
            .err()
            .unwrap();
        gone.assert_hits(1);
        assert!(err.to_string().contains("404"));
    }
}
