//! Web page title and screenshot lookup for URL materials
//!
//! Lookup never fails the request: any fetch problem degrades to using the
//! URL itself as title and no thumbnail.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;

/// Page fetch timeout
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// What we learned about a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub title: String,
    /// PNG screenshot bytes, when a screenshot service is configured
    pub screenshot: Option<Bytes>,
}

/// Trait for page lookups (testable)
#[async_trait]
pub trait PageInfoFetcher: Send + Sync {
    async fn fetch_page_info(&self, url: &str) -> PageInfo;
}

/// Fetches pages over HTTP
pub struct HttpPageInfoFetcher {
    http: reqwest::Client,
    screenshot_url: Option<String>,
}

impl HttpPageInfoFetcher {
    pub fn new(screenshot_url: Option<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("studyquiz/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            screenshot_url: screenshot_url.filter(|u| !u.trim().is_empty()),
        })
    }

    async fn fetch_title(&self, url: &str) -> Result<Option<String>, reqwest::Error> {
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(extract_title(&body))
    }

    async fn fetch_screenshot(&self, service: &str, url: &str) -> Result<Bytes, reqwest::Error> {
        self.http
            .get(service)
            .query(&[("url", url)])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await
    }
}

#[async_trait]
impl PageInfoFetcher for HttpPageInfoFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch_page_info(&self, url: &str) -> PageInfo {
        let title = match self.fetch_title(url).await {
            Ok(Some(title)) => title,
            Ok(None) => {
                tracing::debug!("page has no title, using URL");
                url.to_owned()
            }
            Err(e) => {
                tracing::warn!(error = %e, "page fetch failed, using URL as title");
                url.to_owned()
            }
        };

        let screenshot = match &self.screenshot_url {
            Some(service) => match self.fetch_screenshot(service, url).await {
                Ok(png) if !png.is_empty() => Some(png),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "screenshot failed");
                    None
                }
            },
            None => None,
        };

        PageInfo { title, screenshot }
    }
}

/// Fixed answers for tests and offline runs
#[derive(Debug, Clone, Default)]
pub struct StaticPageInfo {
    pub title: Option<String>,
    pub screenshot: Option<Bytes>,
}

#[async_trait]
impl PageInfoFetcher for StaticPageInfo {
    async fn fetch_page_info(&self, url: &str) -> PageInfo {
        PageInfo {
            title: self.title.clone().unwrap_or_else(|| url.to_owned()),
            screenshot: self.screenshot.clone(),
        }
    }
}

/// First `<title>` of an HTML document, whitespace collapsed.
pub fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
    let title = WHITESPACE_RE.replace_all(raw, " ").trim().to_owned();
    (!title.is_empty()).then_some(title)
}

/// File name for a stored page screenshot.
pub fn screenshot_file_name(title: &str) -> String {
    let stem: String = title.chars().take(50).collect();
    format!("screenshot_{}.png", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_extraction() {
        let html = "<html><head><TITLE lang=\"en\">\n  Rust\n Book </TITLE></head></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Rust Book"));
        assert_eq!(extract_title("<title>   </title>"), None);
        assert_eq!(extract_title("<p>no title</p>"), None);
    }

    #[test]
    fn screenshot_names_are_capped() {
        assert_eq!(screenshot_file_name("Docs"), "screenshot_Docs.png");
        let long = "x".repeat(80);
        assert_eq!(screenshot_file_name(&long), format!("screenshot_{}.png", "x".repeat(50)));
    }

    #[tokio::test]
    async fn static_fetcher_falls_back_to_url() {
        let info = StaticPageInfo::default()
            .fetch_page_info("https://example.com")
            .await;
        assert_eq!(info.title, "https://example.com");
        assert!(info.screenshot.is_none());
    }

    #[tokio::test]
    async fn unreachable_page_uses_url_as_title() {
        let fetcher = HttpPageInfoFetcher::new(None).unwrap();
        let info = fetcher.fetch_page_info("http://127.0.0.1:9/nothing").await;
        assert_eq!(info.title, "http://127.0.0.1:9/nothing");
    }
}
