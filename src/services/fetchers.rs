use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::configuration::{ApiKeySettings, SourceSettings};

/// Rendered pages can be long; anything past this is noise for extraction.
pub const PAGE_CHAR_CAP: usize = 20_000;

const RENDERED_PAGE_TIMEOUT: Duration = Duration::from_secs(45);
const RAW_PAGE_TIMEOUT: Duration = Duration::from_secs(30);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Proxy bodies that mean "we rendered nothing useful".
const PLACEHOLDER_MARKERS: &[&str] = &[
    "You need to enable JavaScript",
    "Just a moment...",
    "Access denied",
    "This site can’t be reached",
];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed response body: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: u8,
    pub include_domains: Vec<String>,
    pub include_raw_content: bool,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        SearchQuery {
            query: query.into(),
            max_results: 10,
            include_domains: Vec::new(),
            include_raw_content: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SearchResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub raw_content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    pub link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrawledPage {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

/// Fetches one page as text. `Ok(None)` means the source answered but had
/// nothing usable; transport problems surface as `FetchError` so call sites
/// decide how loudly to log them.
#[async_trait]
pub trait PageText: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<Option<String>, FetchError>;
}

/// Search API with a synthesized answer plus ranked results.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn search(&self, query: SearchQuery) -> Result<SearchResponse, FetchError>;
}

/// Programmable search restricted to a site via query syntax.
#[async_trait]
pub trait SiteSearch: Send + Sync {
    async fn search_site(&self, query: &str, site: &str) -> Result<Vec<SearchItem>, FetchError>;
}

/// Crawler-job API: submit start URLs, wait for the dataset.
#[async_trait]
pub trait NewsCrawler: Send + Sync {
    async fn crawl(
        &self,
        start_urls: Vec<String>,
        max_pages: u32,
    ) -> Result<Vec<CrawledPage>, FetchError>;
}

fn truncate_chars(text: String, cap: usize) -> String {
    match text.char_indices().nth(cap) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text,
    }
}

/// Text-rendering proxy (`GET {base}/{url}` with bearer auth). One attempt,
/// hard character cap, placeholder bodies count as nothing.
pub struct RenderedPageFetcher {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RenderedPageFetcher {
    pub fn new(sources: &SourceSettings, keys: &ApiKeySettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(RENDERED_PAGE_TIMEOUT)
            .build()
            .expect("failed to build http client");
        RenderedPageFetcher {
            client,
            base_url: sources.page_proxy_url.clone(),
            token: keys.page_proxy.clone(),
        }
    }
}

#[async_trait]
impl PageText for RenderedPageFetcher {
    async fn fetch_text(&self, url: &str) -> Result<Option<String>, FetchError> {
        let mut request = self.client.get(format!("{}/{}", self.base_url, url));
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let trimmed = body.trim();
        if trimmed.is_empty() || PLACEHOLDER_MARKERS.iter().any(|m| trimmed.contains(m)) {
            return Ok(None);
        }

        Ok(Some(truncate_chars(body, PAGE_CHAR_CAP)))
    }
}

/// Plain GET of a company-site path, used by the web-page scan where we want
/// the raw HTML (anchors included), not a rendered reading view.
pub struct RawHtmlFetcher {
    client: reqwest::Client,
}

impl RawHtmlFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(RAW_PAGE_TIMEOUT)
            .build()
            .expect("failed to build http client");
        RawHtmlFetcher { client }
    }
}

impl Default for RawHtmlFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageText for RawHtmlFetcher {
    async fn fetch_text(&self, url: &str) -> Result<Option<String>, FetchError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;
        match body.trim().is_empty() {
            true => Ok(None),
            false => Ok(Some(truncate_chars(body, PAGE_CHAR_CAP))),
        }
    }
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    include_answer: bool,
    include_raw_content: bool,
    max_results: u8,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    include_domains: Vec<String>,
}

/// Search-answer API (Tavily-shaped): advanced depth, optional raw content.
pub struct TavilySearch {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl TavilySearch {
    pub fn new(sources: &SourceSettings, keys: &ApiKeySettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .expect("failed to build http client");
        TavilySearch {
            client,
            url: sources.tavily_url.clone(),
            api_key: keys.tavily.clone(),
        }
    }
}

#[async_trait]
impl SearchEngine for TavilySearch {
    async fn search(&self, query: SearchQuery) -> Result<SearchResponse, FetchError> {
        let body = TavilyRequest {
            api_key: &self.api_key,
            query: &query.query,
            search_depth: "advanced",
            include_answer: true,
            include_raw_content: query.include_raw_content,
            max_results: query.max_results,
            include_domains: query.include_domains.clone(),
        };

        let response = self.client.post(&self.url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

#[derive(Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

/// Programmable search API (Google CSE-shaped). The site restriction rides
/// inside the query string itself.
pub struct GoogleCseSearch {
    client: reqwest::Client,
    url: String,
    api_key: String,
    cx: String,
}

impl GoogleCseSearch {
    pub fn new(sources: &SourceSettings, keys: &ApiKeySettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .expect("failed to build http client");
        GoogleCseSearch {
            client,
            url: sources.google_search_url.clone(),
            api_key: keys.google_search.clone(),
            cx: keys.google_search_cx.clone(),
        }
    }
}

#[async_trait]
impl SiteSearch for GoogleCseSearch {
    async fn search_site(&self, query: &str, site: &str) -> Result<Vec<SearchItem>, FetchError> {
        let q = match site.is_empty() {
            true => query.to_string(),
            false => format!("{} site:{}", query, site),
        };

        let response = self
            .client
            .get(&self.url)
            .query(&[("key", self.api_key.as_str()), ("cx", self.cx.as_str()), ("q", q.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let parsed = response
            .json::<CseResponse>()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;
        Ok(parsed.items)
    }
}

#[derive(Serialize)]
struct CrawlerStartUrl {
    url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CrawlerRequest {
    start_urls: Vec<CrawlerStartUrl>,
    max_crawl_depth: u32,
    max_crawl_pages: u32,
}

/// Crawler-job API (Apify-shaped): run synchronously and read the dataset
/// items back. The caller bounds the whole call with a timeout.
pub struct CrawlerNewsClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl CrawlerNewsClient {
    pub fn new(sources: &SourceSettings, keys: &ApiKeySettings) -> Self {
        CrawlerNewsClient {
            client: reqwest::Client::new(),
            base_url: sources.crawler_url.clone(),
            token: keys.crawler.clone(),
        }
    }
}

#[async_trait]
impl NewsCrawler for CrawlerNewsClient {
    async fn crawl(
        &self,
        start_urls: Vec<String>,
        max_pages: u32,
    ) -> Result<Vec<CrawledPage>, FetchError> {
        let url = format!(
            "{}/acts/apify~website-content-crawler/run-sync-get-dataset-items?token={}",
            self.base_url, self.token
        );
        let body = CrawlerRequest {
            start_urls: start_urls.into_iter().map(|url| CrawlerStartUrl { url }).collect(),
            max_crawl_depth: 1,
            max_crawl_pages: max_pages,
        };

        let response = self.client.post(url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        response
            .json::<Vec<CrawledPage>>()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }
}
