//! Headlines source speaking the NewsAPI response format
//!
//! Request: `GET <source_url>&page=N&pageSize=M` with the key in `X-Api-Key`.
//!
//! Response:
//! ```text
//! { "status": "ok", "totalResults": 25,
//!   "articles": [ { "source": { "name": ".." }, "title": "..", "description": "..",
//!                   "url": "..", "urlToImage": "..", "publishedAt": "..", "content": ".." } ] }
//! ```
//! or `{ "status": "error", "code": "..", "message": ".." }`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use super::{ContentSource, Page, SourceError, SourceResult};
use crate::config::Config;
use crate::models::Item;

const NO_TITLE: &str = "No title";
const NO_DESCRIPTION: &str = "No description";
const UNKNOWN_SOURCE: &str = "Unknown source";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    status: String,
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    articles: Vec<RawArticle>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    source: Option<RawSource>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

impl RawArticle {
    /// Convert to an item, filling placeholders for missing fields
    ///
    /// Articles without a url have no stable identity and are dropped.
    fn into_item(self) -> Option<Item> {
        let id = non_empty(self.url)?;
        Some(Item {
            id,
            title: non_empty(self.title).unwrap_or_else(|| NO_TITLE.to_string()),
            description: non_empty(self.description)
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            image_url: non_empty(self.url_to_image),
            published_at: self.published_at.as_deref().and_then(parse_timestamp),
            source_name: self
                .source
                .and_then(|s| non_empty(s.name))
                .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
            body: self.content.unwrap_or_default(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Decode a response body into a page
pub(crate) fn parse_page(body: &str) -> SourceResult<Page> {
    let response: ApiResponse = serde_json::from_str(body)?;

    if response.status != "ok" {
        return Err(SourceError::Api(
            response
                .message
                .unwrap_or_else(|| format!("status '{}'", response.status)),
        ));
    }

    let received = response.articles.len();
    let items: Vec<Item> = response
        .articles
        .into_iter()
        .filter_map(RawArticle::into_item)
        .collect();
    if items.len() < received {
        debug!("Dropped {} article(s) without a url", received - items.len());
    }

    Ok(Page::new(items, response.total_results))
}

/// HTTP headlines source
pub struct NewsApiSource {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl NewsApiSource {
    /// Create a source for `base_url` with a per-request timeout
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> SourceResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SourceError::Config(format!("invalid source URL '{}': {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("feedsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Create a source from application configuration
    pub fn from_config(config: &Config) -> SourceResult<Self> {
        Self::new(
            &config.source_url,
            config.api_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Full URL for a page request
    pub fn page_url(&self, page: u32, page_size: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("pageSize", &page_size.to_string());
        url
    }
}

impl ContentSource for NewsApiSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> SourceResult<Page> {
        let url = self.page_url(page, page_size);
        debug!("Requesting {}", url);

        let mut request = self.client.get(url);
        if let Some(ref key) = self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Error payloads still carry a message worth surfacing in logs
            if let Ok(ApiResponse {
                message: Some(message),
                ..
            }) = serde_json::from_str::<ApiResponse>(&body)
            {
                return Err(SourceError::Api(message));
            }
            return Err(SourceError::Status(status.as_u16()));
        }

        parse_page(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OK_BODY: &str = r#"{
        "status": "ok",
        "totalResults": 25,
        "articles": [
            {
                "source": { "id": null, "name": "Example News" },
                "author": "Someone",
                "title": "Climate crisis update",
                "description": "Leaders meet again",
                "url": "https://example.com/climate",
                "urlToImage": "https://example.com/climate.jpg",
                "publishedAt": "2024-05-01T12:30:00Z",
                "content": "Full text [+1200 chars]"
            },
            {
                "source": { "name": "" },
                "title": null,
                "description": "",
                "url": "https://example.com/untitled",
                "urlToImage": null,
                "publishedAt": "yesterday",
                "content": null
            },
            {
                "source": { "name": "Nowhere" },
                "title": "No link",
                "url": null
            }
        ]
    }"#;

    #[test]
    fn test_parse_page() {
        let page = parse_page(OK_BODY).unwrap();
        assert_eq!(page.total_results, 25);
        assert_eq!(page.items.len(), 2);

        let first = &page.items[0];
        assert_eq!(first.id, "https://example.com/climate");
        assert_eq!(first.title, "Climate crisis update");
        assert_eq!(first.source_name, "Example News");
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://example.com/climate.jpg")
        );
        assert_eq!(
            first.published_at.unwrap().to_rfc3339(),
            "2024-05-01T12:30:00+00:00"
        );
        assert_eq!(first.body, "Full text [+1200 chars]");
    }

    #[test]
    fn test_parse_page_fills_placeholders() {
        let page = parse_page(OK_BODY).unwrap();
        let second = &page.items[1];

        assert_eq!(second.title, NO_TITLE);
        assert_eq!(second.description, NO_DESCRIPTION);
        assert_eq!(second.source_name, UNKNOWN_SOURCE);
        assert!(second.image_url.is_none());
        assert!(second.published_at.is_none());
        assert!(second.body.is_empty());
    }

    #[test]
    fn test_parse_page_api_error() {
        let body = r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#;
        match parse_page(body) {
            Err(SourceError::Api(message)) => assert_eq!(message, "Your API key is invalid."),
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_page_garbage() {
        assert!(matches!(
            parse_page("<html>502</html>"),
            Err(SourceError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_page_empty() {
        let page = parse_page(r#"{"status":"ok","totalResults":0,"articles":[]}"#).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_results, 0);
    }

    #[test]
    fn test_page_url() {
        let source = NewsApiSource::new(
            "https://newsapi.org/v2/top-headlines?country=us",
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        let url = source.page_url(3, 10);
        assert_eq!(
            url.as_str(),
            "https://newsapi.org/v2/top-headlines?country=us&page=3&pageSize=10"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = NewsApiSource::new("not a url", None, Duration::from_secs(5));
        assert!(matches!(result, Err(SourceError::Config(_))));
    }
}
