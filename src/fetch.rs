use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;

use crate::meta::PageMeta;

/// Why a fetch produced no HTTP exchange at all.
///
/// The display strings double as the note reported for the URL, so keep
/// them readable.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid url")]
    InvalidUrl,
    #[error("could not connect")]
    Connect,
    #[error("SSL error: could not verify")]
    Tls,
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Other(String),
}

/// A completed HTTP exchange.
///
/// `body` is present only when the response carried an HTML payload; other
/// content types are reported through the header fields alone.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    /// The URL the response actually came from, after redirects.
    pub final_url: String,
    pub server: Option<String>,
    /// Raw Content-Type header value, parameters included.
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: Option<Vec<u8>>,
}

impl FetchedPage {
    /// Distills the response headers into metadata fields.
    pub fn header_meta(&self) -> PageMeta {
        let content_type = match self.content_type.as_deref() {
            Some(value) => match value.split_once(';') {
                Some((media_type, _)) => media_type.trim().to_string(),
                None => value.trim().to_string(),
            },
            None => "unknown".to_string(),
        };
        PageMeta {
            status: Some(self.status.to_string()),
            server: Some(self.server.clone().unwrap_or_else(|| "unknown".to_string())),
            content_type: Some(content_type),
            size: Some(
                self.content_length
                    .map_or_else(|| "-1".to_string(), |n| n.to_string()),
            ),
            ..PageMeta::default()
        }
    }
}

/// The fetch capability consumed by the crawl engine.
///
/// A transport failure (nothing came back) is an `Err`; a completed exchange
/// is `Ok` whatever the status code says.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Fetcher backed by a shared `reqwest` client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sitecrawler/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let url = reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl)?;
        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let server = header_string(&response, header::SERVER);
        let content_type = header_string(&response, header::CONTENT_TYPE);
        let content_length = response.content_length();

        let is_html = content_type
            .as_deref()
            .map_or(false, |value| value.contains("text/html"));
        let body = if is_html {
            Some(response.bytes().await.map_err(classify)?.to_vec())
        } else {
            None
        };

        Ok(FetchedPage {
            status,
            final_url,
            server,
            content_type,
            content_length,
            body,
        })
    }
}

fn header_string(response: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_connect() {
        // rustls certificate failures also surface as connect errors; the
        // distinction is only visible in the error chain, so report them
        // together here and leave `Tls` to fetchers that can tell them apart
        FetchError::Connect
    } else if err.is_builder() {
        FetchError::InvalidUrl
    } else {
        FetchError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(content_type: Option<&str>) -> FetchedPage {
        FetchedPage {
            status: 200,
            final_url: "http://x.test/".to_string(),
            server: None,
            content_type: content_type.map(str::to_string),
            content_length: None,
            body: None,
        }
    }

    #[test]
    fn header_meta_strips_content_type_parameters() {
        let meta = page(Some("text/html; charset=utf-8")).header_meta();
        assert_eq!(meta.content_type.as_deref(), Some("text/html"));
        assert_eq!(meta.status.as_deref(), Some("200"));
    }

    #[test]
    fn header_meta_defaults_for_missing_headers() {
        let meta = page(None).header_meta();
        assert_eq!(meta.server.as_deref(), Some("unknown"));
        assert_eq!(meta.content_type.as_deref(), Some("unknown"));
        assert_eq!(meta.size.as_deref(), Some("-1"));
        assert_eq!(meta.title, None);
    }
}
