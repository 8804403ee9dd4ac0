//! Fetch and decode proxy subscription content.
//!
//! The engine only consumes this through [`SubscriptionFetcher`]; HTTP policy
//! (timeout, user agent) lives in [`FetchSettings`] and nowhere else.
use crate::model::ParserConfig;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_USER_AGENT: &str = "singbox-launcher/1.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("subscription server for {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("subscription content is empty")]
    EmptyContent,

    #[error("decoded subscription content is empty")]
    EmptyDecoded,
}

/// Source of raw subscription bytes.
pub trait SubscriptionFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Blocking HTTP fetcher; the timeout bounds the whole request.
pub struct HttpFetcher {
    agent: ureq::Agent,
    settings: FetchSettings,
}

impl HttpFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(settings.timeout))
            .build()
            .into();
        Self { agent, settings }
    }
}

impl SubscriptionFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let network = |source: ureq::Error| match source {
            ureq::Error::StatusCode(status) => FetchError::Status {
                url: url.to_string(),
                status,
            },
            other => FetchError::Network {
                url: url.to_string(),
                source: Box::new(other),
            },
        };
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", self.settings.user_agent.as_str())
            .call()
            .map_err(network)?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        let body = response.body_mut().read_to_vec().map_err(network)?;
        if body.is_empty() {
            return Err(FetchError::EmptyContent);
        }
        tracing::debug!(url, bytes = body.len(), "fetched subscription");
        Ok(body)
    }
}

/// Decode subscription bytes: URL-safe base64, then standard base64, then as-is.
///
/// Only empty input or an empty decoded payload is an error.
pub fn decode_subscription(content: &[u8]) -> Result<Vec<u8>, FetchError> {
    if content.is_empty() {
        return Err(FetchError::EmptyContent);
    }
    let text = String::from_utf8_lossy(content);
    let trimmed = text.trim();
    match URL_SAFE
        .decode(trimmed)
        .or_else(|_| STANDARD.decode(trimmed))
    {
        Ok(decoded) if decoded.is_empty() => Err(FetchError::EmptyDecoded),
        Ok(decoded) => Ok(decoded),
        Err(_) => {
            tracing::debug!("subscription content is not base64; treating as plain text");
            Ok(content.to_vec())
        }
    }
}

/// Fetch `url` and decode the body.
pub fn fetch_subscription(
    fetcher: &dyn SubscriptionFetcher,
    url: &str,
) -> Result<Vec<u8>, FetchError> {
    let raw = fetcher.fetch(url)?;
    decode_subscription(&raw)
}

/// Content gathered for one configured proxy source.
#[derive(Debug)]
pub struct FetchedSource {
    pub source: String,
    /// False for inline sources, which are returned verbatim.
    pub remote: bool,
    pub content: Result<Vec<u8>, FetchError>,
}

pub fn is_remote_source(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Gather content for every proxy source in order; failures stay per-source.
pub fn fetch_sources(
    config: &ParserConfig,
    fetcher: &dyn SubscriptionFetcher,
) -> Vec<FetchedSource> {
    config
        .proxies
        .iter()
        .map(|proxy| {
            let source = proxy.source.clone();
            if is_remote_source(&source) {
                let content = fetch_subscription(fetcher, source.trim());
                if let Err(err) = &content {
                    tracing::warn!(source = %source, "subscription fetch failed: {err}");
                }
                FetchedSource {
                    source,
                    remote: true,
                    content,
                }
            } else {
                let content = Ok(source.clone().into_bytes());
                FetchedSource {
                    source,
                    remote: false,
                    content,
                }
            }
        })
        .collect()
}
