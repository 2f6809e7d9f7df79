use crate::config::FetchConfig;
use crate::parser::FeedParser;
use crate::traits::FeedClient;
use crate::types::{BriefsError, FeedSource, RawEntry, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Fetches feeds over HTTP and parses them with `FeedParser`.
pub struct HttpFeedClient {
    client: Client,
    config: FetchConfig,
    parser: FeedParser,
}

impl HttpFeedClient {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            config,
            parser: FeedParser::new(),
        })
    }

    /// GET the feed body, retrying transport errors and non-success statuses.
    pub async fn fetch_body(&self, url: &str) -> Result<Vec<u8>> {
        let start_time = Instant::now();

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.try_fetch(url).await {
                Ok(body) => {
                    debug!(
                        "Fetched {} ({} bytes) in {}ms",
                        url,
                        body.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(body);
                }
                // Oversized feeds will not shrink on retry
                Err(e @ BriefsError::FeedTooLarge { .. }) => return Err(e),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    break;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| BriefsError::General(format!("Failed to fetch {}", url))))
    }

    async fn try_fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(BriefsError::General(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        if let Some(content_length) = response.content_length() {
            let size_mb = content_length as usize / (1024 * 1024);
            if size_mb > self.config.max_feed_size_mb {
                return Err(BriefsError::FeedTooLarge { size_mb });
            }
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch_entries(&self, source: &FeedSource) -> Result<Vec<RawEntry>> {
        info!("Fetching {}...", source.name);

        let body = self.fetch_body(&source.url).await?;
        let entries = self.parser.parse_feed(&body)?;

        info!("Fetched {} entries from {}", entries.len(), source.name);
        Ok(entries)
    }

    fn client_name(&self) -> String {
        format!("http ({})", self.config.user_agent)
    }
}
