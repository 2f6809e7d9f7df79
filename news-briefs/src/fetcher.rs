use crate::config::FetchConfig;
use crate::traits::{FeedClient, FetchObserver};
use crate::types::{BriefsError, FeedSource, SourceFailure, SourceOutcome};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Fetches every configured source concurrently, one outcome per source.
///
/// A failing or slow source only affects its own outcome. Outcomes are
/// returned in configuration order once all sources have finished or timed out.
pub struct FeedFetcher {
    client: Arc<dyn FeedClient>,
    config: FetchConfig,
}

impl FeedFetcher {
    pub fn new(client: Arc<dyn FeedClient>, config: FetchConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub async fn fetch_all(&self, sources: &[FeedSource], observer: &dyn FetchObserver) -> Vec<SourceOutcome> {
        let total = sources.len();
        let workers = self.config.max_concurrent_fetches.max(1);
        info!("Fetching {} sources with {} workers via {}", total, workers, self.client.client_name());

        let mut pending = stream::iter(sources.iter().enumerate())
            .map(|(index, source)| async move { (index, self.fetch_one(source).await) })
            .buffer_unordered(workers);

        // Single merge point: nothing else touches the results
        let mut outcomes = Vec::with_capacity(total);
        while let Some((index, outcome)) = pending.next().await {
            observer.on_source_complete(&outcome, outcomes.len() + 1, total);
            outcomes.push((index, outcome));
        }

        outcomes.sort_by_key(|(index, _)| *index);
        let outcomes: Vec<SourceOutcome> = outcomes.into_iter().map(|(_, outcome)| outcome).collect();

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        info!("Fetched {}/{} sources successfully", succeeded, total);
        outcomes
    }

    async fn fetch_one(&self, source: &FeedSource) -> SourceOutcome {
        let started = Instant::now();
        let limit = Duration::from_millis(self.config.source_timeout_ms);

        let result = match tokio::time::timeout(limit, self.client.fetch_entries(source)).await {
            Ok(Ok(mut entries)) => {
                if let Some(max) = self.config.max_entries_per_source {
                    if entries.len() > max {
                        debug!("Keeping first {} of {} entries from {}", max, entries.len(), source.name);
                        entries.truncate(max);
                    }
                }
                Ok(entries)
            }
            Ok(Err(e)) => {
                error!("Failed to fetch {}: {}", source.name, e);
                Err(SourceFailure::from(&e))
            }
            Err(_) => {
                let e = BriefsError::Timeout {
                    source_name: source.name.clone(),
                    millis: self.config.source_timeout_ms,
                };
                error!("{}", e);
                Err(SourceFailure::from(&e))
            }
        };

        SourceOutcome {
            source: source.clone(),
            result,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl FetchObserver for NoopObserver {
    fn on_source_complete(&self, _outcome: &SourceOutcome, _completed: usize, _total: usize) {}
}

/// Reports progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl FetchObserver for LoggingObserver {
    fn on_source_complete(&self, outcome: &SourceOutcome, completed: usize, total: usize) {
        match &outcome.result {
            Ok(entries) => info!(
                "Completed {} ({}/{}): {} entries in {}ms",
                outcome.source.name,
                completed,
                total,
                entries.len(),
                outcome.elapsed_ms
            ),
            Err(failure) => info!(
                "Completed {} ({}/{}): failed, {}",
                outcome.source.name, completed, total, failure
            ),
        }
    }
}
