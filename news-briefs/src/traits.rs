use crate::types::{FeedSource, RawArticle, RawEntry, Result, SourceOutcome};
use async_trait::async_trait;

/// Black-box retrieval of the raw entries of one feed source.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetch and parse the source's current entries
    async fn fetch_entries(&self, source: &FeedSource) -> Result<Vec<RawEntry>>;

    /// Human-readable name of the client, for logs
    fn client_name(&self) -> String {
        "feed-client".to_string()
    }
}

/// Notified once per source as the fetch stage completes it, in completion order.
pub trait FetchObserver: Send + Sync {
    fn on_source_complete(&self, outcome: &SourceOutcome, completed: usize, total: usize);
}

/// Produces the index pairs the grouper should score.
///
/// Implementations may prune pairs that cannot possibly link (e.g. via a
/// shingle bucket pre-filter); every returned pair must satisfy `i < j`.
pub trait CandidatePairs: Send + Sync {
    fn candidate_pairs(&self, articles: &[&RawArticle]) -> Vec<(usize, usize)>;
}
