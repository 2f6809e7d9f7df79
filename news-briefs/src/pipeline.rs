use crate::config::{BriefsConfig, SortOrder};
use crate::enhancer::ContentEnhancer;
use crate::fetcher::FeedFetcher;
use crate::grouping::{verify_partition, SimilarityGrouper};
use crate::normalizer::EntryNormalizer;
use crate::reducer::ClusterReducer;
use crate::sources::HttpFeedClient;
use crate::traits::{FeedClient, FetchObserver};
use crate::types::{Article, BriefsError, ClusterMember, RawArticle, Result, SkippedEntry, SourceFailure, SourceOutcome};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stages of one run, strictly in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Normalize,
    Group,
    Reduce,
    Enhance,
    Done,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Fetch => Some(Stage::Normalize),
            Stage::Normalize => Some(Stage::Group),
            Stage::Group => Some(Stage::Reduce),
            Stage::Reduce => Some(Stage::Enhance),
            Stage::Enhance => Some(Stage::Done),
            Stage::Done => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// What happened during a run, for display by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub sources_total: usize,
    pub sources_ok: usize,
    /// `(source name, failure)` for every source that produced nothing
    pub failures: Vec<(String, SourceFailure)>,
    pub entries_fetched: usize,
    pub skipped: Vec<SkippedEntry>,
    pub exact_duplicates: usize,
    pub raw_articles: usize,
    pub clusters: usize,
    pub articles: usize,
    pub stage: Option<Stage>,
}

impl RunReport {
    pub fn failed_sources(&self) -> Vec<&str> {
        self.failures.iter().map(|(name, _)| name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub articles: Vec<Article>,
    pub report: RunReport,
}

/// Fetch → Normalize → Group → Reduce → Enhance, one bounded batch per run.
pub struct Pipeline {
    config: BriefsConfig,
    fetcher: FeedFetcher,
    normalizer: EntryNormalizer,
    grouper: SimilarityGrouper,
    reducer: ClusterReducer,
    enhancer: ContentEnhancer,
}

impl Pipeline {
    /// Pipeline fetching over HTTP.
    pub fn new(config: BriefsConfig) -> Result<Self> {
        let client = HttpFeedClient::new(config.fetch.clone())?;
        Self::with_client(config, Arc::new(client))
    }

    pub fn with_client(config: BriefsConfig, client: Arc<dyn FeedClient>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            fetcher: FeedFetcher::new(client, config.fetch.clone()),
            normalizer: EntryNormalizer::new(config.normalize.clone()),
            grouper: SimilarityGrouper::new(config.similarity),
            reducer: ClusterReducer::new(),
            enhancer: ContentEnhancer::new(),
            config,
        })
    }

    /// Replace the grouper, e.g. with one using a pre-filtering `CandidatePairs`.
    pub fn with_grouper(mut self, grouper: SimilarityGrouper) -> Self {
        self.grouper = grouper;
        self
    }

    pub fn config(&self) -> &BriefsConfig {
        &self.config
    }

    /// Run to completion. Only an internal invariant violation is an error;
    /// failed sources and bad entries end up in the report.
    pub async fn run(&self, observer: &dyn FetchObserver) -> Result<PipelineRun> {
        info!("Starting pipeline run over {} sources", self.config.sources.len());
        debug!("Stage: {}", Stage::Fetch);

        let outcomes = self.fetcher.fetch_all(&self.config.sources, observer).await;
        self.process(outcomes)
    }

    /// Like `run`, but gives up as soon as `cancel` resolves. In-flight fetches
    /// are dropped and nothing from the aborted run is returned.
    pub async fn run_until<F>(&self, observer: &dyn FetchObserver, cancel: F) -> Result<PipelineRun>
    where
        F: Future,
    {
        tokio::select! {
            run = self.run(observer) => run,
            _ = cancel => {
                warn!("Pipeline run cancelled");
                Err(BriefsError::Cancelled)
            }
        }
    }

    /// Everything after the fetch stage, over a complete set of outcomes.
    pub fn process(&self, outcomes: Vec<SourceOutcome>) -> Result<PipelineRun> {
        let mut report = RunReport {
            sources_total: outcomes.len(),
            ..Default::default()
        };
        let mut stage = Stage::Fetch;

        stage = advance(stage);
        let (raw_articles, collapsed) = self.normalize_all(&outcomes, &mut report);

        stage = advance(stage);
        let clusters = self.grouper.group(&raw_articles);
        verify_partition(&clusters, &raw_articles)?;
        report.clusters = clusters.len();

        stage = advance(stage);
        let index: HashMap<&str, &RawArticle> = raw_articles.iter().map(|a| (a.id.as_str(), a)).collect();
        let mut articles = clusters
            .iter()
            .map(|cluster| self.reducer.reduce(cluster, &index))
            .collect::<Result<Vec<Article>>>()?;
        for article in &mut articles {
            restore_collapsed(article, &collapsed);
        }

        stage = advance(stage);
        for article in &mut articles {
            article.summary = self.enhancer.enhance(&article.summary);
        }
        sort_articles(&mut articles, self.config.sort);

        stage = advance(stage);
        report.articles = articles.len();
        report.stage = Some(stage);

        info!(
            "Pipeline done: {} articles from {} entries ({} sources ok, {} failed, {} skipped)",
            report.articles,
            report.entries_fetched,
            report.sources_ok,
            report.failures.len(),
            report.skipped.len()
        );

        Ok(PipelineRun { articles, report })
    }

    /// Normalized articles, one per id, plus the records that lost an id collision.
    fn normalize_all(&self, outcomes: &[SourceOutcome], report: &mut RunReport) -> (Vec<RawArticle>, Collapsed) {
        // Keyed by id so the same entry fetched twice collapses to one record
        let mut by_id: BTreeMap<String, RawArticle> = BTreeMap::new();
        let mut collapsed = Collapsed::new();

        for outcome in outcomes {
            let entries = match &outcome.result {
                Ok(entries) => entries,
                Err(failure) => {
                    report.failures.push((outcome.source.name.clone(), failure.clone()));
                    continue;
                }
            };
            report.sources_ok += 1;
            report.entries_fetched += entries.len();

            for entry in entries {
                match self.normalizer.normalize(entry, &outcome.source) {
                    Ok(article) => {
                        let keep_existing = by_id
                            .get(&article.id)
                            .map_or(false, |existing| ClusterReducer::compare(&article, existing) != Ordering::Less);
                        let loser = if keep_existing {
                            Some(article)
                        } else {
                            by_id.insert(article.id.clone(), article)
                        };
                        if let Some(loser) = loser {
                            report.exact_duplicates += 1;
                            collapsed.entry(loser.id.clone()).or_default().push(loser);
                        }
                    }
                    Err(e) => {
                        warn!("Skipping entry from {}: {}", outcome.source.name, e);
                        report.skipped.push(SkippedEntry {
                            source_name: outcome.source.name.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        report.raw_articles = by_id.len();
        (by_id.into_values().collect(), collapsed)
    }
}

/// Records dropped by exact-id collapse, keyed by the id they share.
type Collapsed = BTreeMap<String, Vec<RawArticle>>;

/// Add the collapsed copies of each member back as provenance, after the
/// members themselves, so other sources carrying the same entry are still credited.
fn restore_collapsed(article: &mut Article, collapsed: &Collapsed) {
    let mut extra: Vec<&RawArticle> = article
        .members
        .iter()
        .filter_map(|member| collapsed.get(&member.id))
        .flatten()
        .collect();
    if extra.is_empty() {
        return;
    }
    extra.sort_by(|a, b| ClusterReducer::compare(a, b));
    article.members.extend(extra.into_iter().map(ClusterMember::from));
}

fn advance(stage: Stage) -> Stage {
    let next = stage.next().unwrap_or(Stage::Done);
    debug!("Stage: {}", next);
    next
}

/// Order articles for display. Ties fall back to id so the order is total.
pub fn sort_articles(articles: &mut [Article], order: SortOrder) {
    articles.sort_by(|a, b| {
        let primary = match order {
            SortOrder::Recent => a.published_at.recency_cmp(&b.published_at),
            SortOrder::Alphabetical => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortOrder::Source => a.source.name.to_lowercase().cmp(&b.source.name.to_lowercase()),
        };
        primary
            .then_with(|| a.published_at.recency_cmp(&b.published_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}
