use crate::types::{BriefsError, FeedSource, Result};
use crate::utils::url::is_valid_feed_url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

pub const CONFIG_ENV_VAR: &str = "BRIEFS_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    /// Per HTTP request
    pub timeout_seconds: u64,
    /// Whole-source bound, retries included
    pub source_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
    pub max_concurrent_fetches: usize,
    pub max_entries_per_source: Option<usize>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Briefs News Reader 1.0".to_string(),
            timeout_seconds: 10,
            source_timeout_ms: 30_000,
            max_retries: 1,
            retry_delay_seconds: 1,
            max_feed_size_mb: 10,
            max_redirects: 5,
            max_concurrent_fetches: 4,
            max_entries_per_source: Some(5),
        }
    }
}

/// Tuning for duplicate detection.
///
/// `threshold` is the minimum score for two articles to be linked. The score is
/// `title_weight * ratio(titles) + (1 - title_weight) * ratio(summaries)` when
/// both articles carry a summary, and the title ratio alone otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub threshold: f64,
    pub title_weight: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: 0.65,
            title_weight: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub max_summary_chars: Option<usize>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_summary_chars: Some(300),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Recent,
    Alphabetical,
    Source,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recent" => Ok(SortOrder::Recent),
            "alphabetical" => Ok(SortOrder::Alphabetical),
            "source" => Ok(SortOrder::Source),
            other => Err(format!(
                "unknown sort order '{}' (expected recent, alphabetical or source)",
                other
            )),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortOrder::Recent => "recent",
            SortOrder::Alphabetical => "alphabetical",
            SortOrder::Source => "source",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BriefsConfig {
    pub sources: Vec<FeedSource>,
    pub fetch: FetchConfig,
    pub similarity: SimilarityConfig,
    pub normalize: NormalizeConfig,
    pub sort: SortOrder,
}

impl Default for BriefsConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            fetch: FetchConfig::default(),
            similarity: SimilarityConfig::default(),
            normalize: NormalizeConfig::default(),
            sort: SortOrder::default(),
        }
    }
}

impl BriefsConfig {
    /// Config with the given sources and default tuning.
    pub fn with_sources(sources: Vec<FeedSource>) -> Self {
        Self {
            sources,
            ..Default::default()
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from {}", path.display());

        let content = std::fs::read_to_string(path)?;
        let config: BriefsConfig = serde_json::from_str(&content)?;
        config.validate()?;

        info!("Loaded {} feed sources from {}", config.sources.len(), path.display());
        Ok(config)
    }

    /// Reads the file named by `BRIEFS_CONFIG`, or falls back to the built-in defaults.
    pub fn from_env() -> Result<Self> {
        match env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => {
                debug!("{} not set, using built-in feed list", CONFIG_ENV_VAR);
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(BriefsError::Config(format!(
                    "source with url {} has an empty name",
                    source.url
                )));
            }
            if !names.insert(source.name.as_str()) {
                return Err(BriefsError::Config(format!(
                    "duplicate source name: {}",
                    source.name
                )));
            }
            if !is_valid_feed_url(&source.url) {
                return Err(BriefsError::Config(format!(
                    "source {} has an invalid feed url: {}",
                    source.name, source.url
                )));
            }
        }

        let similarity = &self.similarity;
        if !(similarity.threshold > 0.0 && similarity.threshold <= 1.0) {
            return Err(BriefsError::Config(format!(
                "similarity threshold must be in (0, 1], got {}",
                similarity.threshold
            )));
        }
        if !(0.0..=1.0).contains(&similarity.title_weight) {
            return Err(BriefsError::Config(format!(
                "title weight must be in [0, 1], got {}",
                similarity.title_weight
            )));
        }

        if self.fetch.max_concurrent_fetches == 0 {
            return Err(BriefsError::Config(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        if self.fetch.source_timeout_ms == 0 {
            return Err(BriefsError::Config(
                "source_timeout_ms must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Feeds used when no configuration file is supplied.
pub fn default_sources() -> Vec<FeedSource> {
    vec![
        FeedSource::new("TechCrunch", "https://techcrunch.com/feed/", "#ff6b6b"),
        FeedSource::new("VentureBeat", "https://venturebeat.com/feed/", "#4ecdc4"),
        FeedSource::new("The Verge", "https://www.theverge.com/rss/index.xml", "#45b7d1"),
        FeedSource::new("Hacker News", "https://hnrss.org/frontpage", "#ffa726"),
        FeedSource::new("Wired", "https://www.wired.com/feed/rss", "#ab47bc"),
        FeedSource::new(
            "Ars Technica",
            "https://feeds.arstechnica.com/arstechnica/index",
            "#26a69a",
        ),
        FeedSource::new(
            "MIT Technology Review",
            "https://www.technologyreview.com/feed/",
            "#42a5f5",
        ),
    ]
}
