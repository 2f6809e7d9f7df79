use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A configured feed endpoint. Immutable for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    /// Display hint, passed through untouched
    pub color: String,
}

impl FeedSource {
    pub fn new(name: &str, url: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            color: color.to_string(),
        }
    }
}

/// One item as it came out of the feed document, before any cleaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
}

impl RawEntry {
    pub fn new(title: &str, summary: &str, link: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            summary: Some(summary.to_string()),
            link: Some(link.to_string()),
            published: None,
            updated: None,
        }
    }

    pub fn with_published(mut self, published: &str) -> Self {
        self.published = Some(published.to_string());
        self
    }

    pub fn with_updated(mut self, updated: &str) -> Self {
        self.updated = Some(updated.to_string());
        self
    }
}

/// Publication time of an entry, or the sentinel used when no timestamp parsed.
///
/// Ordering is chronological with `Unknown` sorting after every known instant,
/// so "earliest first" naturally pushes undated entries to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Published {
    At(DateTime<Utc>),
    Unknown,
}

pub const UNKNOWN_TIMESTAMP: &str = "unknown";

impl Published {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Published::Unknown)
    }

    /// Most recent first, `Unknown` last.
    pub fn recency_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Published::At(a), Published::At(b)) => b.cmp(a),
            (Published::At(_), Published::Unknown) => Ordering::Less,
            (Published::Unknown, Published::At(_)) => Ordering::Greater,
            (Published::Unknown, Published::Unknown) => Ordering::Equal,
        }
    }

    /// Human-readable age relative to `now`, e.g. "3h ago".
    pub fn age_label(&self, now: DateTime<Utc>) -> String {
        let dt = match self {
            Published::At(dt) => *dt,
            Published::Unknown => return UNKNOWN_TIMESTAMP.to_string(),
        };

        let diff = now.signed_duration_since(dt);
        if diff.num_days() > 0 {
            format!("{}d ago", diff.num_days())
        } else if diff.num_hours() > 0 {
            format!("{}h ago", diff.num_hours())
        } else if diff.num_minutes() > 0 {
            format!("{}m ago", diff.num_minutes())
        } else {
            "just now".to_string()
        }
    }
}

impl fmt::Display for Published {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Published::At(dt) => write!(f, "{}", dt.to_rfc3339()),
            Published::Unknown => f.write_str(UNKNOWN_TIMESTAMP),
        }
    }
}

impl From<Published> for String {
    fn from(published: Published) -> Self {
        published.to_string()
    }
}

impl TryFrom<String> for Published {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        if value == UNKNOWN_TIMESTAMP {
            return Ok(Published::Unknown);
        }
        DateTime::parse_from_rfc3339(&value)
            .map(|dt| Published::At(dt.with_timezone(&Utc)))
            .map_err(|e| format!("invalid timestamp {:?}: {}", value, e))
    }
}

/// A normalized feed entry prior to deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    /// Pure function of the cleaned title and link (see `normalizer::derive_id`)
    pub id: String,
    pub title: String,
    pub summary: String,
    pub link: String,
    pub source: FeedSource,
    pub published_at: Published,
}

/// Ids of the RawArticles judged to describe one story, sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCluster {
    pub members: Vec<String>,
}

impl DuplicateCluster {
    pub fn new(mut members: Vec<String>) -> Self {
        members.sort();
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Provenance record for one member of an article's cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub id: String,
    pub title: String,
    pub link: String,
    pub source_name: String,
}

impl From<&RawArticle> for ClusterMember {
    fn from(article: &RawArticle) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            link: article.link.clone(),
            source_name: article.source.name.clone(),
        }
    }
}

/// The canonical, user-facing story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub link: String,
    pub source: FeedSource,
    pub domain: Option<String>,
    pub published_at: Published,
    /// Every member of the cluster, representative first, followed by copies of
    /// the same entry that other sources carried
    pub members: Vec<ClusterMember>,
}

impl Article {
    pub fn member_ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.id.as_str()).collect()
    }

    /// Distinct member links in member order.
    pub fn member_links(&self) -> Vec<&str> {
        let mut links: Vec<&str> = Vec::new();
        for member in &self.members {
            if !member.link.is_empty() && !links.contains(&member.link.as_str()) {
                links.push(&member.link);
            }
        }
        links
    }

    /// Other sources that carried the same story.
    pub fn also_reported_by(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for member in &self.members {
            let name = member.source_name.as_str();
            if name != self.source.name && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Transport,
    Parse,
}

/// Why a source produced no entries. Recorded, never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&BriefsError> for SourceFailure {
    fn from(error: &BriefsError) -> Self {
        let kind = match error {
            BriefsError::Timeout { .. } => FailureKind::Timeout,
            BriefsError::Parse(_) => FailureKind::Parse,
            BriefsError::Http(e) if e.is_timeout() => FailureKind::Timeout,
            _ => FailureKind::Transport,
        };
        Self {
            kind,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Result of fetching a single source.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source: FeedSource,
    pub result: std::result::Result<Vec<RawEntry>, SourceFailure>,
    pub elapsed_ms: u64,
}

impl SourceOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// An entry the normalizer refused, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub source_name: String,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BriefsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Source {source_name} timed out after {millis}ms")]
    Timeout { source_name: String, millis: u64 },

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("Malformed entry: {reason}")]
    MalformedEntry { reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal invariant violated: {0}")]
    Invariant(String),

    #[error("Pipeline run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, BriefsError>;
