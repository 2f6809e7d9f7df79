use crate::config::NormalizeConfig;
use crate::enhancer::neutralize_markers;
use crate::types::{BriefsError, FeedSource, Published, RawArticle, RawEntry, Result};
use crate::utils::text::{clean_html, collapse_whitespace, truncate_chars};
use crate::utils::time::parse_timestamp;
use crate::utils::url::normalize_link;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Turns raw feed entries into cleaned `RawArticle` records.
#[derive(Debug, Clone, Default)]
pub struct EntryNormalizer {
    config: NormalizeConfig,
}

impl EntryNormalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    pub fn normalize(&self, entry: &RawEntry, source: &FeedSource) -> Result<RawArticle> {
        let title = entry.title.as_deref().map(clean_html).unwrap_or_default();
        if title.is_empty() {
            return Err(BriefsError::MalformedEntry {
                reason: format!(
                    "entry from {} has no title (link: {})",
                    source.name,
                    entry.link.as_deref().unwrap_or("none")
                ),
            });
        }

        let summary = entry
            .summary
            .as_deref()
            .map(|s| collapse_whitespace(&neutralize_markers(&clean_html(s))))
            .unwrap_or_default();
        let summary = match self.config.max_summary_chars {
            Some(max) => truncate_chars(&summary, max),
            None => summary,
        };

        let link = entry.link.as_deref().map(normalize_link).unwrap_or_default();
        let published_at = resolve_published(entry);
        if published_at.is_unknown() {
            debug!("No parsable timestamp for '{}' from {}", title, source.name);
        }

        Ok(RawArticle {
            id: derive_id(&title, &link, &source.name),
            title,
            summary,
            link,
            source: source.clone(),
            published_at,
        })
    }
}

/// `published`, then `updated`; the sentinel when neither parses.
fn resolve_published(entry: &RawEntry) -> Published {
    [entry.published.as_deref(), entry.updated.as_deref()]
        .into_iter()
        .flatten()
        .find_map(parse_timestamp)
        .map(Published::At)
        .unwrap_or(Published::Unknown)
}

/// Stable id over the cleaned title and canonical link.
///
/// Entries without a link fall back to title plus source name.
pub fn derive_id(title: &str, link: &str, source_name: &str) -> String {
    let title_key = collapse_whitespace(&title.to_lowercase());
    let key = if link.is_empty() {
        format!("title:{}\nsource:{}", title_key, source_name)
    } else {
        format!("link:{}\ntitle:{}", link, title_key)
    };

    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(&hasher.finalize()[..8])
}
