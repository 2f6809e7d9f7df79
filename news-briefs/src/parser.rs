use crate::types::{BriefsError, RawEntry, Result};
use feed_rs::parser;
use std::collections::HashSet;
use tracing::debug;

/// Parses RSS / Atom documents into `RawEntry` values.
///
/// Text is passed through untouched; cleaning belongs to the normalizer.
/// Dates are the exception: feed-rs parses them itself and does not keep the
/// original text, so `published` and `updated` arrive as RFC 3339 and an
/// unparsable date is simply absent. The lenient formats in `utils::time` only
/// come into play for entries from other `FeedClient` implementations.
#[derive(Debug, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_feed(&self, content: &[u8]) -> Result<Vec<RawEntry>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let text = String::from_utf8_lossy(content);
        if !Self::is_valid_feed_content(&text) {
            return Err(BriefsError::Parse(
                "response does not look like an RSS or Atom document".to_string(),
            ));
        }

        let feed = parser::parse(content)
            .map_err(|e| BriefsError::Parse(format!("Failed to parse feed: {}", e)))?;

        let mut seen_guids = HashSet::new();
        let mut seen_links = HashSet::new();
        let mut entries = Vec::with_capacity(feed.entries.len());

        for entry in feed.entries {
            // Some feeds repeat an item within one document
            if !entry.id.is_empty() && !seen_guids.insert(entry.id.clone()) {
                debug!("Skipping repeated entry with GUID: {}", entry.id);
                continue;
            }
            let link = entry.links.first().map(|l| l.href.clone());
            if let Some(ref link) = link {
                if !seen_links.insert(link.clone()) {
                    debug!("Skipping repeated entry with link: {}", link);
                    continue;
                }
            }

            // Prefer the short summary; fall back to the full content body
            let summary = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body));

            entries.push(RawEntry {
                title: entry.title.map(|t| t.content),
                summary,
                link,
                // already normalized by feed-rs
                published: entry.published.map(|dt| dt.to_rfc3339()),
                updated: entry.updated.map(|dt| dt.to_rfc3339()),
            });
        }

        debug!("Parsed feed with {} entries", entries.len());
        Ok(entries)
    }

    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<rdf:rdf")
            || content_lower.contains("<channel")
    }
}
