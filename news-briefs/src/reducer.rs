use crate::types::{Article, BriefsError, ClusterMember, DuplicateCluster, RawArticle, Result};
use crate::utils::url::extract_domain;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Picks the single representative of a cluster and builds its `Article`.
///
/// Preference: longest summary, then earliest publication (unknown last),
/// then source name, then id.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterReducer;

impl ClusterReducer {
    pub fn new() -> Self {
        Self
    }

    /// `Less` when `a` is the better representative.
    pub fn compare(a: &RawArticle, b: &RawArticle) -> Ordering {
        b.summary
            .chars()
            .count()
            .cmp(&a.summary.chars().count())
            .then_with(|| a.published_at.cmp(&b.published_at))
            .then_with(|| a.source.name.cmp(&b.source.name))
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| a.link.cmp(&b.link))
    }

    pub fn representative<'a>(&self, members: &[&'a RawArticle]) -> Result<&'a RawArticle> {
        members
            .iter()
            .copied()
            .min_by(|a, b| Self::compare(a, b))
            .ok_or_else(|| BriefsError::Invariant("cannot reduce an empty cluster".to_string()))
    }

    pub fn reduce(&self, cluster: &DuplicateCluster, index: &HashMap<&str, &RawArticle>) -> Result<Article> {
        let mut members = cluster
            .members
            .iter()
            .map(|id| {
                index.get(id.as_str()).copied().ok_or_else(|| {
                    BriefsError::Invariant(format!("cluster member {} is not in the batch", id))
                })
            })
            .collect::<Result<Vec<&RawArticle>>>()?;

        let chosen = self.representative(&members)?;
        members.sort_by(|a, b| Self::compare(a, b));

        Ok(Article {
            id: chosen.id.clone(),
            title: chosen.title.clone(),
            summary: chosen.summary.clone(),
            link: chosen.link.clone(),
            source: chosen.source.clone(),
            domain: extract_domain(&chosen.link),
            published_at: chosen.published_at,
            members: members.into_iter().map(ClusterMember::from).collect(),
        })
    }
}
