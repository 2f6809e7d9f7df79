use crate::config::SimilarityConfig;
use crate::similarity::SimilarityScorer;
use crate::traits::CandidatePairs;
use crate::types::{BriefsError, DuplicateCluster, RawArticle, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Every unordered pair. Quadratic, which is fine for feed-sized batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllPairs;

impl CandidatePairs for AllPairs {
    fn candidate_pairs(&self, articles: &[&RawArticle]) -> Vec<(usize, usize)> {
        let n = articles.len();
        let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                pairs.push((i, j));
            }
        }
        pairs
    }
}

/// Disjoint-set forest over indices `0..n`.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // path compression
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    pub fn union(&mut self, i: usize, j: usize) {
        let ri = self.find(i);
        let rj = self.find(j);
        if ri == rj {
            return;
        }
        match self.rank[ri].cmp(&self.rank[rj]) {
            std::cmp::Ordering::Less => self.parent[ri] = rj,
            std::cmp::Ordering::Greater => self.parent[rj] = ri,
            std::cmp::Ordering::Equal => {
                self.parent[rj] = ri;
                self.rank[ri] += 1;
            }
        }
    }

    /// Connected components, each sorted ascending, ordered by smallest member.
    pub fn components(&mut self) -> Vec<Vec<usize>> {
        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for i in 0..self.parent.len() {
            let root = self.find(i);
            by_root.entry(root).or_default().push(i);
        }
        let mut components: Vec<Vec<usize>> = by_root.into_values().collect();
        components.sort_by_key(|members| members[0]);
        components
    }
}

/// Partitions RawArticles into clusters of the same story.
///
/// Articles are linked when their similarity score reaches the configured
/// threshold, and clusters are the connected components of that link graph.
/// Input is put into id order before any comparison, so the result does not
/// depend on the order entries were fetched in.
pub struct SimilarityGrouper {
    scorer: SimilarityScorer,
    candidates: Box<dyn CandidatePairs>,
}

impl SimilarityGrouper {
    pub fn new(config: SimilarityConfig) -> Self {
        Self::with_candidates(config, Box::new(AllPairs))
    }

    pub fn with_candidates(config: SimilarityConfig, candidates: Box<dyn CandidatePairs>) -> Self {
        Self {
            scorer: SimilarityScorer::new(config),
            candidates,
        }
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Pairs (as indices into `articles`) whose score reaches the threshold.
    pub fn linked_pairs(&self, articles: &[&RawArticle]) -> Vec<(usize, usize)> {
        self.candidates
            .candidate_pairs(articles)
            .into_iter()
            .filter(|&(i, j)| self.scorer.is_linked(articles[i], articles[j]))
            .collect()
    }

    pub fn group(&self, articles: &[RawArticle]) -> Vec<DuplicateCluster> {
        let mut ordered: Vec<&RawArticle> = articles.iter().collect();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));

        let links = self.linked_pairs(&ordered);
        debug!("{} of {} articles have at least one similarity link", count_linked(&links), ordered.len());

        let mut forest = UnionFind::new(ordered.len());
        for (i, j) in links {
            forest.union(i, j);
        }

        forest
            .components()
            .into_iter()
            .map(|members| DuplicateCluster::new(members.into_iter().map(|i| ordered[i].id.clone()).collect()))
            .collect()
    }
}

impl Default for SimilarityGrouper {
    fn default() -> Self {
        Self::new(SimilarityConfig::default())
    }
}

fn count_linked(links: &[(usize, usize)]) -> usize {
    let mut seen: Vec<usize> = links.iter().flat_map(|&(i, j)| [i, j]).collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

/// Check that `clusters` partition `articles`: no empty cluster, every article
/// in exactly one cluster, nothing else.
pub fn verify_partition(clusters: &[DuplicateCluster], articles: &[RawArticle]) -> Result<()> {
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for (index, cluster) in clusters.iter().enumerate() {
        if cluster.is_empty() {
            return Err(BriefsError::Invariant(format!("cluster {} is empty", index)));
        }
        for id in &cluster.members {
            if let Some(previous) = seen.insert(id.as_str(), index) {
                return Err(BriefsError::Invariant(format!(
                    "article {} belongs to clusters {} and {}",
                    id, previous, index
                )));
            }
        }
    }

    if seen.len() != articles.len() {
        return Err(BriefsError::Invariant(format!(
            "clusters cover {} articles but the batch has {}",
            seen.len(),
            articles.len()
        )));
    }
    for article in articles {
        if !seen.contains_key(article.id.as_str()) {
            return Err(BriefsError::Invariant(format!(
                "article {} is missing from every cluster",
                article.id
            )));
        }
    }

    Ok(())
}
