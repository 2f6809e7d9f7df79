//! Text similarity used to decide whether two entries report the same story.
//!
//! The core measure is the Ratcliff/Obershelp ratio: find the longest common
//! block, recurse on both sides of it, and score `2 * matched / total`. It is
//! symmetric in spirit but tie-breaking on equal-length blocks means
//! `ratio(a, b)` and `ratio(b, a)` can differ slightly, so callers that need
//! order independence must fix the argument order themselves.

use crate::config::SimilarityConfig;
use crate::types::RawArticle;
use crate::utils::text::alphanumeric_count;
use std::collections::HashMap;

/// Articles with less comparable text than this never link to anything.
pub const MIN_COMPARABLE_CHARS: usize = 4;

/// Alignment ratio in `[0, 1]` over the characters of `a` and `b`.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = SequenceMatcher::new(&a, &b).matched_chars();
    2.0 * matched as f64 / total as f64
}

/// Upper bound on `sequence_ratio(a, b)` from character counts alone.
///
/// Every aligned character is also a shared character, so this never
/// underestimates; it costs a single pass over both strings.
pub fn quick_ratio(a: &str, b: &str) -> f64 {
    let mut available: HashMap<char, usize> = HashMap::new();
    let mut b_len = 0;
    for c in b.chars() {
        *available.entry(c).or_insert(0) += 1;
        b_len += 1;
    }

    let mut a_len = 0;
    let mut shared = 0;
    for c in a.chars() {
        a_len += 1;
        if let Some(count) = available.get_mut(&c) {
            if *count > 0 {
                *count -= 1;
                shared += 1;
            }
        }
    }

    let total = a_len + b_len;
    if total == 0 {
        return 1.0;
    }
    2.0 * shared as f64 / total as f64
}

struct SequenceMatcher {
    /// Symbol of each character of `a`, `None` when it never occurs in `b`
    a: Vec<Option<usize>>,
    /// Ascending positions in `b` of each symbol
    positions: Vec<Vec<usize>>,
    // Run lengths of the matches ending at `b[j - 1]`, indexed by `j`. Two rows
    // are kept and swapped; `touched` lists the non-zero slots of each row.
    lengths: Vec<usize>,
    next_lengths: Vec<usize>,
    touched: Vec<usize>,
    next_touched: Vec<usize>,
}

impl SequenceMatcher {
    fn new(a: &[char], b: &[char]) -> Self {
        let mut symbols: HashMap<char, usize> = HashMap::new();
        let mut positions: Vec<Vec<usize>> = Vec::new();
        for (j, c) in b.iter().enumerate() {
            let symbol = *symbols.entry(*c).or_insert_with(|| {
                positions.push(Vec::new());
                positions.len() - 1
            });
            positions[symbol].push(j);
        }

        Self {
            a: a.iter().map(|c| symbols.get(c).copied()).collect(),
            positions,
            lengths: vec![0; b.len() + 1],
            next_lengths: vec![0; b.len() + 1],
            touched: Vec::new(),
            next_touched: Vec::new(),
        }
    }

    /// Longest common block inside `a[alo..ahi]` and `b[blo..bhi]` as
    /// `(i, j, size)`. Ties go to the block starting earliest in `a`, then in `b`.
    fn longest_match(&mut self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

        for i in alo..ahi {
            if let Some(symbol) = self.a[i] {
                let positions = &self.positions[symbol];
                let first = positions.partition_point(|&j| j < blo);
                for &j in &positions[first..] {
                    if j >= bhi {
                        break;
                    }
                    let k = self.lengths[j] + 1;
                    self.next_lengths[j + 1] = k;
                    self.next_touched.push(j + 1);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }

            for &slot in &self.touched {
                self.lengths[slot] = 0;
            }
            self.touched.clear();
            std::mem::swap(&mut self.lengths, &mut self.next_lengths);
            std::mem::swap(&mut self.touched, &mut self.next_touched);
        }

        for &slot in &self.touched {
            self.lengths[slot] = 0;
        }
        self.touched.clear();

        (best_i, best_j, best_size)
    }

    fn matched_chars(&mut self) -> usize {
        let mut matched = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.lengths.len() - 1)];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, size) = self.longest_match(alo, ahi, blo, bhi);
            if size == 0 {
                continue;
            }
            matched += size;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + size < ahi && j + size < bhi {
                queue.push((i + size, ahi, j + size, bhi));
            }
        }

        matched
    }
}

/// Scores pairs of articles according to a `SimilarityConfig`.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityScorer {
    config: SimilarityConfig,
}

impl SimilarityScorer {
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// Too little text to compare meaningfully.
    pub fn is_near_empty(article: &RawArticle) -> bool {
        alphanumeric_count(&article.title) + alphanumeric_count(&article.summary) < MIN_COMPARABLE_CHARS
    }

    pub fn score(&self, a: &RawArticle, b: &RawArticle) -> f64 {
        let title_ratio = sequence_ratio(&comparable(&a.title), &comparable(&b.title));

        if a.summary.is_empty() || b.summary.is_empty() {
            return title_ratio;
        }

        let summary_ratio = sequence_ratio(&comparable(&a.summary), &comparable(&b.summary));
        self.weighted(title_ratio, summary_ratio)
    }

    /// Whether the pair should be linked. Near-empty articles never link.
    ///
    /// Agrees with `score(a, b) >= threshold`, but skips the summary alignment
    /// when even the best summary match the character counts allow stays below
    /// the threshold.
    pub fn is_linked(&self, a: &RawArticle, b: &RawArticle) -> bool {
        if Self::is_near_empty(a) || Self::is_near_empty(b) {
            return false;
        }

        let threshold = self.config.threshold;
        let title_ratio = sequence_ratio(&comparable(&a.title), &comparable(&b.title));
        if a.summary.is_empty() || b.summary.is_empty() {
            return title_ratio >= threshold;
        }

        let (summary_a, summary_b) = (comparable(&a.summary), comparable(&b.summary));
        if self.weighted(title_ratio, quick_ratio(&summary_a, &summary_b)) < threshold {
            return false;
        }
        self.weighted(title_ratio, sequence_ratio(&summary_a, &summary_b)) >= threshold
    }

    fn weighted(&self, title_ratio: f64, summary_ratio: f64) -> f64 {
        let w = self.config.title_weight;
        w * title_ratio + (1.0 - w) * summary_ratio
    }
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(SimilarityConfig::default())
    }
}

fn comparable(text: &str) -> String {
    text.to_lowercase()
}
