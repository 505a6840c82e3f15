use std::cmp::Ordering;

use chrono::Duration;

use crate::config::{ScoringWeights, RECENCY_WINDOW_DAYS};
use crate::corpus::Excerpt;
use crate::types::guidance::lowercase_set;
use crate::types::{RankContext, ScoreDetails, ScoredExcerpt};

pub trait Scorer {
    fn score(&self, excerpt: &Excerpt, ctx: &RankContext<'_>) -> ScoreDetails;

    fn score_value(&self, details: &ScoreDetails) -> f64 {
        details.tag_overlap
            + details.path_match
            + details.filetype_match
            + details.recency_boost
            + details.owner_trust
    }
}

/// Additive scorer over five request signals.
#[derive(Debug, Clone, Default)]
pub struct SignalScorer {
    weights: ScoringWeights,
}

impl SignalScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }
}

impl Scorer for SignalScorer {
    fn score(&self, excerpt: &Excerpt, ctx: &RankContext<'_>) -> ScoreDetails {
        let w = &self.weights;
        let mut details = ScoreDetails::default();

        // One increment per distinct label that appears among the tags.
        let tags = lowercase_set(excerpt.tags.as_deref());
        let matching = ctx
            .request
            .label_set()
            .iter()
            .filter(|label| tags.contains(*label))
            .count();
        details.tag_overlap = w.tag_overlap * matching as f64;

        let segment = excerpt.top_level_segment();
        if !segment.is_empty()
            && ctx
                .request
                .touched_paths()
                .iter()
                .any(|p| p.split('/').next() == Some(segment))
        {
            details.path_match = w.path_match;
        }

        if let Some(ext) = excerpt.extension() {
            if ctx.request.extension_set().contains(&ext) {
                details.filetype_match = w.filetype_match;
            }
        }

        if let Some(modified) = excerpt.last_modified_at() {
            if ctx.now - modified <= Duration::days(RECENCY_WINDOW_DAYS) {
                details.recency_boost = w.recency_boost;
            }
        }

        if let Some(owner) = &excerpt.owner {
            let owner = owner.to_lowercase();
            if owner.contains("arch") || owner.contains("platform") {
                details.owner_trust = w.owner_trust;
            }
        }

        details
    }
}

/// Ranked, truncated excerpts for one bucket.
#[derive(Debug, Clone)]
pub struct RankedBucket<'a> {
    pub key: String,
    pub excerpts: Vec<ScoredExcerpt<'a>>,
}

/// Ranker output, in caller priority order.
#[derive(Debug, Clone, Default)]
pub struct RankedExcerpts<'a> {
    pub buckets: Vec<RankedBucket<'a>>,
}

impl<'a> RankedExcerpts<'a> {
    /// Ranked excerpts for `key`; empty when the bucket had no candidates.
    pub fn bucket(&self, key: &str) -> &[ScoredExcerpt<'a>] {
        self.buckets
            .iter()
            .find(|b| b.key == key)
            .map(|b| b.excerpts.as_slice())
            .unwrap_or(&[])
    }

    /// Flattened view: priority order, then rank order.
    pub fn iter(&self) -> impl Iterator<Item = &ScoredExcerpt<'a>> {
        self.buckets.iter().flat_map(|b| b.excerpts.iter())
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.excerpts.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Group `excerpts` by bucket, score, and keep the best `k` per bucket.
///
/// Excerpts outside `selected_keys` are discarded before scoring. Equal
/// scores keep their input order.
pub fn rank_top_k<'a, S, I>(
    scorer: &S,
    excerpts: I,
    ctx: &RankContext<'_>,
    selected_keys: &[String],
    k: usize,
) -> RankedExcerpts<'a>
where
    S: Scorer + ?Sized,
    I: IntoIterator<Item = &'a Excerpt>,
{
    let mut buckets: Vec<RankedBucket<'a>> = Vec::with_capacity(selected_keys.len());
    for key in selected_keys {
        if !buckets.iter().any(|b| &b.key == key) {
            buckets.push(RankedBucket {
                key: key.clone(),
                excerpts: Vec::new(),
            });
        }
    }

    for excerpt in excerpts {
        let Some(bucket) = buckets.iter_mut().find(|b| b.key == excerpt.key) else {
            continue;
        };
        let score = scorer.score_value(&scorer.score(excerpt, ctx));
        bucket.excerpts.push(ScoredExcerpt { excerpt, score });
    }

    for bucket in &mut buckets {
        // Stable: ties stay in input order.
        bucket
            .excerpts
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        bucket.excerpts.truncate(k);
    }

    RankedExcerpts { buckets }
}
