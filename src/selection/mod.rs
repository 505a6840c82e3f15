pub mod budgeting;
pub mod ranking;
pub mod tokens;

use crate::config::{BudgetPolicy, ScoringWeights};
use crate::corpus::{Excerpt, Kernel};
use crate::types::RankContext;
pub use budgeting::{allocate, Allocation};
pub use ranking::{rank_top_k, RankedBucket, RankedExcerpts, Scorer, SignalScorer};
pub use tokens::estimate_tokens;

/// Ranking followed by budget allocation.
#[derive(Debug, Clone)]
pub struct GuidanceSelector<S> {
	scorer: S,
}

impl Default for GuidanceSelector<SignalScorer> {
	fn default() -> Self {
		Self {
			scorer: SignalScorer::default(),
		}
	}
}

impl GuidanceSelector<SignalScorer> {
	pub fn with_weights(weights: ScoringWeights) -> Self {
		Self::new(SignalScorer::new(weights))
	}
}

impl<S> GuidanceSelector<S>
where
	S: Scorer,
{
	pub fn new(scorer: S) -> Self {
		Self { scorer }
	}

	/// Score and rank `excerpts`, then pack them with `kernels` under `policy`.
	///
	/// `selected_keys` is the bucket priority order; `topk` bounds each bucket.
	pub fn select<'a, I>(
		&self,
		policy: &BudgetPolicy,
		kernels: &[Kernel],
		excerpts: I,
		ctx: &RankContext<'_>,
		selected_keys: &[String],
		topk: usize,
	) -> Allocation
	where
		I: IntoIterator<Item = &'a Excerpt>,
	{
		// 1. Scoring and ordering phase
		let ranked = rank_top_k(&self.scorer, excerpts, ctx, selected_keys, topk);

		debug_assert!(ranked.buckets.iter().all(|b| {
			b.excerpts.len() <= topk && b.excerpts.windows(2).all(|w| w[0].score >= w[1].score)
		}));

		// 2. Budgeting phase
		allocate(policy, kernels, &ranked, selected_keys)
	}
}
