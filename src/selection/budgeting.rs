use tracing::debug;

use crate::compression::compress_extractive;
use crate::config::BudgetPolicy;
use crate::corpus::{Excerpt, Kernel};
use crate::selection::ranking::RankedExcerpts;
use crate::selection::tokens::estimate_tokens;
use crate::types::BudgetReport;

#[derive(Debug, Clone)]
pub struct Allocation {
    pub kernels: Vec<Kernel>,
    /// Priority order, then rank order.
    pub excerpts: Vec<Excerpt>,
    pub budget: BudgetReport,
    /// Selected buckets that ended with no included excerpt.
    pub dropped_keys: Vec<String>,
}

/// Pack kernels and ranked excerpts under the global and per-bucket caps.
///
/// Kernels are always included and always counted, even past the cap.
/// Each excerpt goes in verbatim if it fits, else compressed once if its
/// bucket allows it and the result fits, else it is skipped. Once the
/// running total reaches the effective cap nothing further is considered,
/// and every remaining bucket is reported as dropped.
pub fn allocate(
    policy: &BudgetPolicy,
    kernels: &[Kernel],
    ranked: &RankedExcerpts<'_>,
    selected_keys: &[String],
) -> Allocation {
    let effective_cap = policy.effective_cap();
    let mut cost: usize = kernels.iter().map(|k| estimate_tokens(&k.text)).sum();

    let mut excerpts = Vec::new();
    let mut dropped_keys: Vec<String> = Vec::new();
    let mut visited: Vec<&str> = Vec::with_capacity(selected_keys.len());
    let mut exhausted = false;

    for key in selected_keys {
        if visited.contains(&key.as_str()) {
            continue;
        }
        visited.push(key.as_str());

        if exhausted {
            debug!(key = %key, "budget exhausted before bucket was reached");
            dropped_keys.push(key.clone());
            continue;
        }

        let candidates = ranked.bucket(key);
        if candidates.is_empty() {
            debug!(key = %key, "no ranked excerpts for bucket");
            dropped_keys.push(key.clone());
            continue;
        }

        let bucket_cap = policy.bucket_cap(key, selected_keys.len());
        let bucket_compressible = policy.is_compressible(key);
        let mut used = 0usize;
        let mut included = 0usize;

        for scored in candidates {
            let excerpt = scored.excerpt;
            let tokens = estimate_tokens(&excerpt.text);

            if used + tokens <= bucket_cap && cost + tokens <= effective_cap {
                excerpts.push(excerpt.clone());
                used += tokens;
                cost += tokens;
            } else if bucket_compressible && !excerpt.non_compressible {
                let compressed = compress_extractive(&excerpt.text, policy.target_ratio);
                let compressed_tokens = estimate_tokens(&compressed);

                if used + compressed_tokens <= bucket_cap
                    && cost + compressed_tokens <= effective_cap
                {
                    debug!(
                        key = %key,
                        id = %excerpt.id,
                        tokens,
                        compressed_tokens,
                        "included compressed excerpt"
                    );
                    excerpts.push(excerpt.with_text(compressed));
                    used += compressed_tokens;
                    cost += compressed_tokens;
                } else {
                    debug!(
                        key = %key,
                        id = %excerpt.id,
                        tokens,
                        compressed_tokens,
                        "excerpt does not fit after compression"
                    );
                    continue;
                }
            } else {
                debug!(key = %key, id = %excerpt.id, tokens, "non-compressible excerpt does not fit");
                continue;
            }

            included += 1;
            if cost >= effective_cap {
                exhausted = true;
                break;
            }
        }

        if included == 0 {
            dropped_keys.push(key.clone());
        }
        // Kernels alone may already fill the cap.
        if cost >= effective_cap {
            exhausted = true;
        }
    }

    debug!(
        supplied_tokens = cost,
        effective_cap,
        included = excerpts.len(),
        dropped = dropped_keys.len(),
        "allocation finished"
    );

    Allocation {
        kernels: kernels.to_vec(),
        excerpts,
        budget: BudgetReport {
            supplied_tokens: cost,
            cap_tokens: policy.cap_tokens,
            reserved_for_reasoning: policy.reserve_for_reasoning,
        },
        dropped_keys,
    }
}
