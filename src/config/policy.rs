use std::collections::BTreeMap;

use super::manifest::Manifest;
use super::{DEFAULT_TOPK_PER_KEY, MIN_EFFECTIVE_CAP};

/// Buckets, depth and nominal cap resolved for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSelection {
    /// Selected buckets in priority order.
    pub keys: Vec<String>,
    pub topk: usize,
    pub cap_tokens: usize,
}

/// Resolved per-bucket budget settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketPolicy {
    pub max_tokens: Option<usize>,
    pub compressible: bool,
}

impl Default for BucketPolicy {
    fn default() -> Self {
        Self {
            max_tokens: None,
            compressible: true,
        }
    }
}

/// Everything the allocator needs from configuration, with defaults resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetPolicy {
    /// Nominal cap, reported back unchanged.
    pub cap_tokens: usize,
    pub reserve_for_reasoning: usize,
    pub target_ratio: f64,
    pub buckets: BTreeMap<String, BucketPolicy>,
}

impl BudgetPolicy {
    pub fn new(cap_tokens: usize, reserve_for_reasoning: usize, target_ratio: f64) -> Self {
        Self {
            cap_tokens,
            reserve_for_reasoning,
            target_ratio,
            buckets: BTreeMap::new(),
        }
    }

    pub fn with_bucket(mut self, key: impl Into<String>, policy: BucketPolicy) -> Self {
        self.buckets.insert(key.into(), policy);
        self
    }

    /// `max(100, cap - reserve)`.
    pub fn effective_cap(&self) -> usize {
        self.cap_tokens
            .saturating_sub(self.reserve_for_reasoning)
            .max(MIN_EFFECTIVE_CAP)
    }

    /// Configured bucket cap, else an even share of the effective cap.
    pub fn bucket_cap(&self, key: &str, selected_buckets: usize) -> usize {
        self.bucket(key)
            .max_tokens
            .unwrap_or_else(|| self.effective_cap() / selected_buckets.max(1))
    }

    pub fn is_compressible(&self, key: &str) -> bool {
        self.bucket(key).compressible
    }

    fn bucket(&self, key: &str) -> BucketPolicy {
        self.buckets.get(key).copied().unwrap_or_default()
    }
}

impl Manifest {
    /// Resolve the buckets, top-K and nominal cap for `task`.
    ///
    /// Unknown tasks select every bucket in declaration order. Repeated keys
    /// keep their first position.
    pub fn select_task(&self, task: &str) -> TaskSelection {
        let trigger = self.triggers.tasks.get(task);

        let mut keys: Vec<String> = Vec::new();
        let candidates: Vec<&str> = match trigger {
            Some(t) => t.include_keys.iter().map(String::as_str).collect(),
            None => self.keys.keys().collect(),
        };
        for key in candidates {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
        let topk = trigger
            .and_then(|t| t.topk_per_key)
            .or(self.globals.default_topk_per_key)
            .unwrap_or(DEFAULT_TOPK_PER_KEY);
        let cap_tokens = trigger
            .and_then(|t| t.supply_cap_tokens)
            .unwrap_or(self.globals.supply_hard_cap_tokens);

        TaskSelection {
            keys,
            topk,
            cap_tokens,
        }
    }

    /// Budget policy for a request whose nominal cap is `cap_tokens`.
    pub fn budget_policy(&self, cap_tokens: usize) -> BudgetPolicy {
        let mut policy = BudgetPolicy::new(
            cap_tokens,
            self.globals.reserve_for_reasoning,
            self.target_ratio(),
        );
        for (key, bucket) in self.keys.iter() {
            policy = policy.with_bucket(
                key,
                BucketPolicy {
                    max_tokens: bucket.max_tokens,
                    compressible: bucket.compressible.unwrap_or(true),
                },
            );
        }
        policy
    }
}
