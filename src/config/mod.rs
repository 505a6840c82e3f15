pub mod manifest;
pub mod policy;

pub use manifest::{
    BucketConfig, BucketTable, CompressionConfig, Globals, Manifest, ScoringConfig,
    ScoringWeights, TaskTrigger, Triggers,
};
pub use policy::{BucketPolicy, BudgetPolicy, TaskSelection};

/// Items kept per bucket when neither the task nor the globals say otherwise.
pub const DEFAULT_TOPK_PER_KEY: usize = 2;

/// Extractive compression target when the manifest does not set one.
pub const DEFAULT_TARGET_RATIO: f64 = 0.45;

/// Floor for `cap - reserve`.
pub const MIN_EFFECTIVE_CAP: usize = 100;

/// Lines of surrounding mirror context returned by excerpt expansion.
pub const DEFAULT_CONTEXT_LINES: usize = 60;

pub const DEFAULT_TAG_OVERLAP_WEIGHT: f64 = 2.5;
pub const DEFAULT_PATH_MATCH_WEIGHT: f64 = 2.0;
pub const DEFAULT_FILETYPE_MATCH_WEIGHT: f64 = 1.0;
pub const DEFAULT_RECENCY_BOOST_WEIGHT: f64 = 0.5;
pub const DEFAULT_OWNER_TRUST_WEIGHT: f64 = 0.4;

/// Maximum age, in days, that still earns the recency boost.
pub const RECENCY_WINDOW_DAYS: i64 = 180;
