use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{
    DEFAULT_FILETYPE_MATCH_WEIGHT, DEFAULT_OWNER_TRUST_WEIGHT, DEFAULT_PATH_MATCH_WEIGHT,
    DEFAULT_RECENCY_BOOST_WEIGHT, DEFAULT_TAG_OVERLAP_WEIGHT,
};

/// Parsed `manifest.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub version: u32,
    pub globals: Globals,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub keys: BucketTable,
    #[serde(default)]
    pub triggers: Triggers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Globals {
    #[serde(default)]
    pub model_window_tokens: usize,
    /// Max tokens supplied, so the model keeps room to think.
    pub supply_hard_cap_tokens: usize,
    /// Tokens reserved for the model's own reasoning.
    #[serde(default)]
    pub reserve_for_reasoning: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_chunk_tokens: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_topk_per_key: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
}

/// Additive relevance weights. Missing entries take the built-in defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub tag_overlap: f64,
    pub path_match: f64,
    pub filetype_match: f64,
    pub recency_boost: f64,
    pub owner_trust: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            tag_overlap: DEFAULT_TAG_OVERLAP_WEIGHT,
            path_match: DEFAULT_PATH_MATCH_WEIGHT,
            filetype_match: DEFAULT_FILETYPE_MATCH_WEIGHT,
            recency_boost: DEFAULT_RECENCY_BOOST_WEIGHT,
            owner_trust: DEFAULT_OWNER_TRUST_WEIGHT,
        }
    }
}

/// Per-bucket configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Build-time globs; documentation only at runtime.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Kernel files, relative to `kernels/`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kernels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    /// Defaults to `true` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressible: Option<bool>,
}

/// Buckets in manifest declaration order.
///
/// Declaration order is the priority order when a task does not list its keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketTable {
    entries: Vec<(String, BucketConfig)>,
}

impl BucketTable {
    /// Insert or replace; a replaced key keeps its original position.
    pub fn insert(&mut self, key: String, config: BucketConfig) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = config,
            None => self.entries.push((key, config)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&BucketConfig> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, c)| c)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BucketConfig)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for BucketTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, config) in &self.entries {
            map.serialize_entry(key, config)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for BucketTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = BucketTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of bucket key to bucket config")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(BucketTable::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut table = BucketTable::default();
                while let Some((key, config)) =
                    access.next_entry::<String, Option<BucketConfig>>()?
                {
                    table.insert(key, config.unwrap_or_default());
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Triggers {
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskTrigger>,
}

/// Per-task selection overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskTrigger {
    /// Buckets in priority order.
    pub include_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topk_per_key: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supply_cap_tokens: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_phase: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hard_pins: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_sensitive: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require_tags_any: Vec<String>,
}

impl Manifest {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn target_ratio(&self) -> f64 {
        self.globals
            .compression
            .as_ref()
            .and_then(|c| c.target_ratio)
            .unwrap_or(super::DEFAULT_TARGET_RATIO)
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.scoring.weights
    }
}
