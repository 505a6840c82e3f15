use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::corpus::{Excerpt, Kernel};
use crate::types::identifiers::SnapshotVersion;

/// Structured summary of the change a task is about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Repo-relative paths, e.g. `src/api/todos.ts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touched_paths: Option<Vec<String>>,
    /// Extensions with the leading dot, e.g. `.ts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extensions: Option<Vec<String>>,
    /// First commit message or brief intent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A guidance request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<DiffSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    /// Accepted but not applied; caps come from the manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

impl RequestContext {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Self::default()
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_diff(mut self, diff: DiffSummary) -> Self {
        self.diff_summary = Some(diff);
        self
    }

    /// Lower-cased, de-duplicated labels in sorted order.
    pub fn label_set(&self) -> BTreeSet<String> {
        lowercase_set(self.labels.as_deref())
    }

    /// Lower-cased, de-duplicated file extensions.
    pub fn extension_set(&self) -> BTreeSet<String> {
        lowercase_set(
            self.diff_summary
                .as_ref()
                .and_then(|d| d.file_extensions.as_deref()),
        )
    }

    pub fn touched_paths(&self) -> &[String] {
        self.diff_summary
            .as_ref()
            .and_then(|d| d.touched_paths.as_deref())
            .unwrap_or(&[])
    }
}

pub(crate) fn lowercase_set(values: Option<&[String]>) -> BTreeSet<String> {
    values
        .unwrap_or(&[])
        .iter()
        .map(|v| v.to_lowercase())
        .collect()
}

/// Provenance pointer for one included excerpt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub id: String,
    pub filepath: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
}

impl From<&Excerpt> for Citation {
    fn from(ex: &Excerpt) -> Self {
        Citation {
            id: ex.id.clone(),
            filepath: ex.filepath.clone(),
            commit: ex.commit.clone(),
            start_line: ex.start_line,
            end_line: ex.end_line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetReport {
    /// Kernels plus included excerpts, as accounted by the allocator.
    pub supplied_tokens: usize,
    /// Nominal cap, before the reasoning reserve is taken off.
    pub cap_tokens: usize,
    pub reserved_for_reasoning: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub selected_keys: Vec<String>,
    pub dropped_keys: Vec<String>,
    pub snapshot_version: SnapshotVersion,
}

/// The full response to a guidance request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceResponse {
    pub kernels: Vec<Kernel>,
    pub excerpts: Vec<Excerpt>,
    pub citations: Vec<Citation>,
    pub budget: BudgetReport,
    pub debug: DebugInfo,
}

/// Mirror text surrounding an excerpt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    pub id: String,
    pub filepath: String,
    /// First mirror line returned, 1-based.
    pub start_line: usize,
    /// Last mirror line returned, inclusive.
    pub end_line: usize,
    pub text: String,
}

/// Internal: an excerpt that has been scored but not yet allocated.
/// Borrows the snapshot's excerpt to avoid cloning text before it is selected.
#[derive(Debug, Clone)]
pub struct ScoredExcerpt<'a> {
    pub excerpt: &'a Excerpt,
    pub score: f64,
}

/// Internal: per-signal contributions to a score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreDetails {
    pub tag_overlap: f64,
    pub path_match: f64,
    pub filetype_match: f64,
    pub recency_boost: f64,
    pub owner_trust: f64,
}

/// Ranking inputs that do not come from the excerpt itself.
#[derive(Debug, Clone)]
pub struct RankContext<'a> {
    pub request: &'a RequestContext,
    /// Reference instant for the recency signal.
    pub now: DateTime<Utc>,
}
