use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::cache::{GuidanceSnapshot, SnapshotError, MIRROR_DIR};
use crate::config::{Manifest, DEFAULT_CONTEXT_LINES};
use crate::selection::{GuidanceSelector, SignalScorer};
use crate::types::{
    Citation, DebugInfo, Expansion, GuidanceResponse, RankContext, RequestContext,
};

#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("excerpt not found: {0}")]
    ExcerptNotFound(String),
    /// The snapshot has no mirror copy of the excerpt's source file.
    #[error("mirror not found for {filepath}")]
    MirrorNotFound { filepath: String, mirror: PathBuf },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serves guidance requests from one shared, read-only snapshot.
#[derive(Debug, Clone)]
pub struct GuidanceLoader {
    snapshot: Arc<GuidanceSnapshot>,
    selector: GuidanceSelector<SignalScorer>,
}

impl GuidanceLoader {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        Ok(Self::from_snapshot(Arc::new(GuidanceSnapshot::open(root)?)))
    }

    pub fn from_snapshot(snapshot: Arc<GuidanceSnapshot>) -> Self {
        let selector = GuidanceSelector::with_weights(*snapshot.manifest.weights());
        Self { snapshot, selector }
    }

    pub fn snapshot(&self) -> &Arc<GuidanceSnapshot> {
        &self.snapshot
    }

    pub fn manifest(&self) -> &Manifest {
        &self.snapshot.manifest
    }

    pub fn load_guidance(&self, request: &RequestContext) -> GuidanceResponse {
        self.load_guidance_at(request, Utc::now())
    }

    /// Like [`load_guidance`](Self::load_guidance), with an explicit "now" for recency.
    pub fn load_guidance_at(
        &self,
        request: &RequestContext,
        now: DateTime<Utc>,
    ) -> GuidanceResponse {
        let manifest = &self.snapshot.manifest;
        let task = manifest.select_task(&request.task);

        if let Some(max_tokens) = request.max_tokens {
            debug!(
                max_tokens,
                cap_tokens = task.cap_tokens,
                "request budget override is not applied"
            );
        }

        let policy = manifest.budget_policy(task.cap_tokens);
        let kernels = self.snapshot.kernels_for(&task.keys);
        let ctx = RankContext { request, now };

        let allocation = self.selector.select(
            &policy,
            &kernels,
            &self.snapshot.excerpts,
            &ctx,
            &task.keys,
            task.topk,
        );

        let citations = allocation.excerpts.iter().map(Citation::from).collect();

        GuidanceResponse {
            kernels: allocation.kernels,
            excerpts: allocation.excerpts,
            citations,
            budget: allocation.budget,
            debug: DebugInfo {
                selected_keys: task.keys,
                dropped_keys: allocation.dropped_keys,
                snapshot_version: self.snapshot.version.clone(),
            },
        }
    }

    /// Mirror lines around an excerpt: its own range widened by `context_lines`
    /// on each side (default 60), clamped to the file.
    pub fn expand_excerpt(
        &self,
        id: &str,
        context_lines: Option<usize>,
    ) -> Result<Expansion, ExpandError> {
        let excerpt = self
            .snapshot
            .excerpt(id)
            .ok_or_else(|| ExpandError::ExcerptNotFound(id.to_string()))?;

        let mirror_path = match self.snapshot.mirror_path(&excerpt.filepath) {
            Some(path) if path.is_file() => path,
            other => {
                return Err(ExpandError::MirrorNotFound {
                    filepath: excerpt.filepath.clone(),
                    mirror: other.unwrap_or_else(|| self.snapshot.root.join(MIRROR_DIR)),
                })
            }
        };

        let content = match fs::read_to_string(&mirror_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ExpandError::MirrorNotFound {
                    filepath: excerpt.filepath.clone(),
                    mirror: mirror_path,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let context = context_lines.unwrap_or(DEFAULT_CONTEXT_LINES);
        let lines: Vec<&str> = content.lines().collect();
        let first = excerpt.start_line.saturating_sub(context).max(1);
        let last = excerpt.end_line.saturating_add(context).min(lines.len());

        let text = if first <= last {
            lines[first - 1..last].join("\n")
        } else {
            String::new()
        };

        Ok(Expansion {
            id: excerpt.id.clone(),
            filepath: excerpt.filepath.clone(),
            start_line: first,
            end_line: last.max(first.saturating_sub(1)),
            text,
        })
    }
}
