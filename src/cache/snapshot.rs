// Read-only after open:
// no mutation
// no reload
// shared by reference across requests

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::Manifest;
use crate::corpus::{Excerpt, Kernel};
use crate::types::SnapshotVersion;

pub const MANIFEST_FILE: &str = "manifest.yaml";
pub const EXCERPTS_FILE: &str = "excerpts.jsonl";
pub const KERNELS_DIR: &str = "kernels";
pub const MIRROR_DIR: &str = "mirror";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("manifest not found at {0}")]
    ManifestNotFound(PathBuf),
    #[error("invalid manifest: {0}")]
    ManifestParse(#[from] serde_yaml::Error),
    #[error("manifest missing globals")]
    MissingGlobals,
    #[error("invalid JSONL at {path}:{line}: {source}")]
    InvalidJsonl {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A guidance directory loaded once into memory.
#[derive(Debug)]
pub struct GuidanceSnapshot {
    pub root: PathBuf,
    pub manifest: Manifest,
    pub excerpts: Vec<Excerpt>,
    /// Every registered kernel, in bucket declaration order.
    pub kernels: Vec<Kernel>,
    pub version: SnapshotVersion,
}

impl GuidanceSnapshot {
    /// Load `manifest.yaml`, `excerpts.jsonl` and every referenced kernel under `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let root = root.into();

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest_text = match fs::read_to_string(&manifest_path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SnapshotError::ManifestNotFound(manifest_path))
            }
            Err(e) => return Err(e.into()),
        };
        let manifest = Manifest::from_yaml(&manifest_text)?;
        if manifest.globals.supply_hard_cap_tokens == 0 {
            return Err(SnapshotError::MissingGlobals);
        }

        let excerpts_path = root.join(EXCERPTS_FILE);
        let excerpts_text = match fs::read_to_string(&excerpts_path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let excerpts = parse_jsonl(&excerpts_path, &excerpts_text)?;

        let kernels = load_kernels(&root, &manifest)?;

        let mut parts: Vec<&[u8]> = vec![manifest_text.as_bytes(), excerpts_text.as_bytes()];
        let kernel_lines: Vec<String> = kernels
            .iter()
            .map(|k| format!("{}:{}", k.id, k.text))
            .collect();
        parts.extend(kernel_lines.iter().map(|l| l.as_bytes()));
        let version = SnapshotVersion::from_parts(parts);

        info!(
            root = %root.display(),
            buckets = manifest.keys.len(),
            excerpts = excerpts.len(),
            kernels = kernels.len(),
            version = version.as_str(),
            "guidance snapshot loaded"
        );

        Ok(GuidanceSnapshot {
            root,
            manifest,
            excerpts,
            kernels,
            version,
        })
    }

    /// Kernels registered to `keys`, grouped in the order of `keys`.
    pub fn kernels_for(&self, keys: &[String]) -> Vec<Kernel> {
        keys.iter()
            .flat_map(|key| self.kernels.iter().filter(move |k| &k.key == key))
            .cloned()
            .collect()
    }

    pub fn excerpt(&self, id: &str) -> Option<&Excerpt> {
        self.excerpts.iter().find(|e| e.id == id)
    }

    /// Where the read-only source mirror keeps `filepath`.
    ///
    /// `None` when `filepath` is absolute or climbs out of the mirror.
    pub fn mirror_path(&self, filepath: &str) -> Option<PathBuf> {
        contained(&self.root.join(MIRROR_DIR), filepath)
    }
}

/// Join `relative` under `base`, refusing anything but plain path segments.
fn contained(base: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let plain = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain || relative.as_os_str().is_empty() {
        return None;
    }
    Some(base.join(relative))
}

fn parse_jsonl(path: &Path, text: &str) -> Result<Vec<Excerpt>, SnapshotError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| SnapshotError::InvalidJsonl {
                path: path.to_path_buf(),
                line: i + 1,
                source,
            })
        })
        .collect()
}

fn load_kernels(root: &Path, manifest: &Manifest) -> Result<Vec<Kernel>, SnapshotError> {
    let mut kernels = Vec::new();
    for (key, bucket) in manifest.keys.iter() {
        for reference in &bucket.kernels {
            let relative = reference
                .strip_prefix("kernels/")
                .unwrap_or(reference.as_str());
            let Some(path) = contained(&root.join(KERNELS_DIR), relative) else {
                warn!(
                    key,
                    reference = reference.as_str(),
                    "kernel reference outside kernels dir"
                );
                continue;
            };

            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(key, path = %path.display(), "kernel file not found");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if text.trim().is_empty() {
                warn!(key, path = %path.display(), "kernel file is empty");
                continue;
            }

            kernels.push(Kernel::from_reference(key, reference, text));
        }
    }
    Ok(kernels)
}
