use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content hash of a loaded guidance snapshot, `sha256:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotVersion(String);

impl SnapshotVersion {
    /// Hash `parts` in order. Each part is length-prefixed so that
    /// `["ab", "c"]` and `["a", "bc"]` hash differently.
    pub fn from_parts<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }

        let hash = hasher.finalize();
        let hex = hex::encode(hash);

        SnapshotVersion(format!("sha256:{hex}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
