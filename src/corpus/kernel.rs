use serde::{Deserialize, Serialize};

/// Always-included guidance text registered to a bucket.
///
/// Kernels are never compressed, never dropped and never counted against a
/// bucket cap. They do count against the global running total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kernel {
    pub id: String,
    pub key: String,
    pub text: String,
    /// Path inside the guidance directory the text was read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Kernel {
    /// Build a kernel for `key` from the manifest reference `reference`.
    ///
    /// The id is `<key>#<file name of reference>`.
    pub fn from_reference(key: &str, reference: &str, text: String) -> Self {
        let file_name = reference.rsplit('/').next().unwrap_or(reference);
        Kernel {
            id: format!("{key}#{file_name}"),
            key: key.to_string(),
            text,
            source: Some(reference.to_string()),
        }
    }
}
