use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A candidate snippet that may be included in a guidance response.
///
/// Excerpts are immutable. The allocator may emit a copy with compressed
/// text; every other field is carried over untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Excerpt {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub text: String,
    pub filepath: String,
    pub start_line: usize,
    pub end_line: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// ISO-8601 date or RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Pinned commit the excerpt was cut from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub non_compressible: bool,
    /// Debug-only scoring features produced at corpus build time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_features: Option<BTreeMap<String, f64>>,
}

impl Excerpt {
    /// Same excerpt with `text` replaced.
    pub fn with_text(&self, text: String) -> Self {
        Excerpt {
            text,
            ..self.clone()
        }
    }

    /// First `/`-separated segment of the source path.
    pub fn top_level_segment(&self) -> &str {
        self.filepath.split('/').next().unwrap_or("")
    }

    /// Lower-cased extension including the leading dot, e.g. `.ts`.
    ///
    /// Everything after the last `.` of the path counts, as long as it is non-empty.
    pub fn extension(&self) -> Option<String> {
        let dot = self.filepath.rfind('.')?;
        let suffix = &self.filepath[dot..];
        if suffix.len() > 1 {
            Some(suffix.to_lowercase())
        } else {
            None
        }
    }

    /// Parsed `last_modified`, if present and well-formed.
    pub fn last_modified_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.last_modified.as_deref()?.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}
