pub mod snapshot;

pub use snapshot::{GuidanceSnapshot, SnapshotError, MIRROR_DIR};
