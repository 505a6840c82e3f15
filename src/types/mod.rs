pub mod guidance;
pub mod identifiers;

pub use guidance::{
    BudgetReport, Citation, DebugInfo, DiffSummary, Expansion, GuidanceResponse, RequestContext,
    RankContext, ScoreDetails, ScoredExcerpt,
};
pub use identifiers::SnapshotVersion;
