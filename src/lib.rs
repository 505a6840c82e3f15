//! Deterministic, token-budgeted guidance selection for AI coding agents.
//!
//! `guidance-core` ranks candidate excerpts against a task, keeps the top-K
//! per bucket, and packs them with always-included kernels under a global
//! and per-bucket token budget, falling back to extractive compression only
//! where a bucket allows it. Identical inputs always produce identical
//! outputs.

pub mod cache;
pub mod compression;
pub mod config;
pub mod corpus;
pub mod loader;
pub mod protocol;
pub mod selection;
pub mod types;
