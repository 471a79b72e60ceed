//! Core types, configuration, and error handling for the vigil workspace.
//!
//! This crate provides the shared foundation used by the other vigil crates:
//! - [`VigilError`] — unified error type using `thiserror`
//! - [`VigilConfig`] — configuration loaded from `.vigil.toml` with
//!   environment overlay
//! - Shared types: [`IssueType`], [`Issue`], [`CommitInfo`], [`PrLink`],
//!   [`FileReviewResult`], [`IssueBreakdown`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{AzureConfig, ResolvedAzure, ReviewOptions, VigilConfig};
pub use error::VigilError;
pub use types::{
    CommitInfo, FileReviewResult, Issue, IssueBreakdown, IssueType, OutputFormat, PrLink,
    Suggestion,
};

/// A convenience `Result` type for vigil operations.
pub type Result<T> = std::result::Result<T, VigilError>;
