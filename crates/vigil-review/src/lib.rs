//! The vigil review core: prompt construction, the Azure OpenAI client,
//! issue post-processing, and the parallel review coordinator.
//!
//! Flow: the coordinator ([`pipeline::ReviewPipeline`]) fans per-file tasks
//! out over a bounded worker pool; each task reads the file, asks the
//! client ([`client::ReviewClient`]) for issues chunk by chunk, and the
//! post-processor ([`postprocess`]) deduplicates, sorts, and enriches the
//! findings before they land in a [`report::ReviewReport`].

pub mod client;
pub mod pipeline;
pub mod postprocess;
pub mod prompt;
pub mod report;

pub use client::{ReviewClient, Reviewer};
pub use pipeline::{FileEntry, ReviewPipeline};
pub use report::ReviewReport;
