//! Repository access for vigil: clone, enumerate, correlate.
//!
//! Clones a repository into a temporary checkout (git2), walks it for
//! reviewable source files (`ignore`), and extracts per-file last-commit
//! metadata with pull-request references mined from commit messages.
//! All of this runs once, single-threaded, before the parallel review
//! phase starts.

pub mod clone;
pub mod commit;
pub mod files;
pub mod notebook;
pub mod provider;

pub use clone::ClonedRepo;
pub use files::{Language, SourceFileInfo};
pub use provider::{Credentials, RepoProvider};
