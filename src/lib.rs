//! duogit: one set of git operations, two interchangeable backends.
//!
//! Presents a uniform repository operation surface (commit, checkout,
//! branch, clone, push, log, staged revert, ignore check) that dispatches
//! per call to either an external `git` executable invoked as a subprocess
//! ([`CommandBackend`]) or an in-process libgit2 implementation
//! ([`LibraryBackend`]). Both backends produce observably equivalent results
//! for every operation, including the edge cases: empty repositories,
//! detached HEAD, non-fast-forward pushes.
//!
//! # Backend selection
//!
//! A persisted external flag (see [`settings`]) selects the backend; it is
//! re-read on every call, so a long-running process honors flag changes
//! immediately.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//!
//! let repo = Path::new("/path/to/repo");
//! duogit::add_all(repo)?;
//! let oid = duogit::commit(repo, "Checkpoint", false)?;
//! duogit::stage_to_revert(repo, &older_commit)?;
//! duogit::commit(repo, "Restore previous version", false)?;
//! ```

pub mod backend;
pub mod error;
mod history;
pub mod ops;
pub mod settings;
pub mod status_matrix;

pub use backend::{CloneOptions, CommandBackend, CommitRecord, GitBackend, LibraryBackend, Oid};
pub use error::{GitError, Result};
pub use ops::*;
pub use settings::BackendKind;
