//! Error taxonomy for all git operations.
//!
//! Errors are categorized by cause so callers can react to specific failure
//! classes (retry a push, surface a dirty-tree warning, treat a missing blob
//! as an absent result). Every variant that wraps a backend failure carries
//! the backend's raw diagnostic text, with any access token scrubbed before
//! the error is constructed.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GitError>;

/// Errors from git operations, uniform across both backends.
#[derive(Debug, Error)]
pub enum GitError {
    /// The path does not contain a git repository.
    #[error("not a git repository: {path}")]
    NotARepository {
        /// The path that was searched
        path: PathBuf,
    },

    /// The git subprocess exited non-zero for a reason outside the
    /// operation's expected exit-code set. Carries stderr verbatim
    /// (token-scrubbed).
    #[error("git {command} failed: {stderr}")]
    ExternalToolFailure {
        /// The git subcommand that failed (e.g. "reset --hard")
        command: String,
        /// Trimmed stderr from the subprocess
        stderr: String,
    },

    /// A safety precondition required a clean working tree.
    #[error("working tree has uncommitted changes")]
    DirtyWorkingTree,

    /// A requested commit, blob, or ref does not exist.
    #[error("object not found: {what}")]
    ObjectNotFound {
        /// Description of the missing object (ref name, hash, path)
        what: String,
    },

    /// The remote rejected a push or clone (auth failure, non-fast-forward,
    /// unreachable host). Diagnostic text is token-scrubbed.
    #[error("remote rejected: {message}")]
    RemoteRejected {
        /// Backend diagnostic text
        message: String,
    },

    /// A branch or ref name failed validation before any mutation.
    #[error("invalid reference name: '{name}'")]
    InvalidReference {
        /// The rejected name
        name: String,
    },

    /// Non-forced deletion of a branch that is not merged into HEAD.
    #[error("branch '{name}' is not fully merged")]
    BranchNotMerged {
        /// The branch that was not deleted
        name: String,
    },

    /// Filesystem or subprocess-spawn failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Unclassified libgit2 failure from the library backend.
    #[error(transparent)]
    Library(#[from] git2::Error),
}

impl GitError {
    /// True if this error means "the requested object does not exist",
    /// regardless of which backend produced it.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GitError::ObjectNotFound { .. })
            || matches!(self, GitError::Library(e) if e.code() == git2::ErrorCode::NotFound)
    }
}
