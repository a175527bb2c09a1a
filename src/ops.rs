//! Flat operation surface.
//!
//! Each function takes the repository path as its first parameter, resolves
//! the backend flag fresh, runs the operation, and returns. No repository
//! state is retained between calls and nothing here coordinates concurrent
//! callers; callers serialize mutating operations against one repository.

use std::path::Path;

use crate::backend::{
    self, CloneOptions, CommandBackend, CommitRecord, GitBackend, LibraryBackend, Oid,
};
use crate::error::Result;
use crate::settings::{self, BackendKind};

/// Default history depth for [`commit_log`].
pub const DEFAULT_LOG_DEPTH: usize = 100_000;

fn open(path: &Path) -> Result<Box<dyn GitBackend>> {
    backend::open_backend(path)
}

/// Initialize a new repository with the given default branch.
pub fn init(path: &Path, default_branch: &str) -> Result<()> {
    match settings::resolve_backend() {
        BackendKind::Command => CommandBackend::init(path, default_branch),
        BackendKind::Library => LibraryBackend::init(path, default_branch),
    }
}

/// Clone a repository into `path`.
pub fn clone(url: &str, path: &Path, opts: &CloneOptions) -> Result<()> {
    match settings::resolve_backend() {
        BackendKind::Command => CommandBackend::clone_repo(url, path, opts),
        BackendKind::Library => LibraryBackend::clone_repo(url, path, opts),
    }
}

/// Resolve a ref (e.g. "HEAD", a branch, a hash prefix) to a commit hash.
pub fn get_current_commit_hash(path: &Path, refspec: &str) -> Result<Oid> {
    open(path)?.resolve_commit(refspec)
}

/// True when HEAD, index, and working tree all agree.
pub fn is_working_tree_clean(path: &Path) -> Result<bool> {
    open(path)?.is_working_tree_clean()
}

/// Paths with uncommitted changes.
pub fn uncommitted_paths(path: &Path) -> Result<Vec<String>> {
    open(path)?.uncommitted_paths()
}

/// Commit the index; returns the new commit hash.
pub fn commit(path: &Path, message: &str, amend: bool) -> Result<Oid> {
    open(path)?.commit(message, amend)
}

/// Check out a branch or commit.
pub fn checkout(path: &Path, refspec: &str) -> Result<()> {
    open(path)?.checkout(refspec)
}

/// Stage working tree and index to match `target`'s tree, leaving HEAD alone.
pub fn stage_to_revert(path: &Path, target: &Oid) -> Result<()> {
    open(path)?.stage_to_revert(target)
}

/// Stage everything, including deletions and untracked files.
pub fn add_all(path: &Path) -> Result<()> {
    open(path)?.stage_all()
}

/// Stage one path.
pub fn add(path: &Path, filepath: &str) -> Result<()> {
    open(path)?.stage_file(filepath)
}

/// Remove one path from the working tree and index.
pub fn remove(path: &Path, filepath: &str) -> Result<()> {
    open(path)?.remove_file(filepath)
}

/// A file's bytes as of a commit, or `None` if absent at that commit.
pub fn file_at_commit(path: &Path, filepath: &str, commit: &Oid) -> Result<Option<Vec<u8>>> {
    open(path)?.file_at_commit(filepath, commit)
}

/// Local branch names.
pub fn list_branches(path: &Path) -> Result<Vec<String>> {
    open(path)?.list_branches()
}

/// Create a branch at HEAD.
pub fn create_branch(path: &Path, name: &str) -> Result<()> {
    open(path)?.create_branch(name)
}

/// Delete a branch; `force` deletes unmerged branches too.
pub fn delete_branch(path: &Path, name: &str, force: bool) -> Result<()> {
    open(path)?.delete_branch(name, force)
}

/// Rename a branch.
pub fn rename_branch(path: &Path, old_name: &str, new_name: &str) -> Result<()> {
    open(path)?.rename_branch(old_name, new_name)
}

/// Current branch name, `None` when detached.
pub fn current_branch(path: &Path) -> Result<Option<String>> {
    open(path)?.current_branch()
}

/// Point `origin` at `url`, creating or updating as needed.
pub fn set_remote_url(path: &Path, url: &str) -> Result<()> {
    open(path)?.set_remote_url(url)
}

/// Push a branch to `origin`.
pub fn push(path: &Path, branch: &str, access_token: Option<&str>, force: bool) -> Result<()> {
    open(path)?.push(branch, access_token, force)
}

/// Commit history from HEAD, newest first, up to `depth` entries
/// (see [`DEFAULT_LOG_DEPTH`]).
pub fn commit_log(path: &Path, depth: usize) -> Result<Vec<CommitRecord>> {
    open(path)?.commit_log(depth)
}

/// Whether the repository's ignore rules match `filepath`.
pub fn is_path_ignored(path: &Path, filepath: &str) -> Result<bool> {
    open(path)?.is_path_ignored(filepath)
}
