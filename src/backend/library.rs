//! Library (libgit2) implementation of GitBackend.
//!
//! Operates directly on the repository's object database and index through
//! the git2 crate; no external process is ever spawned. Working-tree diffs
//! go through the three-way [`status_matrix`](crate::status_matrix), which
//! also drives the staged-revert algorithm.
//!
//! Author/committer identity honors the `GIT_AUTHOR_*` / `GIT_COMMITTER_*`
//! environment overrides the way the git CLI does, so both backends can
//! produce identical commit hashes for the same inputs.

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use git2::{
    build::CheckoutBuilder, BranchType, Commit, Cred, FetchOptions, IndexAddOption, PushOptions,
    RemoteCallbacks, Repository, RepositoryInitOptions, Signature, Time, Tree,
};

use crate::error::{GitError, Result};
use crate::status_matrix::{self, EntryState};

use super::{
    scrub_token, scrub_url_credentials, validate_branch_name, CloneOptions, CommitRecord,
    GitBackend, Oid,
};

/// The remote name this layer manages.
const REMOTE: &str = "origin";

/// Fallback identity when neither environment nor repo config supply one.
const DEFAULT_IDENTITY: (&str, &str) = ("duogit", "duogit@localhost");

/// Library-backend implementation, bound to one working tree.
pub struct LibraryBackend {
    repo: Repository,
    workdir: PathBuf,
}

/// Parse a `GIT_*_DATE` value of the form `[@]<unix-seconds> <±HHMM>`.
fn parse_git_date(value: &str) -> Option<(i64, i32)> {
    let value = value.trim();
    let (secs_str, offset_str) = value.split_once(' ')?;
    let secs: i64 = secs_str.trim_start_matches('@').parse().ok()?;
    let sign = match offset_str.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let digits = &offset_str[1..];
    if digits.len() != 4 {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    Some((secs, sign * (hours * 60 + minutes)))
}

/// Build a signature from `GIT_<ROLE>_NAME/EMAIL/DATE` env vars, if set.
fn env_signature(role: &str) -> Option<Signature<'static>> {
    let name = env::var(format!("GIT_{}_NAME", role)).ok()?;
    let email = env::var(format!("GIT_{}_EMAIL", role)).ok()?;
    match env::var(format!("GIT_{}_DATE", role))
        .ok()
        .as_deref()
        .and_then(parse_git_date)
    {
        Some((secs, offset)) => Signature::new(&name, &email, &Time::new(secs, offset)).ok(),
        None => Signature::now(&name, &email).ok(),
    }
}

impl LibraryBackend {
    /// Open a repository at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|_| GitError::NotARepository {
            path: path.to_path_buf(),
        })?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::NotARepository {
                path: path.to_path_buf(),
            })?
            .to_path_buf();
        Ok(Self { repo, workdir })
    }

    /// Initialize a new repository with the given default branch name.
    pub fn init(path: &Path, default_branch: &str) -> Result<()> {
        validate_branch_name(default_branch)?;
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(default_branch).mkpath(true);
        Repository::init_opts(path, &opts)?;
        Ok(())
    }

    /// Clone `url` into `dest`. A token is supplied through the credentials
    /// callback and scrubbed from any error text.
    pub fn clone_repo(url: &str, dest: &Path, opts: &CloneOptions) -> Result<()> {
        let token = opts.access_token.clone();
        let mut callbacks = RemoteCallbacks::new();
        if let Some(token) = token.clone() {
            callbacks.credentials(move |_url, username, _allowed| {
                Cred::userpass_plaintext(username.unwrap_or("x-access-token"), &token)
            });
        }

        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(callbacks);
        if let Some(depth) = opts.depth {
            fetch.depth(depth as i32);
        }
        if opts.single_branch {
            // libgit2 fetches the default refspec; the restriction is applied
            // at checkout (only the default branch is materialized).
            log::debug!("single-branch clone requested; narrowing at checkout only");
        }

        git2::build::RepoBuilder::new()
            .fetch_options(fetch)
            .clone(url, dest)
            .map(|_| ())
            .map_err(|e| GitError::RemoteRejected {
                message: scrub_url_credentials(&scrub_token(e.message(), token.as_deref())),
            })
    }

    /// Author or committer signature: env override, then repo config,
    /// then the built-in default identity.
    fn signature(&self, role: &str) -> Result<Signature<'static>> {
        if let Some(sig) = env_signature(role) {
            return Ok(sig);
        }
        self.repo
            .signature()
            .or_else(|_| Signature::now(DEFAULT_IDENTITY.0, DEFAULT_IDENTITY.1))
            .map_err(GitError::from)
    }

    /// HEAD's tree, or `None` on an unborn branch (empty repository).
    fn head_tree(&self) -> Result<Option<Tree<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_tree()?)),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// HEAD's commit, or an `ObjectNotFound` error on an unborn branch.
    fn head_commit(&self) -> Result<Commit<'_>> {
        self.repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|_| GitError::ObjectNotFound {
                what: "HEAD".to_string(),
            })
    }
}

impl GitBackend for LibraryBackend {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    // =========================================================================
    // Commit / tree operations
    // =========================================================================

    fn resolve_commit(&self, refspec: &str) -> Result<Oid> {
        let object = self
            .repo
            .revparse_single(refspec)
            .map_err(|_| GitError::ObjectNotFound {
                what: refspec.to_string(),
            })?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| GitError::ObjectNotFound {
                what: refspec.to_string(),
            })?;
        Ok(Oid::from(commit.id()))
    }

    fn is_working_tree_clean(&self) -> Result<bool> {
        let tree = self.head_tree()?;
        let entries = status_matrix::status_matrix(&self.repo, tree.as_ref())?;
        Ok(status_matrix::is_clean(&entries))
    }

    fn uncommitted_paths(&self) -> Result<Vec<String>> {
        let tree = self.head_tree()?;
        let entries = status_matrix::status_matrix(&self.repo, tree.as_ref())?;
        Ok(entries
            .into_iter()
            .filter(|e| !e.is_unmodified())
            .map(|e| e.path)
            .collect())
    }

    fn commit(&self, message: &str, amend: bool) -> Result<Oid> {
        let author = self.signature("AUTHOR")?;
        let committer = self.signature("COMMITTER")?;
        // Whitespace cleanup for parity with `git commit -m`
        let message = git2::message_prettify(message, None)?;

        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        if amend {
            let head = self.head_commit()?;
            let new_id = head.amend(
                Some("HEAD"),
                Some(&author),
                Some(&committer),
                None,
                Some(message.as_str()),
                Some(&tree),
            )?;
            return Ok(Oid::from(new_id));
        }

        // An unborn branch commits with no parent
        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                None
            }
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&Commit> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &author, &committer, &message, &tree, &parents)?;
        Ok(Oid::from(oid))
    }

    fn checkout(&self, refspec: &str) -> Result<()> {
        let refname = format!("refs/heads/{}", refspec);

        if let Ok(reference) = self.repo.find_reference(&refname) {
            let commit = reference.peel_to_commit()?;
            let tree = commit.tree()?;
            let mut checkout = CheckoutBuilder::new();
            checkout.safe().recreate_missing(true);
            self.repo
                .checkout_tree(tree.as_object(), Some(&mut checkout))?;
            self.repo.set_head(&refname)?;
            return Ok(());
        }

        // Not a branch; detach to whatever the refspec resolves to
        let object = self
            .repo
            .revparse_single(refspec)
            .map_err(|_| GitError::ObjectNotFound {
                what: refspec.to_string(),
            })?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| GitError::ObjectNotFound {
                what: refspec.to_string(),
            })?;
        let mut checkout = CheckoutBuilder::new();
        checkout.safe().recreate_missing(true);
        self.repo
            .checkout_tree(commit.tree()?.as_object(), Some(&mut checkout))?;
        self.repo.set_head_detached(commit.id())?;
        Ok(())
    }

    fn stage_to_revert(&self, target: &Oid) -> Result<()> {
        let head = Oid::from(self.head_commit()?.id());
        if head == *target {
            return Ok(());
        }

        let commit = self
            .repo
            .find_commit(target.to_git2()?)
            .map_err(|_| GitError::ObjectNotFound {
                what: target.to_string(),
            })?;
        let target_tree = commit.tree()?;
        let entries = status_matrix::status_matrix(&self.repo, Some(&target_tree))?;

        // Re-running after a staged revert must be a no-op: when both the
        // index and working tree already equal the target's tree there is
        // nothing left to stage.
        if status_matrix::is_clean(&entries) {
            return Ok(());
        }

        // Same gate as the command backend: restoring over uncommitted work
        // would destroy it.
        if !self.is_working_tree_clean()? {
            return Err(GitError::DirtyWorkingTree);
        }

        let mut index = self.repo.index()?;
        for entry in &entries {
            let rel = Path::new(&entry.path);
            let abs = self.workdir.join(rel);

            if entry.head == EntryState::Matches {
                // Present in the target: restore verbatim bytes when the
                // index or working tree disagrees with the target blob
                if entry.index != EntryState::Matches || entry.workdir != EntryState::Matches {
                    let tree_entry = target_tree.get_path(rel)?;
                    let blob = self.repo.find_blob(tree_entry.id())?;
                    if let Some(parent) = abs.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&abs, blob.content())?;
                    index.add_path(rel)?;
                }
            } else {
                // Absent from the target: delete from disk and index
                match fs::remove_file(&abs) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(GitError::Io(e)),
                }
                index.remove_path(rel)?;
            }
        }
        // One atomic index write; HEAD is never touched
        index.write()?;
        Ok(())
    }

    fn stage_all(&self) -> Result<()> {
        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        // add_all does not record deletions; update_all does
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        Ok(())
    }

    fn stage_file(&self, path: &str) -> Result<()> {
        let mut index = self.repo.index()?;
        let rel = Path::new(path);
        if self.workdir.join(rel).exists() {
            index.add_path(rel)?;
        } else {
            // `git add` on a deleted path stages the deletion
            index.remove_path(rel)?;
        }
        index.write()?;
        Ok(())
    }

    fn remove_file(&self, path: &str) -> Result<()> {
        let rel = Path::new(path);
        match fs::remove_file(self.workdir.join(rel)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(GitError::Io(e)),
        }
        let mut index = self.repo.index()?;
        index.remove_path(rel)?;
        index.write()?;
        Ok(())
    }

    fn file_at_commit(&self, path: &str, commit: &Oid) -> Result<Option<Vec<u8>>> {
        let lookup = || -> std::result::Result<Vec<u8>, git2::Error> {
            let commit = self.repo.find_commit(commit.to_git2().map_err(|_| {
                git2::Error::from_str("invalid commit hash")
            })?)?;
            let entry = commit.tree()?.get_path(Path::new(path))?;
            let blob = self.repo.find_blob(entry.id())?;
            Ok(blob.content().to_vec())
        };
        match lookup() {
            Ok(content) => Ok(Some(content)),
            Err(e) => {
                log::debug!("no content for {} at {}: {}", path, commit.short(), e);
                Ok(None)
            }
        }
    }

    // =========================================================================
    // Branch operations
    // =========================================================================

    fn list_branches(&self) -> Result<Vec<String>> {
        let mut branches = Vec::new();
        for branch in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                branches.push(name.to_string());
            }
        }
        Ok(branches)
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        validate_branch_name(name)?;
        let head = self.head_commit()?;
        self.repo.branch(name, &head, false)?;
        Ok(())
    }

    fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
        validate_branch_name(name)?;
        let mut branch = self
            .repo
            .find_branch(name, BranchType::Local)
            .map_err(|_| GitError::ObjectNotFound {
                what: format!("branch '{}'", name),
            })?;

        if !force {
            // Non-forced deletion requires the branch to be merged into HEAD
            let tip = branch.get().peel_to_commit()?.id();
            let head = self.head_commit()?.id();
            let merged = self
                .repo
                .merge_base(tip, head)
                .map(|base| base == tip)
                .unwrap_or(false);
            if !merged {
                return Err(GitError::BranchNotMerged {
                    name: name.to_string(),
                });
            }
        }

        branch.delete()?;
        Ok(())
    }

    fn rename_branch(&self, old_name: &str, new_name: &str) -> Result<()> {
        validate_branch_name(new_name)?;
        let mut branch = self
            .repo
            .find_branch(old_name, BranchType::Local)
            .map_err(|_| GitError::ObjectNotFound {
                what: format!("branch '{}'", old_name),
            })?;
        branch.rename(new_name, false)?;
        Ok(())
    }

    fn current_branch(&self) -> Result<Option<String>> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(String::from)),
            Ok(_) => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                // Unborn HEAD still names its branch through the symbolic ref
                let head = self.repo.find_reference("HEAD")?;
                Ok(head
                    .symbolic_target()
                    .and_then(|t| t.strip_prefix("refs/heads/"))
                    .map(String::from))
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Remote operations
    // =========================================================================

    fn set_remote_url(&self, url: &str) -> Result<()> {
        // Creation is the normal path here; updating covers the remote that
        // already exists. End state matches the command backend either way.
        if self.repo.find_remote(REMOTE).is_ok() {
            self.repo.remote_set_url(REMOTE, url)?;
        } else {
            self.repo.remote(REMOTE, url)?;
        }
        Ok(())
    }

    fn push(&self, branch: &str, access_token: Option<&str>, force: bool) -> Result<()> {
        validate_branch_name(branch)?;
        let mut remote = self
            .repo
            .find_remote(REMOTE)
            .map_err(|_| GitError::ObjectNotFound {
                what: format!("remote '{}'", REMOTE),
            })?;

        let mut callbacks = RemoteCallbacks::new();
        if let Some(token) = access_token {
            let token = token.to_string();
            callbacks.credentials(move |_url, username, _allowed| {
                Cred::userpass_plaintext(username.unwrap_or("x-access-token"), &token)
            });
        }
        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);

        let prefix = if force { "+" } else { "" };
        let refspec = format!("{0}refs/heads/{1}:refs/heads/{1}", prefix, branch);

        remote
            .push(&[refspec.as_str()], Some(&mut options))
            .map_err(|e| GitError::RemoteRejected {
                message: scrub_url_credentials(&scrub_token(e.message(), access_token)),
            })
    }

    // =========================================================================
    // History / metadata
    // =========================================================================

    fn commit_log(&self, depth: usize) -> Result<Vec<CommitRecord>> {
        let mut revwalk = self.repo.revwalk()?;
        if let Err(e) = revwalk.push_head() {
            // An empty repository has no HEAD to walk; its history is a
            // valid, empty list rather than an error.
            if e.code() == git2::ErrorCode::UnbornBranch
                || e.code() == git2::ErrorCode::NotFound
            {
                log::debug!("revwalk produced no history: {}", e);
                return Ok(Vec::new());
            }
            return Err(e.into());
        }

        let mut records = Vec::new();
        for oid in revwalk.take(depth) {
            let commit = self.repo.find_commit(oid?)?;
            records.push(CommitRecord {
                id: Oid::from(commit.id()),
                message: commit.message().unwrap_or("").to_string(),
                author_time_secs: commit.author().when().seconds(),
            });
        }
        Ok(records)
    }

    fn is_path_ignored(&self, path: &str) -> Result<bool> {
        Ok(self.repo.is_path_ignored(path)?)
    }
}
