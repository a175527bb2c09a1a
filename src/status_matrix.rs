//! Three-way status comparison for the library backend.
//!
//! For every path known to a base tree, the index, or the working tree, the
//! matrix records a triple of flags: is the path in the base tree, does the
//! index entry match the base blob, do the on-disk bytes match the index
//! entry. The library backend builds its clean-tree check, its uncommitted
//! path listing, and the staged-revert diff on top of this one structure.
//!
//! Working-tree content is compared by hashing file bytes as a git blob
//! (no object is written), so the comparison is byte-exact and independent
//! of mtimes.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;

use git2::{ObjectType, Repository, StatusOptions, Tree, TreeWalkMode, TreeWalkResult};

use crate::error::{GitError, Result};

/// State of a path relative to one of the three trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Path does not exist there
    Absent,
    /// Content matches the tree it is compared against
    Matches,
    /// Content is present but differs
    Differs,
}

/// One row of the status matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Repository-relative path, `/`-separated
    pub path: String,
    /// Presence in the base tree (`Absent` or `Matches`)
    pub head: EntryState,
    /// Index entry compared against the base tree's blob
    pub index: EntryState,
    /// On-disk bytes compared against the index entry
    pub workdir: EntryState,
}

impl StatusEntry {
    /// True when the path is identical across base tree, index, and disk.
    pub fn is_unmodified(&self) -> bool {
        self.head == EntryState::Matches
            && self.index == EntryState::Matches
            && self.workdir == EntryState::Matches
    }
}

/// Collect blob entries of a tree into a path -> oid map.
fn tree_blobs(tree: &Tree<'_>) -> Result<BTreeMap<String, git2::Oid>> {
    let mut blobs = BTreeMap::new();
    tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
        if entry.kind() == Some(ObjectType::Blob) {
            if let Some(name) = entry.name() {
                blobs.insert(format!("{}{}", dir, name), entry.id());
            }
        }
        TreeWalkResult::Ok
    })?;
    Ok(blobs)
}

/// Compute the status matrix of a repository against `base` (typically the
/// HEAD tree, or an arbitrary historical tree for revert diffing).
///
/// `base = None` models an empty base tree (unborn HEAD). The path universe
/// is the union of base-tree paths, index paths, and untracked files; ignored
/// files never appear. Each path appears exactly once; entries are sorted by
/// path for deterministic output, though callers must not rely on order.
pub fn status_matrix(repo: &Repository, base: Option<&Tree<'_>>) -> Result<Vec<StatusEntry>> {
    let workdir = repo.workdir().ok_or_else(|| GitError::NotARepository {
        path: repo.path().to_path_buf(),
    })?;

    let base_blobs = match base {
        Some(tree) => tree_blobs(tree)?,
        None => BTreeMap::new(),
    };

    let index = repo.index()?;
    let mut index_blobs: BTreeMap<String, git2::Oid> = BTreeMap::new();
    for entry in index.iter() {
        let path = String::from_utf8_lossy(&entry.path).into_owned();
        index_blobs.insert(path, entry.id);
    }

    let mut paths: BTreeSet<String> = base_blobs.keys().cloned().collect();
    paths.extend(index_blobs.keys().cloned());

    // Untracked files are only discoverable by scanning the working tree;
    // statuses() handles ignore rules for us.
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);
    for status in repo.statuses(Some(&mut opts))?.iter() {
        if let Some(path) = status.path() {
            paths.insert(path.to_string());
        }
    }

    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        let base_oid = base_blobs.get(&path);
        let index_oid = index_blobs.get(&path);

        let head = match base_oid {
            Some(_) => EntryState::Matches,
            None => EntryState::Absent,
        };

        let index_state = match (base_oid, index_oid) {
            (_, None) => EntryState::Absent,
            (Some(b), Some(i)) if b == i => EntryState::Matches,
            _ => EntryState::Differs,
        };

        // Content-only comparison: raw disk bytes against the index blob.
        // Mode-only changes (e.g. the executable bit) and checkout/checkin
        // filter effects (e.g. autocrlf) are not reflected here.
        let workdir_state = match fs::read(workdir.join(&path)) {
            Ok(bytes) => {
                let disk_oid = git2::Oid::hash_object(ObjectType::Blob, &bytes)?;
                match index_oid {
                    Some(i) if *i == disk_oid => EntryState::Matches,
                    _ => EntryState::Differs,
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => EntryState::Absent,
            Err(e) => return Err(GitError::Io(e)),
        };

        entries.push(StatusEntry {
            path,
            head,
            index: index_state,
            workdir: workdir_state,
        });
    }

    Ok(entries)
}

/// A tree is clean iff every path is present and matching in all three places.
pub fn is_clean(entries: &[StatusEntry]) -> bool {
    entries.iter().all(StatusEntry::is_unmodified)
}
