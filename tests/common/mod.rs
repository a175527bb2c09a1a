//! Shared fixtures for the integration suites.
//!
//! Fixture repositories are built through the library backend so they do not
//! depend on the ambient git configuration; the command-backend tests then
//! operate on the same on-disk state.

use std::fs;
use std::path::Path;

use duogit::{CommandBackend, GitBackend, LibraryBackend, Oid};
use tempfile::TempDir;

/// Initialize an empty repository on branch `main` with a test identity.
pub fn init_repo(path: &Path) {
    let mut opts = git2::RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = git2::Repository::init_opts(path, &opts).unwrap();
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();
    config.set_bool("commit.gpgsign", false).unwrap();
}

/// The three-commit history from the revert scenario:
/// C1 adds `a.txt`="1"; C2 adds `b.txt`="2" and edits `a.txt`="1b";
/// C3 deletes `b.txt`.
pub struct Fixture {
    pub dir: TempDir,
    pub c1: Oid,
    pub c2: Oid,
    pub c3: Oid,
}

impl Fixture {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn command(&self) -> CommandBackend {
        CommandBackend::open(self.path()).unwrap()
    }

    pub fn library(&self) -> LibraryBackend {
        LibraryBackend::open(self.path()).unwrap()
    }

    /// Both backends over the same repository.
    pub fn backends(&self) -> Vec<Box<dyn GitBackend>> {
        vec![Box::new(self.command()), Box::new(self.library())]
    }
}

pub fn fixture_history() -> Fixture {
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    let backend = LibraryBackend::open(dir.path()).unwrap();

    fs::write(dir.path().join("a.txt"), "1").unwrap();
    backend.stage_all().unwrap();
    let c1 = backend.commit("C1: add a.txt", false).unwrap();

    fs::write(dir.path().join("b.txt"), "2").unwrap();
    fs::write(dir.path().join("a.txt"), "1b").unwrap();
    backend.stage_all().unwrap();
    let c2 = backend.commit("C2: add b.txt, edit a.txt", false).unwrap();

    backend.remove_file("b.txt").unwrap();
    let c3 = backend.commit("C3: delete b.txt", false).unwrap();

    Fixture { dir, c1, c2, c3 }
}

/// Tree id of a commit, for content-equality assertions.
pub fn tree_id(path: &Path, commit: &Oid) -> git2::Oid {
    let repo = git2::Repository::open(path).unwrap();
    let commit = repo
        .find_commit(git2::Oid::from_str(commit.as_str()).unwrap())
        .unwrap();
    commit.tree_id()
}
