//! Staged-revert behavior: both backends must restore working tree and index
//! to a historical commit's content without moving HEAD, fail closed on a
//! dirty tree, and be re-runnable without further effect.

mod common;

use std::fs;

use duogit::{GitBackend, GitError, Oid};

use common::{fixture_history, tree_id, Fixture};

fn each_backend(run: impl Fn(&Fixture, Box<dyn GitBackend>)) {
    for use_command in [true, false] {
        let fx = fixture_history();
        let backend: Box<dyn GitBackend> = if use_command {
            Box::new(fx.command())
        } else {
            Box::new(fx.library())
        };
        run(&fx, backend);
    }
}

#[test]
fn revert_to_c1_restores_exact_tree_and_keeps_head() {
    each_backend(|fx, backend| {
        backend.stage_to_revert(&fx.c1).unwrap();

        // Working tree now matches C1: only a.txt with its original content
        assert_eq!(fs::read(fx.path().join("a.txt")).unwrap(), b"1");
        assert!(!fx.path().join("b.txt").exists());

        // HEAD never moved
        assert_eq!(backend.resolve_commit("HEAD").unwrap(), fx.c3);

        // The difference is staged, so committing re-creates C1's content
        let c4 = backend.commit("C4: restore C1", false).unwrap();
        assert_eq!(tree_id(fx.path(), &c4), tree_id(fx.path(), &fx.c1));
        assert_ne!(c4, fx.c1);

        let log = backend.commit_log(100).unwrap();
        assert_eq!(log.len(), 4);
        assert_eq!(log[0].message, "C4: restore C1\n");
        assert!(backend.is_working_tree_clean().unwrap());
    });
}

#[test]
fn revert_to_c2_restores_the_deleted_file() {
    each_backend(|fx, backend| {
        backend.stage_to_revert(&fx.c2).unwrap();
        assert_eq!(fs::read(fx.path().join("a.txt")).unwrap(), b"1b");
        assert_eq!(fs::read(fx.path().join("b.txt")).unwrap(), b"2");
        assert_eq!(backend.resolve_commit("HEAD").unwrap(), fx.c3);

        let c4 = backend.commit("bring back b.txt", false).unwrap();
        assert_eq!(tree_id(fx.path(), &c4), tree_id(fx.path(), &fx.c2));
    });
}

#[test]
fn revert_is_idempotent() {
    each_backend(|fx, backend| {
        backend.stage_to_revert(&fx.c1).unwrap();
        let snapshot = fs::read(fx.path().join("a.txt")).unwrap();

        // Second invocation changes nothing further on disk
        backend.stage_to_revert(&fx.c1).unwrap();
        assert_eq!(fs::read(fx.path().join("a.txt")).unwrap(), snapshot);
        assert!(!fx.path().join("b.txt").exists());
        assert_eq!(backend.resolve_commit("HEAD").unwrap(), fx.c3);

        let c4 = backend.commit("restore", false).unwrap();
        assert_eq!(tree_id(fx.path(), &c4), tree_id(fx.path(), &fx.c1));
    });
}

#[test]
fn untracked_file_after_staged_revert_blocks_the_rerun_on_both_backends() {
    // An untracked file means the tree no longer equals the target, so the
    // rerun must not short-circuit as "already staged"; with other changes
    // pending it hits the dirty gate instead, identically on both backends.
    each_backend(|fx, backend| {
        backend.stage_to_revert(&fx.c1).unwrap();
        fs::write(fx.path().join("junk.txt"), "untracked").unwrap();

        let err = backend.stage_to_revert(&fx.c1).unwrap_err();
        assert!(
            matches!(err, GitError::DirtyWorkingTree),
            "expected DirtyWorkingTree, got {err}"
        );

        // The failed rerun wrote nothing
        assert_eq!(fs::read(fx.path().join("junk.txt")).unwrap(), b"untracked");
        assert_eq!(fs::read(fx.path().join("a.txt")).unwrap(), b"1");
        assert_eq!(backend.resolve_commit("HEAD").unwrap(), fx.c3);
    });
}

#[test]
fn revert_to_current_head_is_a_noop() {
    each_backend(|fx, backend| {
        backend.stage_to_revert(&fx.c3).unwrap();
        assert!(backend.is_working_tree_clean().unwrap());
        assert_eq!(backend.resolve_commit("HEAD").unwrap(), fx.c3);
    });
}

#[test]
fn dirty_tree_fails_closed_with_no_writes() {
    each_backend(|fx, backend| {
        fs::write(fx.path().join("a.txt"), "uncommitted edit").unwrap();
        fs::write(fx.path().join("junk.txt"), "untracked").unwrap();

        let err = backend.stage_to_revert(&fx.c1).unwrap_err();
        assert!(
            matches!(err, GitError::DirtyWorkingTree),
            "expected DirtyWorkingTree, got {err}"
        );

        // Nothing was destroyed or restored
        assert_eq!(
            fs::read(fx.path().join("a.txt")).unwrap(),
            b"uncommitted edit"
        );
        assert_eq!(fs::read(fx.path().join("junk.txt")).unwrap(), b"untracked");
        assert!(!fx.path().join("b.txt").exists());
        assert_eq!(backend.resolve_commit("HEAD").unwrap(), fx.c3);
    });
}

#[test]
fn revert_target_must_exist() {
    each_backend(|_fx, backend| {
        let bogus = Oid::from_hex("deadbeefdeadbeefdeadbeefdeadbeefdeadbeef").unwrap();
        let err = backend.stage_to_revert(&bogus).unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err}");
    });
}

#[test]
fn revert_restores_nested_paths() {
    each_backend(|fx, backend| {
        // Extend history: C4 adds a nested file, C5 deletes it
        fs::create_dir_all(fx.path().join("docs/guides")).unwrap();
        fs::write(fx.path().join("docs/guides/intro.md"), "hello").unwrap();
        backend.stage_all().unwrap();
        let c4 = backend.commit("add nested doc", false).unwrap();

        backend.remove_file("docs/guides/intro.md").unwrap();
        backend.commit("drop nested doc", false).unwrap();
        // Leftover empty directories would not dirty the tree, but clear
        // them anyway so the restore exercises directory creation
        let _ = fs::remove_dir_all(fx.path().join("docs"));

        backend.stage_to_revert(&c4).unwrap();
        assert_eq!(
            fs::read(fx.path().join("docs/guides/intro.md")).unwrap(),
            b"hello"
        );

        let c6 = backend.commit("restore nested doc", false).unwrap();
        assert_eq!(tree_id(fx.path(), &c6), tree_id(fx.path(), &c4));
    });
}

#[test]
fn reverting_forward_works_too() {
    // Staged revert is not only for going backward: after restoring C1 and
    // committing, a second revert targeting C3's content walks forward again.
    each_backend(|fx, backend| {
        backend.stage_to_revert(&fx.c1).unwrap();
        backend.commit("back to C1", false).unwrap();

        backend.stage_to_revert(&fx.c3).unwrap();
        assert_eq!(fs::read(fx.path().join("a.txt")).unwrap(), b"1b");
        assert!(!fx.path().join("b.txt").exists());

        let tip = backend.commit("forward to C3 content", false).unwrap();
        assert_eq!(tree_id(fx.path(), &tip), tree_id(fx.path(), &fx.c3));
    });
}
