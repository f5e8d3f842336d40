// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::Cursor;
use std::path::Path;

use chrono::Utc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use super::classify::{Failure, classify};
use super::{
    CommitTreeOptions, GitBackend, GixQuery, MemoryBackend, PushEnv, RepoReader,
    ScratchRepository, ShellBackend,
};
use crate::error::GitError;
use crate::git::fast_import::{CommitHeader, FastImportWriter, FromRef};
use crate::git::object::{FileMode, ObjectFormat, Signature};

fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

fn signature() -> Signature {
    Signature::new("Tester", "tester@example.com", Utc::now().fixed_offset())
}

fn commit_options(tree: String, parents: Vec<String>) -> CommitTreeOptions {
    CommitTreeOptions {
        tree,
        parents,
        message: "test commit\n".to_string(),
        author: signature(),
        committer: signature(),
        sign_key: None,
    }
}

fn push_env() -> PushEnv {
    PushEnv {
        prefix: "REPOFILES".to_string(),
        pusher_id: 7,
        pusher_name: "tester".to_string(),
        pusher_email: "tester@example.com".to_string(),
        repo_owner: "owner".to_string(),
        repo_name: "repo".to_string(),
        repo_id: 42,
    }
}

// --- classify ---

#[test]
fn test_classify_clone_failures() {
    let branch = classify(
        "git clone",
        Failure::Clone {
            repo: "/r",
            branch: "dev",
        },
        "fatal: Remote branch dev not found in upstream origin\n",
    );
    assert!(matches!(branch, GitError::BranchNotFound { branch } if branch == "dev"));

    let repo = classify(
        "git clone",
        Failure::Clone {
            repo: "/missing",
            branch: "main",
        },
        "fatal: repository '/missing' does not exist\n",
    );
    assert!(matches!(repo, GitError::RepoNotFound { .. }));
}

#[test]
fn test_classify_push_failures() {
    let failure = Failure::Push {
        repo: "/r",
        branch: "main",
    };
    let stale = classify(
        "git push",
        failure,
        " ! [rejected]        abc -> main (non-fast-forward)\n",
    );
    assert!(matches!(stale, GitError::PushOutOfDate { .. }));

    let hook = classify(
        "git push",
        failure,
        "remote: Branch main is protected\n\
         To /r\n ! [remote rejected] abc -> main (pre-receive hook declined)\n",
    );
    insta::assert_snapshot!(hook.to_string(), @"push to main rejected: Branch main is protected");
}

#[test]
fn test_classify_invalid_path_and_fallback() {
    let invalid = classify(
        "git update-index",
        Failure::Index { path: "a//b" },
        "error: Invalid path 'a//b'\nfatal: git update-index: --cacheinfo cannot add a//b\n",
    );
    assert!(matches!(invalid, GitError::InvalidPath { .. }));

    let other = classify("git write-tree", Failure::Other, "fatal: boom\n");
    insta::assert_snapshot!(other.to_string(), @"git command failed: git write-tree - fatal: boom");
}

#[test]
fn test_classify_fast_import_not_updating() {
    let err = classify(
        "git fast-import",
        Failure::FastImport { branch: "main" },
        "warning: Not updating refs/heads/main (new tip abc does not contain def)\n",
    );
    assert!(matches!(err, GitError::PushOutOfDate { .. }));
}

#[test]
fn test_push_env_exports_hook_variables() {
    let env = push_env().to_env();
    assert_eq!(env.get("REPOFILES_PUSHER_ID"), Some("7"));
    assert_eq!(env.get("REPOFILES_REPO_NAME"), Some("repo"));
    assert_eq!(env.get("REPOFILES_IS_INTERNAL"), Some("true"));
    assert_eq!(env.get("GIT_COMMITTER_NAME"), Some("tester"));
}

// --- MemoryBackend ---

fn seeded_memory() -> (MemoryBackend, &'static Path) {
    let backend = MemoryBackend::new();
    let repo = Path::new("/mem/owner/repo.git");
    backend.create_repo(repo, ObjectFormat::Sha1);
    backend
        .commit_files(repo, "main", &[("README.md", b"hello\n")], "Initial commit\n")
        .expect("seed commit");
    (backend, repo)
}

#[tokio::test]
async fn test_memory_clone_missing_branch() {
    let (backend, repo) = seeded_memory();
    let token = CancellationToken::new();
    let err = backend
        .clone_scratch(repo, "nope", &token)
        .await
        .expect_err("branch does not exist");
    assert!(matches!(err.as_git(), Some(GitError::BranchNotFound { .. })));
}

#[tokio::test]
async fn test_memory_scratch_commit_and_push() {
    let (backend, repo) = seeded_memory();
    let token = CancellationToken::new();
    let head = backend.branch_head(repo, "main").expect("head");

    let mut scratch = backend.clone_scratch(repo, "main", &token).await.expect("clone");
    scratch.set_default_index().await.expect("read-tree");
    let id = scratch.hash_object(b"new\n").await.expect("hash");
    scratch
        .add_object_to_index(FileMode::Regular, &id, "docs/new.txt")
        .await
        .expect("stage");
    let tree = scratch.write_tree().await.expect("write-tree");
    let commit = scratch
        .commit_tree(&commit_options(tree, vec![head.clone()]))
        .await
        .expect("commit-tree");

    // Nothing is visible on origin before the push
    assert!(backend.read_file(repo, "main", "docs/new.txt").is_none());

    scratch.push(&commit, "main", &push_env()).await.expect("push");
    assert_eq!(backend.read_file(repo, "main", "docs/new.txt"), Some(b"new\n".to_vec()));
    assert_eq!(backend.branch_head(repo, "main"), Some(commit));
    assert_eq!(backend.push_count(repo), 1);
}

#[tokio::test]
async fn test_memory_push_out_of_date() {
    let (backend, repo) = seeded_memory();
    let token = CancellationToken::new();
    let head = backend.branch_head(repo, "main").expect("head");

    let mut scratch = backend.clone_scratch(repo, "main", &token).await.expect("clone");
    scratch.set_default_index().await.expect("read-tree");
    let tree = scratch.write_tree().await.expect("write-tree");
    let commit = scratch
        .commit_tree(&commit_options(tree, vec![head]))
        .await
        .expect("commit-tree");

    // Someone else moves the branch first
    backend
        .commit_files(repo, "main", &[("other.txt", b"x")], "concurrent\n")
        .expect("concurrent commit");

    let err = scratch
        .push(&commit, "main", &push_env())
        .await
        .expect_err("stale push");
    assert!(matches!(err.as_git(), Some(GitError::PushOutOfDate { .. })));
}

#[tokio::test]
async fn test_memory_push_rejected() {
    let (backend, repo) = seeded_memory();
    backend
        .reject_pushes(repo, Some("pre-receive hook declined"))
        .expect("configure");
    let token = CancellationToken::new();
    let head = backend.branch_head(repo, "main").expect("head");

    let mut scratch = backend.clone_scratch(repo, "main", &token).await.expect("clone");
    scratch.set_default_index().await.expect("read-tree");
    let tree = scratch.write_tree().await.expect("write-tree");
    let commit = scratch
        .commit_tree(&commit_options(tree, vec![head]))
        .await
        .expect("commit-tree");
    let err = scratch
        .push(&commit, "main", &push_env())
        .await
        .expect_err("rejected");
    assert!(matches!(err.as_git(), Some(GitError::PushRejected { .. })));
}

#[tokio::test]
async fn test_memory_tree_entry_and_history() {
    let (backend, repo) = seeded_memory();
    let first = backend.branch_head(repo, "main").expect("head");
    backend
        .commit_files(repo, "main", &[("src/lib.rs", b"fn main() {}\n")], "add src\n")
        .expect("second commit");
    let second = backend.branch_head(repo, "main").expect("head");

    let token = CancellationToken::new();
    let reader = backend.reader(repo, &token).await.expect("reader");

    let dir = reader.tree_entry(&second, "src").await.expect("lookup").expect("dir");
    assert!(dir.is_dir());
    assert!(reader.tree_entry(&first, "src").await.expect("lookup").is_none());

    assert!(reader
        .file_changed_since(&second, &first, "src/lib.rs")
        .await
        .expect("history"));
    assert!(!reader
        .file_changed_since(&second, &first, "README.md")
        .await
        .expect("history"));
}

#[tokio::test]
async fn test_memory_lfs_patterns_match_any_depth() {
    let (backend, repo) = seeded_memory();
    backend.set_lfs_patterns(repo, &["*.bin"]).expect("patterns");
    let token = CancellationToken::new();
    let reader = backend.reader(repo, &token).await.expect("reader");

    let tracked = reader
        .lfs_tracked(None, &["a.bin", "deep/dir/b.bin", "c.txt"])
        .await
        .expect("check-attr");
    assert_eq!(
        tracked.into_iter().collect::<Vec<_>>(),
        vec!["a.bin".to_string(), "deep/dir/b.bin".to_string()]
    );
}

#[tokio::test]
async fn test_memory_fast_import_applies_stream() {
    let (backend, repo) = seeded_memory();
    let head = backend.branch_head(repo, "main").expect("head");
    let sig = signature();

    let mut writer = FastImportWriter::new(Vec::new());
    writer
        .commit(&CommitHeader {
            branch: "main",
            author: &sig,
            committer: &sig,
            message: "Update files\n",
            from: Some(FromRef::Commit(head)),
        })
        .expect("header");
    writer.delete("README.md").expect("delete");
    writer
        .modify(FileMode::Executable, "bin/run", &mut Cursor::new(b"#!/bin/sh\n".to_vec()), None)
        .expect("modify");
    let stream = writer.finish().expect("finish");

    let token = CancellationToken::new();
    backend
        .fast_import(repo, "main", stream.clone(), &push_env(), &token)
        .await
        .expect("import");

    assert_eq!(
        backend.list_files(repo, "main"),
        vec![("bin/run".to_string(), FileMode::Executable)]
    );

    // Replaying the same stream is stale: its `from` is no longer the head
    let err = backend
        .fast_import(repo, "main", stream, &push_env(), &token)
        .await
        .expect_err("stale stream");
    assert!(matches!(err.as_git(), Some(GitError::PushOutOfDate { .. })));
}

// --- ShellBackend / GixQuery ---

async fn bare_origin(dir: &Path) -> std::path::PathBuf {
    let origin = dir.join("origin.git");
    let status = tokio::process::Command::new("git")
        .args(["init", "--bare", "--quiet"])
        .arg(&origin)
        .status()
        .await
        .expect("git init should run");
    assert!(status.success());
    origin
}

#[tokio::test]
async fn test_shell_clone_missing_repo() {
    let temp = temp_dir();
    let backend = ShellBackend::new(temp.path().join("tmp")).expect("git available");
    let token = CancellationToken::new();

    let err = backend
        .clone_scratch(&temp.path().join("missing.git"), "main", &token)
        .await
        .expect_err("missing repo");
    assert!(matches!(err.as_git(), Some(GitError::RepoNotFound { .. })));
}

#[tokio::test]
async fn test_shell_init_commit_push_roundtrip() {
    let temp = temp_dir();
    let origin = bare_origin(temp.path()).await;
    let backend = ShellBackend::new(temp.path().join("tmp")).expect("git available");
    let token = CancellationToken::new();

    assert!(GixQuery::is_empty(&origin).expect("query"));

    let mut scratch = backend
        .init_scratch(&origin, ObjectFormat::Sha1, &token)
        .await
        .expect("init");
    let scratch_path = scratch.path().to_path_buf();
    let blob = scratch.hash_object(b"hello\n").await.expect("hash");
    scratch
        .add_object_to_index(FileMode::Regular, &blob, "dir/hello.txt")
        .await
        .expect("stage");
    assert_eq!(
        scratch.ls_files(&["dir/hello.txt", "absent"]).await.expect("ls-files"),
        vec!["dir/hello.txt".to_string()]
    );
    let tree = scratch.write_tree().await.expect("write-tree");
    let commit = scratch
        .commit_tree(&commit_options(tree, Vec::new()))
        .await
        .expect("commit-tree");
    scratch.push(&commit, "main", &push_env()).await.expect("push");
    scratch.close();

    assert!(!scratch_path.exists(), "temporary repository should be removed");
    assert!(!GixQuery::is_empty(&origin).expect("query"));
    assert!(GixQuery::branch_exists(&origin, "main").expect("query"));
    assert_eq!(
        GixQuery::branch_commit(&origin, "main").expect("query"),
        Some(commit.clone())
    );

    let reader = backend.reader(&origin, &token).await.expect("reader");
    let entry = reader
        .tree_entry(&commit, "dir/hello.txt")
        .await
        .expect("ls-tree")
        .expect("entry exists");
    assert_eq!(entry.id, blob);
    assert_eq!(entry.size, Some(6));
    assert_eq!(reader.read_blob(&blob, Some(4)).await.expect("cat-file"), b"hell");
    let info = reader.commit_info(&commit).await.expect("cat-file commit");
    assert_eq!(info.summary(), "test commit");
}

#[tokio::test]
async fn test_shell_clone_missing_branch() {
    let temp = temp_dir();
    let origin = bare_origin(temp.path()).await;
    let backend = ShellBackend::new(temp.path().join("tmp")).expect("git available");
    let token = CancellationToken::new();

    // Give the origin one branch so the clone itself is valid
    let mut scratch = backend
        .init_scratch(&origin, ObjectFormat::Sha1, &token)
        .await
        .expect("init");
    let tree = scratch.write_tree().await.expect("write-tree");
    let commit = scratch
        .commit_tree(&commit_options(tree, Vec::new()))
        .await
        .expect("commit-tree");
    scratch.push(&commit, "main", &push_env()).await.expect("push");

    let err = backend
        .clone_scratch(&origin, "does-not-exist", &token)
        .await
        .expect_err("missing branch");
    assert!(matches!(err.as_git(), Some(GitError::BranchNotFound { .. })));
}
