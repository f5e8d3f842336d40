// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! In-process git backend for tests.
//!
//! ```text
//! MemoryBackend (Arc<Mutex<..>>, cheap to clone)
//!   repos: path -> MemRepo { store, branches, lfs patterns, push policy }
//!
//! Store   blobs / trees / commits keyed by content hash
//! Tree    flat map "dir/file" -> (mode, blob id); directories are implied
//!
//! MemScratch   private Store layered over the origin Store
//!   push       copies private objects into origin, then moves the branch
//!              only if the old head is an ancestor (compare-and-swap)
//! ```
//!
//! Ids are SHA-256 digests truncated to the repository's hex length; they
//! are stable but are not the ids real git would compute.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use wax::{Glob, Program as _};

use super::{CommitTreeOptions, GitBackend, PushEnv, RepoReader, ScratchRepository};
use crate::error::{EngineError, EngineResult, GitError};
use crate::git::fast_import::unquote_path;
use crate::git::object::{CommitInfo, FileMode, ObjectFormat, Signature, TreeEntry};

type Tree = BTreeMap<String, (FileMode, String)>;

// --- Object store ---

#[derive(Debug, Clone, Default)]
struct Store {
    blobs: HashMap<String, Vec<u8>>,
    trees: HashMap<String, Tree>,
    commits: HashMap<String, CommitInfo>,
    signed: HashSet<String>,
}

impl Store {
    fn absorb(&mut self, other: &Self) {
        self.blobs
            .extend(other.blobs.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.trees
            .extend(other.trees.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.commits
            .extend(other.commits.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.signed.extend(other.signed.iter().cloned());
    }
}

/// Private objects looked up before the origin's.
#[derive(Clone, Copy)]
struct Layered<'a> {
    local: Option<&'a Store>,
    origin: &'a Store,
}

impl<'a> Layered<'a> {
    fn find<T>(&self, pick: impl Fn(&'a Store) -> Option<&'a T>) -> Option<&'a T> {
        self.local.and_then(&pick).or_else(|| pick(self.origin))
    }

    fn blob(&self, id: &str) -> Option<&'a Vec<u8>> {
        self.find(|s| s.blobs.get(id))
    }

    fn tree(&self, id: &str) -> Option<&'a Tree> {
        self.find(|s| s.trees.get(id))
    }

    fn commit(&self, id: &str) -> Option<&'a CommitInfo> {
        self.find(|s| s.commits.get(id))
    }

    fn commit_tree(&self, id: &str) -> Option<&'a Tree> {
        self.commit(id).and_then(|c| self.tree(&c.tree))
    }

    /// Full id for an exact id or a unique prefix of at least four digits.
    fn expand(&self, rev: &str) -> Option<String> {
        if self.commit(rev).is_some() {
            return Some(rev.to_string());
        }
        if rev.len() < 4 {
            return None;
        }
        let mut matches: BTreeSet<&String> = self.origin.commits.keys().collect();
        if let Some(local) = self.local {
            matches.extend(local.commits.keys());
        }
        let mut found = matches.into_iter().filter(|id| id.starts_with(rev));
        match (found.next(), found.next()) {
            (Some(id), None) => Some(id.clone()),
            _ => None,
        }
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        self.ancestors(descendant).contains(ancestor)
    }

    fn ancestors(&self, start: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start.to_string()]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(commit) = self.commit(&id) {
                queue.extend(commit.parents.iter().cloned());
            }
        }
        seen
    }

    fn entry(&self, commit: &str, path: &str) -> EngineResult<Option<TreeEntry>> {
        let tree = self.commit_tree(commit).ok_or_else(|| GitError::CommitNotFound {
            commit: commit.to_string(),
        })?;
        Ok(tree_entry(tree, path, |id| self.blob(id).map(Vec::len)))
    }

    fn changed_since(&self, commit: &str, since: &str, path: &str) -> bool {
        let excluded = self.ancestors(since);
        let mut queue = VecDeque::from([commit.to_string()]);
        let mut seen = HashSet::new();
        while let Some(id) = queue.pop_front() {
            if excluded.contains(&id) || !seen.insert(id.clone()) {
                continue;
            }
            let Some(info) = self.commit(&id) else {
                continue;
            };
            let current = self.commit_tree(&id).and_then(|t| t.get(path));
            let parent = info
                .parents
                .first()
                .and_then(|p| self.commit_tree(p))
                .and_then(|t| t.get(path));
            if current != parent {
                return true;
            }
            queue.extend(info.parents.iter().cloned());
        }
        false
    }
}

fn tree_entry(tree: &Tree, path: &str, size_of: impl Fn(&str) -> Option<usize>) -> Option<TreeEntry> {
    if let Some((mode, id)) = tree.get(path) {
        return Some(TreeEntry {
            path: path.to_string(),
            mode: *mode,
            id: id.clone(),
            size: size_of(id).map(|n| n as u64),
        });
    }
    let prefix = format!("{path}/");
    tree.keys().any(|k| k.starts_with(&prefix)).then(|| TreeEntry {
        path: path.to_string(),
        mode: FileMode::Tree,
        id: digest(ObjectFormat::Sha256, "tree-path", path.as_bytes()),
        size: None,
    })
}

fn digest(format: ObjectFormat, kind: &str, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{kind} {}\0", bytes.len()).as_bytes());
    hasher.update(bytes);
    let mut id = hex::encode(hasher.finalize());
    id.truncate(format.hex_len());
    id
}

fn tree_id(format: ObjectFormat, tree: &Tree) -> String {
    let mut bytes = Vec::new();
    for (path, (mode, id)) in tree {
        bytes.extend_from_slice(format!("{} {id}\t{path}\0", mode.as_octal()).as_bytes());
    }
    digest(format, "tree", &bytes)
}

fn commit_id(format: ObjectFormat, info: &CommitInfo) -> String {
    let mut text = format!("tree {}\n", info.tree);
    for parent in &info.parents {
        text.push_str(&format!("parent {parent}\n"));
    }
    text.push_str(&format!("author {}\ncommitter {}\n\n{}", info.author, info.committer, info.message));
    digest(format, "commit", text.as_bytes())
}

fn matches_any(patterns: &[String], path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    patterns.iter().any(|pattern| {
        // Patterns without a slash match at any depth, like .gitattributes
        let subject = if pattern.contains('/') { path } else { name };
        Glob::new(pattern).is_ok_and(|glob| glob.is_match(subject))
    })
}

// --- Repositories ---

#[derive(Debug, Clone, Default)]
struct MemRepo {
    format: ObjectFormat,
    store: Store,
    branches: BTreeMap<String, String>,
    lfs_patterns: Vec<String>,
    push_rejection: Option<String>,
    pushes: usize,
    last_push_env: Option<PushEnv>,
}

impl MemRepo {
    fn view(&self) -> Layered<'_> {
        Layered {
            local: None,
            origin: &self.store,
        }
    }

    fn commit(&mut self, parent: Option<String>, tree: Tree, message: &str, sig: &Signature) -> String {
        let tree_id = tree_id(self.format, &tree);
        self.store.trees.insert(tree_id.clone(), tree);
        let mut info = CommitInfo {
            id: String::new(),
            tree: tree_id,
            parents: parent.into_iter().collect(),
            author: sig.clone(),
            committer: sig.clone(),
            message: message.to_string(),
        };
        info.id = commit_id(self.format, &info);
        let id = info.id.clone();
        self.store.commits.insert(id.clone(), info);
        id
    }
}

/// In-memory [`GitBackend`] with seeding helpers for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    repos: Arc<Mutex<HashMap<PathBuf, MemRepo>>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MemRepo>> {
        self.repos.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_repo<T>(&self, path: &Path, f: impl FnOnce(&mut MemRepo) -> T) -> EngineResult<T> {
        let mut repos = self.lock();
        let repo = repos.get_mut(path).ok_or_else(|| GitError::RepoNotFound {
            path: path.display().to_string(),
        })?;
        Ok(f(repo))
    }

    /// Registers an empty repository.
    pub fn create_repo(&self, path: impl Into<PathBuf>, format: ObjectFormat) {
        self.lock().insert(
            path.into(),
            MemRepo {
                format,
                ..MemRepo::default()
            },
        );
    }

    /// Commits `files` on top of `branch` (creating it) and returns the id.
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepoNotFound` for an unknown repository.
    pub fn commit_files(
        &self,
        path: &Path,
        branch: &str,
        files: &[(&str, &[u8])],
        message: &str,
    ) -> EngineResult<String> {
        let entries: Vec<_> = files
            .iter()
            .map(|(p, c)| (*p, FileMode::Regular, *c))
            .collect();
        self.commit_entries(path, branch, &entries, message)
    }

    /// Like [`Self::commit_files`] with an explicit mode per file.
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepoNotFound` for an unknown repository.
    pub fn commit_entries(
        &self,
        path: &Path,
        branch: &str,
        files: &[(&str, FileMode, &[u8])],
        message: &str,
    ) -> EngineResult<String> {
        self.with_repo(path, |repo| {
            let parent = repo.branches.get(branch).cloned();
            let mut tree = parent
                .as_deref()
                .and_then(|p| repo.view().commit_tree(p).cloned())
                .unwrap_or_default();
            for (file, mode, content) in files {
                let id = digest(repo.format, "blob", content);
                repo.store.blobs.insert(id.clone(), content.to_vec());
                tree.insert((*file).to_string(), (*mode, id));
            }
            let sig = Signature::new("Seed", "seed@example.com", Utc::now().fixed_offset());
            let id = repo.commit(parent, tree, message, &sig);
            repo.branches.insert(branch.to_string(), id.clone());
            id
        })
    }

    /// Marks paths matching `patterns` as LFS-tracked.
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepoNotFound` for an unknown repository.
    pub fn set_lfs_patterns(&self, path: &Path, patterns: &[&str]) -> EngineResult<()> {
        self.with_repo(path, |repo| {
            repo.lfs_patterns = patterns.iter().map(ToString::to_string).collect();
        })
    }

    /// Makes every following push fail as if a hook declined it.
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepoNotFound` for an unknown repository.
    pub fn reject_pushes(&self, path: &Path, message: Option<&str>) -> EngineResult<()> {
        self.with_repo(path, |repo| {
            repo.push_rejection = message.map(ToString::to_string);
        })
    }

    /// Head of `branch`.
    #[must_use]
    pub fn branch_head(&self, path: &Path, branch: &str) -> Option<String> {
        self.with_repo(path, |repo| repo.branches.get(branch).cloned())
            .ok()
            .flatten()
    }

    /// Content of `file` at the head of `branch`.
    #[must_use]
    pub fn read_file(&self, path: &Path, branch: &str, file: &str) -> Option<Vec<u8>> {
        self.with_repo(path, |repo| {
            let view = repo.view();
            let head = repo.branches.get(branch)?;
            let (_, id) = view.commit_tree(head)?.get(file)?;
            view.blob(id).cloned()
        })
        .ok()
        .flatten()
    }

    /// Every path with its mode at the head of `branch`.
    #[must_use]
    pub fn list_files(&self, path: &Path, branch: &str) -> Vec<(String, FileMode)> {
        self.with_repo(path, |repo| {
            let view = repo.view();
            repo.branches
                .get(branch)
                .and_then(|head| view.commit_tree(head))
                .map(|tree| tree.iter().map(|(p, (m, _))| (p.clone(), *m)).collect())
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    /// Commit object by id.
    #[must_use]
    pub fn commit(&self, path: &Path, id: &str) -> Option<CommitInfo> {
        self.with_repo(path, |repo| repo.store.commits.get(id).cloned())
            .ok()
            .flatten()
    }

    /// True when `id` was created with a signing key.
    #[must_use]
    pub fn is_signed(&self, path: &Path, id: &str) -> bool {
        self.with_repo(path, |repo| repo.store.signed.contains(id))
            .unwrap_or(false)
    }

    /// Number of successful pushes and fast-imports.
    #[must_use]
    pub fn push_count(&self, path: &Path) -> usize {
        self.with_repo(path, |repo| repo.pushes).unwrap_or(0)
    }

    /// Environment of the last successful push.
    #[must_use]
    pub fn last_push_env(&self, path: &Path) -> Option<PushEnv> {
        self.with_repo(path, |repo| repo.last_push_env.clone())
            .ok()
            .flatten()
    }
}

impl GitBackend for MemoryBackend {
    type Reader = MemReader;
    type Scratch = MemScratch;

    async fn reader(&self, repo: &Path, _token: &CancellationToken) -> EngineResult<MemReader> {
        self.with_repo(repo, |_| ())?;
        Ok(MemReader {
            backend: self.clone(),
            repo: repo.to_path_buf(),
        })
    }

    async fn is_empty(&self, repo: &Path) -> EngineResult<bool> {
        self.with_repo(repo, |r| r.branches.is_empty())
    }

    async fn branch_exists(&self, repo: &Path, branch: &str) -> EngineResult<bool> {
        self.with_repo(repo, |r| r.branches.contains_key(branch))
    }

    async fn clone_scratch(
        &self,
        repo: &Path,
        branch: &str,
        token: &CancellationToken,
    ) -> EngineResult<MemScratch> {
        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let (format, refs) = self.with_repo(repo, |r| (r.format, r.branches.clone()))?;
        if !refs.contains_key(branch) {
            return Err(GitError::BranchNotFound {
                branch: branch.to_string(),
            }
            .into());
        }
        Ok(MemScratch {
            backend: self.clone(),
            origin: repo.to_path_buf(),
            path: PathBuf::from(format!("memory:{}#{branch}", repo.display())),
            format,
            head: Some(branch.to_string()),
            refs,
            index: Tree::new(),
            local: Store::default(),
        })
    }

    async fn init_scratch(
        &self,
        repo: &Path,
        format: ObjectFormat,
        token: &CancellationToken,
    ) -> EngineResult<MemScratch> {
        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        self.with_repo(repo, |_| ())?;
        Ok(MemScratch {
            backend: self.clone(),
            origin: repo.to_path_buf(),
            path: PathBuf::from(format!("memory:{}#init", repo.display())),
            format,
            head: None,
            refs: BTreeMap::new(),
            index: Tree::new(),
            local: Store::default(),
        })
    }

    async fn fast_import(
        &self,
        repo: &Path,
        branch: &str,
        stream: Vec<u8>,
        env: &PushEnv,
        token: &CancellationToken,
    ) -> EngineResult<()> {
        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let parsed = parse_stream(&stream).ok_or_else(|| GitError::CommandFailed {
            command: "fast-import".to_string(),
            message: "malformed stream".to_string(),
        })?;

        self.with_repo(repo, |r| {
            let current = r.branches.get(&parsed.branch).cloned();
            let parent = match &parsed.from {
                Some(ParsedFrom::Commit(id)) => {
                    // Like git without --force: the old tip must be contained in the new one
                    if let Some(tip) = &current
                        && tip != id
                        && !r.view().is_ancestor(tip, id)
                    {
                        return Err(GitError::PushOutOfDate {
                            branch: branch.to_string(),
                            message: format!("Not updating refs/heads/{}", parsed.branch),
                        }
                        .into());
                    }
                    Some(id.clone())
                }
                Some(ParsedFrom::Branch(name)) => r.branches.get(name).cloned(),
                None => None,
            };

            let mut tree = parent
                .as_deref()
                .and_then(|p| r.view().commit_tree(p).cloned())
                .unwrap_or_default();
            for change in parsed.changes {
                match change {
                    ParsedChange::Delete(path) => {
                        tree.remove(&path);
                    }
                    ParsedChange::Modify(mode, path, content) => {
                        let id = digest(r.format, "blob", &content);
                        r.store.blobs.insert(id.clone(), content);
                        tree.insert(path, (mode, id));
                    }
                    ParsedChange::Reuse(mode, path, id) => {
                        if r.view().blob(&id).is_none() {
                            return Err(GitError::CommandFailed {
                                command: "fast-import".to_string(),
                                message: format!("fatal: Not a blob (actually a missing object): {id}"),
                            }
                            .into());
                        }
                        tree.insert(path, (mode, id));
                    }
                }
            }

            let tree_id = tree_id(r.format, &tree);
            r.store.trees.insert(tree_id.clone(), tree);
            let mut info = CommitInfo {
                id: String::new(),
                tree: tree_id,
                parents: parent.into_iter().collect(),
                author: parsed.author,
                committer: parsed.committer,
                message: parsed.message,
            };
            info.id = commit_id(r.format, &info);
            r.branches.insert(parsed.branch.clone(), info.id.clone());
            r.store.commits.insert(info.id.clone(), info);
            r.pushes += 1;
            r.last_push_env = Some(env.clone());
            Ok(())
        })?
    }
}

// --- Fast-import parsing ---

enum ParsedFrom {
    Commit(String),
    Branch(String),
}

enum ParsedChange {
    Delete(String),
    Modify(FileMode, String, Vec<u8>),
    Reuse(FileMode, String, String),
}

struct ParsedCommit {
    branch: String,
    author: Signature,
    committer: Signature,
    message: String,
    from: Option<ParsedFrom>,
    changes: Vec<ParsedChange>,
}

struct StreamCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> StreamCursor<'a> {
    fn line(&mut self) -> Option<&'a str> {
        let rest = self.bytes.get(self.pos..)?;
        if rest.is_empty() {
            return None;
        }
        let end = rest.iter().position(|b| *b == b'\n').unwrap_or(rest.len());
        self.pos += end + 1;
        std::str::from_utf8(&rest[..end]).ok()
    }

    fn peek_line(&self) -> Option<&'a str> {
        let mut probe = StreamCursor {
            bytes: self.bytes,
            pos: self.pos,
        };
        probe.line()
    }

    fn data(&mut self) -> Option<Vec<u8>> {
        let len: usize = self.line()?.strip_prefix("data ")?.parse().ok()?;
        let data = self.bytes.get(self.pos..self.pos + len)?.to_vec();
        self.pos += len;
        if self.bytes.get(self.pos) == Some(&b'\n') {
            self.pos += 1;
        }
        Some(data)
    }
}

fn parse_stream(bytes: &[u8]) -> Option<ParsedCommit> {
    let mut cursor = StreamCursor { bytes, pos: 0 };
    let branch = cursor
        .line()?
        .strip_prefix("commit refs/heads/")?
        .to_string();
    let author = Signature::parse_raw(cursor.line()?.strip_prefix("author ")?)?;
    let committer = Signature::parse_raw(cursor.line()?.strip_prefix("committer ")?)?;
    let message = String::from_utf8(cursor.data()?).ok()?;

    let mut from = None;
    if let Some(line) = cursor.peek_line()
        && let Some(target) = line.strip_prefix("from ")
    {
        cursor.line();
        from = Some(match target.strip_prefix("refs/heads/").and_then(|b| b.strip_suffix("^0")) {
            Some(branch) => ParsedFrom::Branch(branch.to_string()),
            None => ParsedFrom::Commit(target.to_string()),
        });
    }

    let mut changes = Vec::new();
    while let Some(line) = cursor.line() {
        if line.is_empty() {
            break;
        }
        if let Some(path) = line.strip_prefix("D ") {
            changes.push(ParsedChange::Delete(unquote_path(path)));
        } else if let Some(rest) = line.strip_prefix("M ") {
            let (mode, rest) = rest.split_once(' ')?;
            let mode = FileMode::from_octal(mode)?;
            let (dataref, path) = rest.split_once(' ')?;
            if dataref == "inline" {
                changes.push(ParsedChange::Modify(mode, unquote_path(path), cursor.data()?));
            } else {
                changes.push(ParsedChange::Reuse(mode, unquote_path(path), dataref.to_string()));
            }
        } else {
            return None;
        }
    }

    Some(ParsedCommit {
        branch,
        author,
        committer,
        message,
        from,
        changes,
    })
}

// --- Reader ---

/// Read-only view of a [`MemoryBackend`] repository.
#[derive(Debug, Clone)]
pub struct MemReader {
    backend: MemoryBackend,
    repo: PathBuf,
}

impl MemReader {
    fn read<T>(&self, f: impl FnOnce(&MemRepo, Layered<'_>) -> EngineResult<T>) -> EngineResult<T> {
        self.backend.with_repo(&self.repo, |repo| f(repo, repo.view()))?
    }
}

impl RepoReader for MemReader {
    async fn branch_commit(&self, branch: &str) -> EngineResult<Option<String>> {
        self.read(|repo, _| Ok(repo.branches.get(branch).cloned()))
    }

    async fn resolve_commit(&self, rev: &str) -> EngineResult<Option<String>> {
        self.read(|repo, view| {
            let rev = rev.strip_prefix("refs/heads/").unwrap_or(rev);
            Ok(repo.branches.get(rev).cloned().or_else(|| view.expand(rev)))
        })
    }

    async fn commit_info(&self, commit: &str) -> EngineResult<CommitInfo> {
        self.read(|_, view| {
            view.expand(commit)
                .and_then(|id| view.commit(&id).cloned())
                .ok_or_else(|| {
                    GitError::CommitNotFound {
                        commit: commit.to_string(),
                    }
                    .into()
                })
        })
    }

    async fn tree_entry(&self, commit: &str, path: &str) -> EngineResult<Option<TreeEntry>> {
        self.read(|_, view| view.entry(commit, path))
    }

    async fn file_changed_since(&self, commit: &str, since: &str, path: &str) -> EngineResult<bool> {
        self.read(|_, view| Ok(view.changed_since(commit, since, path)))
    }

    async fn read_blob(&self, id: &str, limit: Option<usize>) -> EngineResult<Vec<u8>> {
        self.read(|_, view| read_limited(view, id, limit))
    }

    async fn lfs_tracked(&self, _treeish: Option<&str>, paths: &[&str]) -> EngineResult<BTreeSet<String>> {
        self.read(|repo, _| Ok(lfs_subset(&repo.lfs_patterns, paths)))
    }
}

fn read_limited(view: Layered<'_>, id: &str, limit: Option<usize>) -> EngineResult<Vec<u8>> {
    let blob = view.blob(id).ok_or_else(|| GitError::CommandFailed {
        command: format!("cat-file blob {id}"),
        message: "not a valid object".to_string(),
    })?;
    let end = limit.map_or(blob.len(), |l| l.min(blob.len()));
    Ok(blob[..end].to_vec())
}

fn lfs_subset(patterns: &[String], paths: &[&str]) -> BTreeSet<String> {
    paths
        .iter()
        .filter(|p| matches_any(patterns, p))
        .map(ToString::to_string)
        .collect()
}

// --- Scratch ---

/// Scratch repository of a [`MemoryBackend`].
#[derive(Debug)]
pub struct MemScratch {
    backend: MemoryBackend,
    origin: PathBuf,
    path: PathBuf,
    format: ObjectFormat,
    head: Option<String>,
    refs: BTreeMap<String, String>,
    index: Tree,
    local: Store,
}

impl MemScratch {
    fn read<T>(&self, f: impl FnOnce(&MemRepo, Layered<'_>) -> EngineResult<T>) -> EngineResult<T> {
        self.backend.with_repo(&self.origin, |repo| {
            let view = Layered {
                local: Some(&self.local),
                origin: &repo.store,
            };
            f(repo, view)
        })?
    }

    fn head_commit(&self) -> Option<&String> {
        self.head.as_ref().and_then(|b| self.refs.get(b))
    }
}

impl RepoReader for MemScratch {
    async fn branch_commit(&self, branch: &str) -> EngineResult<Option<String>> {
        Ok(self.refs.get(branch).cloned())
    }

    async fn resolve_commit(&self, rev: &str) -> EngineResult<Option<String>> {
        if rev == "HEAD" {
            return Ok(self.head_commit().cloned());
        }
        self.read(|_, view| {
            let rev = rev.strip_prefix("refs/heads/").unwrap_or(rev);
            Ok(self.refs.get(rev).cloned().or_else(|| view.expand(rev)))
        })
    }

    async fn commit_info(&self, commit: &str) -> EngineResult<CommitInfo> {
        self.read(|_, view| {
            view.expand(commit)
                .and_then(|id| view.commit(&id).cloned())
                .ok_or_else(|| {
                    GitError::CommitNotFound {
                        commit: commit.to_string(),
                    }
                    .into()
                })
        })
    }

    async fn tree_entry(&self, commit: &str, path: &str) -> EngineResult<Option<TreeEntry>> {
        self.read(|_, view| view.entry(commit, path))
    }

    async fn file_changed_since(&self, commit: &str, since: &str, path: &str) -> EngineResult<bool> {
        self.read(|_, view| Ok(view.changed_since(commit, since, path)))
    }

    async fn read_blob(&self, id: &str, limit: Option<usize>) -> EngineResult<Vec<u8>> {
        self.read(|_, view| read_limited(view, id, limit))
    }

    async fn lfs_tracked(&self, _treeish: Option<&str>, paths: &[&str]) -> EngineResult<BTreeSet<String>> {
        self.read(|repo, _| Ok(lfs_subset(&repo.lfs_patterns, paths)))
    }
}

impl ScratchRepository for MemScratch {
    fn path(&self) -> &Path {
        &self.path
    }

    fn object_format(&self) -> ObjectFormat {
        self.format
    }

    async fn set_default_index(&mut self) -> EngineResult<()> {
        let head = self.head_commit().cloned().ok_or_else(|| GitError::CommandFailed {
            command: "read-tree HEAD".to_string(),
            message: "HEAD does not point at a commit".to_string(),
        })?;
        let tree = self.read(|_, view| {
            view.commit_tree(&head).cloned().ok_or_else(|| {
                GitError::CommitNotFound {
                    commit: head.clone(),
                }
                .into()
            })
        })?;
        self.index = tree;
        Ok(())
    }

    async fn ls_files(&self, paths: &[&str]) -> EngineResult<Vec<String>> {
        Ok(self
            .index
            .keys()
            .filter(|key| {
                paths
                    .iter()
                    .any(|p| key.as_str() == *p || key.starts_with(&format!("{p}/")))
            })
            .cloned()
            .collect())
    }

    async fn remove_files_from_index(&mut self, paths: &[&str]) -> EngineResult<()> {
        for path in paths {
            self.index.remove(*path);
        }
        Ok(())
    }

    async fn hash_object(&mut self, content: &[u8]) -> EngineResult<String> {
        let id = digest(self.format, "blob", content);
        self.local.blobs.insert(id.clone(), content.to_vec());
        Ok(id)
    }

    async fn add_object_to_index(&mut self, mode: FileMode, id: &str, path: &str) -> EngineResult<()> {
        if path.is_empty() || path.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
            return Err(GitError::InvalidPath {
                path: path.to_string(),
                message: "invalid path".to_string(),
            }
            .into());
        }
        self.index.insert(path.to_string(), (mode, id.to_string()));
        Ok(())
    }

    async fn write_tree(&mut self) -> EngineResult<String> {
        let id = tree_id(self.format, &self.index);
        self.local.trees.insert(id.clone(), self.index.clone());
        Ok(id)
    }

    async fn commit_tree(&mut self, options: &CommitTreeOptions) -> EngineResult<String> {
        let mut info = CommitInfo {
            id: String::new(),
            tree: options.tree.clone(),
            parents: options.parents.clone(),
            author: options.author.clone(),
            committer: options.committer.clone(),
            message: options.message.clone(),
        };
        info.id = commit_id(self.format, &info);
        let id = info.id.clone();
        self.local.commits.insert(id.clone(), info);
        if options.sign_key.is_some() {
            self.local.signed.insert(id.clone());
        }
        Ok(id)
    }

    async fn push(&mut self, commit: &str, branch: &str, env: &PushEnv) -> EngineResult<()> {
        let local = &self.local;
        self.backend.with_repo(&self.origin, |repo| {
            if let Some(message) = &repo.push_rejection {
                return Err(GitError::PushRejected {
                    branch: branch.to_string(),
                    message: message.clone(),
                }
                .into());
            }
            if let Some(current) = repo.branches.get(branch) {
                let view = Layered {
                    local: Some(local),
                    origin: &repo.store,
                };
                if !view.is_ancestor(current, commit) {
                    return Err(GitError::PushOutOfDate {
                        branch: branch.to_string(),
                        message: "non-fast-forward".to_string(),
                    }
                    .into());
                }
            }
            repo.store.absorb(local);
            repo.branches.insert(branch.to_string(), commit.to_string());
            repo.pushes += 1;
            repo.last_push_env = Some(env.clone());
            Ok::<(), EngineError>(())
        })??;
        self.refs.insert(branch.to_string(), commit.to_string());
        Ok(())
    }

    async fn diff_index(&self) -> EngineResult<String> {
        let head = self.head_commit().cloned();
        self.read(|_, view| {
            let empty = Tree::new();
            let before = head
                .as_deref()
                .and_then(|h| view.commit_tree(h))
                .unwrap_or(&empty);
            Ok(naive_diff(before, &self.index, |id| {
                view.blob(id).map(|b| String::from_utf8_lossy(b).into_owned())
            }))
        })
    }

    async fn changed_paths(&self) -> EngineResult<Vec<String>> {
        let head = self.head_commit().cloned();
        self.read(|_, view| {
            let empty = Tree::new();
            let before = head
                .as_deref()
                .and_then(|h| view.commit_tree(h))
                .unwrap_or(&empty);
            let paths: BTreeSet<&String> = before.keys().chain(self.index.keys()).collect();
            Ok(paths
                .into_iter()
                .filter(|path| before.get(*path) != self.index.get(*path))
                .cloned()
                .collect())
        })
    }

    async fn apply_patch(&mut self, _patch: &[u8]) -> EngineResult<()> {
        Err(GitError::Unsupported {
            operation: "apply".to_string(),
        }
        .into())
    }

    async fn merge_trees(&mut self, _base: &str, _ours: &str, _theirs: &str) -> EngineResult<()> {
        Err(GitError::Unsupported {
            operation: "read-tree -m".to_string(),
        }
        .into())
    }

    fn close(self) {}
}

/// Whole-file unified diff between two flat trees.
fn naive_diff(before: &Tree, after: &Tree, text_of: impl Fn(&str) -> Option<String>) -> String {
    let paths: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    let mut out = String::new();
    for path in paths {
        let old = before.get(path);
        let new = after.get(path);
        if old == new {
            continue;
        }
        let old_text = old.and_then(|(_, id)| text_of(id)).unwrap_or_default();
        let new_text = new.and_then(|(_, id)| text_of(id)).unwrap_or_default();
        let old_lines: Vec<&str> = old_text.lines().collect();
        let new_lines: Vec<&str> = new_text.lines().collect();

        out.push_str(&format!("diff --git a/{path} b/{path}\n"));
        match (old, new) {
            (None, Some((mode, _))) => out.push_str(&format!("new file mode {}\n", mode.as_octal())),
            (Some((mode, _)), None) => {
                out.push_str(&format!("deleted file mode {}\n", mode.as_octal()));
            }
            _ => {}
        }
        let from = if old.is_some() { format!("a/{path}") } else { "/dev/null".to_string() };
        let to = if new.is_some() { format!("b/{path}") } else { "/dev/null".to_string() };
        out.push_str(&format!("--- {from}\n+++ {to}\n"));
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            usize::from(!old_lines.is_empty()),
            old_lines.len(),
            usize::from(!new_lines.is_empty()),
            new_lines.len()
        ));
        for line in &old_lines {
            out.push_str(&format!("-{line}\n"));
        }
        for line in &new_lines {
            out.push_str(&format!("+{line}\n"));
        }
    }
    out
}
