// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Git CLI backend.
//!
//! ```text
//! ShellBackend
//!   .reader()        --> ShellReader            (cwd = origin)
//!   .clone_scratch() --> TemporaryUploadRepository
//!                          git clone -s --bare -b <branch> <origin> <tmp>
//!   .init_scratch()  --> TemporaryUploadRepository
//!                          git init --bare [--object-format=sha256] <tmp>
//!   .fast_import()   --> git fast-import --quiet   (cwd = origin)
//!
//! GitRunner  one git binary + cwd + env + timeouts + cancellation token
//!            every command: ALLOW_FAILURE, captured, then classified
//! ```
//!
//! The temporary repository lives in a [`TempDir`] and is removed when the
//! value is dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::classify::{Failure, classify};
use super::query::GixQuery;
use super::{CommitTreeOptions, GitBackend, PushEnv, RepoReader, ScratchRepository};
use crate::config::Config;
use crate::core::env::container::Env;
use crate::core::env::git_env;
use crate::core::process::builder::{ProcessBuilder, ProcessFlags, ProcessOutput};
use crate::error::{
    EngineError, EngineResult, FileError, GitError, ProcessError, ProtectionError,
};
use crate::git::object::{CommitInfo, FileMode, ObjectFormat, TreeEntry};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(360);
const DEFAULT_DIFF_TIMEOUT: Duration = Duration::from_secs(60);

// --- Runner ---

/// Runs git commands in one directory.
#[derive(Debug, Clone)]
struct GitRunner {
    git: PathBuf,
    dir: PathBuf,
    env: Env,
    timeout: Duration,
    diff_timeout: Duration,
    token: CancellationToken,
}

impl GitRunner {
    fn command(&self, args: &[&str]) -> ProcessBuilder {
        ProcessBuilder::new(&self.git)
            .args(args)
            .cwd(&self.dir)
            .env(self.env.clone())
            .timeout(self.timeout)
    }

    /// Runs a prepared command and classifies a non-zero exit.
    async fn exec(&self, builder: ProcessBuilder, failure: Failure<'_>) -> EngineResult<ProcessOutput> {
        let output = self.probe(builder).await?;
        if output.success() {
            return Ok(output);
        }
        Err(classify("git", failure, output.stderr()).into())
    }

    /// Runs a prepared command without judging its exit code.
    async fn probe(&self, builder: ProcessBuilder) -> EngineResult<ProcessOutput> {
        let command = builder.command_line();
        let output = builder
            .flag(ProcessFlags::ALLOW_FAILURE | ProcessFlags::TRACE_STDERR)
            .run_with_cancellation(self.token.clone())
            .await
            .map_err(|e| process_failure(&command, e))?;

        if output.is_interrupted() {
            return Err(EngineError::Cancelled);
        }
        Ok(output)
    }

    async fn run(&self, args: &[&str], failure: Failure<'_>) -> EngineResult<ProcessOutput> {
        self.exec(self.command(args), failure).await
    }

    async fn stdout(&self, args: &[&str]) -> EngineResult<String> {
        let output = self.run(args, Failure::Other).await?;
        Ok(output.stdout().trim().to_string())
    }

    // --- Queries shared by origin readers and scratch repositories ---

    async fn rev_parse(&self, rev: &str) -> EngineResult<Option<String>> {
        if rev.is_empty() || rev.starts_with('-') {
            return Ok(None);
        }
        let spec = format!("{rev}^{{commit}}");
        let output = self
            .probe(self.command(&["rev-parse", "--verify", "--quiet", &spec]))
            .await?;
        Ok(output
            .success()
            .then(|| output.stdout().trim().to_string())
            .filter(|id| !id.is_empty()))
    }

    async fn commit_info(&self, commit: &str) -> EngineResult<CommitInfo> {
        let not_found = || GitError::CommitNotFound {
            commit: commit.to_string(),
        };
        let id = self.rev_parse(commit).await?.ok_or_else(not_found)?;
        let output = self.run(&["cat-file", "commit", &id], Failure::Other).await?;
        CommitInfo::parse(&id, output.stdout_bytes()).ok_or_else(|| not_found().into())
    }

    async fn tree_entry(&self, commit: &str, path: &str) -> EngineResult<Option<TreeEntry>> {
        let output = self
            .run(&["ls-tree", "-z", "-l", commit, "--", path], Failure::Other)
            .await?;
        Ok(parse_ls_tree(output.stdout_bytes())
            .into_iter()
            .find(|entry| entry.path == path))
    }

    async fn file_changed_since(&self, commit: &str, since: &str, path: &str) -> EngineResult<bool> {
        let range = format!("{since}..{commit}");
        let count = self
            .stdout(&["rev-list", "--count", &range, "--", path])
            .await?;
        Ok(count.parse::<u64>().unwrap_or(0) > 0)
    }

    async fn read_blob(&self, id: &str, limit: Option<usize>) -> EngineResult<Vec<u8>> {
        let output = self.run(&["cat-file", "blob", id], Failure::Other).await?;
        let mut bytes = output.into_stdout_bytes();
        if let Some(limit) = limit {
            bytes.truncate(limit);
        }
        Ok(bytes)
    }

    async fn lfs_tracked(&self, treeish: Option<&str>, paths: &[&str]) -> EngineResult<BTreeSet<String>> {
        if paths.is_empty() {
            return Ok(BTreeSet::new());
        }
        let mut args = vec!["check-attr", "-z", "--cached", "filter", "--"];
        args.extend(paths);

        let Some(tree) = treeish else {
            let output = self.run(&args, Failure::Other).await?;
            return Ok(parse_check_attr(output.stdout_bytes(), "lfs"));
        };

        // Load the tree into a throwaway index so attributes come from it
        // without needing `check-attr --source`
        let scratch = tempfile::Builder::new().prefix("attr-").tempdir()?;
        let mut runner = self.clone();
        runner
            .env
            .set("GIT_INDEX_FILE", scratch.path().join("index").display().to_string());
        runner.run(&["read-tree", tree], Failure::Other).await?;
        let output = runner.run(&args, Failure::Other).await?;
        Ok(parse_check_attr(output.stdout_bytes(), "lfs"))
    }
}

fn process_failure(command: &str, err: anyhow::Error) -> EngineError {
    match err.downcast::<ProcessError>() {
        Ok(process) => process.into(),
        Err(other) => GitError::CommandFailed {
            command: command.to_string(),
            message: format!("{other:#}"),
        }
        .into(),
    }
}

/// Parses `git ls-tree -z -l` records: `<mode> <type> <id> <size>\t<path>`.
fn parse_ls_tree(stdout: &[u8]) -> Vec<TreeEntry> {
    stdout
        .split(|b| *b == 0)
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let record = String::from_utf8_lossy(record);
            let (meta, path) = record.split_once('\t')?;
            let mut fields = meta.split_whitespace();
            let mode = FileMode::from_octal(fields.next()?)?;
            let _kind = fields.next()?;
            let id = fields.next()?.to_string();
            let size = fields.next().and_then(|s| s.parse().ok());
            Some(TreeEntry {
                path: path.to_string(),
                mode,
                id,
                size,
            })
        })
        .collect()
}

/// Parses `git check-attr -z` triples and keeps paths whose value is `want`.
fn parse_check_attr(stdout: &[u8], want: &str) -> BTreeSet<String> {
    let fields: Vec<String> = stdout
        .split(|b| *b == 0)
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect();
    fields
        .chunks_exact(3)
        .filter(|triple| triple[2] == want)
        .map(|triple| triple[0].clone())
        .collect()
}

// --- Backend ---

/// Git backend that shells out to the git CLI.
#[derive(Debug, Clone)]
pub struct ShellBackend {
    git: PathBuf,
    temp_root: PathBuf,
    timeout: Duration,
    diff_timeout: Duration,
    env: Env,
}

impl ShellBackend {
    /// Backend using `git` from `PATH` with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::ExecutableNotFound` if git is not installed.
    pub fn new(temp_root: impl Into<PathBuf>) -> EngineResult<Self> {
        Self::with_binary("git", temp_root)
    }

    /// Backend using a specific git binary.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::ExecutableNotFound` if `binary` cannot be found.
    pub fn with_binary(binary: &str, temp_root: impl Into<PathBuf>) -> EngineResult<Self> {
        let git = ProcessBuilder::which(binary)?.program().clone();
        let mut env = git_env();
        env.set("GIT_LITERAL_PATHSPECS", "1");
        Ok(Self {
            git,
            temp_root: temp_root.into(),
            timeout: DEFAULT_TIMEOUT,
            diff_timeout: DEFAULT_DIFF_TIMEOUT,
            env,
        })
    }

    /// Backend configured from the `[git]` and `[repository]` sections.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::ExecutableNotFound` if the configured binary is
    /// missing.
    pub fn from_config(config: &Config) -> EngineResult<Self> {
        Ok(Self::with_binary(&config.git.binary, &config.repository.temp_path)?
            .with_timeouts(
                Duration::from_secs(config.git.timeout_secs),
                Duration::from_secs(config.git.diff_timeout_secs),
            ))
    }

    /// Overrides the per-command and diff timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, command: Duration, diff: Duration) -> Self {
        self.timeout = command;
        self.diff_timeout = diff;
        self
    }

    fn runner(&self, dir: &Path, token: &CancellationToken) -> GitRunner {
        GitRunner {
            git: self.git.clone(),
            dir: dir.to_path_buf(),
            env: self.env.clone(),
            timeout: self.timeout,
            diff_timeout: self.diff_timeout,
            token: token.clone(),
        }
    }

    async fn temp_dir(&self) -> EngineResult<TempDir> {
        tokio::fs::create_dir_all(&self.temp_root).await?;
        let dir = tempfile::Builder::new()
            .prefix("upload-")
            .tempdir_in(&self.temp_root)?;
        debug!(path = %dir.path().display(), "created temporary upload repository");
        Ok(dir)
    }

    fn scratch(
        &self,
        origin: &Path,
        temp: TempDir,
        format: ObjectFormat,
        token: &CancellationToken,
    ) -> TemporaryUploadRepository {
        TemporaryUploadRepository {
            origin: origin.to_path_buf(),
            runner: self.runner(temp.path(), token),
            format,
            temp: Some(temp),
        }
    }
}

impl GitBackend for ShellBackend {
    type Reader = ShellReader;
    type Scratch = TemporaryUploadRepository;

    async fn reader(&self, repo: &Path, token: &CancellationToken) -> EngineResult<ShellReader> {
        if !repo.exists() {
            return Err(GitError::RepoNotFound {
                path: repo.display().to_string(),
            }
            .into());
        }
        Ok(ShellReader {
            runner: self.runner(repo, token),
        })
    }

    async fn is_empty(&self, repo: &Path) -> EngineResult<bool> {
        GixQuery::is_empty(repo)
    }

    async fn branch_exists(&self, repo: &Path, branch: &str) -> EngineResult<bool> {
        GixQuery::branch_exists(repo, branch)
    }

    async fn clone_scratch(
        &self,
        repo: &Path,
        branch: &str,
        token: &CancellationToken,
    ) -> EngineResult<TemporaryUploadRepository> {
        let format = GixQuery::object_format(repo)?;
        let temp = self.temp_dir().await?;
        let origin = repo.display().to_string();
        let dest = temp.path().display().to_string();

        let runner = self.runner(&self.temp_root, token);
        runner
            .run(
                &["clone", "-s", "--bare", "-b", branch, "--", &origin, &dest],
                Failure::Clone {
                    repo: &origin,
                    branch,
                },
            )
            .await?;

        Ok(self.scratch(repo, temp, format, token))
    }

    async fn init_scratch(
        &self,
        repo: &Path,
        format: ObjectFormat,
        token: &CancellationToken,
    ) -> EngineResult<TemporaryUploadRepository> {
        let temp = self.temp_dir().await?;
        let dest = temp.path().display().to_string();
        let object_format = format!("--object-format={format}");

        let mut args = vec!["init", "--bare", "--quiet"];
        if format == ObjectFormat::Sha256 {
            args.push(&object_format);
        }
        args.push(&dest);
        self.runner(&self.temp_root, token)
            .run(&args, Failure::Other)
            .await?;

        Ok(self.scratch(repo, temp, format, token))
    }

    async fn fast_import(
        &self,
        repo: &Path,
        branch: &str,
        stream: Vec<u8>,
        env: &PushEnv,
        token: &CancellationToken,
    ) -> EngineResult<()> {
        let mut runner = self.runner(repo, token);
        runner.env.extend(env.to_env().iter());
        let builder = runner.command(&["fast-import", "--quiet"]).stdin(stream);
        runner.exec(builder, Failure::FastImport { branch }).await?;
        debug!(branch, "fast-import finished");
        Ok(())
    }
}

// --- Origin Reader ---

/// Read-only view of the origin repository through the git CLI.
#[derive(Debug, Clone)]
pub struct ShellReader {
    runner: GitRunner,
}

impl RepoReader for ShellReader {
    async fn branch_commit(&self, branch: &str) -> EngineResult<Option<String>> {
        self.runner.rev_parse(&format!("refs/heads/{branch}")).await
    }

    async fn resolve_commit(&self, rev: &str) -> EngineResult<Option<String>> {
        self.runner.rev_parse(rev).await
    }

    async fn commit_info(&self, commit: &str) -> EngineResult<CommitInfo> {
        self.runner.commit_info(commit).await
    }

    async fn tree_entry(&self, commit: &str, path: &str) -> EngineResult<Option<TreeEntry>> {
        self.runner.tree_entry(commit, path).await
    }

    async fn file_changed_since(&self, commit: &str, since: &str, path: &str) -> EngineResult<bool> {
        self.runner.file_changed_since(commit, since, path).await
    }

    async fn read_blob(&self, id: &str, limit: Option<usize>) -> EngineResult<Vec<u8>> {
        self.runner.read_blob(id, limit).await
    }

    async fn lfs_tracked(&self, treeish: Option<&str>, paths: &[&str]) -> EngineResult<BTreeSet<String>> {
        self.runner.lfs_tracked(treeish, paths).await
    }
}

// --- Temporary Upload Repository ---

/// Shared bare clone used to assemble one commit.
#[derive(Debug)]
pub struct TemporaryUploadRepository {
    origin: PathBuf,
    runner: GitRunner,
    format: ObjectFormat,
    temp: Option<TempDir>,
}

impl TemporaryUploadRepository {
    fn origin_str(&self) -> String {
        self.origin.display().to_string()
    }

    /// Resolves unmerged index entries with `git merge-file`, returning the
    /// paths that still conflict.
    async fn resolve_unmerged(&mut self) -> EngineResult<Vec<String>> {
        let output = self
            .runner
            .run(&["ls-files", "-u", "-z"], Failure::Other)
            .await?;
        let stages = parse_unmerged(output.stdout_bytes());

        let mut conflicts = Vec::new();
        for (path, stage) in stages {
            let (Some(base), Some(ours), Some(theirs)) = (&stage.base, &stage.ours, &stage.theirs) else {
                conflicts.push(path);
                continue;
            };
            match self.merge_file(base, ours, theirs).await? {
                Some(merged) => {
                    let id = self.hash_object(&merged).await?;
                    self.add_object_to_index(stage.mode, &id, &path).await?;
                }
                None => conflicts.push(path),
            }
        }
        Ok(conflicts)
    }

    /// Content merge of three blobs; `None` on conflict.
    async fn merge_file(&self, base: &str, ours: &str, theirs: &str) -> EngineResult<Option<Vec<u8>>> {
        let work = tempfile::Builder::new()
            .prefix("merge-")
            .tempdir_in(self.runner.dir.as_path())?;
        let mut files = Vec::with_capacity(3);
        for (name, id) in [("ours", ours), ("base", base), ("theirs", theirs)] {
            let path = work.path().join(name);
            tokio::fs::write(&path, self.runner.read_blob(id, None).await?).await?;
            files.push(path.display().to_string());
        }

        let output = self
            .runner
            .probe(self.runner.command(&["merge-file", "-p", &files[0], &files[1], &files[2]]))
            .await?;
        Ok(output.success().then(|| output.into_stdout_bytes()))
    }
}

#[derive(Debug)]
struct UnmergedStages {
    mode: FileMode,
    base: Option<String>,
    ours: Option<String>,
    theirs: Option<String>,
}

/// Groups `ls-files -u -z` records (`<mode> <id> <stage>\t<path>`) by path.
fn parse_unmerged(stdout: &[u8]) -> BTreeMap<String, UnmergedStages> {
    let mut stages: BTreeMap<String, UnmergedStages> = BTreeMap::new();
    for record in stdout.split(|b| *b == 0).filter(|r| !r.is_empty()) {
        let record = String::from_utf8_lossy(record);
        let Some((meta, path)) = record.split_once('\t') else {
            continue;
        };
        let fields: Vec<&str> = meta.split_whitespace().collect();
        let [mode, id, stage] = fields.as_slice() else {
            continue;
        };
        let mode = FileMode::from_octal(mode).unwrap_or(FileMode::Regular);
        let entry = stages.entry(path.to_string()).or_insert(UnmergedStages {
            mode,
            base: None,
            ours: None,
            theirs: None,
        });
        let id = Some((*id).to_string());
        match *stage {
            "1" => entry.base = id,
            "2" => {
                entry.mode = mode;
                entry.ours = id;
            }
            "3" => entry.theirs = id,
            _ => {}
        }
    }
    stages
}

impl RepoReader for TemporaryUploadRepository {
    async fn branch_commit(&self, branch: &str) -> EngineResult<Option<String>> {
        self.runner.rev_parse(&format!("refs/heads/{branch}")).await
    }

    async fn resolve_commit(&self, rev: &str) -> EngineResult<Option<String>> {
        self.runner.rev_parse(rev).await
    }

    async fn commit_info(&self, commit: &str) -> EngineResult<CommitInfo> {
        self.runner.commit_info(commit).await
    }

    async fn tree_entry(&self, commit: &str, path: &str) -> EngineResult<Option<TreeEntry>> {
        self.runner.tree_entry(commit, path).await
    }

    async fn file_changed_since(&self, commit: &str, since: &str, path: &str) -> EngineResult<bool> {
        self.runner.file_changed_since(commit, since, path).await
    }

    async fn read_blob(&self, id: &str, limit: Option<usize>) -> EngineResult<Vec<u8>> {
        self.runner.read_blob(id, limit).await
    }

    async fn lfs_tracked(&self, treeish: Option<&str>, paths: &[&str]) -> EngineResult<BTreeSet<String>> {
        self.runner.lfs_tracked(treeish, paths).await
    }
}

impl ScratchRepository for TemporaryUploadRepository {
    fn path(&self) -> &Path {
        &self.runner.dir
    }

    fn object_format(&self) -> ObjectFormat {
        self.format
    }

    async fn set_default_index(&mut self) -> EngineResult<()> {
        self.runner.run(&["read-tree", "HEAD"], Failure::Other).await?;
        Ok(())
    }

    async fn ls_files(&self, paths: &[&str]) -> EngineResult<Vec<String>> {
        // An empty pathspec would list the whole index
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = vec!["ls-files", "-z", "--"];
        args.extend(paths);
        let output = self.runner.run(&args, Failure::Other).await?;
        Ok(output
            .stdout_bytes()
            .split(|b| *b == 0)
            .filter(|p| !p.is_empty())
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect())
    }

    async fn remove_files_from_index(&mut self, paths: &[&str]) -> EngineResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let zero = self.format.zero_id();
        let mut input = Vec::new();
        for path in paths {
            input.extend_from_slice(format!("0 {zero}\t{path}").as_bytes());
            input.push(0);
        }
        let builder = self
            .runner
            .command(&["update-index", "--remove", "-z", "--index-info"])
            .stdin(input);
        self.runner.exec(builder, Failure::Other).await?;
        Ok(())
    }

    async fn hash_object(&mut self, content: &[u8]) -> EngineResult<String> {
        let builder = self
            .runner
            .command(&["hash-object", "-w", "--stdin"])
            .stdin(content.to_vec());
        let output = self.runner.exec(builder, Failure::Other).await?;
        Ok(output.stdout().trim().to_string())
    }

    async fn add_object_to_index(&mut self, mode: FileMode, id: &str, path: &str) -> EngineResult<()> {
        let cacheinfo = format!("{},{id},{path}", mode.as_octal());
        self.runner
            .run(
                &["update-index", "--add", "--replace", "--cacheinfo", &cacheinfo],
                Failure::Index { path },
            )
            .await?;
        Ok(())
    }

    async fn write_tree(&mut self) -> EngineResult<String> {
        self.runner.stdout(&["write-tree"]).await
    }

    async fn commit_tree(&mut self, options: &CommitTreeOptions) -> EngineResult<String> {
        let mut args = vec!["commit-tree".to_string(), options.tree.clone()];
        for parent in &options.parents {
            args.push("-p".to_string());
            args.push(parent.clone());
        }
        match &options.sign_key {
            Some(key) => args.push(format!("-S{key}")),
            None => args.push("--no-gpg-sign".to_string()),
        }

        let mut env = self.runner.env.clone();
        env.set("GIT_AUTHOR_NAME", &options.author.name)
            .set("GIT_AUTHOR_EMAIL", &options.author.email)
            .set("GIT_AUTHOR_DATE", options.author.git_date())
            .set("GIT_COMMITTER_NAME", &options.committer.name)
            .set("GIT_COMMITTER_EMAIL", &options.committer.email)
            .set("GIT_COMMITTER_DATE", options.committer.git_date());

        let builder = ProcessBuilder::new(&self.runner.git)
            .args(&args)
            .cwd(&self.runner.dir)
            .env(env)
            .timeout(self.runner.timeout)
            .stdin(options.message.clone());
        let output = self.runner.probe(builder).await?;

        if !output.success() {
            if options.sign_key.is_some() {
                return Err(ProtectionError::SigningFailed {
                    message: output.stderr().trim().to_string(),
                }
                .into());
            }
            return Err(classify("git commit-tree", Failure::Other, output.stderr()).into());
        }
        Ok(output.stdout().trim().to_string())
    }

    async fn push(&mut self, commit: &str, branch: &str, env: &PushEnv) -> EngineResult<()> {
        let origin = self.origin_str();
        let refspec = format!("{commit}:refs/heads/{branch}");
        let mut runner = self.runner.clone();
        runner.env.extend(env.to_env().iter());
        runner
            .run(
                &["push", &origin, &refspec],
                Failure::Push {
                    repo: &origin,
                    branch,
                },
            )
            .await?;
        debug!(branch, commit, "pushed");
        Ok(())
    }

    async fn diff_index(&self) -> EngineResult<String> {
        let builder = self
            .runner
            .command(&["diff-index", "--cached", "-p", "-M", "HEAD", "--"])
            .timeout(self.runner.diff_timeout);
        let output = self.runner.exec(builder, Failure::Other).await?;
        Ok(output.stdout().into_owned())
    }

    async fn changed_paths(&self) -> EngineResult<Vec<String>> {
        let builder = self
            .runner
            .command(&["diff-index", "--cached", "--name-status", "-z", "--no-renames", "HEAD", "--"])
            .timeout(self.runner.diff_timeout);
        let output = self.runner.exec(builder, Failure::Other).await?;
        Ok(parse_name_status(output.stdout_bytes()))
    }

    async fn apply_patch(&mut self, patch: &[u8]) -> EngineResult<()> {
        let builder = self
            .runner
            .command(&[
                "apply",
                "--index",
                "--recount",
                "--cached",
                "--ignore-whitespace",
                "--whitespace=fix",
                "--binary",
            ])
            .stdin(patch.to_vec());
        let output = self.runner.probe(builder).await?;
        if !output.success() {
            return Err(FileError::PatchDoesNotApply {
                message: output.stderr().trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn merge_trees(&mut self, base: &str, ours: &str, theirs: &str) -> EngineResult<()> {
        self.runner
            .run(&["read-tree", "-m", "--aggressive", base, ours, theirs], Failure::Other)
            .await?;

        let conflicts = self.resolve_unmerged().await?;
        if !conflicts.is_empty() {
            return Err(FileError::MergeConflict { paths: conflicts }.into());
        }
        Ok(())
    }

    fn close(mut self) {
        if let Some(temp) = self.temp.take() {
            let path = temp.path().display().to_string();
            if let Err(e) = temp.close() {
                warn!(path, error = %e, "failed to remove temporary upload repository");
            }
        }
    }
}

/// Paths from `--name-status -z` output: `<status>\0<path>\0` pairs.
fn parse_name_status(stdout: &[u8]) -> Vec<String> {
    stdout
        .split(|&b| b == 0)
        .collect::<Vec<_>>()
        .chunks_exact(2)
        .map(|pair| String::from_utf8_lossy(pair[1]).into_owned())
        .collect()
}
