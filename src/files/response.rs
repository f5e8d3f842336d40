// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Response bodies returned after a successful write.
//!
//! ```text
//! {app}                     web root, e.g. http://localhost:3000/
//! {app}api/v1/              API root
//!
//! contents   {api}repos/{o}/{r}/contents/{path}?ref={branch}
//! html       {app}{o}/{r}/src/branch/{branch}/{path}
//! git blob   {api}repos/{o}/{r}/git/blobs/{sha}
//! download   {app}{o}/{r}/raw/branch/{branch}/{path}
//! commit     {api}repos/{o}/{r}/git/commits/{sha}, {app}{o}/{r}/commit/{sha}
//! tree       {api}repos/{o}/{r}/git/trees/{sha}
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use super::types::Repository;
use crate::error::EngineResult;
use crate::git::backend::RepoReader;
use crate::git::object::{CommitInfo, FileMode, Signature};

/// Blobs above this size are described without their content.
pub const MAX_INLINE_CONTENT: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitUser {
    pub name: String,
    pub email: String,
    /// RFC 3339.
    pub date: String,
}

impl From<&Signature> for CommitUser {
    fn from(sig: &Signature) -> Self {
        Self {
            name: sig.name.clone(),
            email: sig.email.clone(),
            date: sig.when.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitMeta {
    pub url: String,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCommitResponse {
    pub url: String,
    pub html_url: String,
    pub sha: String,
    pub created: String,
    pub author: CommitUser,
    pub committer: CommitUser,
    pub parents: Vec<CommitMeta>,
    pub message: String,
    pub tree: CommitMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileLinks {
    #[serde(rename = "self")]
    pub this: String,
    pub git: String,
    pub html: String,
}

/// Metadata, and for small files the content, of one tree entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentsResponse {
    pub name: String,
    pub path: String,
    pub sha: String,
    pub last_commit_sha: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Base64 of the blob.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Link target, for symlinks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub url: String,
    pub html_url: String,
    pub git_url: String,
    pub download_url: String,
    #[serde(rename = "_links")]
    pub links: FileLinks,
}

/// Result of a multi-file transaction. Deleted paths map to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilesResponse {
    pub files: Vec<Option<ContentsResponse>>,
    pub commit: FileCommitResponse,
}

/// Result of a single-file write or of a commit without file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResponse {
    pub content: Option<ContentsResponse>,
    pub commit: FileCommitResponse,
}

/// URL builder for one repository.
#[derive(Debug, Clone)]
pub struct Urls {
    app: String,
    repo: String,
}

impl Urls {
    pub fn new(app_url: &str, repo: &Repository) -> Self {
        let app = if app_url.ends_with('/') {
            app_url.to_string()
        } else {
            format!("{app_url}/")
        };
        Self {
            app,
            repo: format!("{}/{}", repo.owner_name, repo.name),
        }
    }

    fn api(&self) -> String {
        format!("{}api/v1/repos/{}", self.app, self.repo)
    }

    fn web(&self) -> String {
        format!("{}{}", self.app, self.repo)
    }

    #[must_use]
    pub fn commit_api(&self, sha: &str) -> String {
        format!("{}/git/commits/{sha}", self.api())
    }

    #[must_use]
    pub fn commit_html(&self, sha: &str) -> String {
        format!("{}/commit/{sha}", self.web())
    }

    #[must_use]
    pub fn tree_api(&self, sha: &str) -> String {
        format!("{}/git/trees/{sha}", self.api())
    }

    #[must_use]
    pub fn blob_api(&self, sha: &str) -> String {
        format!("{}/git/blobs/{sha}", self.api())
    }

    #[must_use]
    pub fn contents_api(&self, path: &str, branch: &str) -> String {
        format!("{}/contents/{path}?ref={branch}", self.api())
    }

    #[must_use]
    pub fn contents_html(&self, path: &str, branch: &str) -> String {
        format!("{}/src/branch/{branch}/{path}", self.web())
    }

    #[must_use]
    pub fn download(&self, path: &str, branch: &str) -> String {
        format!("{}/raw/branch/{branch}/{path}", self.web())
    }
}

/// Describes `commit`.
#[must_use]
pub fn commit_response(urls: &Urls, commit: &CommitInfo) -> FileCommitResponse {
    FileCommitResponse {
        url: urls.commit_api(&commit.id),
        html_url: urls.commit_html(&commit.id),
        sha: commit.id.clone(),
        created: commit.committer.when.to_rfc3339(),
        author: CommitUser::from(&commit.author),
        committer: CommitUser::from(&commit.committer),
        parents: commit
            .parents
            .iter()
            .map(|p| CommitMeta {
                url: urls.commit_api(p),
                sha: p.clone(),
            })
            .collect(),
        message: commit.message.clone(),
        tree: CommitMeta {
            url: urls.tree_api(&commit.tree),
            sha: commit.tree.clone(),
        },
    }
}

/// Describes `path` as of `commit` on `branch`; `None` if it does not exist.
///
/// # Errors
///
/// Returns a `GitError` if the tree or blob cannot be read.
pub async fn contents_response<R: RepoReader>(
    reader: &R,
    urls: &Urls,
    branch: &str,
    commit: &str,
    path: &str,
) -> EngineResult<Option<ContentsResponse>> {
    let Some(entry) = reader.tree_entry(commit, path).await? else {
        return Ok(None);
    };

    let size = entry.size.unwrap_or(0);
    let kind = match entry.mode {
        FileMode::Tree => "dir",
        FileMode::Submodule => "submodule",
        FileMode::Symlink => "symlink",
        FileMode::Regular | FileMode::Executable => "file",
    };
    let mut encoding = None;
    let mut content = None;
    let mut target = None;
    if entry.is_link() {
        let blob = reader.read_blob(&entry.id, None).await?;
        target = Some(String::from_utf8_lossy(&blob).into_owned());
    } else if kind == "file" && size <= MAX_INLINE_CONTENT {
        let blob = reader.read_blob(&entry.id, None).await?;
        encoding = Some("base64".to_string());
        content = Some(STANDARD.encode(blob));
    }

    let html_url = urls.contents_html(path, branch);
    let git_url = urls.blob_api(&entry.id);
    let url = urls.contents_api(path, branch);
    Ok(Some(ContentsResponse {
        name: entry.name().to_string(),
        path: path.to_string(),
        sha: entry.id.clone(),
        last_commit_sha: commit.to_string(),
        kind: kind.to_string(),
        size,
        encoding,
        content,
        target,
        download_url: urls.download(path, branch),
        links: FileLinks {
            this: url.clone(),
            git: git_url.clone(),
            html: html_url.clone(),
        },
        url,
        html_url,
        git_url,
    }))
}
