// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{
    EngineError, EngineResult, ErrorKind, FileError, GitError, LfsError, ProcessError,
    ProtectionError,
};

#[test]
fn test_file_error_display() {
    let err = FileError::ShaDoesNotMatch {
        path: "b.txt".to_string(),
        given: "abc".to_string(),
        current: "def".to_string(),
    };
    insta::assert_snapshot!(err.to_string(), @"sha does not match [given: abc, expected: def]");
}

#[test]
fn test_merge_conflict_display_lists_paths() {
    let err = FileError::MergeConflict {
        paths: vec!["a.txt".to_string(), "dir/b.txt".to_string()],
    };
    insta::assert_snapshot!(err.to_string(), @"merge conflict in a.txt, dir/b.txt");
}

#[test]
fn test_kind_taxonomy() {
    let cases: Vec<(EngineError, ErrorKind)> = vec![
        (FileError::NoFiles.into(), ErrorKind::InvalidArgument),
        (FileError::ShaOrCommitIdNotProvided.into(), ErrorKind::InvalidArgument),
        (
            FileError::FilenameInvalid {
                path: ".git/config".into(),
            }
            .into(),
            ErrorKind::PathInvalid,
        ),
        (
            FileError::AlreadyExists { path: "a".into() }.into(),
            ErrorKind::AlreadyExists,
        ),
        (
            GitError::BranchAlreadyExists {
                branch: "feature-x".into(),
            }
            .into(),
            ErrorKind::AlreadyExists,
        ),
        (
            GitError::BranchNotFound {
                branch: "main".into(),
            }
            .into(),
            ErrorKind::NotFound,
        ),
        (
            FileError::CommitIdDoesNotMatch {
                given: "a".into(),
                current: "b".into(),
            }
            .into(),
            ErrorKind::Conflict,
        ),
        (
            ProtectionError::ProtectedFile {
                path: "secrets/key.pem".into(),
                branch: "main".into(),
            }
            .into(),
            ErrorKind::Authorization,
        ),
        (
            GitError::PushOutOfDate {
                branch: "main".into(),
                message: "non-fast-forward".into(),
            }
            .into(),
            ErrorKind::Transport,
        ),
        (
            LfsError::MetaStore {
                oid: "00".into(),
                message: "db down".into(),
            }
            .into(),
            ErrorKind::Infrastructure,
        ),
        (
            ProcessError::NonZeroExit {
                command: "git".into(),
                code: 128,
            }
            .into(),
            ErrorKind::Infrastructure,
        ),
        (EngineError::Cancelled, ErrorKind::Infrastructure),
    ];

    for (err, expected) in cases {
        assert_eq!(err.kind(), expected, "wrong kind for {err}");
    }
}

#[test]
fn test_kind_display() {
    insta::assert_snapshot!(ErrorKind::PathInvalid.to_string(), @"path-invalid");
}

#[test]
fn test_engine_error_size() {
    // Box<str> variants are 16 bytes (fat pointer), plus discriminant and alignment
    let size = std::mem::size_of::<EngineError>();
    assert!(size <= 24, "EngineError is {size} bytes, expected <= 24");
}

#[test]
fn test_engine_result_size() {
    let size = std::mem::size_of::<EngineResult<()>>();
    assert!(size <= 24, "EngineResult<()> is {size} bytes, expected <= 24");
}
