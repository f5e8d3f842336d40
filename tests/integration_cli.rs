// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration tests for CLI parsing.
//!
//! Tests the CLI module with realistic command-line argument patterns.

use clap::Parser;
use repofiles_rs::cli::global::GlobalOptions;
use repofiles_rs::cli::{Cli, Command};
use std::path::PathBuf;

// =============================================================================
// Global Options
// =============================================================================

#[test]
fn cli_no_command() {
    let cli = Cli::try_parse_from(["repofiles"]).unwrap();
    assert!(cli.command.is_none());
}

#[test]
fn cli_overrides_keep_set_order_first() {
    let global = GlobalOptions {
        options: vec!["git.timeout_secs=5".to_string()],
        log_level: Some(1),
        log_file: Some(PathBuf::from("/var/log/repofiles.log")),
        json_log: true,
        ..GlobalOptions::default()
    };
    insta::assert_debug_snapshot!(global.to_config_overrides(), @r#"
    [
        "git.timeout_secs=5",
        "log.console_level=1",
        "log.file=/var/log/repofiles.log",
        "log.json=true",
    ]
    "#);
}

#[test]
fn cli_set_is_repeatable() {
    let cli = Cli::try_parse_from([
        "repofiles",
        "--set",
        "diff.max_lines=10",
        "-s",
        "lfs.start_server=true",
        "config",
    ])
    .unwrap();
    assert_eq!(cli.global.options, ["diff.max_lines=10", "lfs.start_server=true"]);
}

// =============================================================================
// File Commands
// =============================================================================

#[test]
fn cli_change_defaults() {
    let cli = Cli::try_parse_from([
        "repofiles",
        "change",
        "--repo",
        "/srv/git/octo/cat.git",
        "--changes",
        "-",
    ])
    .unwrap();
    let Some(Command::Change(args)) = cli.command else {
        panic!("expected change");
    };
    assert_eq!(args.changes, PathBuf::from("-"));
    assert_eq!(args.repo.default_branch, "main");
    assert_eq!(args.repo.id, 1);
    assert_eq!(args.repo.owner, None);
}

#[test]
fn cli_patch_with_new_branch() {
    let cli = Cli::try_parse_from([
        "repofiles",
        "patch",
        "-r",
        "repo.git",
        "-b",
        "main",
        "--new-branch",
        "fix",
        "--patch",
        "fix.diff",
        "--doer",
        "ann",
        "--doer-email",
        "ann@example.com",
    ])
    .unwrap();
    let Some(Command::Patch(args)) = cli.command else {
        panic!("expected patch");
    };
    assert_eq!(args.branch.as_deref(), Some("main"));
    assert_eq!(args.new_branch.as_deref(), Some("fix"));
    assert_eq!(args.doer.name, "ann");
    assert_eq!(args.doer.email, "ann@example.com");
}

#[test]
fn cli_delete_requires_path() {
    assert!(Cli::try_parse_from(["repofiles", "delete", "--repo", "r.git"]).is_err());
}

#[test]
fn cli_cherry_pick_requires_commit() {
    assert!(Cli::try_parse_from(["repofiles", "cherry-pick", "--repo", "r.git"]).is_err());
}

#[test]
fn cli_unknown_command_rejected() {
    assert!(Cli::try_parse_from(["repofiles", "build"]).is_err());
}
