// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::cli::{Cli, Command};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_parse_version() {
    let cli = Cli::try_parse_from(["repofiles", "version"]).unwrap();
    assert!(matches!(cli.command, Some(Command::Version)));
}

#[test]
fn test_parse_global_options_after_subcommand() {
    let cli = Cli::try_parse_from([
        "repofiles",
        "-l",
        "4",
        "config",
        "--config",
        "a.toml",
        "--config",
        "b.toml",
        "--json-log",
    ])
    .unwrap();
    assert_eq!(cli.global.log_level, Some(4));
    assert_eq!(cli.global.configs, [PathBuf::from("a.toml"), PathBuf::from("b.toml")]);
    insta::assert_debug_snapshot!(cli.global.to_config_overrides(), @r#"
    [
        "log.console_level=4",
        "log.json=true",
    ]
    "#);
}

#[test]
fn test_parse_log_level_out_of_range() {
    assert!(Cli::try_parse_from(["repofiles", "-l", "6", "config"]).is_err());
}

#[test]
fn test_parse_delete() {
    let cli = Cli::try_parse_from([
        "repofiles",
        "delete",
        "--repo",
        "/srv/git/octo/cat.git",
        "--branch",
        "dev",
        "--path",
        "docs/old.md",
        "--sha",
        "abc123",
    ])
    .unwrap();
    let Some(Command::Delete(args)) = cli.command else {
        panic!("expected delete");
    };
    assert_eq!(args.repo.path, PathBuf::from("/srv/git/octo/cat.git"));
    assert_eq!(args.repo.default_branch, "main");
    assert_eq!(args.branch.as_deref(), Some("dev"));
    assert_eq!(args.path, "docs/old.md");
    assert_eq!(args.sha.as_deref(), Some("abc123"));
    assert_eq!(args.message, None);
}

#[test]
fn test_parse_cherry_pick_revert() {
    let cli = Cli::try_parse_from([
        "repofiles",
        "cherry-pick",
        "-r",
        "repo.git",
        "--commit",
        "deadbeef",
        "--revert",
    ])
    .unwrap();
    let Some(Command::CherryPick(args)) = cli.command else {
        panic!("expected cherry-pick");
    };
    assert!(args.revert);
    assert_eq!(args.commit, "deadbeef");
    assert_eq!(args.branch, None);
}

#[test]
fn test_parse_preview_requires_content() {
    let result = Cli::try_parse_from(["repofiles", "preview", "--repo", "r.git", "--path", "a.txt"]);
    assert!(result.is_err());
}
