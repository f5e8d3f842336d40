// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{Config, ConfigLoader};
use crate::git::object::ObjectFormat;
use crate::logging::LogLevel;
use std::path::PathBuf;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.git.binary, "git");
    assert_eq!(config.git.timeout_secs, 360);
    assert_eq!(config.git.diff_timeout_secs, 60);
    assert_eq!(config.git.object_format, ObjectFormat::Sha1);
    assert!(!config.lfs.start_server);
    assert_eq!(config.repository.fallback_encoding, "windows-1252");
    assert_eq!(config.log.console_level, LogLevel::INFO);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_parse() {
    let config = Config::parse(
        r#"
            [git]
            timeout_secs = 30
            object_format = "sha256"

            [lfs]
            start_server = true
            content_path = "/srv/lfs"

            [diff]
            max_files = 5
        "#,
    )
    .expect("parse");

    assert_eq!(config.git.timeout_secs, 30);
    assert_eq!(config.git.object_format, ObjectFormat::Sha256);
    assert!(config.lfs.start_server);
    assert_eq!(config.lfs.content_path, PathBuf::from("/srv/lfs"));
    assert_eq!(config.diff_limits().max_files, 5);
    assert_eq!(config.diff_limits().max_lines, 1000);
}

#[test]
fn test_validate_rejects_zero_limits() {
    let err = Config::parse("[diff]\nmax_lines = 0").expect_err("zero limit");
    insta::assert_snapshot!(
        err.to_string(),
        @"invalid value for 'max_lines' in section '[diff]': must be greater than 0"
    );

    let err = Config::parse("[git]\ntimeout_secs = 0").expect_err("zero timeout");
    assert!(err.to_string().contains("timeout_secs"));
}

#[test]
fn test_validate_rejects_unknown_encoding() {
    let err = Config::parse("[repository]\nfallback_encoding = \"klingon\"").expect_err("bad label");
    insta::assert_snapshot!(
        err.to_string(),
        @"invalid value for 'fallback_encoding' in section '[repository]': unknown encoding 'klingon'"
    );
}

#[test]
fn test_unknown_object_format_is_rejected() {
    assert!(Config::parse("[git]\nobject_format = \"md5\"").is_err());
}

#[test]
fn test_fallback_encoding_lookup() {
    let config = Config::parse("[repository]\nfallback_encoding = \"shift_jis\"").expect("parse");
    assert_eq!(config.fallback_encoding(), encoding_rs::SHIFT_JIS);
}

#[test]
fn test_deny_unknown_fields_top_level() {
    let result = Config::parse("[git]\nbinary = \"git\"\n\n[unknown_section]\nfoo = \"bar\"\n");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("unknown_section"));
}

#[test]
fn test_deny_unknown_fields_in_section() {
    assert!(Config::parse("[lfs]\nstart = true").is_err());
}

#[test]
fn test_config_loader_lists_layers_in_order() {
    let loader = ConfigLoader::new()
        .add_toml_str("[git]\n timeout_secs = 10")
        .add_toml_file_optional("/nonexistent/optional.toml")
        .with_env_prefix("REPOFILES")
        .set_assignment("git.timeout_secs = 20")
        .expect("assignment");

    insta::assert_snapshot!(loader.format_loaded_files().join("\n"), @r"
    1. [string] <string>
    2. [env] REPOFILES_*
    3. [set] git.timeout_secs=20
    ");
}

#[test]
fn test_format_options_sorted_and_aligned() {
    let config = Config::parse("[log]\nfile = \"repofiles.log\"").expect("parse");
    let formatted = config.format_options();

    let keys: Vec<&str> = formatted
        .iter()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(keys, sorted);

    let eq_columns: Vec<usize> = formatted.iter().filter_map(|l| l.find(" = ")).collect();
    assert!(eq_columns.windows(2).all(|w| w[0] == w[1]));
    assert!(formatted.iter().any(|l| l.ends_with("= repofiles.log")));
    assert!(formatted.iter().any(|l| l.starts_with("repository.app_url")));
}

#[test]
fn test_config_loader_add_toml_file_success() {
    use std::io::Write;
    use tempfile::NamedTempFile;

    let mut file = NamedTempFile::new().expect("failed to create temp file");
    writeln!(
        file,
        r#"
[repository]
app_url = "https://git.example.com/"
"#
    )
    .expect("failed to write temp file");

    let config = ConfigLoader::new()
        .add_toml_file(file.path())
        .build()
        .expect("build should succeed");

    assert_eq!(config.repository.app_url, "https://git.example.com/");
}

#[test]
fn test_config_loader_add_toml_file_not_found() {
    let loader = ConfigLoader::new().add_toml_file("/nonexistent/path/to/config.toml");
    assert!(loader.build().is_err());
}

#[test]
fn test_config_loader_add_toml_file_invalid_toml() {
    use std::io::Write;
    use tempfile::NamedTempFile;

    let mut file = NamedTempFile::new().expect("failed to create temp file");
    writeln!(file, "this is not valid toml {{{{{{").expect("failed to write");

    let result = ConfigLoader::new().add_toml_file(file.path()).build();
    assert!(result.is_err(), "build should fail with invalid TOML");
}

#[test]
fn test_config_loader_with_env_prefix() {
    // SAFETY: the variable name is unique to this test
    unsafe {
        std::env::set_var("RFTEST_GIT__TIMEOUT_SECS", "42");
        std::env::set_var("RFTEST_LFS__START_SERVER", "true");
    }

    let config = ConfigLoader::new()
        .add_toml_str("[git]\n timeout_secs = 10")
        .with_env_prefix("RFTEST")
        .build()
        .expect("build should succeed");

    assert_eq!(config.git.timeout_secs, 42, "env var should override TOML value");
    assert!(config.lfs.start_server);

    // SAFETY: same as above
    unsafe {
        std::env::remove_var("RFTEST_GIT__TIMEOUT_SECS");
        std::env::remove_var("RFTEST_LFS__START_SERVER");
    }
}

#[test]
fn test_config_loader_set_assignment() {
    let config = ConfigLoader::new()
        .add_toml_str("[git]\n timeout_secs = 10")
        .set_assignment("git.timeout_secs=99")
        .expect("set should succeed")
        .set_assignment("repository.app_url = https://example.org/")
        .expect("set should succeed")
        .build()
        .expect("build should succeed");

    assert_eq!(config.git.timeout_secs, 99);
    assert_eq!(config.repository.app_url, "https://example.org/");
}

#[test]
fn test_config_loader_set_assignment_requires_equals() {
    let result = ConfigLoader::new().set_assignment("git.timeout_secs");
    assert!(result.is_err());
}

#[test]
fn test_config_loader_set_assignment_requires_section() {
    let err = ConfigLoader::new()
        .set_assignment("timeout_secs=5")
        .err()
        .expect("bare key should be rejected");
    insta::assert_snapshot!(err.to_string(), @"invalid value for 'timeout_secs=5' in section '[set]': expected section.key");
}

#[test]
fn test_config_loader_layered_sources() {
    use std::io::Write;
    use tempfile::NamedTempFile;

    let mut file = NamedTempFile::new().expect("failed to create temp file");
    writeln!(
        file,
        r#"
[git]
timeout_secs = 20
hook_env_prefix = "GITEA"
"#
    )
    .expect("failed to write");

    let config = ConfigLoader::new()
        .add_toml_file(file.path())
        .add_toml_str("[git]\ntimeout_secs = 30")
        .build()
        .expect("build should succeed");

    assert_eq!(config.git.timeout_secs, 30, "string should override file");
    assert_eq!(config.git.hook_env_prefix, "GITEA", "file value should persist");
}

#[test]
fn test_config_loader_build_deserialization_error() {
    let result = ConfigLoader::new()
        .add_toml_str("[lfs]\n start_server = \"not a boolean\"")
        .build();

    let err_str = result.expect_err("type mismatch").to_string();
    assert!(
        err_str.contains("start_server") || err_str.contains("invalid type"),
        "error should mention the problematic field: {err_str}"
    );
}

#[test]
fn test_log_level_bounds() {
    assert!(LogLevel::new(0).is_ok());
    assert!(LogLevel::new(5).is_ok());
    assert!(LogLevel::new(6).is_err());
}
