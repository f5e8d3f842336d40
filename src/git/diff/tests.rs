// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use tokio_util::sync::CancellationToken;

use super::{DiffFileKind, DiffLimits, DiffLineKind, parse_patch, split_header_names};
use crate::error::EngineError;

const MODIFY_AND_ADD: &str = "\
diff --git a/README.md b/README.md
index 3b18e51..a042389 100644
--- a/README.md
+++ b/README.md
@@ -1,3 +1,3 @@ intro
 hello
-world
+there
 bye
\\ No newline at end of file
diff --git a/docs/new file.txt b/docs/new file.txt
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/docs/new file.txt
@@ -0,0 +1,2 @@
+one
+two
";

fn parse(patch: &str, limits: DiffLimits) -> super::Diff {
    parse_patch(patch, limits, &CancellationToken::new()).expect("parse")
}

#[test]
fn test_parse_modify_and_add() {
    let diff = parse(MODIFY_AND_ADD, DiffLimits::default());
    assert_eq!(diff.files.len(), 2);
    assert_eq!(diff.total_additions, 3);
    assert_eq!(diff.total_deletions, 1);
    assert!(!diff.is_incomplete);

    let readme = &diff.files[0];
    assert_eq!(readme.name, "README.md");
    assert_eq!(readme.kind, DiffFileKind::Modify);
    let lines: Vec<_> = readme.sections[0]
        .lines
        .iter()
        .map(|l| (l.kind, l.left_index, l.right_index))
        .collect();
    assert_eq!(
        lines,
        vec![
            (DiffLineKind::Section, None, None),
            (DiffLineKind::Plain, Some(1), Some(1)),
            (DiffLineKind::Del, Some(2), None),
            (DiffLineKind::Add, None, Some(2)),
            (DiffLineKind::Plain, Some(3), Some(3)),
        ]
    );

    let added = &diff.files[1];
    assert_eq!(added.name, "docs/new file.txt");
    assert_eq!(added.kind, DiffFileKind::Add);
    assert_eq!(added.additions, 2);
    assert_eq!(added.sections[0].lines[1].right_index, Some(1));
}

#[test]
fn test_parse_rename_delete_and_binary() {
    let patch = "\
diff --git a/old.txt b/new.txt
similarity index 100%
rename from old.txt
rename to new.txt
diff --git a/gone.txt b/gone.txt
deleted file mode 100644
--- a/gone.txt
+++ /dev/null
@@ -1 +0,0 @@
-bye
diff --git a/logo.png b/logo.png
index 1111111..2222222 100644
Binary files a/logo.png and b/logo.png differ
";
    let diff = parse(patch, DiffLimits::default());
    let summary: Vec<_> = diff
        .files
        .iter()
        .map(|f| format!("{:?} {} -> {} bin={}", f.kind, f.old_name, f.name, f.is_bin))
        .collect();
    insta::assert_snapshot!(summary.join("\n"), @r"
    Rename old.txt -> new.txt bin=false
    Delete gone.txt -> gone.txt bin=false
    Modify logo.png -> logo.png bin=true
    ");
    assert_eq!(diff.files[1].sections[0].lines[1].left_index, Some(1));
}

#[test]
fn test_max_files_marks_diff_incomplete() {
    let limits = DiffLimits {
        max_files: 1,
        ..DiffLimits::default()
    };
    let diff = parse(MODIFY_AND_ADD, limits);
    assert_eq!(diff.files.len(), 1);
    assert!(diff.is_incomplete);
}

#[test]
fn test_max_lines_truncates_file_but_keeps_counts() {
    let limits = DiffLimits {
        max_lines: 3,
        ..DiffLimits::default()
    };
    let diff = parse(MODIFY_AND_ADD, limits);
    let readme = &diff.files[0];
    assert!(readme.is_incomplete);
    assert_eq!(readme.sections[0].lines.len(), 3);
    assert_eq!(readme.additions, 1);
    assert_eq!(readme.deletions, 1);
    assert!(!diff.files[1].is_incomplete);
}

#[test]
fn test_long_line_is_cut() {
    let patch = format!(
        "diff --git a/a b/a\n--- a/a\n+++ b/a\n@@ -0,0 +1 @@\n+{}\n",
        "x".repeat(50)
    );
    let limits = DiffLimits {
        max_line_characters: 10,
        ..DiffLimits::default()
    };
    let diff = parse(&patch, limits);
    let file = &diff.files[0];
    assert!(file.is_incomplete_line_too_long);
    assert_eq!(file.sections[0].lines[1].content.chars().count(), 10);
}

#[test]
fn test_cancelled_token_stops_parsing() {
    let token = CancellationToken::new();
    token.cancel();
    let err = parse_patch(MODIFY_AND_ADD, DiffLimits::default(), &token).expect_err("cancelled");
    assert!(matches!(err, EngineError::Cancelled));
}

#[test]
fn test_header_split_prefers_matching_halves() {
    assert_eq!(
        split_header_names("a/x b/y b/x b/y"),
        ("x b/y".to_string(), "x b/y".to_string())
    );
    assert_eq!(split_header_names("a/one b/two"), ("one".to_string(), "two".to_string()));
}

#[test]
fn test_empty_patch() {
    let diff = parse("", DiffLimits::default());
    assert!(diff.files.is_empty());
    assert_eq!(diff.total_additions, 0);
}
