// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::{Cursor, Read};

use tempfile::TempDir;

use super::{ContentStore, JsonMetaStore, Lfs, MemoryMetaStore, MetaObject, MetaStore, Pointer};
use crate::error::{EngineError, LfsError};

fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

#[test]
fn test_pointer_text() {
    let pointer = Pointer::from_content(b"hello");
    insta::assert_snapshot!(pointer.to_string().trim_end(), @r"
    version https://git-lfs.github.com/spec/v1
    oid sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824
    size 5
    ");
}

#[test]
fn test_pointer_parse_accepts_own_output() {
    let pointer = Pointer::from_content(b"some large file");
    let parsed = Pointer::parse(pointer.to_string().as_bytes());
    assert_eq!(parsed, Some(pointer));
}

#[test]
fn test_pointer_parse_rejects_non_pointers() {
    assert_eq!(Pointer::parse(b"just text\n"), None);
    assert_eq!(
        Pointer::parse(b"version https://git-lfs.github.com/spec/v1\noid sha256:xyz\nsize 3\n"),
        None
    );
    assert_eq!(
        Pointer::parse(b"version https://git-lfs.github.com/spec/v1\noid md5:abc\nsize 3\n"),
        None
    );
    assert_eq!(Pointer::parse(&[b'a'; 2048]), None);
}

#[test]
fn test_generate_matches_from_content() {
    let data = vec![7u8; 20_000];
    let streamed = Pointer::generate(&mut Cursor::new(&data)).expect("hash");
    assert_eq!(streamed, Pointer::from_content(&data));
    assert_eq!(streamed.size, 20_000);
}

#[test]
fn test_relative_path_fans_out() {
    let pointer = Pointer::from_content(b"hello");
    let path = pointer.relative_path();
    let parts: Vec<_> = path.iter().map(|p| p.to_string_lossy().into_owned()).collect();
    assert_eq!(parts, vec!["2c", "f2", pointer.oid.as_str()]);
}

#[test]
fn test_put_is_idempotent() {
    let dir = temp_dir();
    let store = ContentStore::new(dir.path());
    let pointer = Pointer::from_content(b"payload");

    assert!(!store.exists(&pointer).expect("exists"));
    store.put(&pointer, &mut Cursor::new(b"payload")).expect("first put");
    assert!(store.exists(&pointer).expect("exists"));
    store.put(&pointer, &mut Cursor::new(b"payload")).expect("second put");

    let fan_dir = store.object_path(&pointer);
    let siblings = std::fs::read_dir(fan_dir.parent().expect("parent"))
        .expect("read dir")
        .count();
    assert_eq!(siblings, 1, "no temp files or duplicates left behind");

    let mut stored = String::new();
    store
        .open(&pointer)
        .expect("open")
        .read_to_string(&mut stored)
        .expect("read");
    assert_eq!(stored, "payload");
}

#[test]
fn test_put_rejects_mismatched_content() {
    let dir = temp_dir();
    let store = ContentStore::new(dir.path());
    let pointer = Pointer::from_content(b"expected");

    let err = store
        .put(&pointer, &mut Cursor::new(b"short"))
        .expect_err("size mismatch");
    assert!(matches!(err, EngineError::Lfs(ref e) if matches!(**e, LfsError::SizeMismatch { .. })));

    let err = store
        .put(&pointer, &mut Cursor::new(b"Expected"))
        .expect_err("hash mismatch");
    assert!(matches!(err, EngineError::Lfs(ref e) if matches!(**e, LfsError::HashMismatch { .. })));
    assert!(!store.exists(&pointer).expect("exists"));
}

#[tokio::test]
async fn test_store_then_record() {
    let dir = temp_dir();
    let lfs = Lfs::new(ContentStore::new(dir.path()), MemoryMetaStore::new());
    let mut content = Cursor::new(b"big binary".to_vec());
    content.set_position(4);

    let (pointer, content) = lfs.store_content(content).await.expect("store");
    assert_eq!(content.position(), 0, "content rewound for staging");
    assert_eq!(pointer, Pointer::from_content(b"big binary"));
    assert!(lfs.store.exists(&pointer).expect("exists"));
    assert!(lfs.meta.get(1, &pointer.oid).await.expect("get").is_none());

    lfs.record(1, &pointer).await.expect("record");
    lfs.record(1, &pointer).await.expect("record twice");
    assert_eq!(lfs.meta.objects().len(), 1);
}

#[tokio::test]
async fn test_meta_failure_leaves_stored_blob() {
    let dir = temp_dir();
    let lfs = Lfs::new(ContentStore::new(dir.path()), MemoryMetaStore::new());
    lfs.meta.fail_creates("database is down");

    let (pointer, _) = lfs
        .store_content(Cursor::new(b"content".to_vec()))
        .await
        .expect("store");
    let err = lfs.record(7, &pointer).await.expect_err("meta failure");
    assert!(matches!(err, EngineError::Lfs(_)));
    assert!(lfs.store.exists(&pointer).expect("exists"));
}

#[tokio::test]
async fn test_record_new_and_forget_leave_older_rows() {
    let dir = temp_dir();
    let lfs = Lfs::new(ContentStore::new(dir.path()), MemoryMetaStore::new());
    let old = Pointer::from_content(b"referenced before");
    let new = Pointer::from_content(b"added by this commit");
    lfs.record(5, &old).await.expect("seed");

    assert!(!lfs.record_new(5, &old).await.expect("known row"));
    assert!(lfs.record_new(5, &new).await.expect("new row"));

    lfs.forget(5, &[new.oid.clone()]).await;
    let oids: Vec<_> = lfs.meta.objects().into_iter().map(|o| o.pointer.oid).collect();
    assert_eq!(oids, [old.oid]);
}

#[tokio::test]
async fn test_resolve_prefix_follows_known_pointers() {
    let dir = temp_dir();
    let lfs = Lfs::new(ContentStore::new(dir.path()), MemoryMetaStore::new());
    let (pointer, _) = lfs
        .store_content(Cursor::new(b"0123456789".to_vec()))
        .await
        .expect("store");
    let text = pointer.to_string();

    assert_eq!(lfs.resolve_prefix(3, text.as_bytes(), 4).await.expect("unknown"), None);

    lfs.record(3, &pointer).await.expect("record");
    let prefix = lfs.resolve_prefix(3, text.as_bytes(), 4).await.expect("resolve");
    assert_eq!(prefix.as_deref(), Some(&b"0123"[..]));
    assert_eq!(lfs.resolve_prefix(3, b"plain", 4).await.expect("plain"), None);
}

#[tokio::test]
async fn test_json_meta_store_persists_rows() {
    let dir = temp_dir();
    let path = dir.path().join("meta").join("objects.json");
    let pointer = Pointer::from_content(b"persisted");

    let store = JsonMetaStore::new(&path);
    assert!(store.get(3, &pointer.oid).await.expect("get").is_none());
    let object = MetaObject {
        pointer: pointer.clone(),
        repository_id: 3,
    };
    store.create(object.clone()).await.expect("create");
    store.create(object.clone()).await.expect("create twice");

    let reopened = JsonMetaStore::new(&path);
    assert_eq!(reopened.get(3, &pointer.oid).await.expect("get"), Some(object));
    assert!(reopened.get(4, &pointer.oid).await.expect("other repo").is_none());

    assert!(reopened.remove(3, &pointer.oid).await.expect("remove"));
    assert!(!reopened.remove(3, &pointer.oid).await.expect("remove again"));
    assert!(store.get(3, &pointer.oid).await.expect("get").is_none());
}

#[tokio::test]
async fn test_json_meta_store_rejects_garbage() {
    let dir = temp_dir();
    let path = dir.path().join("objects.json");
    std::fs::write(&path, "not json").expect("write");
    let err = JsonMetaStore::new(&path)
        .get(1, "abc")
        .await
        .expect_err("garbage");
    assert!(matches!(err, EngineError::Lfs(ref e) if matches!(**e, LfsError::MetaStore { .. })));
}
