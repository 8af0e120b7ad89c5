use tokio::io::AsyncReadExt;

use shelfs::files::{ContentKind, FileError};

use crate::helpers::test_registry;

async fn read_all(mut file: tokio::fs::File) -> Vec<u8> {
    let mut content = Vec::new();
    file.read_to_end(&mut content).await.unwrap();
    content
}

#[tokio::test]
async fn test_list_without_directory_is_empty() {
    let (registry, _clock, _dir) = test_registry().await;
    assert!(registry.list("alice").await.unwrap().is_empty());
    assert!(!registry.namespace().root().join("alice").exists());
}

#[tokio::test]
async fn test_store_list_remove() {
    let (registry, _clock, _dir) = test_registry().await;

    let stored = registry.store("alice", "a.txt", b"hello", 1024).await.unwrap();
    assert_eq!(stored.name, "a.txt");
    assert_eq!(stored.size, 5);
    assert_eq!(stored.file_type, "txt");
    assert!(stored.stored_name.ends_with("-a.txt"));
    assert_ne!(stored.stored_name, "a.txt");

    let files = registry.list("alice").await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "a.txt");
    assert_eq!(files[0].stored_name, stored.stored_name);
    assert_eq!(files[0].size, 5);

    registry.remove("alice", "a.txt").await.unwrap();
    assert!(registry.list("alice").await.unwrap().is_empty());

    let err = registry.remove("alice", "a.txt").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_oversized_upload_leaves_nothing_behind() {
    let (registry, _clock, _dir) = test_registry().await;

    let err = registry
        .store("alice", "big.bin", &[0u8; 2048], 1024)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        shelfs::Error::Files(FileError::TooLarge {
            size: 2048,
            max: 1024
        })
    ));
    assert!(registry.list("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exactly_max_size_is_accepted() {
    let (registry, _clock, _dir) = test_registry().await;
    let stored = registry
        .store("alice", "edge.bin", &[1u8; 1024], 1024)
        .await
        .unwrap();
    assert_eq!(stored.size, 1024);
}

#[tokio::test]
async fn test_bad_original_names_are_rejected() {
    let (registry, _clock, _dir) = test_registry().await;
    let long = format!("{}.txt", "x".repeat(300));
    for name in ["../escape.txt", "a/b.txt", "", "..", long.as_str()] {
        let err = registry.store("alice", name, b"x", 1024).await.unwrap_err();
        assert!(err.is_validation_error(), "{name:?} gave {err:?}");
    }
    assert!(registry.list("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_same_name_uploads_do_not_collide() {
    let (registry, clock, _dir) = test_registry().await;

    let first = registry.store("alice", "notes.txt", b"first", 1024).await.unwrap();
    clock.advance(1_000);
    let second = registry.store("alice", "notes.txt", b"second", 1024).await.unwrap();
    assert_ne!(first.stored_name, second.stored_name);
    assert_eq!(registry.list("alice").await.unwrap().len(), 2);

    // The original name picks the newest upload.
    let newest = registry.retrieve("alice", "notes.txt").await.unwrap();
    assert_eq!(newest.info.stored_name, second.stored_name);
    assert_eq!(read_all(newest.file).await, b"second");

    // The stored name picks exactly one.
    let exact = registry.retrieve("alice", &first.stored_name).await.unwrap();
    assert_eq!(read_all(exact.file).await, b"first");

    registry.remove("alice", &first.stored_name).await.unwrap();
    let remaining = registry.list("alice").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].stored_name, second.stored_name);
}

#[tokio::test]
async fn test_same_millisecond_uploads_do_not_collide() {
    let (registry, _clock, _dir) = test_registry().await;
    let a = registry.store("alice", "x.txt", b"a", 1024).await.unwrap();
    let b = registry.store("alice", "x.txt", b"b", 1024).await.unwrap();
    assert_ne!(a.stored_name, b.stored_name);
}

#[tokio::test]
async fn test_users_are_isolated() {
    let (registry, _clock, _dir) = test_registry().await;
    let stored = registry.store("alice", "secret.txt", b"alice", 1024).await.unwrap();

    assert!(registry.list("bob").await.unwrap().is_empty());
    let err = registry.retrieve("bob", &stored.stored_name).await.unwrap_err();
    assert!(err.is_not_found());

    let err = registry
        .retrieve("bob", &format!("../alice/{}", stored.stored_name))
        .await
        .unwrap_err();
    assert!(err.is_invalid_path());
}

#[tokio::test]
async fn test_list_skips_hidden_entries_and_directories() {
    let (registry, _clock, _dir) = test_registry().await;
    registry.store("alice", "keep.txt", b"keep", 1024).await.unwrap();

    let user_dir = registry.namespace().ensure_user_dir("alice").await.unwrap();
    std::fs::write(user_dir.join(".upload.part"), b"partial").unwrap();
    std::fs::create_dir(user_dir.join("subdir")).unwrap();

    let files = registry.list("alice").await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "keep.txt");
}

#[tokio::test]
async fn test_foreign_files_are_listed_verbatim() {
    let (registry, _clock, _dir) = test_registry().await;
    let user_dir = registry.namespace().ensure_user_dir("alice").await.unwrap();
    std::fs::write(user_dir.join("Makefile"), b"all:").unwrap();

    let files = registry.list("alice").await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "Makefile");
    assert_eq!(files[0].stored_name, "Makefile");
    assert_eq!(files[0].file_type, "unknown");

    let retrieved = registry.retrieve("alice", "Makefile").await.unwrap();
    assert_eq!(read_all(retrieved.file).await, b"all:");
}

#[tokio::test]
async fn test_preview_classification() {
    let (registry, _clock, _dir) = test_registry().await;

    // Missing files are reported before the type is considered.
    let err = registry.preview("alice", "notes.exe").await.unwrap_err();
    assert!(err.is_not_found());

    registry.store("alice", "notes.exe", b"MZ", 1024).await.unwrap();
    let err = registry.preview("alice", "notes.exe").await.unwrap_err();
    assert!(matches!(
        err,
        shelfs::Error::Files(FileError::UnsupportedPreview { .. })
    ));

    registry.store("alice", "notes.txt", b"plain text", 1024).await.unwrap();
    let (preview, retrieved) = registry.preview("alice", "notes.txt").await.unwrap();
    assert_eq!(preview.kind, ContentKind::Text);
    assert_eq!(preview.content_type, "text/plain; charset=utf-8");
    assert_eq!(read_all(retrieved.file).await, b"plain text");

    registry.store("alice", "photo.JPG", b"\xff\xd8", 1024).await.unwrap();
    let (preview, _) = registry.preview("alice", "photo.JPG").await.unwrap();
    assert_eq!(preview.content_type, "image/jpeg");
}

#[tokio::test]
async fn test_file_used_as_directory_is_not_found() {
    let (registry, _clock, _dir) = test_registry().await;
    let stored = registry.store("alice", "a.txt", b"hello", 1024).await.unwrap();

    let nested = format!("{}/x", stored.stored_name);
    let err = registry.retrieve("alice", &nested).await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
    let err = registry.remove("alice", &nested).await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
    let err = registry.preview("alice", &nested).await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

#[tokio::test]
async fn test_lookups_do_not_create_user_dir() {
    let (registry, _clock, _dir) = test_registry().await;

    assert!(registry.retrieve("alice", "a.txt").await.unwrap_err().is_not_found());
    assert!(registry.remove("alice", "a.txt").await.unwrap_err().is_not_found());
    assert!(registry.preview("alice", "a.png").await.unwrap_err().is_not_found());
    assert!(!registry.namespace().root().join("alice").exists());
}

#[tokio::test]
async fn test_chunked_upload() {
    let (registry, _clock, _dir) = test_registry().await;

    let mut upload = registry.begin_upload("alice", "notes.txt", 1024).await.unwrap();
    upload.write(b"hello ").await.unwrap();
    upload.write(b"world").await.unwrap();
    assert_eq!(upload.written(), 11);
    // Not visible until finished.
    assert!(registry.list("alice").await.unwrap().is_empty());

    let stored = upload.finish().await.unwrap();
    assert_eq!(stored.size, 11);
    let retrieved = registry.retrieve("alice", "notes.txt").await.unwrap();
    assert_eq!(read_all(retrieved.file).await, b"hello world");
}

#[tokio::test]
async fn test_chunked_upload_over_cap_is_discarded() {
    let (registry, _clock, _dir) = test_registry().await;
    let user_dir = registry.namespace().ensure_user_dir("alice").await.unwrap();

    let mut upload = registry.begin_upload("alice", "big.bin", 8).await.unwrap();
    upload.write(&[0u8; 6]).await.unwrap();
    let err = upload.write(&[0u8; 6]).await.unwrap_err();
    assert!(matches!(
        err,
        shelfs::Error::Files(FileError::TooLarge { size: 12, max: 8 })
    ));
    drop(upload);

    assert_eq!(std::fs::read_dir(&user_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_abandoned_upload_leaves_nothing_behind() {
    let (registry, _clock, _dir) = test_registry().await;
    let user_dir = registry.namespace().ensure_user_dir("alice").await.unwrap();

    let mut upload = registry.begin_upload("alice", "half.txt", 1024).await.unwrap();
    upload.write(b"partial").await.unwrap();
    drop(upload);

    assert_eq!(std::fs::read_dir(&user_dir).unwrap().count(), 0);
}
