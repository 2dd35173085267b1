//! Integration tests for the unified registry.

mod common;

use bytes::Bytes;
use common::{FailingStore, TestRegistry, UndeletableBlobs};
use filehub_core::{Backend, FileFilter, FileId, FileKey, NewFile};
use filehub_registry::{ErrorKind, Registry, Upload};
use time::macros::datetime;

#[tokio::test]
async fn test_list_merges_backends_newest_first() {
    let test = TestRegistry::new().await;

    let r1 = test
        .add_file_at(Backend::Relational, "a.json", "c", &[], datetime!(2024-01-01 00:00 UTC))
        .await;
    let d1 = test
        .add_file_at(Backend::Document, "b.json", "c", &[], datetime!(2024-01-04 00:00 UTC))
        .await;
    let r2 = test
        .add_file_at(Backend::Relational, "c.json", "c", &[], datetime!(2024-01-03 00:00 UTC))
        .await;
    let d2 = test
        .add_file_at(Backend::Document, "d.json", "c", &[], datetime!(2024-01-02 00:00 UTC))
        .await;

    let records = test.service.search_files(&FileFilter::default()).await.unwrap();
    let keys: Vec<FileKey> = records.iter().map(|r| r.key()).collect();
    assert_eq!(keys, vec![d1.key(), r2.key(), d2.key(), r1.key()]);

    for pair in records.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
}

#[tokio::test]
async fn test_list_filters_both_backends_without_duplicates() {
    let test = TestRegistry::new().await;
    let t = datetime!(2024-05-01 12:00 UTC);

    test.add_file_at(Backend::Relational, "Report.json", "reports", &["q1", "final"], t)
        .await;
    test.add_file_at(Backend::Document, "report-draft.json", "reports", &["q1"], t)
        .await;
    test.add_file_at(Backend::Document, "notes.txt", "misc", &["q1", "final"], t)
        .await;
    test.add_file_at(Backend::Relational, "image.png", "reports", &[], t)
        .await;

    let everything = test.service.search_files(&FileFilter::default()).await.unwrap();
    assert_eq!(everything.len(), 4);

    let filters = [
        FileFilter::default().with_query(Some("report")),
        FileFilter::default().with_category(Some("reports")),
        FileFilter::default().with_extension(Some("JSON")),
        FileFilter::default().with_tags(["q1", "final"]),
        FileFilter::new(Some("REPORT"), Some("reports"), Some("json"), ["q1"]),
        FileFilter::default().with_query(Some("nothing-matches")),
    ];
    for filter in filters {
        let found = test.service.search_files(&filter).await.unwrap();
        let expected: Vec<_> = everything.iter().filter(|r| filter.matches(r)).collect();
        assert_eq!(found.len(), expected.len(), "{filter:?}");
        for record in &found {
            assert!(filter.matches(record), "{record:?} should not match {filter:?}");
        }

        let mut keys: Vec<FileKey> = found.iter().map(|r| r.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), found.len(), "duplicate records for {filter:?}");
    }

    let both = test
        .service
        .search_files(&FileFilter::default().with_query(Some("report")))
        .await
        .unwrap();
    assert!(both.iter().any(|r| r.backend == Backend::Relational));
    assert!(both.iter().any(|r| r.backend == Backend::Document));
}

#[tokio::test]
async fn test_get_routes_by_backend() {
    let test = TestRegistry::new().await;
    let rel = test.add_file(Backend::Relational, "rel.json", "{}").await;
    let doc = test.add_file(Backend::Document, "doc.json", "{}").await;

    // Both stores start counting at 1.
    assert_eq!(rel.id, doc.id);

    assert_eq!(test.service.get_file(rel.key()).await.unwrap().original_name, "rel.json");
    assert_eq!(test.service.get_file(doc.key()).await.unwrap().original_name, "doc.json");
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let test = TestRegistry::new().await;
    let err = test
        .service
        .get_file(FileKey::new(FileId::new(99), Backend::Document))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_then_get_and_delete_again() {
    let test = TestRegistry::new().await;
    let record = test.add_file(Backend::Relational, "a.json", "{}").await;
    assert!(test.read_blob(&record.stored_path).is_some());

    test.service.delete_file(record.key()).await.unwrap();

    assert_eq!(
        test.service.get_file(record.key()).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        test.service.delete_file(record.key()).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert!(test.read_blob(&record.stored_path).is_none());
}

#[tokio::test]
async fn test_delete_leaves_same_id_in_other_backend() {
    let test = TestRegistry::new().await;
    let rel = test.add_file(Backend::Relational, "a.json", "{}").await;
    let doc = test.add_file(Backend::Document, "b.json", "{}").await;
    assert_eq!(rel.id, doc.id);

    test.service.delete_file(rel.key()).await.unwrap();
    assert!(test.service.get_file(doc.key()).await.is_ok());
    assert!(test.read_blob(&doc.stored_path).is_some());
}

#[tokio::test]
async fn test_delete_succeeds_when_blob_removal_fails() {
    let test = TestRegistry::with_stores(
        |_| {},
        |mut stores| {
            stores.blobs = UndeletableBlobs::new(stores.blobs);
            stores
        },
    )
    .await;
    let record = test.add_file(Backend::Document, "a.json", "{}").await;

    test.service.delete_file(record.key()).await.unwrap();

    assert_eq!(
        test.service.get_file(record.key()).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    // The blob is left behind.
    assert!(test.read_blob(&record.stored_path).is_some());
}

#[tokio::test]
async fn test_delete_with_missing_blob_still_succeeds() {
    let test = TestRegistry::new().await;
    let record = test.add_file(Backend::Relational, "a.json", "{}").await;
    std::fs::remove_file(test.blob_root().join(&record.stored_path)).unwrap();

    test.service.delete_file(record.key()).await.unwrap();
}

#[tokio::test]
async fn test_rename() {
    let test = TestRegistry::new().await;
    let record = test.add_file(Backend::Document, "old.json", "{}").await;

    let renamed = test
        .service
        .rename_file(record.key(), "  new.json ")
        .await
        .unwrap();
    assert_eq!(renamed.original_name, "new.json");
    assert_eq!(renamed.stored_path, record.stored_path);
    assert_eq!(renamed.key(), record.key());
}

#[tokio::test]
async fn test_rename_rejects_unsafe_names() {
    let test = TestRegistry::new().await;
    let record = test.add_file(Backend::Relational, "keep.json", "{}").await;

    for name in ["../escape.json", "a/b.json", "a\\b.json", "", "   ", ".."] {
        let err = test.service.rename_file(record.key(), name).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{name:?}");
    }

    let unchanged = test.service.get_file(record.key()).await.unwrap();
    assert_eq!(unchanged.original_name, "keep.json");
}

#[tokio::test]
async fn test_rename_missing_is_not_found() {
    let test = TestRegistry::new().await;
    let err = test
        .service
        .rename_file(FileKey::new(FileId::new(5), Backend::Relational), "x.json")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_aggregate_stats_with_empty_backend() {
    let test = TestRegistry::new().await;

    let empty = test.service.get_stats().await.unwrap();
    assert_eq!(empty.combined.total, 0);

    test.add_file(Backend::Relational, "a.json", "{}").await;
    test.add_file(Backend::Relational, "b.csv", "x,y").await;
    test.add_file(Backend::Relational, "c.json", "[]").await;

    let stats = test.service.get_stats().await.unwrap();
    assert_eq!(stats.relational.total, 3);
    assert_eq!(stats.document.total, 0);
    assert!(stats.document.by_category.is_empty());
    assert_eq!(stats.combined.total, 3);
    assert_eq!(stats.combined.by_extension.get("json"), Some(&2));
    assert_eq!(stats.combined.by_category.get("uncategorized"), Some(&3));
}

#[tokio::test]
async fn test_aggregate_stats_sums_backends() {
    let test = TestRegistry::new().await;
    let t = datetime!(2024-01-01 00:00 UTC);
    test.add_file_at(Backend::Relational, "a.json", "x", &[], t).await;
    test.add_file_at(Backend::Document, "b.json", "x", &[], t).await;
    test.add_file_at(Backend::Document, "c.txt", "y", &[], t).await;

    let stats = test.service.get_stats().await.unwrap();
    assert_eq!(stats.combined.total, 3);
    assert_eq!(stats.combined.by_category.get("x"), Some(&2));
    assert_eq!(stats.document.by_extension.get("txt"), Some(&1));
    assert_eq!(stats.for_backend(Backend::Relational).total, 1);
}

#[tokio::test]
async fn test_register_requires_blob() {
    let test = TestRegistry::new().await;
    let file = NewFile::new("ghost.json", "uploads/ghost.json", None, ["t"], 2).unwrap();

    let err = test
        .registry()
        .register(file, Backend::Relational)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(test.service.get_stats().await.unwrap().combined.total, 0);
}

#[tokio::test]
async fn test_register_rejects_escaping_stored_path() {
    let test = TestRegistry::new().await;
    let file = NewFile::new("x.json", "../outside.json", None, ["t"], 2).unwrap();

    let err = test
        .registry()
        .register(file, Backend::Document)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_register_rederives_extension() {
    let test = TestRegistry::new().await;
    test.registry()
        .blobs()
        .put("uploads/x", Bytes::from_static(b"{}"))
        .await
        .unwrap();
    let mut file = NewFile::new("Data.JSON", "uploads/x", None, ["t"], 2).unwrap();
    file.extension = "exe".to_string();

    let record = test.registry().register(file, Backend::Document).await.unwrap();
    assert_eq!(record.extension, "json");
}

#[tokio::test]
async fn test_register_rejects_blob_owned_by_other_backend() {
    let test = TestRegistry::new().await;
    test.registry()
        .blobs()
        .put("uploads/shared.json", Bytes::from_static(b"{}"))
        .await
        .unwrap();

    let first = NewFile::new("a.json", "uploads/shared.json", None, ["t"], 2).unwrap();
    let owner = test.registry().register(first, Backend::Relational).await.unwrap();

    let second = NewFile::new("b.json", "uploads/shared.json", None, ["t"], 2).unwrap();
    let err = test
        .registry()
        .register(second, Backend::Document)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("relational:1"));
    assert_eq!(test.service.get_stats().await.unwrap().document.total, 0);

    // The blob survives for its one owner.
    test.service.delete_file(owner.key()).await.unwrap();
    assert!(test.read_blob("uploads/shared.json").is_none());
}

#[tokio::test]
async fn test_register_stores_canonical_blob_key() {
    let test = TestRegistry::new().await;
    test.registry()
        .blobs()
        .put("uploads/x.json", Bytes::from_static(b"{}"))
        .await
        .unwrap();

    let file = NewFile::new("x.json", "uploads/./x.json", None, ["t"], 2).unwrap();
    let record = test.registry().register(file, Backend::Relational).await.unwrap();
    assert_eq!(record.stored_path, "uploads/x.json");

    for alias in ["uploads/x.json", "uploads/tmp/../x.json"] {
        for backend in Backend::ALL {
            let file = NewFile::new("y.json", alias, None, ["t"], 2).unwrap();
            let err = test.registry().register(file, backend).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{alias} in {backend}");
        }
    }

    let (_, data) = test.service.read_content(record.key()).await.unwrap();
    assert_eq!(data, Bytes::from_static(b"{}"));
    assert_eq!(test.service.get_stats().await.unwrap().combined.total, 1);
}

#[tokio::test]
async fn test_read_content() {
    let test = TestRegistry::new().await;
    let record = test.add_file(Backend::Document, "a.json", r#"{"k":1}"#).await;

    let (fetched, data) = test.service.read_content(record.key()).await.unwrap();
    assert_eq!(fetched, record);
    assert_eq!(data, Bytes::from_static(br#"{"k":1}"#));
}

#[tokio::test]
async fn test_read_content_with_missing_blob_is_blob_io() {
    let test = TestRegistry::new().await;
    let record = test.add_file(Backend::Document, "a.json", "{}").await;
    std::fs::remove_file(test.blob_root().join(&record.stored_path)).unwrap();

    let err = test.service.read_content(record.key()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BlobIo);
}

#[tokio::test]
async fn test_upload_applies_defaults() {
    let test = TestRegistry::new().await;
    let record = test
        .service
        .upload(
            Backend::Relational,
            Upload {
                name: "Photo.PNG".to_string(),
                category: Some("  ".to_string()),
                tags: vec![" b ".to_string(), "a".to_string(), "b".to_string()],
                data: Bytes::from_static(b"png"),
            },
        )
        .await
        .unwrap();

    assert_eq!(record.extension, "png");
    assert_eq!(record.category, "uncategorized");
    assert_eq!(record.size_bytes, 3);
    assert_eq!(record.tags.len(), 2);
    assert!(record.stored_path.starts_with("uploads/"));
    assert!(record.stored_path.ends_with(".png"));
}

#[tokio::test]
async fn test_upload_cleans_blob_when_registration_fails() {
    let test = TestRegistry::with_stores(
        |_| {},
        |mut stores| {
            stores.document = FailingStore::new(Backend::Document);
            stores
        },
    )
    .await;

    let err = test
        .service
        .upload(
            Backend::Document,
            Upload {
                name: "a.json".to_string(),
                category: None,
                tags: vec![],
                data: Bytes::from_static(b"{}"),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    assert_eq!(test.blob_count("uploads"), 0);
}

#[tokio::test]
async fn test_unavailable_backend_fails_list() {
    let test = TestRegistry::with_stores(
        |_| {},
        |mut stores| {
            stores.relational = FailingStore::new(Backend::Relational);
            stores
        },
    )
    .await;

    let err = test
        .service
        .search_files(&FileFilter::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    assert!(err.to_string().contains("relational"));
}

#[tokio::test]
async fn test_registry_rejects_swapped_stores() {
    let test = TestRegistry::new().await;
    let registry = test.registry();

    let result = Registry::new(
        registry.store(Backend::Document).clone(),
        registry.store(Backend::Relational).clone(),
        registry.blobs().clone(),
    );
    assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::InvalidInput));
}

#[tokio::test]
async fn test_health_and_close() {
    let test = TestRegistry::new().await;
    test.service.health_check().await.unwrap();

    test.service.close().await;
    assert_eq!(
        test.service.health_check().await.unwrap_err().kind(),
        ErrorKind::BackendUnavailable
    );
}
