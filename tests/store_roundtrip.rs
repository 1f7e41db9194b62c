use demo_store_api::store::{DocumentStore, FileStore};

#[tokio::test]
async fn file_store_round_trips_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());

    let mut doc = store.get_or_create("abc123").await.expect("create");
    doc.products.retain(|p| p.id != 1);
    store.save("abc123", &doc).await.expect("save");

    let loaded = store.load("abc123").await;
    assert_eq!(loaded, doc);
    assert!(dir.path().join("abc123.json").exists());
}

#[tokio::test]
async fn corrupt_document_falls_back_to_seed() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("broken.json"), b"{ not json").expect("write");
    let store = FileStore::new(dir.path());

    let loaded = store.load("broken").await;
    assert_eq!(loaded.products.len(), 6);
}
