//! The processing service's upload delegate against a real gateway router.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use restora_core::{HttpUploadDelegate, UploadDelegate};
use restora_fetch::Fetcher;
use restora_gateway::{routes, AppState, BackendKind, Config, DisabledPurger, Gateway, GatewaySettings};
use restora_types::ErrorKind;

async fn serve_gateway() -> (SocketAddr, Arc<InMemory>) {
    let store = Arc::new(InMemory::new());
    let gateway = Gateway::new(
        store.clone(),
        BackendKind::Memory,
        Arc::new(DisabledPurger),
        Fetcher::builder().set_proxy(None).build().unwrap(),
        GatewaySettings {
            public_base_url: "https://cdn.example".into(),
            key_prefix: "uploads".into(),
            max_upload_bytes: 1024 * 1024,
            local_ingress_root: std::env::temp_dir(),
        },
    );
    let app = routes::build(Arc::new(AppState::new(Config::default(), gateway)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, store)
}

fn delegate(addr: SocketAddr) -> HttpUploadDelegate {
    HttpUploadDelegate::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn local_artifact_is_published_under_its_key() {
    let (addr, store) = serve_gateway().await;
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("a.jpg");
    tokio::fs::write(&artifact, b"restored-jpeg").await.unwrap();

    let out = delegate(addr).upload(&artifact, "uploads/42/a.jpg").await.unwrap();
    assert!(out.success);
    assert_eq!(out.public_url, "https://cdn.example/uploads/42/a.jpg");
    assert_eq!(out.storage_key, "uploads/42/a.jpg");
    assert_eq!(out.file_size, 13);
    assert_eq!(out.content_type, "image/jpeg");

    let stored = store.get(&ObjectPath::from("uploads/42/a.jpg")).await.unwrap();
    assert_eq!(&stored.bytes().await.unwrap()[..], b"restored-jpeg");
}

#[tokio::test]
async fn missing_artifact_is_rejected_and_nothing_is_written() {
    let (addr, store) = serve_gateway().await;

    let err = delegate(addr)
        .upload(Path::new("/no/such/dir/a.jpg"), "uploads/42/a.jpg")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UploadRejected);
    assert!(err.to_failure().detail.contains("does not exist"));
    assert!(store.head(&ObjectPath::from("uploads/42/a.jpg")).await.is_err());
}

#[tokio::test]
async fn invalid_key_is_rejected() {
    let (addr, _) = serve_gateway().await;
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("a.jpg");
    tokio::fs::write(&artifact, b"x").await.unwrap();

    let err = delegate(addr).upload(&artifact, "../escape.jpg").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UploadRejected);
}
