//! Object-store construction.
//!
//! Both backends sit behind `Arc<dyn ObjectStore>`; the rest of the gateway
//! never branches on which one is active except for content-type metadata.

use std::sync::Arc;
use std::time::Duration;

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::{ClientOptions, ObjectStore};
use serde::Serialize;
use strum::{AsRefStr, Display};
use tracing::info;
use utoipa::ToSchema;

use crate::config::Config;
use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize, ToSchema)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// S3-compatible bucket (Cloudflare R2 in production).
    S3,
    Local,
    Memory,
}

impl BackendKind {
    /// `LocalFileSystem` rejects writes that carry attributes.
    pub fn supports_attributes(self) -> bool {
        !matches!(self, BackendKind::Local)
    }
}

/// Build the store selected by `cfg`: S3/R2 when a bucket is configured,
/// the local filesystem otherwise.
pub fn build_object_store(cfg: &Config) -> Result<(Arc<dyn ObjectStore>, BackendKind), GatewayError> {
    match &cfg.bucket {
        Some(bucket) => build_s3(cfg, bucket).map(|s| (s, BackendKind::S3)),
        None => build_local(cfg).map(|s| (s, BackendKind::Local)),
    }
}

fn build_s3(cfg: &Config, bucket: &str) -> Result<Arc<dyn ObjectStore>, GatewayError> {
    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(bucket)
        .with_region(&cfg.region)
        .with_client_options(
            ClientOptions::new()
                .with_timeout(Duration::from_secs(cfg.storage_timeout_secs))
                .with_connect_timeout(Duration::from_secs(10)),
        );

    if let Some(endpoint) = &cfg.endpoint {
        // R2 and MinIO want path-style requests.
        builder = builder
            .with_endpoint(endpoint)
            .with_virtual_hosted_style_request(false);
        if endpoint.starts_with("http://") {
            builder = builder.with_allow_http(true);
        }
    }
    if let Some(ak) = &cfg.access_key {
        builder = builder.with_access_key_id(ak);
    }
    if let Some(sk) = &cfg.secret_key {
        builder = builder.with_secret_access_key(sk);
    }

    let store = builder
        .build()
        .map_err(|e| GatewayError::Config(format!("S3: {e}")))?;
    info!(bucket = %bucket, endpoint = ?cfg.endpoint, "using S3-compatible object store");
    Ok(Arc::new(store))
}

fn build_local(cfg: &Config) -> Result<Arc<dyn ObjectStore>, GatewayError> {
    let root = &cfg.local_root;
    std::fs::create_dir_all(root).map_err(|e| {
        GatewayError::Config(format!("failed to create storage directory '{}': {e}", root.display()))
    })?;
    // new_with_prefix needs an absolute path.
    let root = root.canonicalize().map_err(|e| {
        GatewayError::Config(format!("failed to resolve '{}': {e}", root.display()))
    })?;

    let store = LocalFileSystem::new_with_prefix(&root)
        .map_err(|e| GatewayError::Config(format!("LocalFileSystem: {e}")))?;
    info!(root = %root.display(), "using local filesystem object store");
    Ok(Arc::new(store))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn local_backend_is_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config { local_root: dir.path().join("objects"), ..Config::default() };
        let (_, kind) = build_object_store(&cfg).unwrap();
        assert_eq!(kind, BackendKind::Local);
        assert!(dir.path().join("objects").is_dir());
        assert!(!kind.supports_attributes());
    }

    #[test]
    fn bucket_selects_s3() {
        let cfg = Config {
            bucket: Some("restora".into()),
            endpoint: Some("https://account.r2.cloudflarestorage.com".into()),
            access_key: Some("ak".into()),
            secret_key: Some("sk".into()),
            ..Config::default()
        };
        let (_, kind) = build_object_store(&cfg).unwrap();
        assert_eq!(kind, BackendKind::S3);
        assert_eq!(kind.to_string(), "s3");
    }
}
