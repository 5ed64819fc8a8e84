//! The gateway's three ingress modes and the write-and-purge sequence they
//! share.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, ObjectStore, PutMultipartOpts, PutOptions, PutPayload, WriteMultipart,
};
use restora_fetch::Fetcher;
use restora_types::{derive_object_key, validate_object_key, UploadResponse, DEFAULT_FILENAME};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::purge::CachePurger;
use crate::storage::BackendKind;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const READ_CHUNK: usize = 1024 * 1024;
const MAX_INFLIGHT_PARTS: usize = 4;

/// How the destination key of an upload is given: explicitly, or derived
/// from an owner id and a filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpec {
    pub key: Option<String>,
    pub user_id: Option<String>,
    pub filename: Option<String>,
}

/// Naming and limits for a [`Gateway`].
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub public_base_url: String,
    pub key_prefix: String,
    pub max_upload_bytes: u64,
    /// Local-path ingress only reads files that resolve under this directory.
    pub local_ingress_root: PathBuf,
}

/// A stored object opened for reading.
pub struct StoredObject {
    pub content_type: String,
    pub size: u64,
    pub body: futures::stream::BoxStream<'static, Result<Bytes, GatewayError>>,
}

/// Stateless upload service over one object store and one cache purger.
pub struct Gateway {
    store: Arc<dyn ObjectStore>,
    backend: BackendKind,
    purger: Arc<dyn CachePurger>,
    fetcher: Fetcher,
    settings: GatewaySettings,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("backend", &self.backend)
            .field("purge_enabled", &self.purger.enabled())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Gateway {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        backend: BackendKind,
        purger: Arc<dyn CachePurger>,
        fetcher: Fetcher,
        settings: GatewaySettings,
    ) -> Self {
        Self { store, backend, purger, fetcher, settings }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn purge_enabled(&self) -> bool {
        self.purger.enabled()
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.settings.max_upload_bytes
    }

    /// `<public_base_url>/<key>`, with exactly one slash at the join.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.settings.public_base_url.trim_end_matches('/'), key)
    }

    /// Resolve and validate the destination key. `fallback_filename` is used
    /// when the key is derived and the caller gave no filename.
    pub fn resolve_key(&self, spec: &KeySpec, fallback_filename: Option<&str>) -> Result<String, GatewayError> {
        if let Some(key) = spec.key.as_deref().filter(|k| !k.trim().is_empty()) {
            validate_object_key(key).map_err(GatewayError::Validation)?;
            return Ok(key.to_owned());
        }

        let Some(owner) = spec.user_id.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            return Err(GatewayError::Validation("either key or user_id is required".into()));
        };
        if owner.contains('/') || owner == "." || owner == ".." {
            return Err(GatewayError::Validation(format!(
                "user_id '{owner}' must be a single path segment"
            )));
        }

        let filename = spec
            .filename
            .as_deref()
            .or(fallback_filename)
            .and_then(basename)
            .unwrap_or(DEFAULT_FILENAME);
        let key = derive_object_key(&self.settings.key_prefix, owner, filename);
        validate_object_key(&key).map_err(GatewayError::Validation)?;
        Ok(key)
    }

    /// Bytes ingress: the body is already buffered by the caller.
    pub async fn upload_bytes(
        &self,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<UploadResponse, GatewayError> {
        let size = body.len() as u64;
        if size > self.settings.max_upload_bytes {
            return Err(self.too_large());
        }
        let content_type = content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_owned();
        let path = object_path(key)?;

        let opts = PutOptions { attributes: self.attributes(&content_type), ..Default::default() };
        self.store
            .put_opts(&path, PutPayload::from(body), opts)
            .await
            .map_err(|e| GatewayError::StorageWrite(e.to_string()))?;

        Ok(self.publish(key, size, content_type).await)
    }

    /// URL ingress: stream the remote source straight into the store.
    pub async fn upload_url(&self, image_url: &str, key: &str) -> Result<UploadResponse, GatewayError> {
        let path = object_path(key)?;
        let source = self.fetcher.open(image_url).await?;
        let content_type = source
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned());

        let stream = source.into_stream().map(|chunk| chunk.map_err(GatewayError::from));
        let size = self.write_stream(&path, &content_type, stream).await?;
        Ok(self.publish(key, size, content_type).await)
    }

    /// Local-path ingress: the file must already exist under the configured
    /// ingress root. Nothing is written when it does not.
    pub async fn upload_local(&self, local: &Path, key: &str) -> Result<UploadResponse, GatewayError> {
        let path = object_path(key)?;
        let local = self.confine_local(local).await?;
        let local = local.as_path();

        let content_type = mime_guess::from_path(local)
            .first()
            .map(|m| m.essence_str().to_owned())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned());

        let file = tokio::fs::File::open(local)
            .await
            .map_err(|e| GatewayError::NotFound(format!("cannot open {}: {e}", local.display())))?;
        let size = self.write_stream(&path, &content_type, file_chunks(file)).await?;
        Ok(self.publish(key, size, content_type).await)
    }

    /// Open an object for streaming. The content type comes from stored
    /// metadata, or from the key's extension on backends without it.
    pub async fn get_object(&self, key: &str) -> Result<StoredObject, GatewayError> {
        let path = object_path(key)?;
        let got = match self.store.get(&path).await {
            Ok(got) => got,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(GatewayError::NotFound(format!("object {key} not found")));
            }
            Err(e) => return Err(GatewayError::Internal(format!("storage read failed: {e}"))),
        };
        let content_type = got
            .attributes
            .get(&Attribute::ContentType)
            .map(|v| AsRef::<str>::as_ref(v).to_owned())
            .or_else(|| mime_guess::from_path(key).first().map(|m| m.essence_str().to_owned()))
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned());
        let size = got.meta.size;
        let body = got
            .into_stream()
            .map(|chunk| {
                chunk.map_err(|e| GatewayError::Internal(format!("storage read failed: {e}")))
            })
            .boxed();
        Ok(StoredObject { content_type, size, body })
    }

    /// Remove an object. A missing object is `NotFound`; no purge is sent.
    pub async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        let path = object_path(key)?;
        match self.store.head(&path).await {
            Ok(_) => {}
            Err(object_store::Error::NotFound { .. }) => {
                return Err(GatewayError::NotFound(format!("object {key} not found")));
            }
            Err(e) => return Err(GatewayError::StorageWrite(e.to_string())),
        }
        self.store
            .delete(&path)
            .await
            .map_err(|e| GatewayError::StorageWrite(e.to_string()))?;
        info!(key = %key, "object deleted");
        Ok(())
    }

    /// Multipart write of a chunk stream; aborts the upload on any error.
    async fn write_stream<S>(&self, path: &ObjectPath, content_type: &str, stream: S) -> Result<u64, GatewayError>
    where
        S: Stream<Item = Result<Bytes, GatewayError>> + Send,
    {
        let opts = PutMultipartOpts { attributes: self.attributes(content_type), ..Default::default() };
        let upload = self
            .store
            .put_multipart_opts(path, opts)
            .await
            .map_err(|e| GatewayError::StorageWrite(e.to_string()))?;
        let mut writer = WriteMultipart::new(upload);

        let limit = self.settings.max_upload_bytes;
        let mut written: u64 = 0;
        let mut stream = std::pin::pin!(stream);
        let copied: Result<(), GatewayError> = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                written += chunk.len() as u64;
                if written > limit {
                    return Err(self.too_large());
                }
                writer
                    .wait_for_capacity(MAX_INFLIGHT_PARTS)
                    .await
                    .map_err(|e| GatewayError::StorageWrite(e.to_string()))?;
                writer.write(&chunk);
            }
            Ok(())
        }
        .await;

        if let Err(e) = copied {
            if let Err(abort) = writer.abort().await {
                warn!(path = %path, error = %abort, "failed to abort multipart upload");
            }
            return Err(e);
        }
        writer
            .finish()
            .await
            .map_err(|e| GatewayError::StorageWrite(e.to_string()))?;
        debug!(path = %path, bytes = written, "object written");
        Ok(written)
    }

    /// Derive the public URL, attempt a purge, and build the response. Purge
    /// failures are logged only.
    async fn publish(&self, key: &str, size: u64, content_type: String) -> UploadResponse {
        let public_url = self.public_url(key);
        if self.purger.enabled() {
            if let Err(e) = self.purger.purge(&public_url).await {
                warn!(url = %public_url, error = %e, "cache purge failed; serving may be stale");
            }
        }
        info!(key = %key, bytes = size, content_type = %content_type, "upload stored");
        UploadResponse {
            success: true,
            public_url,
            storage_key: key.to_owned(),
            file_size: size,
            content_type,
        }
    }

    /// Resolve `local` and require it to be a regular file under the ingress
    /// root. Symlinks are followed before the check.
    async fn confine_local(&self, local: &Path) -> Result<PathBuf, GatewayError> {
        let missing = || GatewayError::NotFound(format!("local file {} does not exist", local.display()));
        let resolved = tokio::fs::canonicalize(local).await.map_err(|_| missing())?;
        let root = tokio::fs::canonicalize(&self.settings.local_ingress_root)
            .await
            .map_err(|e| {
                GatewayError::Internal(format!(
                    "ingress root {} unavailable: {e}",
                    self.settings.local_ingress_root.display()
                ))
            })?;
        if !resolved.starts_with(&root) {
            warn!(path = %local.display(), root = %root.display(), "local path outside ingress root refused");
            return Err(GatewayError::Validation(format!(
                "local file {} is outside the ingress root",
                local.display()
            )));
        }
        match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.is_file() => Ok(resolved),
            _ => Err(missing()),
        }
    }

    fn attributes(&self, content_type: &str) -> Attributes {
        let mut attributes = Attributes::new();
        if self.backend.supports_attributes() {
            attributes.insert(Attribute::ContentType, content_type.to_owned().into());
        }
        attributes
    }

    fn too_large(&self) -> GatewayError {
        GatewayError::Validation(format!(
            "upload exceeds the {} byte limit",
            self.settings.max_upload_bytes
        ))
    }
}

fn object_path(key: &str) -> Result<ObjectPath, GatewayError> {
    validate_object_key(key).map_err(GatewayError::Validation)?;
    ObjectPath::parse(key).map_err(|e| GatewayError::Validation(format!("invalid key '{key}': {e}")))
}

/// Last path component of a client-supplied filename.
fn basename(name: &str) -> Option<&str> {
    name.rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
}

fn file_chunks(file: tokio::fs::File) -> impl Stream<Item = Result<Bytes, GatewayError>> + Send {
    futures::stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; READ_CHUNK];
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| GatewayError::Internal(format!("read failed: {e}")))?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some((Bytes::from(buf), file)))
    })
}
