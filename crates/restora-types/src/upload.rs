//! Storage-gateway wire contract.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Success body shared by all three ingress modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub public_url: String,
    pub storage_key: String,
    pub file_size: u64,
    pub content_type: String,
}

/// Local-path ingress. `path` must be readable on the gateway's own
/// filesystem, so the caller and the gateway have to share a volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LocalUploadRequest {
    pub path: String,
    pub key: String,
}

/// Remote-URL ingress. Either `key` or `user_id` must be present; with
/// `user_id` the key is derived from the URL's filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UrlUploadRequest {
    pub image_url: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Delete by explicit key or by `user_id` + `filename`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeleteObjectRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeleteObjectResponse {
    pub success: bool,
    pub storage_key: String,
}
