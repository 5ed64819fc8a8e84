//! Storage gateway for restora.
//!
//! Accepts artifacts over three ingress modes (multipart bytes, remote URL,
//! local path), writes them to an S3-compatible bucket or the local
//! filesystem, purges the CDN entry for the resulting public URL, and
//! returns that URL.

pub mod config;
pub mod error;
pub mod purge;
pub mod routes;
pub mod service;
pub mod state;
pub mod storage;

pub use config::Config;
pub use error::GatewayError;
pub use purge::{CachePurger, CloudflarePurger, DisabledPurger, PurgeError};
pub use service::{Gateway, GatewaySettings, KeySpec, StoredObject};
pub use state::AppState;
pub use storage::{build_object_store, BackendKind};
