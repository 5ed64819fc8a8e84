//! Gateway configuration, loaded from environment variables at startup.

use std::path::PathBuf;

/// Runtime configuration for restora-gateway.
///
/// Every field has a default so a local gateway (filesystem backend, no CDN
/// purge) starts without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8106"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,object_store=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Bucket name. When set, objects go to S3/R2; otherwise to `local_root`.
    pub bucket: Option<String>,

    /// S3-compatible endpoint, e.g. `https://<account>.r2.cloudflarestorage.com`.
    pub endpoint: Option<String>,

    pub access_key: Option<String>,
    pub secret_key: Option<String>,

    /// Region passed to the S3 client (R2 expects `"auto"`).
    pub region: String,

    /// Directory backing the filesystem store.
    pub local_root: PathBuf,

    /// Directory local-path ingress may read from. Paths resolving outside it
    /// are refused.
    pub local_ingress_root: PathBuf,

    /// Base address public URLs are built from: `<public_base_url>/<key>`.
    pub public_base_url: String,

    /// Cloudflare zone and API token. Purge is enabled only when both are set.
    pub cdn_zone_id: Option<String>,
    pub cdn_api_token: Option<String>,

    /// Bound for URL-ingress fetches.
    pub fetch_timeout_secs: u64,

    /// Bound for one cache-purge call.
    pub purge_timeout_secs: u64,

    /// Bound for a single object-store request.
    pub storage_timeout_secs: u64,

    /// Largest accepted upload body, in MiB.
    pub max_upload_mb: u64,

    /// First key segment when a key is derived from `user_id`.
    pub key_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8106".into(),
            log_level: "info".into(),
            log_json: false,
            bucket: None,
            endpoint: None,
            access_key: None,
            secret_key: None,
            region: "auto".into(),
            local_root: PathBuf::from("./objects"),
            local_ingress_root: std::env::temp_dir().join("restora"),
            public_base_url: "http://127.0.0.1:8106/objects".into(),
            cdn_zone_id: None,
            cdn_api_token: None,
            fetch_timeout_secs: 30,
            purge_timeout_secs: 10,
            storage_timeout_secs: 60,
            max_upload_mb: 50,
            key_prefix: "uploads".into(),
        }
    }
}

impl Config {
    /// Build [`Config`] from `GATEWAY_*` environment variables, falling back
    /// to the defaults above.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bind_address: env_or("GATEWAY_BIND", &d.bind_address),
            log_level: env_or("GATEWAY_LOG", &d.log_level),
            log_json: flag("GATEWAY_LOG_JSON"),
            bucket: env_opt("GATEWAY_BUCKET"),
            endpoint: env_opt("GATEWAY_ENDPOINT"),
            access_key: env_opt("GATEWAY_ACCESS_KEY"),
            secret_key: env_opt("GATEWAY_SECRET_KEY"),
            region: env_or("GATEWAY_REGION", &d.region),
            local_root: env_opt("GATEWAY_LOCAL_ROOT").map(PathBuf::from).unwrap_or(d.local_root),
            local_ingress_root: env_opt("GATEWAY_LOCAL_INGRESS_ROOT")
                .map(PathBuf::from)
                .unwrap_or(d.local_ingress_root),
            public_base_url: env_or("GATEWAY_PUBLIC_URL", &d.public_base_url),
            cdn_zone_id: env_opt("GATEWAY_CDN_ZONE_ID"),
            cdn_api_token: env_opt("GATEWAY_CDN_API_TOKEN"),
            fetch_timeout_secs: parse_env("GATEWAY_FETCH_TIMEOUT_SECS", d.fetch_timeout_secs),
            purge_timeout_secs: parse_env("GATEWAY_PURGE_TIMEOUT_SECS", d.purge_timeout_secs),
            storage_timeout_secs: parse_env("GATEWAY_STORAGE_TIMEOUT_SECS", d.storage_timeout_secs),
            max_upload_mb: parse_env("GATEWAY_MAX_UPLOAD_MB", d.max_upload_mb),
            key_prefix: env_or("GATEWAY_KEY_PREFIX", &d.key_prefix),
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// Zone and token, when CDN purge is configured.
    pub fn cdn_credentials(&self) -> Option<(&str, &str)> {
        match (&self.cdn_zone_id, &self.cdn_api_token) {
            (Some(zone), Some(token)) => Some((zone, token)),
            _ => None,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn purge_needs_both_zone_and_token() {
        let mut cfg = Config { cdn_zone_id: Some("z".into()), ..Config::default() };
        assert!(cfg.cdn_credentials().is_none());
        cfg.cdn_api_token = Some("t".into());
        assert_eq!(cfg.cdn_credentials(), Some(("z", "t")));
    }

    #[test]
    fn upload_limit_is_in_mebibytes() {
        let cfg = Config { max_upload_mb: 2, ..Config::default() };
        assert_eq!(cfg.max_upload_bytes(), 2 * 1024 * 1024);
    }
}
