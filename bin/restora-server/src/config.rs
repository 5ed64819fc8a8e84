//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;

/// Runtime configuration for restora-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8105"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated CORS origins. `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui` (disable with `RESTORA_ENABLE_SWAGGER=false`).
    pub enable_swagger: bool,

    /// Per-job scratch root. Must be visible to the storage gateway at the
    /// same path.
    pub work_dir: PathBuf,

    /// Checkout of CodeFormer holding the `inference_*.py` scripts.
    pub codeformer_dir: PathBuf,

    /// Interpreter used to run the scripts.
    pub python: String,

    pub transform_timeout_secs: u64,
    pub fetch_timeout_secs: u64,

    /// Largest accepted source image, in MiB.
    pub max_source_mb: u64,

    /// Base address of the storage gateway.
    pub gateway_url: String,

    pub upload_timeout_secs: u64,

    /// First segment of every storage key.
    pub key_prefix: String,

    /// Jobs allowed in the pipeline at once; the rest wait as `queued`.
    pub max_concurrent_jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8105".into(),
            log_level: "info".into(),
            log_json: false,
            cors_allowed_origins: None,
            enable_swagger: true,
            work_dir: std::env::temp_dir().join("restora"),
            codeformer_dir: PathBuf::from("./CodeFormer"),
            python: "python".into(),
            transform_timeout_secs: 300,
            fetch_timeout_secs: 30,
            max_source_mb: 50,
            gateway_url: "http://127.0.0.1:8106".into(),
            upload_timeout_secs: 120,
            key_prefix: "uploads".into(),
            max_concurrent_jobs: 2,
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bind_address: env_or("RESTORA_BIND", &d.bind_address),
            log_level: env_or("RESTORA_LOG", &d.log_level),
            log_json: std::env::var("RESTORA_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            cors_allowed_origins: std::env::var("RESTORA_CORS_ORIGINS").ok(),
            enable_swagger: std::env::var("RESTORA_ENABLE_SWAGGER")
                .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
                .unwrap_or(d.enable_swagger),
            work_dir: std::env::var("RESTORA_WORK_DIR").map(PathBuf::from).unwrap_or(d.work_dir),
            codeformer_dir: std::env::var("RESTORA_CODEFORMER_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.codeformer_dir),
            python: env_or("RESTORA_PYTHON", &d.python),
            transform_timeout_secs: parse_env("RESTORA_TRANSFORM_TIMEOUT_SECS", d.transform_timeout_secs),
            fetch_timeout_secs: parse_env("RESTORA_FETCH_TIMEOUT_SECS", d.fetch_timeout_secs),
            max_source_mb: parse_env("RESTORA_MAX_SOURCE_MB", d.max_source_mb),
            gateway_url: env_or("RESTORA_GATEWAY_URL", &d.gateway_url),
            upload_timeout_secs: parse_env("RESTORA_UPLOAD_TIMEOUT_SECS", d.upload_timeout_secs),
            key_prefix: env_or("RESTORA_KEY_PREFIX", &d.key_prefix),
            max_concurrent_jobs: parse_env("RESTORA_MAX_CONCURRENT_JOBS", d.max_concurrent_jobs),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
