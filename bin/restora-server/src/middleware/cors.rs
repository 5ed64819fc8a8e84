use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

/// CORS for browser clients polling job status. `origins` is the
/// comma-separated `RESTORA_CORS_ORIGINS` value; unset or unparsable means any.
pub fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    let layer = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(allowed)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn blank_entries_are_ignored() {
        // Building must not panic for either shape.
        let _ = cors_layer(Some(" , "));
        let _ = cors_layer(Some("https://app.example, https://admin.example"));
        let _ = cors_layer(None);
    }
}
