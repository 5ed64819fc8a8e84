//! Axum router construction.
//!
//! [`build`] assembles upload, object, and health routes, the Swagger UI at
//! `/swagger-ui`, and the per-request trace layer.

pub mod doc;
mod health;
mod objects;
mod upload;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use restora_utils::trace;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.gateway.max_upload_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .merge(health::router())
        .merge(upload::router().layer(DefaultBodyLimit::max(body_limit)))
        .merge(objects::router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

#[cfg(test)]
mod test {
    use super::*;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use object_store::memory::InMemory;
    use restora_fetch::Fetcher;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::purge::DisabledPurger;
    use crate::service::{Gateway, GatewaySettings};
    use crate::storage::BackendKind;

    fn app() -> Router {
        let gateway = Gateway::new(
            Arc::new(InMemory::new()),
            BackendKind::Memory,
            Arc::new(DisabledPurger),
            Fetcher::builder().set_proxy(None).build().unwrap(),
            GatewaySettings {
                public_base_url: "https://cdn.example".into(),
                key_prefix: "uploads".into(),
                max_upload_bytes: 1024,
                local_ingress_root: std::env::temp_dir(),
            },
        );
        build(Arc::new(AppState::new(Config::default(), gateway)))
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value, Option<String>) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let trace = resp
            .headers()
            .get(trace::X_TRACE_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body, trace)
    }

    fn multipart(parts: &[(&str, Option<&str>, &str)]) -> (String, Bytes) {
        let boundary = "restora-test-boundary";
        let mut body = String::new();
        for (name, file_name, value) in parts {
            body.push_str(&format!("--{boundary}\r\n"));
            match file_name {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\nContent-Type: image/jpeg\r\n\r\n"
                )),
                None => body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        (format!("multipart/form-data; boundary={boundary}"), Bytes::from(body))
    }

    #[tokio::test]
    async fn health_reports_backend_and_purge() {
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body, trace) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"], "memory");
        assert_eq!(body["purge_enabled"], false);
        assert!(trace.is_some());
    }

    #[tokio::test]
    async fn trace_id_is_echoed() {
        let id = "3f2c9a54-8a8e-4a43-9f51-0d3f0b7f8c11";
        let req = Request::get("/health").header(trace::X_TRACE_ID, id).body(Body::empty()).unwrap();
        let (_, _, trace) = send(app(), req).await;
        assert_eq!(trace.as_deref(), Some(id));
    }

    #[tokio::test]
    async fn multipart_upload_derives_key_from_user_and_file_name() {
        let (content_type, body) =
            multipart(&[("user_id", None, "42"), ("file", Some("a.jpg"), "jpeg-bytes")]);
        let req = Request::post("/upload/file")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();

        let (status, body, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["success"], true);
        assert_eq!(body["storage_key"], "uploads/42/a.jpg");
        assert_eq!(body["public_url"], "https://cdn.example/uploads/42/a.jpg");
        assert_eq!(body["content_type"], "image/jpeg");
        assert_eq!(body["file_size"], 10);
    }

    #[tokio::test]
    async fn multipart_without_file_is_bad_request() {
        let (content_type, body) = multipart(&[("key", None, "k/a.jpg")]);
        let req = Request::post("/upload/file")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let (status, body, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "no file uploaded");
    }

    #[tokio::test]
    async fn local_upload_of_missing_path_is_not_found() {
        let req = json_request(
            Method::POST,
            "/upload/local",
            json!({ "path": "/definitely/not/here.jpg", "key": "uploads/42/here.jpg" }),
        );
        let (status, body, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("does not exist"));
    }

    #[tokio::test]
    async fn traversal_key_is_bad_request() {
        let req = json_request(
            Method::POST,
            "/upload/local",
            json!({ "path": "/tmp/a.jpg", "key": "../../etc/passwd" }),
        );
        let (status, _, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let req = Request::post("/upload/url")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn url_upload_rejects_non_http_source() {
        let req = json_request(
            Method::POST,
            "/upload/url",
            json!({ "image_url": "file:///etc/passwd", "user_id": "42" }),
        );
        let (status, _, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_of_absent_object_is_not_found() {
        let req = json_request(Method::DELETE, "/objects", json!({ "user_id": "42", "filename": "a.jpg" }));
        let (status, body, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "object uploads/42/a.jpg not found");
    }

    #[tokio::test]
    async fn delete_needs_a_key_or_filename() {
        let req = json_request(Method::DELETE, "/objects", json!({ "user_id": "42" }));
        let (status, _, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn uploaded_object_is_served_at_its_public_path() {
        let app = app();
        let (content_type, body) =
            multipart(&[("user_id", None, "42"), ("file", Some("a.jpg"), "jpeg-bytes")]);
        let req = Request::post("/upload/file")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let (status, _, _) = send(app.clone(), req).await;
        assert_eq!(status, StatusCode::OK);

        let resp = app
            .oneshot(Request::get("/objects/uploads/42/a.jpg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/jpeg");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"jpeg-bytes");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let req = Request::get("/objects/uploads/42/none.jpg").body(Body::empty()).unwrap();
        let (status, body, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "object uploads/42/none.jpg not found");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let req = Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap();
        let (status, body, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/upload/local"].is_object());
    }
}
