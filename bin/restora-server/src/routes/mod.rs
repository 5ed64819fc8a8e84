//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `RESTORA_ENABLE_SWAGGER=false`)
//! - Job submission, status, result and delete routes
//! - Health route

pub mod doc;
mod health;
mod jobs;

use std::sync::Arc;

use axum::{middleware, Router};
use restora_utils::trace;
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::cors;
use crate::state::AppState;

pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new().merge(health::router()).merge(jobs::router());

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(state.config.cors_allowed_origins.as_deref())))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

#[cfg(test)]
mod test {
    use super::*;

    use std::net::SocketAddr;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::routing::get;
    use http_body_util::BodyExt;
    use restora_core::{ArtifactTransform, CoreError, Orchestrator, Pipeline, PipelineConfig, UploadDelegate};
    use restora_fetch::Fetcher;
    use restora_types::{TransformOptions, UploadResponse};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use tracing_test::traced_test;

    use crate::config::Config;
    use crate::transform::CodeFormerTransform;

    /// Copies the input into `final_results/`; sleeps first on `slow.*` inputs.
    struct CopyTransform;

    #[async_trait]
    impl ArtifactTransform for CopyTransform {
        async fn transform(
            &self,
            input: &Path,
            output_dir: &Path,
            _options: &TransformOptions,
        ) -> Result<PathBuf, CoreError> {
            let name = input.file_name().unwrap().to_string_lossy().into_owned();
            if name.starts_with("slow") {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            let out = output_dir.join("final_results").join(&name);
            tokio::fs::create_dir_all(out.parent().unwrap()).await?;
            tokio::fs::copy(input, &out).await?;
            Ok(out)
        }
    }

    struct CdnDelegate;

    #[async_trait]
    impl UploadDelegate for CdnDelegate {
        async fn upload(&self, artifact: &Path, key: &str) -> Result<UploadResponse, CoreError> {
            let file_size = tokio::fs::metadata(artifact).await?.len();
            Ok(UploadResponse {
                success: true,
                public_url: format!("https://cdn.example/{key}"),
                storage_key: key.to_owned(),
                file_size,
                content_type: "image/jpeg".into(),
            })
        }
    }

    async fn source_server() -> SocketAddr {
        let app = Router::new()
            .route("/a.jpg", get(|| async { &b"jpeg-bytes"[..] }))
            .route("/slow.jpg", get(|| async { &b"jpeg-bytes"[..] }))
            .route("/missing.jpg", get(|| async { StatusCode::NOT_FOUND }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    struct TestApp {
        router: Router,
        source: SocketAddr,
        _work: tempfile::TempDir,
    }

    impl TestApp {
        async fn new() -> Self {
            let work = tempfile::tempdir().unwrap();
            let pipeline = Pipeline::new(
                PipelineConfig { work_dir: work.path().to_path_buf(), key_prefix: "uploads".into() },
                Fetcher::builder().set_proxy(None).set_timeout(Duration::from_secs(5)).build().unwrap(),
                Arc::new(CopyTransform),
                Arc::new(CdnDelegate),
            );
            let config = Config {
                // Nothing listens on port 1.
                gateway_url: "http://127.0.0.1:1".into(),
                codeformer_dir: work.path().join("no-codeformer"),
                ..Config::default()
            };
            let codeformer = Arc::new(CodeFormerTransform::new(
                &config.codeformer_dir,
                "python",
                Duration::from_secs(1),
            ));
            let state = AppState::new(config, Orchestrator::new(pipeline, 4), codeformer).unwrap();
            Self { router: build(Arc::new(state)), source: source_server().await, _work: work }
        }

        fn url(&self, name: &str) -> String {
            format!("http://{}/{name}", self.source)
        }

        async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
            let resp = self.router.clone().oneshot(req).await.unwrap();
            let status = resp.status();
            let bytes = resp.into_body().collect().await.unwrap().to_bytes();
            (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
        }

        async fn get(&self, uri: &str) -> (StatusCode, Value) {
            self.send(Request::get(uri).body(Body::empty()).unwrap()).await
        }

        async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
            let req = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(req).await
        }

        async fn delete(&self, uri: &str) -> (StatusCode, Value) {
            self.send(Request::delete(uri).body(Body::empty()).unwrap()).await
        }

        async fn submit(&self, path: &str, name: &str, owner: &str) -> String {
            let (status, body) = self.post(path, json!({ "user_id": owner, "image_url": self.url(name) })).await;
            assert_eq!(status, StatusCode::ACCEPTED, "{body}");
            body["job_id"].as_str().unwrap().to_owned()
        }

        async fn wait_terminal(&self, id: &str) -> Value {
            for _ in 0..200 {
                let (_, body) = self.get(&format!("/jobs/{id}")).await;
                if body["status"] == "completed" || body["status"] == "failed" {
                    return body;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            panic!("job {id} never finished");
        }
    }

    #[tokio::test]
    async fn enhance_job_completes_with_published_url() {
        let app = TestApp::new().await;
        let (status, body) =
            app.post("/enhance", json!({ "user_id": "42", "image_url": app.url("a.jpg"), "upscale": 2 })).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "queued");
        let id = body["job_id"].as_str().unwrap().to_owned();

        let view = app.wait_terminal(&id).await;
        assert_eq!(view["status"], "completed");
        assert_eq!(view["operation"], "enhance");
        assert_eq!(view["user_id"], "42");

        let (status, result) = app.get(&format!("/jobs/{id}/result")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["status"], "completed");
        assert_eq!(result["public_url"], "https://cdn.example/uploads/42/a.jpg");
        assert_eq!(result["storage_key"], "uploads/42/a.jpg");
        assert_eq!(result["file_size"], 10);
        assert!(result["processing_time"].is_number());
        assert!(result.get("error").is_none());
    }

    #[tokio::test]
    async fn colorize_and_inpaint_are_accepted() {
        let app = TestApp::new().await;
        let colorize = app.submit("/colorize", "a.jpg", "7").await;
        let inpaint = app.submit("/inpaint", "a.jpg", "7").await;
        assert_eq!(app.wait_terminal(&colorize).await["operation"], "colorize");
        assert_eq!(app.wait_terminal(&inpaint).await["operation"], "inpaint");
    }

    #[tokio::test]
    async fn invalid_submissions_are_bad_requests() {
        let app = TestApp::new().await;

        let (status, _) = app.post("/enhance", json!({ "user_id": " ", "image_url": app.url("a.jpg") })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app.post("/colorize", json!({ "user_id": "42", "image_url": "ftp://x/a.jpg" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            app.post("/inpaint", json!({ "user_id": "42", "image_url": app.url("a.jpg"), "upscale": 9 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let req = Request::post("/enhance")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{oops"))
            .unwrap();
        let (status, body) = app.send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (_, jobs) = app.get("/jobs").await;
        assert_eq!(jobs, json!([]));
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let app = TestApp::new().await;
        assert_eq!(app.get("/jobs/unknown-id").await.0, StatusCode::NOT_FOUND);
        assert_eq!(app.get("/jobs/unknown-id/result").await.0, StatusCode::NOT_FOUND);
        assert_eq!(app.delete("/jobs/unknown-id").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn result_of_unfinished_job_is_conflict() {
        let app = TestApp::new().await;
        let id = app.submit("/enhance", "slow.jpg", "42").await;

        let (status, body) = app.get(&format!("/jobs/{id}/result")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].is_string());

        let (_, view) = app.get(&format!("/jobs/{id}")).await;
        assert!(view["status"] == "queued" || view["status"] == "processing", "{view}");
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_job_result_carries_the_error() {
        let app = TestApp::new().await;
        let id = app.submit("/enhance", "missing.jpg", "42").await;

        let view = app.wait_terminal(&id).await;
        assert_eq!(view["status"], "failed");
        assert_eq!(view["error"]["kind"], "fetch");

        let (status, result) = app.get(&format!("/jobs/{id}/result")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["status"], "failed");
        assert_eq!(result["error"]["kind"], "fetch");
        assert!(result.get("public_url").is_none());
        assert!(logs_contain("job accepted"));
    }

    #[tokio::test]
    async fn delete_removes_the_job_once() {
        let app = TestApp::new().await;
        let id = app.submit("/enhance", "slow.jpg", "42").await;

        let (status, body) = app.delete(&format!("/jobs/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "job_id": id, "deleted": true }));

        assert_eq!(app.get(&format!("/jobs/{id}")).await.0, StatusCode::NOT_FOUND);
        assert_eq!(app.delete(&format!("/jobs/{id}")).await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listing_filters_by_owner() {
        let app = TestApp::new().await;
        let mine = app.submit("/enhance", "a.jpg", "alice").await;
        app.submit("/enhance", "a.jpg", "bob").await;

        let (status, all) = app.get("/jobs").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (_, alice) = app.get("/jobs?owner=alice").await;
        let alice = alice.as_array().unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0]["job_id"], mine.as_str());
    }

    #[tokio::test]
    async fn health_is_degraded_without_codeformer_or_gateway() {
        let app = TestApp::new().await;
        let (status, body) = app.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["codeformer_available"], false);
        assert_eq!(body["gateway_reachable"], false);
        assert!(!body["version"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn trace_id_is_echoed() {
        let app = TestApp::new().await;
        let id = "3f2c9a54-8a8e-4a43-9f51-0d3f0b7f8c11";
        let req = Request::get("/health").header(trace::X_TRACE_ID, id).body(Body::empty()).unwrap();
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.headers().get(trace::X_TRACE_ID).unwrap().to_str().unwrap(), id);
    }

    #[tokio::test]
    async fn openapi_lists_job_routes() {
        let app = TestApp::new().await;
        let (status, body) = app.get("/api-docs/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/jobs/{id}/result"].is_object());
        assert!(body["paths"]["/enhance"].is_object());
    }
}
