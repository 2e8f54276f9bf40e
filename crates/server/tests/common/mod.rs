//! Common test utilities for in-process HTTP testing with mocks.
//!
//! This module provides a test fixture that builds the router around a
//! tracker whose collaborators are recording mocks, so the HTTP surface can
//! be exercised without a site registry or maintenance jobs.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use hitgate_core::testing::{MemoryOptionStore, MockAuthenticator, MockTaskRunner, MockVisitHandler};
use hitgate_core::{Config, Tracker};
use hitgate_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use hitgate_core::testing::fixtures;

/// Test fixture with a router backed by mock collaborators.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_pixel() {
///     let fixture = TestFixture::new();
///     let response = fixture.get("/piwik.php?idsite=1&rec=1").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Site authenticator: allows every site by default
    pub auth: Arc<MockAuthenticator>,
    /// Visit handler: records every hit
    pub visits: Arc<MockVisitHandler>,
    /// Scheduled task runner
    pub tasks: Arc<MockTaskRunner>,
    /// Option store behind the scheduled-task gate
    pub options: Arc<MemoryOptionStore>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }
}

impl TestFixture {
    /// Create a fixture with the default tracker configuration.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a fixture after adjusting the config.
    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = fixtures::config(&temp_dir.path().join("test.db"));
        adjust(&mut config);

        let auth = Arc::new(MockAuthenticator::allow_all());
        let visits = Arc::new(MockVisitHandler::new());
        let tasks = Arc::new(MockTaskRunner::new());
        let options = Arc::new(MemoryOptionStore::new());

        let tracker = Tracker::new(&config, auth.clone(), options.clone(), tasks.clone())
            .with_visit_handler(visits.clone());
        let state = Arc::new(AppState::new(config, Arc::new(tracker)));

        Self {
            router: create_router(state),
            auth,
            visits,
            tasks,
            options,
            temp_dir,
        }
    }

    /// Make a GET request.
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Make a POST request with a form body.
    pub async fn post_form(&self, uri: &str, form: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Make a POST request with a JSON body.
    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.post_raw(uri, "application/json", body.to_string().into_bytes())
            .await
    }

    /// Make a POST request with an arbitrary body.
    pub async fn post_raw(&self, uri: &str, content_type: &str, body: Vec<u8>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Send a prepared request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
