use crate::config::GatewayConfig;
use crate::create_app;
use crate::state::AppState;
use axum::body::{Body, Bytes};
use axum::response::Response;
use axum::Router;
use hound_auth::{ManualClock, NewClient};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::api::mcp::SESSION_ID_HEADER;

/// Test fixture driving the full router in-process.
///
/// Credentials live in a temporary file that is removed with the fixture, and
/// token expiry follows a [`ManualClock`] the test can move.
///
/// # Examples
///
/// ```rust
/// #[tokio::test]
/// async fn test_endpoint() {
///     let fixture = TestFixture::new().await;
///     let token = fixture.issue_token("mcp_a");
///
///     let response = fixture.get_as("/", &token).await;
///     response.assert_status(StatusCode::BAD_REQUEST);
/// }
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// Shared state behind the router
    pub state: AppState,
    /// Time source for token and code expiry
    pub clock: ManualClock,
    _credentials_dir: TempDir,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Creates a fixture after letting the test adjust the configuration
    pub async fn with_config(configure: impl FnOnce(&mut GatewayConfig)) -> Self {
        Self::setup_logger(LevelFilter::Debug);

        let credentials_dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = GatewayConfig::for_test(&credentials_dir.path().join("clients.json"));
        configure(&mut config);

        let clock = ManualClock::default();
        let state = AppState::with_clock(config, Arc::new(clock.clone()));
        let app = create_app(state.clone()).await;

        Self {
            app,
            state,
            clock,
            _credentials_dir: credentials_dir,
        }
    }

    pub fn setup_logger(level: LevelFilter) {
        let _ = env_logger::builder()
            .filter_level(level)
            .is_test(true)
            .try_init();
    }

    /// Writes a client to the credential file
    pub async fn create_client(&self, name: &str) -> NewClient {
        self.state
            .auth
            .create_client(name)
            .await
            .expect("Failed to create client")
    }

    /// Issues an access token for `client_id` without going through HTTP
    pub fn issue_token(&self, client_id: &str) -> String {
        self.state.auth.issue(client_id).access_token
    }

    /// A request builder carrying a bearer token
    pub fn request_builder(
        &self,
        method: Method,
        uri: impl AsRef<str>,
        token: &str,
    ) -> http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri.as_ref())
            .header(AUTHORIZATION, format!("Bearer {}", token))
    }

    pub async fn get_anonymous(&self, uri: impl AsRef<str>) -> TestResponse {
        let request = Request::builder()
            .uri(uri.as_ref())
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn get_as(&self, uri: impl AsRef<str>, token: &str) -> TestResponse {
        let request = self
            .request_builder(Method::GET, uri, token)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Sends a form-encoded POST without credentials
    pub async fn post_form(&self, uri: impl AsRef<str>, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri.as_ref())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Sends a JSON POST without credentials
    pub async fn post_json<T: Serialize>(&self, uri: impl AsRef<str>, body: &T) -> TestResponse {
        let json_body = serde_json::to_string(body).expect("Failed to serialize body to JSON");
        self.post_raw_json(uri, &json_body).await
    }

    pub async fn post_raw_json(&self, uri: impl AsRef<str>, body: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri.as_ref())
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Sends a JSON POST with a bearer token
    pub async fn post_json_as<T: Serialize>(
        &self,
        uri: impl AsRef<str>,
        body: &T,
        token: &str,
    ) -> TestResponse {
        let json_body = serde_json::to_string(body).expect("Failed to serialize body to JSON");
        self.post_raw_json_as(uri, &json_body, token).await
    }

    pub async fn post_raw_json_as(
        &self,
        uri: impl AsRef<str>,
        body: &str,
        token: &str,
    ) -> TestResponse {
        let request = self
            .request_builder(Method::POST, uri, token)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Sends a JSON POST addressed to a streamable HTTP session
    pub async fn post_json_with_session<T: Serialize>(
        &self,
        uri: impl AsRef<str>,
        body: &T,
        token: &str,
        session_id: &str,
    ) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let request = self
            .request_builder(Method::POST, uri, token)
            .header(CONTENT_TYPE, "application/json")
            .header(SESSION_ID_HEADER, session_id)
            .body(Body::from(json_body))
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn delete_session(&self, session_id: &str, token: &str) -> TestResponse {
        let request = self
            .request_builder(Method::DELETE, "/", token)
            .header(SESSION_ID_HEADER, session_id)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Sends a request and returns the response with its body still
    /// streaming. Use this for event streams, which never finish on their own.
    pub async fn open_stream(&self, builder: http::request::Builder) -> Response {
        let request = builder.body(Body::empty()).expect("Failed to build request");
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// Sends a request and collects the whole response
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            json,
        }
    }
}

/// Reads the next complete server-sent event from a streaming body,
/// skipping keep-alive comments
pub async fn next_event(body: &mut Body) -> String {
    let mut buffer = String::new();
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("Timed out waiting for an event")
            .expect("Event stream ended")
            .expect("Failed to read event stream");
        if let Ok(data) = frame.into_data() {
            buffer.push_str(std::str::from_utf8(&data).expect("Event is not UTF-8"));
        }
        while let Some(end) = buffer.find("\n\n") {
            let event: String = buffer.drain(..end + 2).collect();
            let event = event.trim_end().to_string();
            if !event.starts_with(':') {
                return event;
            }
        }
    }
}

/// A collected response
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Parsed body; `Null` when empty or not JSON
    pub json: Value,
}

impl TestResponse {
    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {}: {}",
            expected,
            self.status,
            self.text()
        );
    }

    pub fn assert_ok(&self) {
        self.assert_status(StatusCode::OK);
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!("Failed to parse response as JSON ({}): {}", e, self.text())
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}
