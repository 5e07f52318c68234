//! Shared harness for the router-level tests: the full axum app over an
//! in-memory store, with real JWTs.

use std::sync::Arc;
use std::time::Duration;

use api_adapters::{router, AppState};
use auth_adapters::JwtVerifier;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use domains::UserId;
use secrecy::SecretString;
use serde_json::{json, Value};
use services::{Limits, Services};
use storage_adapters::MemoryStore;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789";
pub const TEST_ISSUER: &str = "stylepitch-tests";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub jwt: Arc<JwtVerifier>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        let store = Arc::new(MemoryStore::new());
        let jwt = Arc::new(JwtVerifier::new(
            &SecretString::from(TEST_SECRET.to_string()),
            TEST_ISSUER,
            Duration::from_secs(600),
        ));
        let services = Services::new(store.clone(), store.clone(), store.clone(), limits);
        let router = router(AppState::new(services, jwt.clone()));
        Self { router, store, jwt }
    }

    pub fn token(&self, user: &str) -> String {
        self.jwt
            .issue(&UserId::new(user))
            .expect("token for test user")
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Sends a JSON request as `user` (anonymous when `None`) and decodes
    /// the JSON reply; an empty body decodes as `Value::Null`.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self.send(request).await;
        let status = response.status();
        (status, json_body(response).await)
    }

    pub async fn get(&self, uri: &str, user: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(user), None).await
    }

    pub async fn post(&self, uri: &str, user: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(user), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(user), Some(body)).await
    }

    /// Creates a profile for `user` named `<first> Tester`.
    pub async fn sign_up(&self, user: &str, first: &str) {
        let (status, _) = self
            .put(
                "/me",
                user,
                json!({
                    "first_name": first,
                    "last_name": "Tester",
                    "email": format!("{user}@example.com"),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "sign up {user}");
    }

    /// Uploads a design tagged with `regions` and returns its id.
    pub async fn upload(&self, owner: &str, title: &str, regions: &[&str]) -> String {
        let (status, body) = self
            .post(
                "/designs",
                owner,
                json!({
                    "title": title,
                    "image_urls": [format!("https://img.example.com/{title}.jpg")],
                    "regions": regions,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "upload {title}: {body}");
        body["id"].as_str().expect("design id").to_string()
    }

    pub async fn set_region(&self, user: &str, region: &str) {
        let (status, body) = self.put("/me/region", user, json!({ "region": region })).await;
        assert_eq!(status, StatusCode::OK, "set region: {body}");
    }
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    }
}
