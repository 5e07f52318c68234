use std::time::Duration;

use axum::{
    body::{Body, BodyDataStream},
    http::{header, Request, StatusCode},
};
use futures_util::StreamExt;
use integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn profile_round_trip() {
    let app = TestApp::new();
    let (status, _) = app.get("/me", "ada").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, user) = app
        .put(
            "/me",
            "ada",
            json!({ "first_name": " Ada ", "last_name": "Lovelace", "email": "ada@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["first_name"], "Ada");
    assert_eq!(user["region_preference"], serde_json::Value::Null);

    app.set_region("ada", "east asia").await;
    let (_, user) = app.get("/me", "ada").await;
    assert_eq!(user["region_preference"], "East Asia");
    assert_eq!(user["last_name"], "Lovelace");
}

#[tokio::test]
async fn incomplete_profile_is_rejected() {
    let app = TestApp::new();
    let (status, _) = app
        .put(
            "/me",
            "ada",
            json!({ "first_name": "Ada", "last_name": "", "email": "ada@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .put(
            "/me",
            "ada",
            json!({ "first_name": "Ada", "last_name": "L", "email": "not-an-email" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

async fn next_frame(frames: &mut BodyDataStream) -> String {
    let chunk = tokio::time::timeout(Duration::from_secs(2), frames.next())
        .await
        .expect("frame before timeout")
        .expect("stream open")
        .expect("readable frame");
    String::from_utf8(chunk.to_vec()).unwrap()
}

#[tokio::test]
async fn region_stream_pushes_changes() {
    let app = TestApp::new();
    app.sign_up("ada", "Ada").await;

    let response = app
        .send(
            Request::get("/me/region/stream")
                .header(header::AUTHORIZATION, format!("Bearer {}", app.token("ada")))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let mut frames = response.into_body().into_data_stream();

    let first = next_frame(&mut frames).await;
    assert!(first.contains("event: region"), "{first}");
    assert!(first.contains("data: Global"), "{first}");

    app.set_region("ada", "Africa").await;
    let second = next_frame(&mut frames).await;
    assert!(second.contains("data: Africa"), "{second}");
}
