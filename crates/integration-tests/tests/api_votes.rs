use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use domains::{DesignId, Region};
use integration_tests::{json_body, TestApp};
use serde_json::json;

fn counters(app: &TestApp, region: &str, id: &str) -> Option<(u64, u64)> {
    app.store
        .region_copy(&Region::parse(region).unwrap(), &DesignId::new(id))
        .unwrap()
        .map(|copy| (copy.likes, copy.dislikes))
}

#[tokio::test]
async fn like_updates_canonical_region_and_global_copies() {
    let app = TestApp::new();
    app.sign_up("dee", "Dee").await;
    app.sign_up("val", "Val").await;
    let id = app.upload("dee", "Linen suit", &["Europe", "Gulf"]).await;
    app.set_region("val", "Europe").await;

    let (status, tally) = app
        .post(&format!("/designs/{id}/vote"), "val", json!({ "direction": "like" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tally["likes"], 1);
    assert_eq!(tally["dislikes"], 0);
    assert_eq!(tally["regions_updated"], json!(["Europe", "Global"]));

    assert_eq!(counters(&app, "Europe", &id), Some((1, 0)));
    assert_eq!(counters(&app, "Global", &id), Some((1, 0)));
    // Gulf was tagged but the voter is in Europe
    assert_eq!(counters(&app, "Gulf", &id), Some((0, 0)));

    let (_, design) = app.get(&format!("/designs/{id}"), "val").await;
    assert_eq!(design["likes"], 1);
}

#[tokio::test]
async fn global_voter_touches_only_canonical_and_global() {
    let app = TestApp::new();
    app.sign_up("dee", "Dee").await;
    app.sign_up("val", "Val").await;
    let id = app.upload("dee", "Kaftan", &["Africa"]).await;

    // "left" is the swipe alias for dislike
    let (status, tally) = app
        .post(&format!("/designs/{id}/vote"), "val", json!({ "direction": "left" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tally["dislikes"], 1);
    assert_eq!(tally["regions_updated"], json!(["Global"]));
    assert_eq!(counters(&app, "Africa", &id), Some((0, 0)));
    assert_eq!(counters(&app, "Global", &id), Some((0, 1)));
}

#[tokio::test]
async fn voter_region_without_copy_is_skipped() {
    let app = TestApp::new();
    app.sign_up("dee", "Dee").await;
    app.sign_up("val", "Val").await;
    let id = app.upload("dee", "Sari", &["South Asia"]).await;
    app.set_region("val", "Australia").await;

    let (status, tally) = app
        .post(&format!("/designs/{id}/vote"), "val", json!({ "direction": "right" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tally["likes"], 1);
    assert_eq!(tally["regions_updated"], json!(["Global"]));
    assert_eq!(counters(&app, "Australia", &id), None);
}

#[tokio::test]
async fn repeat_votes_are_counted() {
    let app = TestApp::new();
    app.sign_up("dee", "Dee").await;
    app.sign_up("val", "Val").await;
    let id = app.upload("dee", "Parka", &["Europe"]).await;

    for _ in 0..3 {
        app.post(&format!("/designs/{id}/vote"), "val", json!({ "direction": "like" }))
            .await;
    }
    assert_eq!(counters(&app, "Global", &id), Some((3, 0)));
}

#[tokio::test]
async fn vote_on_unknown_design_changes_nothing() {
    let app = TestApp::new();
    app.sign_up("dee", "Dee").await;
    app.sign_up("val", "Val").await;
    let id = app.upload("dee", "Poncho", &["Americas"]).await;

    let (status, body) = app
        .post("/designs/nope/vote", "val", json!({ "direction": "like" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("design"));
    assert_eq!(counters(&app, "Global", &id), Some((0, 0)));
}

#[tokio::test]
async fn unknown_direction_is_rejected() {
    let app = TestApp::new();
    app.sign_up("dee", "Dee").await;
    let id = app.upload("dee", "Cape", &["Europe"]).await;

    let (status, body) = app
        .post(&format!("/designs/{id}/vote"), "dee", json!({ "direction": "up" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("direction"));
    assert_eq!(counters(&app, "Global", &id), Some((0, 0)));
}

#[tokio::test]
async fn malformed_vote_body_gets_json_error() {
    let app = TestApp::new();
    app.sign_up("dee", "Dee").await;
    let id = app.upload("dee", "Shawl", &["Gulf"]).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/designs/{id}/vote"))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token("dee")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"direction\": "))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].is_string(), "{body}");

    // no content type at all
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/designs/{id}/vote"))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token("dee")))
        .body(Body::from("{}"))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(json_body(response).await["error"].is_string());
    assert_eq!(counters(&app, "Global", &id), Some((0, 0)));
}
