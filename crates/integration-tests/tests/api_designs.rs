use axum::http::StatusCode;
use domains::{DesignId, Region};
use integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn upload_writes_a_copy_per_tag_plus_global() {
    let app = TestApp::new();
    app.sign_up("dee", "Dee").await;
    let id = app.upload("dee", "Linen suit", &["Europe", "Gulf"]).await;
    let design_id = DesignId::new(id.as_str());

    for region in ["Europe", "Gulf", "Global"] {
        let copy = app
            .store
            .region_copy(&Region::parse(region).unwrap(), &design_id)
            .unwrap();
        assert!(copy.is_some(), "missing {region} copy");
    }
    let africa = app
        .store
        .region_copy(&Region::parse("Africa").unwrap(), &design_id)
        .unwrap();
    assert!(africa.is_none());

    let (_, mine) = app.get("/me/designs", "dee").await;
    assert_eq!(mine[0]["id"], id.as_str());
    assert_eq!(mine[0]["regions"], json!(["Europe", "Gulf"]));
}

#[tokio::test]
async fn upload_requires_a_profile() {
    let app = TestApp::new();
    let (status, _) = app
        .post(
            "/designs",
            "nobody",
            json!({
                "title": "Cape",
                "image_urls": ["https://img.example.com/cape.jpg"],
                "regions": ["Europe"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_uploads_are_rejected() {
    let app = TestApp::new();
    app.sign_up("dee", "Dee").await;

    let cases = [
        json!({ "title": "  ", "image_urls": ["https://a.example/x.jpg"], "regions": ["Europe"] }),
        json!({ "title": "Cape", "image_urls": [], "regions": ["Europe"] }),
        json!({ "title": "Cape", "image_urls": ["ftp://a.example/x.jpg"], "regions": ["Europe"] }),
        json!({ "title": "Cape", "image_urls": ["https://a.example/x.jpg"], "regions": [] }),
        json!({ "title": "Cape", "image_urls": ["https://a.example/x.jpg"], "regions": ["Atlantis"] }),
    ];
    for case in cases {
        let (status, body) = app.post("/designs", "dee", case.clone()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{case} -> {body}");
    }

    let (_, mine) = app.get("/me/designs", "dee").await;
    assert!(mine.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn saving_is_idempotent_and_lists_in_order() {
    let app = TestApp::new();
    app.sign_up("dee", "Dee").await;
    app.sign_up("val", "Val").await;
    let first = app.upload("dee", "first", &["Europe"]).await;
    let second = app.upload("dee", "second", &["Europe"]).await;

    let (status, body) = app.post(&format!("/designs/{second}/save"), "val", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newly_saved"], true);

    let (_, body) = app.post(&format!("/designs/{second}/save"), "val", json!({})).await;
    assert_eq!(body["newly_saved"], false);

    app.post(&format!("/designs/{first}/save"), "val", json!({})).await;

    let (_, saved) = app.get("/me/saved", "val").await;
    let titles: Vec<_> = saved
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["second", "first"]);
}

#[tokio::test]
async fn saving_unknown_design_is_not_found() {
    let app = TestApp::new();
    app.sign_up("val", "Val").await;
    let (status, _) = app.post("/designs/ghost/save", "val", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/designs/ghost", "val").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
