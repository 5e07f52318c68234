use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::{ApiError, AppState};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state.metrics.render()?;
    Ok((
        [(
            CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        body,
    ))
}
