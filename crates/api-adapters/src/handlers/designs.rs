use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use domains::{Design, DesignId, SwipeDirection, VoteTally};
use serde::{Deserialize, Serialize};
use services::NewDesign;

use crate::{
    auth::AuthUser,
    extract::{JsonBody, PathParam},
    ApiError, AppState,
};

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub direction: SwipeDirection,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub design_id: DesignId,
    /// false when the design was already saved
    pub newly_saved: bool,
}

pub async fn upload(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    JsonBody(request): JsonBody<NewDesign>,
) -> Result<(StatusCode, Json<Design>), ApiError> {
    let design = state.services.designs.upload(&owner, request).await?;
    state.metrics.upload();
    Ok((StatusCode::CREATED, Json(design)))
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(_viewer): AuthUser,
    PathParam(id): PathParam<String>,
) -> Result<Json<Design>, ApiError> {
    Ok(Json(state.services.designs.get(&DesignId::new(id)).await?))
}

pub async fn vote(
    State(state): State<AppState>,
    AuthUser(voter): AuthUser,
    PathParam(id): PathParam<String>,
    JsonBody(request): JsonBody<VoteRequest>,
) -> Result<Json<VoteTally>, ApiError> {
    let tally = state
        .services
        .votes
        .record(&voter, &DesignId::new(id), request.direction)
        .await?;
    state.metrics.vote(request.direction);
    Ok(Json(tally))
}

pub async fn save(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParam(id): PathParam<String>,
) -> Result<Json<SaveResponse>, ApiError> {
    let design_id = DesignId::new(id);
    let newly_saved = state.services.designs.save(&user, &design_id).await?;
    Ok(Json(SaveResponse {
        design_id,
        newly_saved,
    }))
}
