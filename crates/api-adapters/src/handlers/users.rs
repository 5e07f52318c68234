use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use domains::{Design, ProfileUpdate, Region, User};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{auth::AuthUser, extract::JsonBody, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct RegionRequest {
    pub region: String,
}

#[derive(Debug, Serialize)]
pub struct RegionResponse {
    pub region: Region,
}

pub async fn me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.services.profiles.profile(&user).await?))
}

pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(
        state.services.profiles.upsert_profile(&user, update).await?,
    ))
}

pub async fn set_region(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(request): JsonBody<RegionRequest>,
) -> Result<Json<RegionResponse>, ApiError> {
    let region = Region::parse(&request.region)?;
    let region = state.services.profiles.set_region(&user, region).await?;
    Ok(Json(RegionResponse { region }))
}

/// Emits the current preference, then one `region` event per change.
pub async fn region_stream(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let receiver = state.services.profiles.watch_region(&user).await?;
    debug!(user_id = %user, "region listener attached");

    let events = stream::unfold((receiver, true), |(mut receiver, first)| async move {
        if !first && receiver.changed().await.is_err() {
            return None;
        }
        let region = receiver.borrow_and_update().clone();
        let event = Event::default().event("region").data(region.as_str());
        Some((Ok(event), (receiver, false)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

pub async fn saved(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Design>>, ApiError> {
    Ok(Json(state.services.designs.saved(&user).await?))
}

pub async fn uploaded(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Design>>, ApiError> {
    Ok(Json(state.services.designs.uploaded(&user).await?))
}
