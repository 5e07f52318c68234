//! Swipe feed and leaderboard. Both default to the caller's region
//! preference when `?region=` is absent.

use axum::{extract::State, Json};
use domains::{Region, RegionDesign};
use serde::{Deserialize, Serialize};

use crate::{auth::AuthUser, extract::QueryParams, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct RegionQuery {
    pub region: Option<String>,
}

impl RegionQuery {
    fn explicit(&self) -> Result<Option<Region>, ApiError> {
        match self.region.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => Ok(Some(Region::parse(name)?)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegionDesigns {
    pub region: Region,
    pub designs: Vec<RegionDesign>,
}

pub async fn feed(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    QueryParams(query): QueryParams<RegionQuery>,
) -> Result<Json<RegionDesigns>, ApiError> {
    let feed = &state.services.feed;
    let region = feed.region_for(&viewer, query.explicit()?).await?;
    let designs = feed.load_feed(&region).await;
    Ok(Json(RegionDesigns { region, designs }))
}

pub async fn leaderboard(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    QueryParams(query): QueryParams<RegionQuery>,
) -> Result<Json<RegionDesigns>, ApiError> {
    let feed = &state.services.feed;
    let region = feed.region_for(&viewer, query.explicit()?).await?;
    let designs = feed.leaderboard(&region).await?;
    Ok(Json(RegionDesigns { region, designs }))
}
