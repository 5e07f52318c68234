//! Uploads, design detail, and a user's saved/uploaded collections.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    copy_targets, Design, DesignId, DesignRepository, DomainError, Region, Result, UserId,
    UserRepository,
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::Limits;

/// Upload request as submitted by a designer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDesign {
    pub title: String,
    pub image_urls: Vec<String>,
    pub regions: Vec<String>,
}

#[derive(Clone)]
pub struct DesignService {
    designs: Arc<dyn DesignRepository>,
    users: Arc<dyn UserRepository>,
    limits: Limits,
}

impl DesignService {
    pub fn new(
        designs: Arc<dyn DesignRepository>,
        users: Arc<dyn UserRepository>,
        limits: Limits,
    ) -> Self {
        Self {
            designs,
            users,
            limits,
        }
    }

    /// Creates the canonical design plus one copy per tagged region and `Global`.
    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn upload(&self, owner: &UserId, request: NewDesign) -> Result<Design> {
        if self.users.get_user(owner).await?.is_none() {
            return Err(DomainError::not_found("user", owner.as_str()));
        }

        let title = self.validate_title(&request.title)?;
        let image_urls = self.validate_images(&request.image_urls)?;
        let regions = validate_regions(&request.regions)?;

        let design = Design {
            id: DesignId::generate(),
            title,
            image_urls,
            likes: 0,
            dislikes: 0,
            user_id: owner.clone(),
            regions,
            created_at: Utc::now(),
        };
        let copies = copy_targets(&design.regions);
        self.designs.insert_design(&design, &copies).await?;

        info!(design_id = %design.id, copies = copies.len(), "design uploaded");
        Ok(design)
    }

    pub async fn get(&self, id: &DesignId) -> Result<Design> {
        self.designs
            .get_design(id)
            .await?
            .ok_or_else(|| DomainError::not_found("design", id.as_str()))
    }

    /// Adds a design to the user's saved set. Saving twice is a no-op.
    #[instrument(skip(self))]
    pub async fn save(&self, user: &UserId, id: &DesignId) -> Result<bool> {
        self.get(id).await?;
        let added = self.users.add_saved_design(user, id).await?;
        if added {
            info!(design_id = %id, "design saved");
        }
        Ok(added)
    }

    pub async fn saved(&self, user: &UserId) -> Result<Vec<Design>> {
        let owner = self.require_user(user).await?;
        self.designs.designs_by_ids(&owner.saved_designs).await
    }

    pub async fn uploaded(&self, user: &UserId) -> Result<Vec<Design>> {
        let owner = self.require_user(user).await?;
        self.designs.designs_by_ids(&owner.uploaded_designs).await
    }

    async fn require_user(&self, user: &UserId) -> Result<domains::User> {
        self.users
            .get_user(user)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user.as_str()))
    }

    fn validate_title(&self, raw: &str) -> Result<String> {
        let title = raw.trim();
        if title.is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }
        if title.chars().count() > self.limits.max_title_len {
            return Err(DomainError::validation(format!(
                "title is longer than {} characters",
                self.limits.max_title_len
            )));
        }
        Ok(title.to_string())
    }

    fn validate_images(&self, raw: &[String]) -> Result<Vec<String>> {
        let urls: Vec<String> = raw
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect();

        if urls.is_empty() {
            return Err(DomainError::validation("at least one image URL is required"));
        }
        if urls.len() > self.limits.max_images {
            return Err(DomainError::validation(format!(
                "at most {} images are allowed",
                self.limits.max_images
            )));
        }
        if let Some(bad) = urls
            .iter()
            .find(|u| !(u.starts_with("https://") || u.starts_with("http://")))
        {
            return Err(DomainError::validation(format!("'{bad}' is not an http(s) URL")));
        }
        Ok(urls)
    }
}

fn validate_regions(raw: &[String]) -> Result<Vec<Region>> {
    let mut regions: Vec<Region> = Vec::with_capacity(raw.len());
    for name in raw {
        let region = Region::parse(name)?;
        // Global is implied for every design
        if !region.is_global() && !regions.contains(&region) {
            regions.push(region);
        }
    }
    if regions.is_empty() {
        return Err(DomainError::validation("select at least one region"));
    }
    Ok(regions)
}
