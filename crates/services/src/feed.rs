//! Swipe feed and leaderboard reads.

use std::sync::Arc;

use domains::{DesignRepository, Region, RegionDesign, Result, UserId, UserRepository};
use tracing::{instrument, warn};

use crate::{preferred_region, Limits};

#[derive(Clone)]
pub struct FeedService {
    designs: Arc<dyn DesignRepository>,
    users: Arc<dyn UserRepository>,
    limits: Limits,
}

impl FeedService {
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

    /// The region `viewer` browses when no region is named explicitly.
    pub async fn region_for(&self, viewer: &UserId, explicit: Option<Region>) -> Result<Region> {
        match explicit {
            Some(region) => Ok(region),
            None => preferred_region(self.users.as_ref(), viewer).await,
        }
    }

    /// Newest designs in `region`. Storage failures are logged and come back
    /// as an empty feed.
    #[instrument(skip(self, region), fields(region = %region))]
    pub async fn load_feed(&self, region: &Region) -> Vec<RegionDesign> {
        match self
            .designs
            .region_feed(region, self.limits.feed_page_size)
            .await
        {
            Ok(designs) => designs,
            Err(err) => {
                warn!(error = %err, "feed load failed; serving empty feed");
                Vec::new()
            }
        }
    }

    #[instrument(skip(self, region), fields(region = %region))]
    pub async fn leaderboard(&self, region: &Region) -> Result<Vec<RegionDesign>> {
        self.designs
            .region_leaderboard(region, self.limits.leaderboard_size)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{DomainError, MockDesignRepository, MockUserRepository, User};
    use mockall::predicate::eq;

    fn service(designs: MockDesignRepository, users: MockUserRepository) -> FeedService {
        FeedService::new(Arc::new(designs), Arc::new(users), Limits::default())
    }

    #[tokio::test]
    async fn feed_failure_is_an_empty_feed() {
        let mut designs = MockDesignRepository::new();
        designs
            .expect_region_feed()
            .with(eq(Region::global()), eq(100))
            .returning(|_, _| Err(DomainError::Storage("connection reset".into())));

        let feed = service(designs, MockUserRepository::new())
            .load_feed(&Region::global())
            .await;
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn user_without_preference_browses_global() {
        let mut users = MockUserRepository::new();
        users.expect_get_user().returning(|id| {
            Ok(Some(User {
                id: id.clone(),
                first_name: "Ada".into(),
                last_name: "L".into(),
                email: "ada@example.com".into(),
                region_preference: None,
                saved_designs: vec![],
                uploaded_designs: vec![],
                chats: Default::default(),
                created_at: chrono::Utc::now(),
            }))
        });

        let region = service(MockDesignRepository::new(), users)
            .region_for(&UserId::new("ada"), None)
            .await
            .unwrap();
        assert!(region.is_global());
    }

    #[tokio::test]
    async fn unknown_user_browses_global() {
        let mut users = MockUserRepository::new();
        users.expect_get_user().returning(|_| Ok(None));

        let region = service(MockDesignRepository::new(), users)
            .region_for(&UserId::new("ghost"), None)
            .await
            .unwrap();
        assert!(region.is_global());
    }

    #[tokio::test]
    async fn explicit_region_wins_over_preference() {
        let region = service(MockDesignRepository::new(), MockUserRepository::new())
            .region_for(&UserId::new("ada"), Some(Region::parse("Gulf").unwrap()))
            .await
            .unwrap();
        assert_eq!(region.as_str(), "Gulf");
    }

    #[tokio::test]
    async fn leaderboard_uses_configured_size() {
        let mut designs = MockDesignRepository::new();
        designs
            .expect_region_leaderboard()
            .with(eq(Region::parse("Africa").unwrap()), eq(10))
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let board = service(designs, MockUserRepository::new())
            .leaderboard(&Region::parse("Africa").unwrap())
            .await
            .unwrap();
        assert!(board.is_empty());
    }
}
