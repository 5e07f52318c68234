//! Swipe votes.
//!
//! A vote increments one counter on the canonical design and on its region
//! copies. All increments go to storage as one write so the copies cannot
//! drift apart on partial failure.

use std::sync::Arc;

use domains::{
    vote_targets, DesignId, DesignRepository, Result, SwipeDirection, UserId, UserRepository,
    VoteTally,
};
use tracing::{info, instrument};

use crate::preferred_region;

#[derive(Clone)]
pub struct VoteService {
    designs: Arc<dyn DesignRepository>,
    users: Arc<dyn UserRepository>,
}

impl VoteService {
    pub fn new(designs: Arc<dyn DesignRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { designs, users }
    }

    /// Records `voter`'s swipe, using the voter's current region preference.
    /// Repeat votes on the same design are counted again.
    #[instrument(skip(self))]
    pub async fn record(
        &self,
        voter: &UserId,
        design: &DesignId,
        direction: SwipeDirection,
    ) -> Result<VoteTally> {
        let region = preferred_region(self.users.as_ref(), voter).await?;
        let targets = vote_targets(&region);
        let tally = self.designs.apply_vote(design, direction, &targets).await?;

        info!(
            design_id = %design,
            direction = direction.as_str(),
            voter_region = %region,
            copies = tally.regions_updated.len(),
            "vote recorded"
        );
        Ok(tally)
    }
}
