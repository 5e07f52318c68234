//! # Ports
//!
//! Any storage or identity adapter must implement these traits to be
//! wired into the service layer.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    ChatId, ChatMessage, ChatThread, Design, DesignId, ProfileUpdate, RegionDesign, SwipeDirection,
    User, UserId, VoteTally, VoteTarget,
};
use crate::region::Region;

/// Persistence contract for designs and their region copies.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DesignRepository: Send + Sync {
    /// Writes the canonical design, one copy per region in `copies`, and the
    /// owner's uploaded-designs entry as a single batch.
    async fn insert_design(&self, design: &Design, copies: &[Region]) -> Result<()>;

    async fn get_design(&self, id: &DesignId) -> Result<Option<Design>>;

    /// Canonical designs for `ids`, in the order given; unknown ids are skipped.
    async fn designs_by_ids(&self, ids: &[DesignId]) -> Result<Vec<Design>>;

    /// Region copies newest first, at most `limit`.
    async fn region_feed(&self, region: &Region, limit: usize) -> Result<Vec<RegionDesign>>;

    /// Region copies ranked by likes desc, dislikes asc, newest first.
    async fn region_leaderboard(&self, region: &Region, limit: usize)
        -> Result<Vec<RegionDesign>>;

    /// Increments the `direction` counter on every target in one
    /// all-or-nothing write. The canonical design must exist; missing
    /// region copies are skipped.
    async fn apply_vote(
        &self,
        id: &DesignId,
        direction: SwipeDirection,
        targets: &[VoteTarget],
    ) -> Result<VoteTally>;
}

/// Persistence contract for user documents.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Creates the user on first call, updates profile fields afterwards.
    async fn upsert_profile(&self, id: &UserId, profile: &ProfileUpdate) -> Result<User>;

    async fn set_region_preference(&self, id: &UserId, region: &Region) -> Result<()>;

    /// Adds to the saved set; returns `false` when it was already saved.
    async fn add_saved_design(&self, id: &UserId, design: &DesignId) -> Result<bool>;
}

/// Persistence contract for chat threads and their messages.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Stores `thread` unless a thread with the same id exists, and records
    /// it in both participants' chat maps. Returns the stored thread.
    async fn create_thread_if_absent(&self, thread: &ChatThread) -> Result<ChatThread>;

    async fn get_thread(&self, id: &ChatId) -> Result<Option<ChatThread>>;

    async fn append_message(&self, message: &ChatMessage) -> Result<()>;

    /// Messages newest first, at most `limit`.
    async fn messages(&self, id: &ChatId, limit: usize) -> Result<Vec<ChatMessage>>;

    async fn last_message(&self, id: &ChatId) -> Result<Option<ChatMessage>>;
}

/// Identity contract: turns a bearer credential into a user id.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<UserId>;
}
