//! StylePitch use cases.
//!
//! Each service owns one slice of behaviour and talks to storage only
//! through the `domains` port traits, so every service can be exercised
//! against mocks.

pub mod chats;
pub mod designs;
pub mod feed;
pub mod users;
pub mod votes;

use std::sync::Arc;

use domains::{ChatRepository, DesignRepository, UserRepository};

pub use chats::{chat_id_for, ChatService};
pub use designs::{DesignService, NewDesign};
pub use feed::FeedService;
pub use users::{ProfileService, RegionHub};
pub use votes::VoteService;

/// Size and length bounds applied by the services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub feed_page_size: usize,
    pub leaderboard_size: usize,
    pub max_title_len: usize,
    pub max_images: usize,
    pub max_message_len: usize,
    pub chat_history_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            feed_page_size: 100,
            leaderboard_size: 10,
            max_title_len: 100,
            max_images: 10,
            max_message_len: 2000,
            chat_history_limit: 200,
        }
    }
}

/// Every service, wired to one set of repositories.
#[derive(Clone)]
pub struct Services {
    pub feed: FeedService,
    pub votes: VoteService,
    pub designs: DesignService,
    pub profiles: ProfileService,
    pub chats: ChatService,
}

impl Services {
    pub fn new(
        designs: Arc<dyn DesignRepository>,
        users: Arc<dyn UserRepository>,
        chats: Arc<dyn ChatRepository>,
        limits: Limits,
    ) -> Self {
        let hub = RegionHub::default();
        Self {
            feed: FeedService::new(designs.clone(), users.clone(), limits.clone()),
            votes: VoteService::new(designs.clone(), users.clone()),
            designs: DesignService::new(designs, users.clone(), limits.clone()),
            profiles: ProfileService::new(users.clone(), hub),
            chats: ChatService::new(chats, users, limits),
        }
    }
}

/// Resolves the region a user's feed should use: their stored preference,
/// or `Global` when none is set or the user has no document yet.
pub(crate) async fn preferred_region(
    users: &dyn UserRepository,
    user: &domains::UserId,
) -> domains::Result<domains::Region> {
    let pref = users.get_user(user).await?.and_then(|u| u.region_preference);
    Ok(pref.unwrap_or_default())
}
