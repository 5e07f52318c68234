//! Profiles and region preference.
//!
//! Changing a region preference is persisted and then published on a
//! per-user watch channel, so live listeners re-query with the new region.

use std::sync::Arc;

use dashmap::DashMap;
use domains::{DomainError, ProfileUpdate, Region, Result, User, UserId, UserRepository};
use tokio::sync::watch;
use tracing::{debug, info, instrument};

/// Fan-out of region preference changes, one watch channel per user.
#[derive(Clone, Default)]
pub struct RegionHub {
    channels: Arc<DashMap<UserId, watch::Sender<Region>>>,
}

impl RegionHub {
    /// Subscribes to `user`'s preference. `current` seeds the channel when
    /// nobody has subscribed or published for this user yet.
    pub fn subscribe(&self, user: &UserId, current: Region) -> watch::Receiver<Region> {
        self.channels
            .entry(user.clone())
            .or_insert_with(|| watch::channel(current).0)
            .subscribe()
    }

    /// Publishes `region` to `user`'s channel, opening it if needed so a
    /// listener that attaches afterwards still starts from this value.
    pub fn publish(&self, user: &UserId, region: Region) {
        let sender = self
            .channels
            .entry(user.clone())
            .or_insert_with(|| watch::channel(region.clone()).0);
        let listeners = sender.receiver_count();
        sender.send_replace(region);
        debug!(user_id = %user, listeners, "region published");
    }

    /// Overwrites the channel with the stored preference, unless a publish
    /// reached `receiver` first. That value is newer than any earlier read.
    fn refresh(&self, user: &UserId, receiver: &watch::Receiver<Region>, stored: Region) {
        let Some(sender) = self.channels.get(user) else {
            return;
        };
        sender.send_if_modified(|value| {
            if receiver.has_changed().unwrap_or(true) || *value == stored {
                return false;
            }
            *value = stored;
            true
        });
    }

    /// Drops channels nobody listens to anymore.
    pub fn prune(&self) {
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
    }
}

#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserRepository>,
    hub: RegionHub,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserRepository>, hub: RegionHub) -> Self {
        Self { users, hub }
    }

    pub async fn profile(&self, user: &UserId) -> Result<User> {
        self.users
            .get_user(user)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user.as_str()))
    }

    #[instrument(skip(self, update))]
    pub async fn upsert_profile(&self, user: &UserId, update: ProfileUpdate) -> Result<User> {
        let update = validate_profile(update)?;
        let stored = self.users.upsert_profile(user, &update).await?;
        info!("profile saved");
        Ok(stored)
    }

    /// The region `user` browses by default.
    pub async fn region(&self, user: &UserId) -> Result<Region> {
        crate::preferred_region(self.users.as_ref(), user).await
    }

    #[instrument(skip(self))]
    pub async fn set_region(&self, user: &UserId, region: Region) -> Result<Region> {
        self.users.set_region_preference(user, &region).await?;
        self.hub.publish(user, region.clone());
        info!(region = %region, "region preference changed");
        Ok(region)
    }

    /// Live view of `user`'s region preference.
    pub async fn watch_region(&self, user: &UserId) -> Result<watch::Receiver<Region>> {
        self.hub.prune();
        // Subscribe before reading, so a change persisted meanwhile is seen.
        let mut receiver = self.hub.subscribe(user, Region::global());
        let stored = self.region(user).await?;
        self.hub.refresh(user, &receiver, stored);
        receiver.borrow_and_update();
        Ok(receiver)
    }
}

fn validate_profile(update: ProfileUpdate) -> Result<ProfileUpdate> {
    let first_name = update.first_name.trim().to_string();
    let last_name = update.last_name.trim().to_string();
    let email = update.email.trim().to_string();

    if first_name.is_empty() || last_name.is_empty() || email.is_empty() {
        return Err(DomainError::validation("please fill in all fields"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(DomainError::validation("that email address is invalid")),
    }

    Ok(ProfileUpdate {
        first_name,
        last_name,
        email,
    })
}
