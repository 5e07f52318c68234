//! # In-memory document store
//!
//! Keeps every collection behind one `RwLock`, so multi-document writes
//! (upload batches, votes, thread creation) are all-or-nothing.
//! Used by tests and single-process development runs.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use domains::{
    ChatId, ChatMessage, ChatRepository, ChatThread, Design, DesignId, DesignRepository,
    DomainError, ProfileUpdate, Region, RegionDesign, Result, SwipeDirection, User, UserId,
    UserRepository, VoteTally, VoteTarget,
};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::paths;

#[derive(Default)]
struct Documents {
    designs: HashMap<DesignId, Design>,
    regions: HashMap<Region, HashMap<DesignId, RegionDesign>>,
    users: HashMap<UserId, User>,
    chats: HashMap<ChatId, ChatThread>,
    /// Append order per chat
    messages: HashMap<ChatId, Vec<ChatMessage>>,
}

#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<Documents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Documents>> {
        self.docs.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Documents>> {
        self.docs.write().map_err(|_| StoreError::Poisoned)
    }

    /// Region copy as currently stored, for consistency checks.
    pub fn region_copy(&self, region: &Region, id: &DesignId) -> Result<Option<RegionDesign>> {
        let docs = self.read()?;
        Ok(docs
            .regions
            .get(region)
            .and_then(|designs| designs.get(id))
            .cloned())
    }
}

fn bump(likes: &mut u64, dislikes: &mut u64, direction: SwipeDirection) {
    match direction {
        SwipeDirection::Like => *likes += 1,
        SwipeDirection::Dislike => *dislikes += 1,
    }
}

fn newest_first(a: &RegionDesign, b: &RegionDesign) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.design_id.cmp(&a.design_id))
}

#[async_trait]
impl DesignRepository for MemoryStore {
    async fn insert_design(&self, design: &Design, copies: &[Region]) -> Result<()> {
        let mut docs = self.write()?;
        if docs.designs.contains_key(&design.id) {
            return Err(DomainError::Conflict(format!(
                "{} already exists",
                paths::design(&design.id)
            )));
        }
        let owner = docs
            .users
            .get_mut(&design.user_id)
            .ok_or_else(|| DomainError::not_found("user", design.user_id.as_str()))?;
        owner.uploaded_designs.push(design.id.clone());

        for region in copies {
            docs.regions
                .entry(region.clone())
                .or_default()
                .insert(design.id.clone(), design.region_copy(region));
        }
        docs.designs.insert(design.id.clone(), design.clone());
        Ok(())
    }

    async fn get_design(&self, id: &DesignId) -> Result<Option<Design>> {
        Ok(self.read()?.designs.get(id).cloned())
    }

    async fn designs_by_ids(&self, ids: &[DesignId]) -> Result<Vec<Design>> {
        let docs = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| docs.designs.get(id).cloned())
            .collect())
    }

    async fn region_feed(&self, region: &Region, limit: usize) -> Result<Vec<RegionDesign>> {
        let docs = self.read()?;
        let mut feed: Vec<RegionDesign> = docs
            .regions
            .get(region)
            .map(|designs| designs.values().cloned().collect())
            .unwrap_or_default();
        feed.sort_by(newest_first);
        feed.truncate(limit);
        Ok(feed)
    }

    async fn region_leaderboard(
        &self,
        region: &Region,
        limit: usize,
    ) -> Result<Vec<RegionDesign>> {
        let docs = self.read()?;
        let mut board: Vec<RegionDesign> = docs
            .regions
            .get(region)
            .map(|designs| designs.values().cloned().collect())
            .unwrap_or_default();
        board.sort_by(|a, b| {
            b.likes
                .cmp(&a.likes)
                .then_with(|| a.dislikes.cmp(&b.dislikes))
                .then_with(|| newest_first(a, b))
        });
        board.truncate(limit);
        Ok(board)
    }

    async fn apply_vote(
        &self,
        id: &DesignId,
        direction: SwipeDirection,
        targets: &[VoteTarget],
    ) -> Result<VoteTally> {
        let mut docs = self.write()?;
        if !docs.designs.contains_key(id) {
            return Err(DomainError::not_found("design", id.as_str()));
        }

        let mut regions_updated = Vec::new();
        for target in targets {
            match target {
                VoteTarget::Canonical => {
                    if let Some(design) = docs.designs.get_mut(id) {
                        bump(&mut design.likes, &mut design.dislikes, direction);
                    }
                }
                VoteTarget::Region(region) => {
                    match docs.regions.get_mut(region).and_then(|d| d.get_mut(id)) {
                        Some(copy) => {
                            bump(&mut copy.likes, &mut copy.dislikes, direction);
                            regions_updated.push(region.clone());
                        }
                        None => {
                            debug!(path = %paths::region_design(region, id), "no region copy; skipped");
                        }
                    }
                }
            }
        }

        let design = &docs.designs[id];
        Ok(VoteTally {
            design_id: id.clone(),
            likes: design.likes,
            dislikes: design.dislikes,
            regions_updated,
        })
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    async fn upsert_profile(&self, id: &UserId, profile: &ProfileUpdate) -> Result<User> {
        let mut docs = self.write()?;
        let user = docs.users.entry(id.clone()).or_insert_with(|| User {
            id: id.clone(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            region_preference: None,
            saved_designs: Vec::new(),
            uploaded_designs: Vec::new(),
            chats: Default::default(),
            created_at: chrono::Utc::now(),
        });
        user.first_name = profile.first_name.clone();
        user.last_name = profile.last_name.clone();
        user.email = profile.email.clone();
        Ok(user.clone())
    }

    async fn set_region_preference(&self, id: &UserId, region: &Region) -> Result<()> {
        let mut docs = self.write()?;
        let user = docs
            .users
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found("user", id.as_str()))?;
        user.region_preference = Some(region.clone());
        Ok(())
    }

    async fn add_saved_design(&self, id: &UserId, design: &DesignId) -> Result<bool> {
        let mut docs = self.write()?;
        let user = docs
            .users
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found("user", id.as_str()))?;
        if user.saved_designs.contains(design) {
            return Ok(false);
        }
        user.saved_designs.push(design.clone());
        Ok(true)
    }
}

#[async_trait]
impl ChatRepository for MemoryStore {
    async fn create_thread_if_absent(&self, thread: &ChatThread) -> Result<ChatThread> {
        let mut docs = self.write()?;
        let [a, b] = &thread.participants;
        for participant in [a, b] {
            if !docs.users.contains_key(participant) {
                return Err(DomainError::not_found("user", participant.as_str()));
            }
        }

        let stored = docs
            .chats
            .entry(thread.id.clone())
            .or_insert_with(|| thread.clone())
            .clone();

        let [a, b] = &stored.participants;
        for (owner, other) in [(a, b), (b, a)] {
            if let Some(user) = docs.users.get_mut(owner) {
                user.chats.insert(stored.id.clone(), other.clone());
            }
        }
        Ok(stored)
    }

    async fn get_thread(&self, id: &ChatId) -> Result<Option<ChatThread>> {
        Ok(self.read()?.chats.get(id).cloned())
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<()> {
        let mut docs = self.write()?;
        if !docs.chats.contains_key(&message.chat_id) {
            return Err(DomainError::not_found("chat", message.chat_id.as_str()));
        }
        docs.messages
            .entry(message.chat_id.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn messages(&self, id: &ChatId, limit: usize) -> Result<Vec<ChatMessage>> {
        let docs = self.read()?;
        let mut history: Vec<ChatMessage> = docs.messages.get(id).cloned().unwrap_or_default();
        // stable sort keeps append order for equal timestamps; reverse makes it newest first
        history.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        history.reverse();
        history.truncate(limit);
        Ok(history)
    }

    async fn last_message(&self, id: &ChatId) -> Result<Option<ChatMessage>> {
        Ok(self.messages(id, 1).await?.into_iter().next())
    }
}
