//! # Domain Models
//!
//! These structs represent the core entities of StylePitch.
//! Identifiers are opaque strings: user ids come from the identity
//! provider, design and message ids are UUID v4, chat ids are derived
//! from the participant pair.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::region::Region;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }
    };
}

opaque_id!(
    /// Subject id issued by the identity provider.
    UserId
);
opaque_id!(DesignId);
opaque_id!(ChatId);
opaque_id!(MessageId);

impl DesignId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl MessageId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// A user-submitted item (title + images) shown in feeds and leaderboards.
/// This is the canonical document; region copies mirror its counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Design {
    pub id: DesignId,
    pub title: String,
    pub image_urls: Vec<String>,
    pub likes: u64,
    pub dislikes: u64,
    /// Owner of the design
    pub user_id: UserId,
    /// Region tags as submitted, without the implicit `Global`
    pub regions: Vec<Region>,
    pub created_at: DateTime<Utc>,
}

impl Design {
    /// Projects this design into the copy stored under `region`.
    pub fn region_copy(&self, region: &Region) -> RegionDesign {
        RegionDesign {
            region: region.clone(),
            design_id: self.id.clone(),
            title: self.title.clone(),
            image_urls: self.image_urls.clone(),
            user_id: self.user_id.clone(),
            likes: self.likes,
            dislikes: self.dislikes,
            created_at: self.created_at,
        }
    }
}

/// Partial projection of a [`Design`] stored under a region key, so a
/// region's feed can be read without a filtered scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDesign {
    pub region: Region,
    pub design_id: DesignId,
    pub title: String,
    pub image_urls: Vec<String>,
    pub user_id: UserId,
    pub likes: u64,
    pub dislikes: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    #[serde(alias = "right")]
    Like,
    #[serde(alias = "left")]
    Dislike,
}

impl SwipeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDirection::Like => "like",
            SwipeDirection::Dislike => "dislike",
        }
    }
}

/// One document copy that a vote must increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteTarget {
    Canonical,
    Region(Region),
}

/// Every copy a vote from `voter_region` touches: the canonical design,
/// the voter's region copy (unless the voter is in `Global`), and `Global`.
pub fn vote_targets(voter_region: &Region) -> Vec<VoteTarget> {
    let mut targets = vec![VoteTarget::Canonical];
    if !voter_region.is_global() {
        targets.push(VoteTarget::Region(voter_region.clone()));
    }
    targets.push(VoteTarget::Region(Region::global()));
    targets
}

/// Counters after a vote has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteTally {
    pub design_id: DesignId,
    pub likes: u64,
    pub dislikes: u64,
    /// Region copies that were incremented alongside the canonical design
    pub regions_updated: Vec<Region>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub region_preference: Option<Region>,
    pub saved_designs: Vec<DesignId>,
    pub uploaded_designs: Vec<DesignId>,
    /// chat id -> counterparty
    pub chats: BTreeMap<ChatId, UserId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name, "First", "Last")
    }

    pub fn thread_with(&self, counterparty: &UserId) -> Option<&ChatId> {
        self.chats
            .iter()
            .find(|(_, other)| *other == counterparty)
            .map(|(chat_id, _)| chat_id)
    }
}

pub fn display_name(first: &str, last: &str, first_fallback: &str, last_fallback: &str) -> String {
    let first = if first.trim().is_empty() { first_fallback } else { first.trim() };
    let last = if last.trim().is_empty() { last_fallback } else { last.trim() };
    format!("{first} {last}")
}

/// Profile fields a user controls directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// A two-party conversation between a viewer and a designer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatThread {
    pub id: ChatId,
    pub participants: [UserId; 2],
    pub created_at: DateTime<Utc>,
}

impl ChatThread {
    pub fn has_participant(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }

    pub fn counterparty_of(&self, user: &UserId) -> Option<&UserId> {
        match &self.participants {
            [a, b] if a == user => Some(b),
            [a, b] if b == user => Some(a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub text: String,
    pub sender_id: UserId,
    pub sender_name: String,
    pub created_at: DateTime<Utc>,
}

/// One row of a user's inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub chat_id: ChatId,
    pub counterparty_id: UserId,
    pub counterparty_name: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}
