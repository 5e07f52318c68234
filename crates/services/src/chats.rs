//! Two-party messaging between viewers and designers.
//!
//! A thread is reused when the viewer's chat map already points at the
//! designer. Otherwise it is created under an id derived from the sorted
//! participant pair, so concurrent first messages from both sides land on
//! the same thread.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    display_name, ChatId, ChatMessage, ChatRepository, ChatSummary, ChatThread, DomainError,
    MessageId, Result, User, UserId, UserRepository,
};
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use crate::Limits;

/// Deterministic thread id for an unordered participant pair.
pub fn chat_id_for(a: &UserId, b: &UserId) -> ChatId {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Sha256::new();
    hasher.update(first.as_str().as_bytes());
    hasher.update([0x1f]);
    hasher.update(second.as_str().as_bytes());
    let hash = hex::encode(hasher.finalize());
    ChatId::new(&hash[..32])
}

#[derive(Clone)]
pub struct ChatService {
    chats: Arc<dyn ChatRepository>,
    users: Arc<dyn UserRepository>,
    limits: Limits,
}

impl ChatService {
    pub fn new(
        chats: Arc<dyn ChatRepository>,
        users: Arc<dyn UserRepository>,
        limits: Limits,
    ) -> Self {
        Self {
            chats,
            users,
            limits,
        }
    }

    /// Finds the thread between `viewer` and `designer`, creating it if needed.
    #[instrument(skip(self))]
    pub async fn resolve_thread(&self, viewer: &UserId, designer: &UserId) -> Result<ChatThread> {
        let viewer_doc = self.require_user(viewer).await?;
        self.resolve_for(&viewer_doc, designer).await
    }

    /// Sends `text` to `designer`, opening a thread on first contact.
    #[instrument(skip(self, text))]
    pub async fn send_to_designer(
        &self,
        viewer: &UserId,
        designer: &UserId,
        text: &str,
    ) -> Result<ChatMessage> {
        let text = self.validate_text(text)?;
        let viewer_doc = self.require_user(viewer).await?;
        let thread = self.resolve_for(&viewer_doc, designer).await?;
        self.append(&thread, &viewer_doc, text).await
    }

    /// Posts into an existing thread the sender participates in.
    #[instrument(skip(self, text))]
    pub async fn post_message(
        &self,
        sender: &UserId,
        chat_id: &ChatId,
        text: &str,
    ) -> Result<ChatMessage> {
        let text = self.validate_text(text)?;
        let thread = self.participant_thread(sender, chat_id).await?;
        let sender_doc = self.require_user(sender).await?;
        self.append(&thread, &sender_doc, text).await
    }

    /// Message history, newest first.
    pub async fn messages(&self, viewer: &UserId, chat_id: &ChatId) -> Result<Vec<ChatMessage>> {
        self.participant_thread(viewer, chat_id).await?;
        self.chats
            .messages(chat_id, self.limits.chat_history_limit)
            .await
    }

    /// One summary per thread, most recently active first. `search` filters
    /// on the counterparty's name, case-insensitively.
    pub async fn inbox(&self, viewer: &UserId, search: Option<&str>) -> Result<Vec<ChatSummary>> {
        let viewer_doc = self.require_user(viewer).await?;
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut inbox = Vec::with_capacity(viewer_doc.chats.len());
        for (chat_id, counterparty) in &viewer_doc.chats {
            let counterparty_name = match self.users.get_user(counterparty).await? {
                Some(other) => display_name(&other.first_name, &other.last_name, "Unknown", "Unknown"),
                None => "Unknown Unknown".to_string(),
            };
            if let Some(needle) = &needle {
                if !counterparty_name.to_lowercase().contains(needle.as_str()) {
                    continue;
                }
            }
            let last = self.chats.last_message(chat_id).await?;
            inbox.push(ChatSummary {
                chat_id: chat_id.clone(),
                counterparty_id: counterparty.clone(),
                counterparty_name,
                last_message: last.as_ref().map(|m| m.text.clone()),
                last_message_at: last.map(|m| m.created_at),
            });
        }

        // `None` sorts below every timestamp, so silent threads go last.
        inbox.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(inbox)
    }

    async fn resolve_for(&self, viewer: &User, designer: &UserId) -> Result<ChatThread> {
        if &viewer.id == designer {
            return Err(DomainError::validation("cannot start a chat with yourself"));
        }

        if let Some(existing) = viewer.thread_with(designer) {
            match self.chats.get_thread(existing).await? {
                Some(thread) => return Ok(thread),
                None => warn!(chat_id = %existing, "chat map points at a missing thread"),
            }
        }

        self.require_user(designer).await?;
        let thread = ChatThread {
            id: chat_id_for(&viewer.id, designer),
            participants: [viewer.id.clone(), designer.clone()],
            created_at: Utc::now(),
        };
        let stored = self.chats.create_thread_if_absent(&thread).await?;
        info!(chat_id = %stored.id, "chat thread resolved");
        Ok(stored)
    }

    async fn append(&self, thread: &ChatThread, sender: &User, text: String) -> Result<ChatMessage> {
        let message = ChatMessage {
            id: MessageId::generate(),
            chat_id: thread.id.clone(),
            text,
            sender_id: sender.id.clone(),
            sender_name: sender.display_name(),
            created_at: Utc::now(),
        };
        self.chats.append_message(&message).await?;
        Ok(message)
    }

    async fn participant_thread(&self, user: &UserId, chat_id: &ChatId) -> Result<ChatThread> {
        let thread = self
            .chats
            .get_thread(chat_id)
            .await?
            .ok_or_else(|| DomainError::not_found("chat", chat_id.as_str()))?;
        if !thread.has_participant(user) {
            return Err(DomainError::Forbidden("not a participant of this chat".into()));
        }
        Ok(thread)
    }

    async fn require_user(&self, user: &UserId) -> Result<User> {
        self.users
            .get_user(user)
            .await?
            .ok_or_else(|| DomainError::not_found("user", user.as_str()))
    }

    fn validate_text(&self, raw: &str) -> Result<String> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(DomainError::validation("message must not be empty"));
        }
        if text.chars().count() > self.limits.max_message_len {
            return Err(DomainError::validation(format!(
                "message is longer than {} characters",
                self.limits.max_message_len
            )));
        }
        Ok(text.to_string())
    }
}
