//! # SQLite store
//!
//! Maps the hosted document collections onto relational tables (see
//! `migrations/`). Every multi-document write runs in one transaction,
//! so a failure part-way leaves no counter or chat map half-updated.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    ChatId, ChatMessage, ChatRepository, ChatThread, Design, DesignId, DesignRepository,
    DomainError, MessageId, ProfileUpdate, Region, RegionDesign, Result, SwipeDirection, User,
    UserId, UserRepository, VoteTally, VoteTarget,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::paths;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const REGION_DESIGN_COLUMNS: &str =
    "region, design_id, title, image_urls, user_id, likes, dislikes, created_at_us";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url` and runs migrations.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        // An in-memory database lives and dies with its single connection.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(url, "sqlite store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a transaction that holds the write lock from its first
    /// statement. A deferred one would start on a read lock, and SQLite
    /// fails the later upgrade with SQLITE_BUSY instead of waiting.
    async fn begin_write(&self) -> StoreResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }
}

fn micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn from_micros(value: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(value)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp {value} out of range")))
}

fn count(value: i64) -> u64 {
    value.max(0) as u64
}

fn design_from_row(row: &SqliteRow) -> StoreResult<Design> {
    Ok(Design {
        id: DesignId::new(row.try_get::<String, _>("id")?),
        title: row.try_get("title")?,
        image_urls: serde_json::from_str(row.try_get::<&str, _>("image_urls")?)?,
        likes: count(row.try_get("likes")?),
        dislikes: count(row.try_get("dislikes")?),
        user_id: UserId::new(row.try_get::<String, _>("user_id")?),
        regions: serde_json::from_str(row.try_get::<&str, _>("regions")?)?,
        created_at: from_micros(row.try_get("created_at_us")?)?,
    })
}

fn region_design_from_row(row: &SqliteRow) -> StoreResult<RegionDesign> {
    Ok(RegionDesign {
        region: Region::parse(row.try_get::<&str, _>("region")?)?,
        design_id: DesignId::new(row.try_get::<String, _>("design_id")?),
        title: row.try_get("title")?,
        image_urls: serde_json::from_str(row.try_get::<&str, _>("image_urls")?)?,
        user_id: UserId::new(row.try_get::<String, _>("user_id")?),
        likes: count(row.try_get("likes")?),
        dislikes: count(row.try_get("dislikes")?),
        created_at: from_micros(row.try_get("created_at_us")?)?,
    })
}

fn thread_from_row(row: &SqliteRow) -> StoreResult<ChatThread> {
    Ok(ChatThread {
        id: ChatId::new(row.try_get::<String, _>("id")?),
        participants: [
            UserId::new(row.try_get::<String, _>("participant_a")?),
            UserId::new(row.try_get::<String, _>("participant_b")?),
        ],
        created_at: from_micros(row.try_get("created_at_us")?)?,
    })
}

fn message_from_row(row: &SqliteRow) -> StoreResult<ChatMessage> {
    Ok(ChatMessage {
        id: MessageId::new(row.try_get::<String, _>("id")?),
        chat_id: ChatId::new(row.try_get::<String, _>("chat_id")?),
        text: row.try_get("text")?,
        sender_id: UserId::new(row.try_get::<String, _>("sender_id")?),
        sender_name: row.try_get("sender_name")?,
        created_at: from_micros(row.try_get("created_at_us")?)?,
    })
}

// Inherent halves of the port implementations. They speak `StoreError`
// so `?` works on sqlx and serde errors; the trait impls convert.
impl SqliteStore {
    async fn write_design(&self, design: &Design, copies: &[Region]) -> StoreResult<()> {
        let mut tx = self.begin_write().await?;

        let owner = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(design.user_id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if owner.is_none() {
            return Err(DomainError::not_found("user", design.user_id.as_str()).into());
        }

        let image_urls = serde_json::to_string(&design.image_urls)?;
        let inserted = sqlx::query(
            "INSERT INTO designs (id, title, image_urls, likes, dislikes, user_id, regions, created_at_us) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) ON CONFLICT(id) DO NOTHING",
        )
        .bind(design.id.as_str())
        .bind(&design.title)
        .bind(&image_urls)
        .bind(design.likes as i64)
        .bind(design.dislikes as i64)
        .bind(design.user_id.as_str())
        .bind(serde_json::to_string(&design.regions)?)
        .bind(micros(design.created_at))
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(DomainError::Conflict(format!("{} already exists", paths::design(&design.id))).into());
        }

        for region in copies {
            sqlx::query(&format!(
                "INSERT INTO region_designs ({REGION_DESIGN_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
            ))
            .bind(region.as_str())
            .bind(design.id.as_str())
            .bind(&design.title)
            .bind(&image_urls)
            .bind(design.user_id.as_str())
            .bind(design.likes as i64)
            .bind(design.dislikes as i64)
            .bind(micros(design.created_at))
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("INSERT OR IGNORE INTO user_uploaded_designs (user_id, design_id) VALUES (?, ?)")
            .bind(design.user_id.as_str())
            .bind(design.id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn load_design(&self, id: &DesignId) -> StoreResult<Option<Design>> {
        let row = sqlx::query("SELECT * FROM designs WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(design_from_row).transpose()
    }

    async fn load_region(
        &self,
        region: &Region,
        order_by: &str,
        limit: usize,
    ) -> StoreResult<Vec<RegionDesign>> {
        let rows = sqlx::query(&format!(
            "SELECT {REGION_DESIGN_COLUMNS} FROM region_designs WHERE region = ? ORDER BY {order_by} LIMIT ?"
        ))
        .bind(region.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(region_design_from_row).collect()
    }

    async fn write_vote(
        &self,
        id: &DesignId,
        direction: SwipeDirection,
        targets: &[VoteTarget],
    ) -> StoreResult<VoteTally> {
        let (canonical_sql, copy_sql) = match direction {
            SwipeDirection::Like => (
                "UPDATE designs SET likes = likes + 1 WHERE id = ?",
                "UPDATE region_designs SET likes = likes + 1 WHERE region = ? AND design_id = ?",
            ),
            SwipeDirection::Dislike => (
                "UPDATE designs SET dislikes = dislikes + 1 WHERE id = ?",
                "UPDATE region_designs SET dislikes = dislikes + 1 WHERE region = ? AND design_id = ?",
            ),
        };

        let mut tx = self.begin_write().await?;
        let exists = sqlx::query("SELECT 1 FROM designs WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DomainError::not_found("design", id.as_str()).into());
        }

        let mut regions_updated = Vec::new();
        for target in targets {
            match target {
                VoteTarget::Canonical => {
                    sqlx::query(canonical_sql)
                        .bind(id.as_str())
                        .execute(&mut *tx)
                        .await?;
                }
                VoteTarget::Region(region) => {
                    let updated = sqlx::query(copy_sql)
                        .bind(region.as_str())
                        .bind(id.as_str())
                        .execute(&mut *tx)
                        .await?;
                    if updated.rows_affected() == 0 {
                        debug!(path = %paths::region_design(region, id), "no region copy; skipped");
                    } else {
                        regions_updated.push(region.clone());
                    }
                }
            }
        }

        let (likes, dislikes): (i64, i64) =
            sqlx::query_as("SELECT likes, dislikes FROM designs WHERE id = ?")
                .bind(id.as_str())
                .fetch_one(&mut *tx)
                .await?;
        tx.commit().await?;

        Ok(VoteTally {
            design_id: id.clone(),
            likes: count(likes),
            dislikes: count(dislikes),
            regions_updated,
        })
    }

    async fn load_user(&self, id: &UserId) -> StoreResult<Option<User>> {
        let Some(row) = sqlx::query(
            "SELECT id, first_name, last_name, email, region_preference, created_at_us FROM users WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let saved: Vec<(String,)> =
            sqlx::query_as("SELECT design_id FROM user_saved_designs WHERE user_id = ? ORDER BY rowid")
                .bind(id.as_str())
                .fetch_all(&self.pool)
                .await?;
        let uploaded: Vec<(String,)> = sqlx::query_as(
            "SELECT design_id FROM user_uploaded_designs WHERE user_id = ? ORDER BY rowid",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;
        let chats: Vec<(String, String)> =
            sqlx::query_as("SELECT chat_id, counterparty_id FROM user_chats WHERE user_id = ?")
                .bind(id.as_str())
                .fetch_all(&self.pool)
                .await?;

        let stored_pref: Option<String> = row.try_get("region_preference")?;
        let region_preference = match stored_pref.as_deref().map(Region::parse) {
            Some(Ok(region)) => Some(region),
            Some(Err(err)) => {
                warn!(path = %paths::user(id), error = %err, "ignoring stored region preference");
                None
            }
            None => None,
        };

        Ok(Some(User {
            id: UserId::new(row.try_get::<String, _>("id")?),
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            region_preference,
            saved_designs: saved.into_iter().map(|(d,)| DesignId::new(d)).collect(),
            uploaded_designs: uploaded.into_iter().map(|(d,)| DesignId::new(d)).collect(),
            chats: chats
                .into_iter()
                .map(|(chat, other)| (ChatId::new(chat), UserId::new(other)))
                .collect(),
            created_at: from_micros(row.try_get("created_at_us")?)?,
        }))
    }

    async fn write_profile(&self, id: &UserId, profile: &ProfileUpdate) -> StoreResult<User> {
        sqlx::query(
            "INSERT INTO users (id, first_name, last_name, email, region_preference, created_at_us) \
             VALUES (?, ?, ?, ?, NULL, ?) \
             ON CONFLICT(id) DO UPDATE SET first_name = excluded.first_name, \
             last_name = excluded.last_name, email = excluded.email",
        )
        .bind(id.as_str())
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.email)
        .bind(micros(Utc::now()))
        .execute(&self.pool)
        .await?;

        self.load_user(id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("{} vanished after upsert", paths::user(id))))
    }

    async fn write_region_preference(&self, id: &UserId, region: &Region) -> StoreResult<()> {
        let updated = sqlx::query("UPDATE users SET region_preference = ? WHERE id = ?")
            .bind(region.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(DomainError::not_found("user", id.as_str()).into());
        }
        Ok(())
    }

    async fn write_saved(&self, id: &UserId, design: &DesignId) -> StoreResult<bool> {
        let mut tx = self.begin_write().await?;
        let user = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if user.is_none() {
            return Err(DomainError::not_found("user", id.as_str()).into());
        }
        let inserted =
            sqlx::query("INSERT OR IGNORE INTO user_saved_designs (user_id, design_id) VALUES (?, ?)")
                .bind(id.as_str())
                .bind(design.as_str())
                .execute(&mut *tx)
                .await?;
        tx.commit().await?;
        Ok(inserted.rows_affected() == 1)
    }

    async fn write_thread(&self, thread: &ChatThread) -> StoreResult<ChatThread> {
        let mut tx = self.begin_write().await?;
        for participant in &thread.participants {
            let found = sqlx::query("SELECT 1 FROM users WHERE id = ?")
                .bind(participant.as_str())
                .fetch_optional(&mut *tx)
                .await?;
            if found.is_none() {
                return Err(DomainError::not_found("user", participant.as_str()).into());
            }
        }

        sqlx::query(
            "INSERT INTO chats (id, participant_a, participant_b, created_at_us) VALUES (?, ?, ?, ?) \
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(thread.id.as_str())
        .bind(thread.participants[0].as_str())
        .bind(thread.participants[1].as_str())
        .bind(micros(thread.created_at))
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(
            "SELECT id, participant_a, participant_b, created_at_us FROM chats WHERE id = ?",
        )
        .bind(thread.id.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let stored = thread_from_row(&row)?;

        let [a, b] = &stored.participants;
        for (owner, other) in [(a, b), (b, a)] {
            sqlx::query(
                "INSERT OR IGNORE INTO user_chats (user_id, chat_id, counterparty_id) VALUES (?, ?, ?)",
            )
            .bind(owner.as_str())
            .bind(stored.id.as_str())
            .bind(other.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(stored)
    }

    async fn load_thread(&self, id: &ChatId) -> StoreResult<Option<ChatThread>> {
        let row = sqlx::query(
            "SELECT id, participant_a, participant_b, created_at_us FROM chats WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(thread_from_row).transpose()
    }

    async fn write_message(&self, message: &ChatMessage) -> StoreResult<()> {
        if self.load_thread(&message.chat_id).await?.is_none() {
            return Err(DomainError::not_found("chat", message.chat_id.as_str()).into());
        }
        sqlx::query(
            "INSERT INTO chat_messages (id, chat_id, text, sender_id, sender_name, created_at_us) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id.as_str())
        .bind(message.chat_id.as_str())
        .bind(&message.text)
        .bind(message.sender_id.as_str())
        .bind(&message.sender_name)
        .bind(micros(message.created_at))
        .execute(&self.pool)
        .await?;
        debug!(path = %paths::chat_messages(&message.chat_id), "message stored");
        Ok(())
    }

    async fn load_messages(&self, id: &ChatId, limit: usize) -> StoreResult<Vec<ChatMessage>> {
        let rows = sqlx::query(
            "SELECT id, chat_id, text, sender_id, sender_name, created_at_us FROM chat_messages \
             WHERE chat_id = ? ORDER BY created_at_us DESC, rowid DESC LIMIT ?",
        )
        .bind(id.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(message_from_row).collect()
    }
}

#[async_trait]
impl DesignRepository for SqliteStore {
    async fn insert_design(&self, design: &Design, copies: &[Region]) -> Result<()> {
        Ok(self.write_design(design, copies).await?)
    }

    async fn get_design(&self, id: &DesignId) -> Result<Option<Design>> {
        Ok(self.load_design(id).await?)
    }

    async fn designs_by_ids(&self, ids: &[DesignId]) -> Result<Vec<Design>> {
        let mut designs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(design) = self.load_design(id).await? {
                designs.push(design);
            }
        }
        Ok(designs)
    }

    async fn region_feed(&self, region: &Region, limit: usize) -> Result<Vec<RegionDesign>> {
        Ok(self
            .load_region(region, "created_at_us DESC, design_id DESC", limit)
            .await?)
    }

    async fn region_leaderboard(
        &self,
        region: &Region,
        limit: usize,
    ) -> Result<Vec<RegionDesign>> {
        Ok(self
            .load_region(
                region,
                "likes DESC, dislikes ASC, created_at_us DESC, design_id DESC",
                limit,
            )
            .await?)
    }

    async fn apply_vote(
        &self,
        id: &DesignId,
        direction: SwipeDirection,
        targets: &[VoteTarget],
    ) -> Result<VoteTally> {
        Ok(self.write_vote(id, direction, targets).await?)
    }
}

#[async_trait]
impl UserRepository for SqliteStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.load_user(id).await?)
    }

    async fn upsert_profile(&self, id: &UserId, profile: &ProfileUpdate) -> Result<User> {
        Ok(self.write_profile(id, profile).await?)
    }

    async fn set_region_preference(&self, id: &UserId, region: &Region) -> Result<()> {
        Ok(self.write_region_preference(id, region).await?)
    }

    async fn add_saved_design(&self, id: &UserId, design: &DesignId) -> Result<bool> {
        Ok(self.write_saved(id, design).await?)
    }
}

#[async_trait]
impl ChatRepository for SqliteStore {
    async fn create_thread_if_absent(&self, thread: &ChatThread) -> Result<ChatThread> {
        Ok(self.write_thread(thread).await?)
    }

    async fn get_thread(&self, id: &ChatId) -> Result<Option<ChatThread>> {
        Ok(self.load_thread(id).await?)
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<()> {
        Ok(self.write_message(message).await?)
    }

    async fn messages(&self, id: &ChatId, limit: usize) -> Result<Vec<ChatMessage>> {
        Ok(self.load_messages(id, limit).await?)
    }

    async fn last_message(&self, id: &ChatId) -> Result<Option<ChatMessage>> {
        Ok(self.load_messages(id, 1).await?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domains::{copy_targets, vote_targets};

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:", 1)
            .await
            .expect("in-memory sqlite")
    }

    async fn profile(store: &SqliteStore, id: &str) {
        store
            .upsert_profile(
                &UserId::new(id),
                &ProfileUpdate {
                    first_name: id.to_uppercase(),
                    last_name: "Tester".into(),
                    email: format!("{id}@example.com"),
                },
            )
            .await
            .unwrap();
    }

    fn design(id: &str, owner: &str, tags: &[&str], age_minutes: i64) -> Design {
        Design {
            id: DesignId::new(id),
            title: format!("Design {id}"),
            image_urls: vec![format!("https://img.example.com/{id}.jpg")],
            likes: 0,
            dislikes: 0,
            user_id: UserId::new(owner),
            regions: tags.iter().map(|t| Region::parse(t).unwrap()).collect(),
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    async fn copy_likes(store: &SqliteStore, region: &str, id: &str) -> Option<i64> {
        sqlx::query_as::<_, (i64,)>(
            "SELECT likes FROM region_designs WHERE region = ? AND design_id = ?",
        )
        .bind(region)
        .bind(id)
        .fetch_optional(store.pool())
        .await
        .unwrap()
        .map(|(likes,)| likes)
    }

    #[tokio::test]
    async fn upload_round_trip_with_region_copies() {
        let store = store().await;
        profile(&store, "dee").await;
        let d = design("x", "dee", &["Europe", "Gulf"], 0);
        store.insert_design(&d, &copy_targets(&d.regions)).await.unwrap();

        let loaded = store.get_design(&d.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, d.title);
        assert_eq!(loaded.regions, d.regions);
        assert_eq!(loaded.created_at.timestamp_micros(), d.created_at.timestamp_micros());

        for region in ["Europe", "Gulf", "Global"] {
            assert_eq!(copy_likes(&store, region, "x").await, Some(0), "{region}");
        }
        let owner = store.get_user(&UserId::new("dee")).await.unwrap().unwrap();
        assert_eq!(owner.uploaded_designs, vec![DesignId::new("x")]);
    }

    #[tokio::test]
    async fn duplicate_upload_conflicts_and_rolls_back() {
        let store = store().await;
        profile(&store, "dee").await;
        let d = design("x", "dee", &["Europe"], 0);
        store.insert_design(&d, &copy_targets(&d.regions)).await.unwrap();

        let again = design("x", "dee", &["Africa"], 0);
        let err = store
            .insert_design(&again, &copy_targets(&again.regions))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(copy_likes(&store, "Africa", "x").await, None);
    }

    #[tokio::test]
    async fn vote_increments_canonical_and_region_copies() {
        let store = store().await;
        profile(&store, "dee").await;
        let d = design("x", "dee", &["Europe"], 0);
        store.insert_design(&d, &copy_targets(&d.regions)).await.unwrap();

        let europe = Region::parse("Europe").unwrap();
        let tally = store
            .apply_vote(&d.id, SwipeDirection::Like, &vote_targets(&europe))
            .await
            .unwrap();
        assert_eq!((tally.likes, tally.dislikes), (1, 0));
        assert_eq!(tally.regions_updated, vec![europe, Region::global()]);
        assert_eq!(copy_likes(&store, "Europe", "x").await, Some(1));
        assert_eq!(copy_likes(&store, "Global", "x").await, Some(1));
    }

    #[tokio::test]
    async fn vote_on_missing_design_is_not_found() {
        let store = store().await;
        let err = store
            .apply_vote(
                &DesignId::new("ghost"),
                SwipeDirection::Dislike,
                &vote_targets(&Region::global()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "design", .. }));
    }

    #[tokio::test]
    async fn feed_and_leaderboard_ordering() {
        let store = store().await;
        profile(&store, "dee").await;
        for (id, age) in [("old", 30), ("new", 1), ("mid", 10)] {
            let d = design(id, "dee", &["Africa"], age);
            store.insert_design(&d, &copy_targets(&d.regions)).await.unwrap();
        }
        let africa = Region::parse("Africa").unwrap();
        let targets = vote_targets(&africa);
        store
            .apply_vote(&DesignId::new("old"), SwipeDirection::Like, &targets)
            .await
            .unwrap();

        let feed = store.region_feed(&africa, 2).await.unwrap();
        let ids: Vec<_> = feed.iter().map(|d| d.design_id.as_str()).collect();
        assert_eq!(ids, ["new", "mid"]);

        let board = store.region_leaderboard(&africa, 10).await.unwrap();
        let ids: Vec<_> = board.iter().map(|d| d.design_id.as_str()).collect();
        assert_eq!(ids, ["old", "new", "mid"]);
    }

    #[tokio::test]
    async fn user_document_round_trip() {
        let store = store().await;
        profile(&store, "ada").await;
        let ada = UserId::new("ada");

        assert!(store.get_user(&ada).await.unwrap().unwrap().region_preference.is_none());
        store
            .set_region_preference(&ada, &Region::parse("Gulf").unwrap())
            .await
            .unwrap();
        assert!(store.add_saved_design(&ada, &DesignId::new("b")).await.unwrap());
        assert!(store.add_saved_design(&ada, &DesignId::new("a")).await.unwrap());
        assert!(!store.add_saved_design(&ada, &DesignId::new("b")).await.unwrap());

        let doc = store.get_user(&ada).await.unwrap().unwrap();
        assert_eq!(doc.region_preference.unwrap().as_str(), "Gulf");
        assert_eq!(doc.saved_designs, vec![DesignId::new("b"), DesignId::new("a")]);

        let missing = store
            .set_region_preference(&UserId::new("nobody"), &Region::global())
            .await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn concurrent_style_thread_creation_converges() {
        let store = store().await;
        profile(&store, "alice").await;
        profile(&store, "bob").await;

        let from_alice = ChatThread {
            id: ChatId::new("pair"),
            participants: [UserId::new("alice"), UserId::new("bob")],
            created_at: Utc::now(),
        };
        let from_bob = ChatThread {
            participants: [UserId::new("bob"), UserId::new("alice")],
            ..from_alice.clone()
        };
        let a = store.create_thread_if_absent(&from_alice).await.unwrap();
        let b = store.create_thread_if_absent(&from_bob).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.participants, b.participants);

        let (threads,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chats")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(threads, 1);

        let bob = store.get_user(&UserId::new("bob")).await.unwrap().unwrap();
        assert_eq!(bob.chats.get(&ChatId::new("pair")), Some(&UserId::new("alice")));
    }

    #[tokio::test]
    async fn messages_newest_first() {
        let store = store().await;
        profile(&store, "alice").await;
        profile(&store, "bob").await;
        let chat = ChatId::new("pair");
        store
            .create_thread_if_absent(&ChatThread {
                id: chat.clone(),
                participants: [UserId::new("alice"), UserId::new("bob")],
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let base = Utc::now();
        for (i, text) in ["one", "two", "three"].into_iter().enumerate() {
            store
                .append_message(&ChatMessage {
                    id: MessageId::generate(),
                    chat_id: chat.clone(),
                    text: text.into(),
                    sender_id: UserId::new("alice"),
                    sender_name: "ALICE Tester".into(),
                    created_at: base + Duration::seconds(i as i64),
                })
                .await
                .unwrap();
        }

        let history = store.messages(&chat, 2).await.unwrap();
        let texts: Vec<_> = history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["three", "two"]);

        let orphan = store
            .append_message(&ChatMessage {
                id: MessageId::generate(),
                chat_id: ChatId::new("nope"),
                text: "hello".into(),
                sender_id: UserId::new("alice"),
                sender_name: "ALICE Tester".into(),
                created_at: base,
            })
            .await;
        assert!(matches!(orphan, Err(DomainError::NotFound { entity: "chat", .. })));
    }

    // A pooled file database, so writers really contend for the lock.
    async fn file_store(dir: &tempfile::TempDir) -> SqliteStore {
        let url = format!("sqlite://{}", dir.path().join("stylepitch.db").display());
        SqliteStore::connect(&url, 5).await.expect("file sqlite")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_votes_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(file_store(&dir).await);
        profile(&store, "dee").await;
        let d = design("x", "dee", &["Europe"], 0);
        store.insert_design(&d, &copy_targets(&d.regions)).await.unwrap();

        let targets = vote_targets(&Region::parse("Europe").unwrap());
        let mut tasks = Vec::new();
        for _ in 0..40 {
            let store = store.clone();
            let targets = targets.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .apply_vote(&DesignId::new("x"), SwipeDirection::Like, &targets)
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let canonical = store.get_design(&d.id).await.unwrap().unwrap();
        assert_eq!(canonical.likes, 40);
        assert_eq!(copy_likes(&store, "Europe", "x").await, Some(40));
        assert_eq!(copy_likes(&store, "Global", "x").await, Some(40));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_thread_creation_yields_one_chat() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(file_store(&dir).await);
        profile(&store, "alice").await;
        profile(&store, "bob").await;

        let mut tasks = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            let participants = if i % 2 == 0 {
                [UserId::new("alice"), UserId::new("bob")]
            } else {
                [UserId::new("bob"), UserId::new("alice")]
            };
            tasks.push(tokio::spawn(async move {
                store
                    .create_thread_if_absent(&ChatThread {
                        id: ChatId::new("pair"),
                        participants,
                        created_at: Utc::now(),
                    })
                    .await
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().id, ChatId::new("pair"));
        }

        let (threads,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chats")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(threads, 1);
    }
}
