//! # configs
//!
//! Layered settings for the StylePitch binaries:
//! built-in defaults, then `config/default.toml` (optional), then
//! `STYLEPITCH__SECTION__KEY` environment variables. A `.env` file is
//! read into the environment first.

use config::{Config, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub const ENV_PREFIX: &str = "STYLEPITCH";
const DEV_SECRET: &str = "stylepitch-development-secret-change-me";
const MIN_SECRET_LEN: usize = 32;

/// `database.url` value selecting the in-process store.
pub const MEMORY_DATABASE: &str = "memory";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub feed: FeedSettings,
    pub leaderboard: LeaderboardSettings,
    pub chat: ChatSettings,
    pub uploads: UploadSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite URL, or `memory` for the in-process store
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn is_memory(&self) -> bool {
        self.url.eq_ignore_ascii_case(MEMORY_DATABASE)
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
    pub issuer: String,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct FeedSettings {
    pub page_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardSettings {
    pub size: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChatSettings {
    pub max_message_len: usize,
    pub history_limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct UploadSettings {
    pub max_title_len: usize,
    pub max_images: usize,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    pub json: bool,
}

impl Settings {
    /// Loads `.env`, `config/default.toml` and the environment.
    pub fn load() -> Result<Self, SettingsError> {
        // A missing .env is normal outside development.
        let _ = dotenvy::dotenv();

        let settings: Settings = defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults overlaid with a TOML document; no environment involved.
    pub fn from_toml(toml: &str) -> Result<Self, SettingsError> {
        let settings: Settings = defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = [
            ("feed.page_size", self.feed.page_size),
            ("leaderboard.size", self.leaderboard.size),
            ("chat.max_message_len", self.chat.max_message_len),
            ("chat.history_limit", self.chat.history_limit),
            ("uploads.max_title_len", self.uploads.max_title_len),
            ("uploads.max_images", self.uploads.max_images),
            ("database.max_connections", self.database.max_connections as usize),
            ("auth.token_ttl_secs", self.auth.token_ttl_secs as usize),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(SettingsError::Invalid {
                    key,
                    reason: "must be greater than zero".into(),
                });
            }
        }

        let secret = self.auth.jwt_secret.expose_secret();
        if secret.len() < MIN_SECRET_LEN {
            return Err(SettingsError::Invalid {
                key: "auth.jwt_secret",
                reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
            });
        }
        if secret == DEV_SECRET {
            warn!("auth.jwt_secret is the development default; set STYLEPITCH__AUTH__JWT_SECRET");
        }
        if self.auth.issuer.trim().is_empty() {
            return Err(SettingsError::Invalid {
                key: "auth.issuer",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, SettingsError> {
    Ok(Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080_i64)?
        .set_default("database.url", "sqlite://stylepitch.db")?
        .set_default("database.max_connections", 5_i64)?
        .set_default("auth.jwt_secret", DEV_SECRET)?
        .set_default("auth.issuer", "stylepitch")?
        .set_default("auth.token_ttl_secs", 86_400_i64)?
        .set_default("feed.page_size", 100_i64)?
        .set_default("leaderboard.size", 10_i64)?
        .set_default("chat.max_message_len", 2000_i64)?
        .set_default("chat.history_limit", 200_i64)?
        .set_default("uploads.max_title_len", 100_i64)?
        .set_default("uploads.max_images", 10_i64)?
        .set_default("log.json", false)?)
}
