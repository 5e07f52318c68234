//! # StylePitch server
//!
//! Loads settings, opens the configured store, and serves the HTTP API
//! until Ctrl+C or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api_adapters::{router, AppState};
use auth_adapters::JwtVerifier;
use configs::{DatabaseSettings, Settings};
use domains::{ChatRepository, DesignRepository, UserRepository};
use services::{Limits, Services};
use storage_adapters::MemoryStore;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

struct Stores {
    designs: Arc<dyn DesignRepository>,
    users: Arc<dyn UserRepository>,
    chats: Arc<dyn ChatRepository>,
}

impl Stores {
    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: DesignRepository + UserRepository + ChatRepository + 'static,
    {
        Self {
            designs: store.clone(),
            users: store.clone(),
            chats: store,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(settings.log.json);

    let stores = open_stores(&settings.database).await?;
    let services = Services::new(stores.designs, stores.users, stores.chats, limits(&settings));
    let verifier = Arc::new(JwtVerifier::new(
        &settings.auth.jwt_secret,
        settings.auth.issuer.clone(),
        Duration::from_secs(settings.auth.token_ttl_secs),
    ));
    let app = router(AppState::new(services, verifier));

    let address = settings.server.address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "StylePitch listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("server stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn limits(settings: &Settings) -> Limits {
    Limits {
        feed_page_size: settings.feed.page_size,
        leaderboard_size: settings.leaderboard.size,
        max_title_len: settings.uploads.max_title_len,
        max_images: settings.uploads.max_images,
        max_message_len: settings.chat.max_message_len,
        chat_history_limit: settings.chat.history_limit,
    }
}

async fn open_stores(database: &DatabaseSettings) -> anyhow::Result<Stores> {
    if database.is_memory() {
        warn!("using the in-memory store; data is lost on exit");
        return Ok(Stores::from_store(Arc::new(MemoryStore::new())));
    }
    open_sqlite(database).await
}

#[cfg(feature = "db-sqlite")]
async fn open_sqlite(database: &DatabaseSettings) -> anyhow::Result<Stores> {
    let store = storage_adapters::SqliteStore::connect(&database.url, database.max_connections)
        .await
        .with_context(|| format!("opening {}", database.url))?;
    Ok(Stores::from_store(Arc::new(store)))
}

#[cfg(not(feature = "db-sqlite"))]
async fn open_sqlite(database: &DatabaseSettings) -> anyhow::Result<Stores> {
    anyhow::bail!(
        "built without db-sqlite; cannot open {}, set database.url = \"memory\"",
        database.url
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(err) => {
                error!(error = %err, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
