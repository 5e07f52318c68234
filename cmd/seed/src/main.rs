//! Seeds a SQLite database with demo designers and designs, then prints a
//! bearer token per demo user for local testing.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use auth_adapters::JwtVerifier;
use configs::Settings;
use domains::{ProfileUpdate, Region, SwipeDirection, UserId};
use services::{Limits, NewDesign, Services};
use storage_adapters::SqliteStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USERS: &[(&str, &str, &str, &str)] = &[
    ("demo-amara", "Amara", "Okafor", "Africa"),
    ("demo-lena", "Lena", "Vogt", "Europe"),
    ("demo-kenji", "Kenji", "Mori", "East Asia"),
    ("demo-noor", "Noor", "Haddad", "Gulf"),
];

const DESIGNS: &[(&str, &str, &[&str])] = &[
    ("demo-amara", "Ankara wrap dress", &["Africa", "Europe"]),
    ("demo-lena", "Oversized wool coat", &["Europe"]),
    ("demo-kenji", "Layered linen set", &["East Asia", "Australia"]),
    ("demo-noor", "Embroidered abaya", &["Gulf", "South Asia"]),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load().context("loading settings")?;
    if settings.database.is_memory() {
        bail!("seeding an in-memory store is pointless; point database.url at a SQLite file");
    }

    let store = Arc::new(
        SqliteStore::connect(&settings.database.url, settings.database.max_connections)
            .await
            .with_context(|| format!("opening {}", settings.database.url))?,
    );
    let services = Services::new(store.clone(), store.clone(), store, Limits::default());

    for (id, first, last, region) in USERS {
        let user = UserId::new(*id);
        services
            .profiles
            .upsert_profile(
                &user,
                ProfileUpdate {
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    email: format!("{id}@stylepitch.dev"),
                },
            )
            .await?;
        services
            .profiles
            .set_region(&user, Region::parse(region)?)
            .await?;
    }

    let mut uploaded = Vec::with_capacity(DESIGNS.len());
    for (owner, title, regions) in DESIGNS {
        let slug = title.to_lowercase().replace(' ', "-");
        let design = services
            .designs
            .upload(
                &UserId::new(*owner),
                NewDesign {
                    title: title.to_string(),
                    image_urls: vec![format!("https://images.stylepitch.dev/{slug}.jpg")],
                    regions: regions.iter().map(|r| r.to_string()).collect(),
                },
            )
            .await?;
        uploaded.push(design.id);
    }

    // Everyone likes everyone else's work once, so leaderboards are not empty.
    for (voter, ..) in USERS {
        let voter = UserId::new(*voter);
        for (design, (owner, ..)) in uploaded.iter().zip(DESIGNS) {
            if *owner != voter.as_str() {
                services.votes.record(&voter, design, SwipeDirection::Like).await?;
            }
        }
    }
    info!(users = USERS.len(), designs = uploaded.len(), "seed complete");

    let jwt = JwtVerifier::new(
        &settings.auth.jwt_secret,
        settings.auth.issuer.clone(),
        Duration::from_secs(settings.auth.token_ttl_secs),
    );
    for (id, ..) in USERS {
        let token = jwt.issue(&UserId::new(*id))?;
        println!("{id}\t{token}");
    }
    Ok(())
}
