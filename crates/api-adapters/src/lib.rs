//! # api-adapters
//!
//! The HTTP/JSON surface of StylePitch. Every route except `/health`
//! and `/metrics` requires a bearer token.

pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod auth;
#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;
#[cfg(feature = "web-axum")]
pub mod state;

pub use metrics::Metrics;

#[cfg(feature = "web-axum")]
pub use error::ApiError;
#[cfg(feature = "web-axum")]
pub use state::AppState;

#[cfg(feature = "web-axum")]
pub fn router(state: AppState) -> axum::Router {
    use axum::routing::{get, post, put};
    use handlers::{chats, designs, feed, health, users};

    let routes = axum::Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .route("/me", get(users::me).put(users::update_me))
        .route("/me/region", put(users::set_region))
        .route("/me/region/stream", get(users::region_stream))
        .route("/me/saved", get(users::saved))
        .route("/me/designs", get(users::uploaded))
        .route("/feed", get(feed::feed))
        .route("/leaderboard", get(feed::leaderboard))
        .route("/designs", post(designs::upload))
        .route("/designs/{id}", get(designs::get))
        .route("/designs/{id}/vote", post(designs::vote))
        .route("/designs/{id}/save", post(designs::save))
        .route("/chats", get(chats::inbox).post(chats::message_designer))
        .route(
            "/chats/{id}/messages",
            get(chats::history).post(chats::post_message),
        );

    middleware::apply(routes).with_state(state)
}
