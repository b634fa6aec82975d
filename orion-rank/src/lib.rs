//! orion-rank library - ranked film lists built from pairwise verdicts
//!
//! A user's list is partitioned into tiers (liked, ok, disliked). A new
//! entry is placed inside its tier by binary search over "which do you
//! prefer?" verdicts; every verdict also feeds a pairwise rating update.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod catalog;
pub mod comparisons;
pub mod engine;
pub mod entries;
pub mod error;
pub mod films;
pub mod ledger;
pub mod rating;
pub mod scoring;
pub mod session;
pub mod session_store;
pub mod tier;

#[cfg(test)]
pub(crate) mod test_support;

use catalog::TmdbClient;
use engine::RankingEngine;
use session_store::SessionStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: RankingEngine,
    pub sessions: SessionStore,
    /// `None` when no TMDB API key is configured
    pub catalog: Option<Arc<TmdbClient>>,
}

impl AppState {
    pub fn new(engine: RankingEngine, catalog: Option<TmdbClient>) -> Self {
        Self {
            engine,
            sessions: SessionStore::new(),
            catalog: catalog.map(Arc::new),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{delete, get, post};

    let api = Router::new()
        .route("/api/list", get(api::list::get_list))
        .route("/api/list/:entry_id", delete(api::list::remove_entry))
        .route("/api/comparisons", get(api::list::get_comparisons))
        .route("/api/films", post(api::films::add_film))
        .route("/api/films/catalog/:tmdb_id", post(api::films::add_catalog_film))
        .route("/api/catalog/search", get(api::films::search_catalog))
        .route("/api/rank/:entry_id/start", post(api::ranking::start))
        .route("/api/rank/:entry_id/tier", post(api::ranking::set_tier))
        .route("/api/rank/:entry_id/verdict", post(api::ranking::submit_verdict));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
