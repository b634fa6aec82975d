//! Film endpoints: manual adds, catalog adds and catalog search

use super::error::ApiError;
use super::user::UserId;
use crate::catalog::{CatalogMovie, TmdbClient};
use crate::engine::AddedEntry;
use crate::error::Error;
use crate::films::{owned_by_tmdb, CatalogFilm};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use orion_common::Tier;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

fn catalog(state: &AppState) -> Result<&Arc<TmdbClient>, ApiError> {
    state
        .catalog
        .as_ref()
        .ok_or_else(|| Error::CatalogUnavailable("TMDB API key not configured".to_string()).into())
}

fn added_status(added: &AddedEntry) -> StatusCode {
    if added.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

#[derive(Debug, Deserialize)]
pub struct AddFilmRequest {
    pub title: String,
    pub year: Option<i32>,
    pub watched_at: Option<NaiveDate>,
}

/// POST /api/films
pub async fn add_film(
    State(state): State<AppState>,
    user: UserId,
    Json(request): Json<AddFilmRequest>,
) -> Result<(StatusCode, Json<AddedEntry>), ApiError> {
    let added = state
        .engine
        .add_film(user.as_str(), &request.title, request.year, request.watched_at)
        .await?;
    Ok((added_status(&added), Json(added)))
}

#[derive(Debug, Deserialize)]
pub struct AddCatalogFilmRequest {
    pub title: String,
    pub year: Option<i32>,
    pub poster_path: Option<String>,
}

/// POST /api/films/catalog/:tmdb_id
///
/// Works without a catalog; the director is then left unset.
pub async fn add_catalog_film(
    State(state): State<AppState>,
    user: UserId,
    Path(tmdb_id): Path<i64>,
    Json(request): Json<AddCatalogFilmRequest>,
) -> Result<(StatusCode, Json<AddedEntry>), ApiError> {
    if tmdb_id <= 0 {
        return Err(ApiError::BadRequest(format!("Invalid TMDB id: {}", tmdb_id)));
    }

    let director = match &state.catalog {
        Some(client) => client.director_or_none(tmdb_id).await,
        None => None,
    };

    let film = CatalogFilm {
        tmdb_id,
        title: request.title,
        year: request.year,
        poster_path: request.poster_path,
        director,
    };
    let added = state.engine.add_catalog_film(user.as_str(), &film).await?;
    Ok((added_status(&added), Json(added)))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    /// Ignored unless it is all digits
    #[serde(default)]
    pub year: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub movie: CatalogMovie,
    pub director: Option<String>,
    pub owned: bool,
    pub entry_id: Option<Uuid>,
    pub tier: Option<Tier>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
}

fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// GET /api/catalog/search?q=..&year=..
pub async fn search_catalog(
    State(state): State<AppState>,
    user: UserId,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let client = catalog(&state)?;
    let movies = client.search_movies(&query.q, parse_year(&query.year)).await?;
    let owned = owned_by_tmdb(state.engine.pool(), user.as_str()).await?;

    let mut results = Vec::with_capacity(movies.len());
    for movie in movies {
        let director = client.director_or_none(movie.tmdb_id).await;
        let entry = owned.get(&movie.tmdb_id).copied();
        results.push(SearchResult {
            director,
            owned: entry.is_some(),
            entry_id: entry.map(|(id, _)| id),
            tier: entry.map(|(_, tier)| tier),
            movie,
        });
    }

    Ok(Json(SearchResponse {
        query: query.q.trim().to_string(),
        results,
    }))
}
