//! TMDB catalog client
//!
//! Search and director lookup against The Movie Database (v3 API).
//!
//! # API Reference
//! - Search: `GET {base}/search/movie?query=..&year=..`
//! - Credits: `GET {base}/movie/{id}/credits`

use crate::error::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// TMDB API base URL
pub const TMDB_API_URL: &str = "https://api.themoviedb.org/3";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Shortest query sent to TMDB
pub const MIN_QUERY_LEN: usize = 2;

/// Maximum results returned from one search
pub const MAX_RESULTS: usize = 8;

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogMovie {
    pub tmdb_id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<i64>,
    title: Option<String>,
    release_date: Option<String>,
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreditsResponse {
    #[serde(default)]
    crew: Vec<CrewMember>,
}

#[derive(Debug, Deserialize)]
struct CrewMember {
    job: Option<String>,
    name: Option<String>,
}

/// Year from a `YYYY-MM-DD` release date
fn release_year(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

/// Decode a search response body
pub fn parse_search_results(body: &str) -> Result<Vec<CatalogMovie>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| Error::Catalog(format!("Failed to parse TMDB search response: {}", e)))?;

    Ok(response
        .results
        .into_iter()
        .take(MAX_RESULTS)
        .filter_map(|item| {
            let title = item.title.filter(|t| !t.is_empty())?;
            let tmdb_id = item.id.filter(|id| *id != 0)?;
            Some(CatalogMovie {
                tmdb_id,
                title,
                year: release_year(item.release_date.as_deref()),
                poster_path: item.poster_path,
            })
        })
        .collect())
}

/// Decode a credits response body and pick the first director
pub fn parse_director(body: &str) -> Result<Option<String>> {
    let response: CreditsResponse = serde_json::from_str(body)
        .map_err(|e| Error::Catalog(format!("Failed to parse TMDB credits response: {}", e)))?;

    Ok(response
        .crew
        .into_iter()
        .find(|member| member.job.as_deref() == Some("Director"))
        .and_then(|member| member.name))
}

pub struct TmdbClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    /// Director lookups by TMDB id, including misses
    directors: Mutex<HashMap<i64, Option<String>>>,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::Catalog(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.unwrap_or(TMDB_API_URL).trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            directors: Mutex::new(HashMap::new()),
        })
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| Error::Catalog(format!("TMDB request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Catalog(format!("TMDB returned {}: {}", status, body)));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Catalog(format!("Failed to read TMDB response: {}", e)))
    }

    /// Search movies by title, optionally restricted to a release year
    pub async fn search_movies(&self, query: &str, year: Option<i32>) -> Result<Vec<CatalogMovie>> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }

        let mut params = vec![
            ("query", query.to_string()),
            ("include_adult", "false".to_string()),
            ("language", "en-US".to_string()),
        ];
        if let Some(year) = year {
            params.push(("year", year.to_string()));
        }

        let body = self.get("/search/movie", &params).await?;
        let results = parse_search_results(&body)?;
        debug!(query = %query, ?year, results = results.len(), "TMDB search complete");
        Ok(results)
    }

    /// Director of a movie, cached for the life of the client
    pub async fn director(&self, tmdb_id: i64) -> Result<Option<String>> {
        if let Some(cached) = self.directors.lock().await.get(&tmdb_id) {
            return Ok(cached.clone());
        }

        let body = self.get(&format!("/movie/{}/credits", tmdb_id), &[]).await?;
        let director = parse_director(&body)?;
        debug!(tmdb_id, director = ?director, "TMDB director lookup");

        self.directors.lock().await.insert(tmdb_id, director.clone());
        Ok(director)
    }

    /// Director lookup that logs and swallows failures
    pub async fn director_or_none(&self, tmdb_id: i64) -> Option<String> {
        match self.director(tmdb_id).await {
            Ok(director) => director,
            Err(e) => {
                warn!(tmdb_id, error = %e, "Director lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_results() {
        let body = r#"{
            "page": 1,
            "results": [
                {"id": 949, "title": "Heat", "release_date": "1995-12-15", "poster_path": "/heat.jpg"},
                {"id": 0, "title": "No Id"},
                {"id": 12, "title": ""},
                {"id": 13, "title": "Undated", "release_date": ""},
                {"id": 14, "title": "Odd Date", "release_date": "19"}
            ]
        }"#;

        let results = parse_search_results(body).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0],
            CatalogMovie {
                tmdb_id: 949,
                title: "Heat".to_string(),
                year: Some(1995),
                poster_path: Some("/heat.jpg".to_string()),
            }
        );
        assert_eq!(results[1].year, None);
        assert_eq!(results[2].year, None);
    }

    #[test]
    fn test_search_results_capped() {
        let items: Vec<String> = (1..=20)
            .map(|i| format!(r#"{{"id": {}, "title": "Film {}"}}"#, i, i))
            .collect();
        let body = format!(r#"{{"results": [{}]}}"#, items.join(","));

        let results = parse_search_results(&body).unwrap();
        assert_eq!(results.len(), MAX_RESULTS);
        assert_eq!(results[0].tmdb_id, 1);
    }

    #[test]
    fn test_parse_director() {
        let body = r#"{"id": 949, "crew": [
            {"job": "Producer", "name": "Art Linson"},
            {"job": "Director", "name": "Michael Mann"},
            {"job": "Director", "name": "Somebody Else"}
        ]}"#;
        assert_eq!(parse_director(body).unwrap().as_deref(), Some("Michael Mann"));
        assert_eq!(parse_director(r#"{"crew": []}"#).unwrap(), None);
        assert!(parse_director("not json").is_err());
    }

    #[tokio::test]
    async fn test_short_query_skips_request() {
        // Unroutable base URL: any request would fail
        let client = TmdbClient::new("key", Some("http://127.0.0.1:9")).unwrap();
        assert!(client.search_movies(" a ", None).await.unwrap().is_empty());
    }
}
