//! TMDB metadata enrichment batch job.
//!
//! One-way I/O glue, fully outside the recommendation core: look each
//! movie title up against the TMDB search API and write the enriched
//! catalog (poster, backdrop, overview, vote average) to a JSON file,
//! with a second file listing the titles that found no match or errored.
//! Requests are throttled to stay inside the API's rate limits.

use anyhow::{Context, Result};
use data_loader::{Movie, MovieId, RatingStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const TMDB_BASE: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Serialize)]
pub struct EnrichedMovie {
    #[serde(rename = "movieId")]
    pub movie_id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
    #[serde(rename = "tmdbId")]
    pub tmdb_id: u64,
    #[serde(rename = "posterPath")]
    pub poster_path: Option<String>,
    #[serde(rename = "backdropPath")]
    pub backdrop_path: Option<String>,
    pub overview: String,
    #[serde(rename = "voteAverage")]
    pub vote_average: f32,
    #[serde(rename = "releaseDate")]
    pub release_date: String,
}

#[derive(Debug, Serialize)]
pub struct EnrichmentError {
    #[serde(rename = "movieId")]
    pub movie_id: MovieId,
    pub title: String,
    pub error: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<TmdbMovie>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    id: u64,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    #[serde(default)]
    overview: String,
    #[serde(default)]
    vote_average: f32,
    #[serde(default)]
    release_date: String,
}

/// Strip the trailing " (year)" suffix for the search query
fn title_without_year(title: &str) -> &str {
    title
        .rsplit_once(" (")
        .map(|(base, _)| base)
        .unwrap_or(title)
        .trim()
}

async fn search_tmdb(
    client: &reqwest::Client,
    api_key: &str,
    movie: &Movie,
) -> Result<Option<TmdbMovie>> {
    let mut request = client
        .get(format!("{TMDB_BASE}/search/movie"))
        .query(&[("api_key", api_key), ("query", title_without_year(&movie.title))]);
    if let Some(year) = movie.year {
        request = request.query(&[("year", year.to_string())]);
    }

    let response = request.send().await?.error_for_status()?;
    let mut payload: SearchResponse = response.json().await?;
    if payload.results.is_empty() {
        Ok(None)
    } else {
        Ok(Some(payload.results.remove(0)))
    }
}

/// Run the enrichment job over the full catalog.
pub async fn run(
    store: &RatingStore,
    api_key: &str,
    output: &Path,
    throttle_ms: u64,
) -> Result<()> {
    let client = reqwest::Client::new();

    let mut movies: Vec<&Movie> = store.movies().collect();
    movies.sort_by_key(|m| m.id);
    info!(movies = movies.len(), "Starting TMDB enrichment");

    let mut enriched: Vec<EnrichedMovie> = Vec::new();
    let mut errors: Vec<EnrichmentError> = Vec::new();

    for (processed, movie) in movies.iter().enumerate() {
        match search_tmdb(&client, api_key, movie).await {
            Ok(Some(hit)) => enriched.push(EnrichedMovie {
                movie_id: movie.id,
                title: movie.title.clone(),
                genres: movie.genres.clone(),
                tmdb_id: hit.id,
                poster_path: hit.poster_path,
                backdrop_path: hit.backdrop_path,
                overview: hit.overview,
                vote_average: hit.vote_average,
                release_date: hit.release_date,
            }),
            Ok(None) => errors.push(EnrichmentError {
                movie_id: movie.id,
                title: movie.title.clone(),
                error: "no TMDB match".to_string(),
            }),
            Err(err) => {
                warn!(movie_id = movie.id, %err, "TMDB lookup failed");
                errors.push(EnrichmentError {
                    movie_id: movie.id,
                    title: movie.title.clone(),
                    error: err.to_string(),
                });
            }
        }

        if (processed + 1) % 100 == 0 {
            info!("Processed {}/{} movies", processed + 1, movies.len());
        }
        tokio::time::sleep(Duration::from_millis(throttle_ms)).await;
    }

    fs::write(output, serde_json::to_string_pretty(&enriched)?)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(
        enriched = enriched.len(),
        errors = errors.len(),
        "Enrichment complete, saved to {}",
        output.display()
    );

    if !errors.is_empty() {
        let error_path = output.with_file_name("enrichment_errors.json");
        fs::write(&error_path, serde_json::to_string_pretty(&errors)?)
            .with_context(|| format!("Failed to write {}", error_path.display()))?;
        info!("Errors saved to {}", error_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_without_year() {
        assert_eq!(title_without_year("Toy Story (1995)"), "Toy Story");
        assert_eq!(
            title_without_year("Seven (a.k.a. Se7en) (1995)"),
            "Seven (a.k.a. Se7en)"
        );
        assert_eq!(title_without_year("Untitled"), "Untitled");
    }
}
