//! HTTP handlers: thin wrappers translating query parameters into core
//! calls and core results into the JSON envelope.
//!
//! The envelope mirrors the upstream API contract:
//! `{"success": true, "data": ...}` on success, see `error` for failures.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use data_loader::{Movie, MovieId, UserId};
use engine::{
    HybridPrediction, PredictionSource, DEFAULT_COLLABORATIVE_K, DEFAULT_CONTENT_K,
    DEFAULT_DECAY_FACTOR, DEFAULT_NEIGHBOR_K, DEFAULT_RECENT_K,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Wrap a payload in the success envelope
fn envelope<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct MovieSummary {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
    pub year: Option<u16>,
    pub avg_rating: Option<f32>,
    pub rating_count: Option<u32>,
}

impl MovieSummary {
    fn from_store(state: &AppState, movie: &Movie) -> Self {
        let stats = state.store.get_movie_stats(movie.id);
        Self {
            movie_id: movie.id,
            title: movie.title.clone(),
            genres: movie.genres.clone(),
            year: movie.year,
            avg_rating: stats.map(|s| s.avg_rating),
            rating_count: stats.map(|s| s.rating_count),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SimilarMovieResponse {
    pub movie_id: MovieId,
    pub title: Option<String>,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub method: String,
    pub predicted_rating: f32,
    /// Source flag(s); anything except "neighborhood" marks a fallback
    pub sources: Vec<PredictionSource>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub movie_id: MovieId,
    pub title: Option<String>,
    pub genres: Option<Vec<String>>,
    pub score: f32,
    pub content_score: f32,
    pub collaborative_score: f32,
}

// =============================================================================
// Health
// =============================================================================

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let (users, movies, ratings) = state.store.counts();
    Json(json!({
        "status": "healthy",
        "message": "Recommendation service is running",
        "total_users": users,
        "total_movies": movies,
        "total_ratings": ratings,
    }))
}

// =============================================================================
// Movie search
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub title: Option<String>,
    pub limit: Option<usize>,
}

pub async fn search_movies(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Value>> {
    let query = params
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ApiError::InvalidArgument("missing required query parameter: title".to_string())
        })?;
    let limit = params.limit.unwrap_or(50);

    let results: Vec<MovieSummary> = state
        .store
        .search_movies(query)
        .into_iter()
        .take(limit)
        .map(|movie| MovieSummary::from_store(&state, movie))
        .collect();
    Ok(envelope(results))
}

// =============================================================================
// Similarity queries
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    pub n: Option<usize>,
}

pub async fn similar_movies(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
    Query(params): Query<SimilarParams>,
) -> ApiResult<Json<Value>> {
    let n = params.n.unwrap_or(10);
    let similar = state.recommender.content().top_similar(movie_id, n)?;

    let results: Vec<SimilarMovieResponse> = similar
        .into_iter()
        .map(|s| SimilarMovieResponse {
            movie_id: s.movie_id,
            title: state.store.get_movie(s.movie_id).map(|m| m.title.clone()),
            score: s.score,
        })
        .collect();
    Ok(envelope(results))
}

#[derive(Debug, Deserialize)]
pub struct NeighborParams {
    pub k: Option<usize>,
}

pub async fn similar_users(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(params): Query<NeighborParams>,
) -> ApiResult<Json<Value>> {
    let k = params.k.unwrap_or(5);
    let neighbors = state
        .recommender
        .collaborative()
        .top_similar_users(user_id, k)?;
    Ok(envelope(neighbors))
}

// =============================================================================
// Prediction
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct PredictParams {
    pub user_id: Option<UserId>,
    pub movie_id: Option<MovieId>,
    pub k: Option<usize>,
    /// "collaborative", "content", or "hybrid" (default)
    pub method: Option<String>,
    pub collab_weight: Option<f32>,
    pub content_weight: Option<f32>,
}

pub async fn predict(
    State(state): State<AppState>,
    Query(params): Query<PredictParams>,
) -> ApiResult<Json<Value>> {
    let user_id = params.user_id.ok_or_else(|| {
        ApiError::InvalidArgument("missing required query parameter: user_id".to_string())
    })?;
    let movie_id = params.movie_id.ok_or_else(|| {
        ApiError::InvalidArgument("missing required query parameter: movie_id".to_string())
    })?;

    let method = params.method.as_deref().unwrap_or("hybrid");
    let response = match method {
        "collaborative" => {
            let k = params.k.unwrap_or(DEFAULT_COLLABORATIVE_K);
            let prediction = state.recommender.predict_collaborative(user_id, movie_id, k);
            PredictionResponse {
                user_id,
                movie_id,
                method: method.to_string(),
                predicted_rating: prediction.value,
                sources: vec![prediction.source],
            }
        }
        "content" => {
            let k = params.k.unwrap_or(DEFAULT_CONTENT_K);
            let prediction = state.recommender.predict_content(user_id, movie_id, k);
            PredictionResponse {
                user_id,
                movie_id,
                method: method.to_string(),
                predicted_rating: prediction.value,
                sources: vec![prediction.source],
            }
        }
        "hybrid" => {
            let HybridPrediction {
                value,
                collaborative,
                content,
            } = state.recommender.predict_hybrid(
                user_id,
                movie_id,
                params.collab_weight.unwrap_or(0.5),
                params.content_weight.unwrap_or(0.5),
            );
            PredictionResponse {
                user_id,
                movie_id,
                method: method.to_string(),
                predicted_rating: value,
                sources: vec![collaborative.source, content.source],
            }
        }
        other => {
            return Err(ApiError::InvalidArgument(format!(
                "unknown prediction method: {other}"
            )))
        }
    };

    Ok(envelope(response))
}

// =============================================================================
// Recommendations
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RecommendParams {
    pub limit: Option<usize>,
    pub cb_weight: Option<f32>,
}

pub async fn recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(params): Query<RecommendParams>,
) -> ApiResult<Json<Value>> {
    let limit = params.limit.unwrap_or(10);
    let cb_weight = params.cb_weight.unwrap_or(0.5);
    if !(0.0..=1.0).contains(&cb_weight) {
        return Err(ApiError::InvalidArgument(format!(
            "cb_weight must be in [0, 1], got {cb_weight}"
        )));
    }

    let ranked = state.recommender.recommend(
        user_id,
        limit,
        cb_weight,
        DEFAULT_RECENT_K,
        DEFAULT_NEIGHBOR_K,
    )?;

    let results: Vec<RecommendationResponse> = ranked
        .into_iter()
        .map(|rec| {
            let movie = state.store.get_movie(rec.movie_id);
            RecommendationResponse {
                movie_id: rec.movie_id,
                title: movie.map(|m| m.title.clone()),
                genres: movie.map(|m| m.genres.clone()),
                score: rec.score,
                content_score: rec.content_score,
                collaborative_score: rec.collaborative_score,
            }
        })
        .collect();
    Ok(envelope(results))
}

// =============================================================================
// Temporal analytics
// =============================================================================

pub async fn temporal_trends(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(envelope(state.temporal.rating_trends()))
}

pub async fn temporal_seasonal(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(envelope(state.temporal.seasonal_patterns()))
}

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    pub limit: Option<usize>,
}

pub async fn temporal_popular(
    State(state): State<AppState>,
    Query(params): Query<TrendingParams>,
) -> ApiResult<Json<Value>> {
    let limit = params.limit.unwrap_or(20);
    Ok(envelope(state.temporal.popularity_trends(limit)))
}

pub async fn temporal_user_weights(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<Value>> {
    let weights = state
        .temporal
        .user_time_weights(user_id, DEFAULT_DECAY_FACTOR)?;
    Ok(envelope(weights))
}

pub async fn temporal_report(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(envelope(json!({ "report": state.temporal.render_report() })))
}
