//! Point prediction over the similarity engines.
//!
//! `Recommender` owns both built engines plus the per-user training
//! histories, and produces predicted ratings via k-nearest-neighbor
//! weighted averaging. Sparse inputs never error; they fall back to the
//! documented mean values, and every `Prediction` carries a source flag so
//! callers (and the offline harness) can tell a real neighborhood estimate
//! from a fallback.

use crate::collaborative::CollaborativeEngine;
use crate::content::ContentEngine;
use data_loader::{Movie, MovieId, Rating, UserId};
use serde::Serialize;
use std::collections::HashMap;
use tracing::instrument;

/// Default neighbor count for collaborative prediction
pub const DEFAULT_COLLABORATIVE_K: usize = 10;
/// Default neighbor count for content-based prediction
pub const DEFAULT_CONTENT_K: usize = 20;

/// How a predicted value was produced.
///
/// Everything except `Neighborhood` is a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    /// Weighted average over similar users / similar rated movies
    Neighborhood,
    /// Mean over every user-item matrix cell, zeros included
    MatrixMean,
    /// Mean rating of the target movie across its raters
    MovieMean,
    /// Mean over all training ratings
    GlobalMean,
    /// Mean of the target user's own training ratings
    UserMean,
}

/// A predicted rating plus its provenance
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub value: f32,
    pub source: PredictionSource,
}

impl Prediction {
    fn new(value: f32, source: PredictionSource) -> Self {
        Self { value, source }
    }

    /// True when the value came from a fallback rule rather than a
    /// neighborhood estimate
    pub fn is_fallback(&self) -> bool {
        self.source != PredictionSource::Neighborhood
    }
}

/// Hybrid point prediction: the blend plus both component predictions
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HybridPrediction {
    pub value: f32,
    pub collaborative: Prediction,
    pub content: Prediction,
}

/// Both similarity engines plus the training data views the predictors
/// need. Built once; all methods are pure reads.
#[derive(Debug)]
pub struct Recommender {
    content: ContentEngine,
    collaborative: CollaborativeEngine,
    /// Training ratings per user, input order preserved
    histories: HashMap<UserId, Vec<Rating>>,
    /// Mean over all training ratings (not the zero-diluted matrix mean)
    global_mean: f32,
}

impl Recommender {
    /// Build both engines from the training ratings and the movie catalog.
    #[instrument(skip(ratings, movies), fields(ratings = ratings.len(), movies = movies.len()))]
    pub fn fit(ratings: &[Rating], movies: &[Movie]) -> Self {
        let content = ContentEngine::build(movies);
        let collaborative = CollaborativeEngine::build(ratings);

        let mut histories: HashMap<UserId, Vec<Rating>> = HashMap::new();
        for rating in ratings {
            histories.entry(rating.user_id).or_default().push(*rating);
        }

        let global_mean = if ratings.is_empty() {
            0.0
        } else {
            let total: f64 = ratings.iter().map(|r| r.rating as f64).sum();
            (total / ratings.len() as f64) as f32
        };

        Self {
            content,
            collaborative,
            histories,
            global_mean,
        }
    }

    pub fn content(&self) -> &ContentEngine {
        &self.content
    }

    pub fn collaborative(&self) -> &CollaborativeEngine {
        &self.collaborative
    }

    /// Mean over all training ratings
    pub fn global_mean(&self) -> f32 {
        self.global_mean
    }

    /// The user's training ratings, input order; empty for unknown users
    pub fn user_history(&self, user_id: UserId) -> &[Rating] {
        self.histories
            .get(&user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Mean of the user's own training ratings
    fn user_mean(&self, user_id: UserId) -> Option<f32> {
        let history = self.histories.get(&user_id)?;
        if history.is_empty() {
            return None;
        }
        let total: f64 = history.iter().map(|r| r.rating as f64).sum();
        Some((total / history.len() as f64) as f32)
    }

    /// Collaborative prediction: weighted average of the ratings the
    /// target user's k nearest neighbors gave the movie.
    ///
    /// Fallback ladder:
    /// - movie unknown to the item matrix -> matrix mean, whoever asks
    /// - user unknown -> the movie's mean over its raters
    /// - no neighbor rated the movie, or the similarity mass is zero ->
    ///   matrix mean
    #[instrument(skip(self))]
    pub fn predict_collaborative(&self, user_id: UserId, movie_id: MovieId, k: usize) -> Prediction {
        if !self.collaborative.contains_movie(movie_id) {
            return Prediction::new(self.collaborative.matrix_mean(), PredictionSource::MatrixMean);
        }

        if !self.collaborative.contains_user(user_id) {
            // Column exists, so the mean over raters is always available
            let mean = self.collaborative.movie_mean(movie_id).unwrap_or(0.0);
            return Prediction::new(mean, PredictionSource::MovieMean);
        }

        let neighbors = match self.collaborative.top_similar_users(user_id, k) {
            Ok(neighbors) => neighbors,
            Err(_) => {
                return Prediction::new(
                    self.collaborative.matrix_mean(),
                    PredictionSource::MatrixMean,
                )
            }
        };

        // Among the neighbors, only those who actually rated the movie
        // (cell > 0) contribute
        let pairs: Vec<(f32, f32)> = neighbors
            .iter()
            .filter_map(|neighbor| {
                let rating = self.collaborative.rating(neighbor.user_id, movie_id)?;
                (rating > 0.0).then_some((neighbor.similarity, rating))
            })
            .collect();

        match weighted_average(&pairs) {
            Some(value) => Prediction::new(value, PredictionSource::Neighborhood),
            None => {
                Prediction::new(self.collaborative.matrix_mean(), PredictionSource::MatrixMean)
            }
        }
    }

    /// Content-based prediction: weighted average of the user's own
    /// ratings on the k movies most similar to the target.
    ///
    /// Fallback ladder:
    /// - user has no rating history -> global mean over training ratings
    /// - movie unknown to the similarity matrix -> the user's mean rating
    /// - no usable similarity pairs, or zero similarity mass -> the
    ///   user's mean rating
    #[instrument(skip(self))]
    pub fn predict_content(&self, user_id: UserId, movie_id: MovieId, k: usize) -> Prediction {
        let Some(history) = self.histories.get(&user_id).filter(|h| !h.is_empty()) else {
            return Prediction::new(self.global_mean, PredictionSource::GlobalMean);
        };
        // History is non-empty here, so the user mean always exists
        let user_mean = self.user_mean(user_id).unwrap_or(self.global_mean);

        if !self.content.contains(movie_id) {
            return Prediction::new(user_mean, PredictionSource::UserMean);
        }

        // Pair each rated movie's similarity-to-target with its rating,
        // keeping history order so the stable sort breaks ties the same
        // way the matrix row order would
        let mut pairs: Vec<(f32, f32)> = history
            .iter()
            .filter_map(|r| {
                self.content
                    .similarity(movie_id, r.movie_id)
                    .map(|sim| (sim, r.rating))
            })
            .collect();

        if pairs.is_empty() {
            return Prediction::new(user_mean, PredictionSource::UserMean);
        }

        pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        pairs.truncate(k);

        match weighted_average(&pairs) {
            Some(value) => Prediction::new(value, PredictionSource::Neighborhood),
            None => Prediction::new(user_mean, PredictionSource::UserMean),
        }
    }

    /// Linear blend of the two predictors.
    ///
    /// Weights are taken as given and not normalized; callers passing
    /// weights that do not sum to 1 get a prediction outside the rating
    /// scale's usual range, which is permitted (if surprising).
    #[instrument(skip(self))]
    pub fn predict_hybrid(
        &self,
        user_id: UserId,
        movie_id: MovieId,
        collab_weight: f32,
        content_weight: f32,
    ) -> HybridPrediction {
        let collaborative =
            self.predict_collaborative(user_id, movie_id, DEFAULT_COLLABORATIVE_K);
        let content = self.predict_content(user_id, movie_id, DEFAULT_CONTENT_K);
        HybridPrediction {
            value: collab_weight * collaborative.value + content_weight * content.value,
            collaborative,
            content,
        }
    }
}

/// Similarity-weighted average over (similarity, rating) pairs:
/// `sum(rating * similarity) / sum(similarity)`.
///
/// None when there are no pairs or the similarity mass is zero; callers
/// pick the appropriate fallback.
fn weighted_average(pairs: &[(f32, f32)]) -> Option<f32> {
    let weighted_sum: f64 = pairs.iter().map(|&(s, r)| s as f64 * r as f64).sum();
    let similarity_sum: f64 = pairs.iter().map(|&(s, _)| s as f64).sum();
    (similarity_sum > 0.0).then(|| (weighted_sum / similarity_sum) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(user_id: UserId, movie_id: MovieId, value: f32) -> Rating {
        Rating {
            user_id,
            movie_id,
            rating: value,
            timestamp: 1_000,
        }
    }

    fn movie(id: MovieId, genres: &[&str]) -> Movie {
        Movie {
            id,
            title: format!("Movie {id}"),
            year: Some(2000),
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn fixture() -> Recommender {
        let ratings = vec![
            rating(1, 10, 5.0),
            rating(2, 10, 4.0),
            rating(1, 20, 3.0),
        ];
        let movies = vec![
            movie(10, &["Action"]),
            movie(20, &["Action"]),
            movie(30, &["Romance"]),
        ];
        Recommender::fit(&ratings, &movies)
    }

    #[test]
    fn test_unknown_movie_returns_matrix_mean_for_any_user() {
        let recommender = fixture();
        let expected = recommender.collaborative().matrix_mean();

        for user_id in [1, 2, 999] {
            let prediction = recommender.predict_collaborative(user_id, 777, 5);
            assert_eq!(prediction.source, PredictionSource::MatrixMean);
            assert!((prediction.value - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_unknown_user_returns_movie_mean() {
        let recommender = fixture();
        let prediction = recommender.predict_collaborative(999, 10, 5);
        assert_eq!(prediction.source, PredictionSource::MovieMean);
        // Movie 10 rated 5.0 and 4.0
        assert!((prediction.value - 4.5).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_average_three_neighbors() {
        // Ratings {4, 3, 5} with similarities {0.8, 0.5, 0.2}
        let pairs = [(0.8f32, 4.0f32), (0.5, 3.0), (0.2, 5.0)];
        let expected = (4.0 * 0.8 + 3.0 * 0.5 + 5.0 * 0.2) / (0.8 + 0.5 + 0.2);
        let value = weighted_average(&pairs).unwrap();
        assert!((value - expected).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_average_zero_mass() {
        assert!(weighted_average(&[]).is_none());
        assert!(weighted_average(&[(0.0, 4.0), (0.0, 2.0)]).is_none());
    }

    #[test]
    fn test_collaborative_neighborhood_path() {
        // User 2 predicts movie 20 through neighbor 1: only neighbor 1
        // rated it (3.0), so the weighted average is that rating
        let recommender = fixture();
        let prediction = recommender.predict_collaborative(2, 20, 5);
        assert_eq!(prediction.source, PredictionSource::Neighborhood);
        assert!((prediction.value - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_content_unknown_user_returns_global_mean() {
        let recommender = fixture();
        let prediction = recommender.predict_content(999, 10, 5);
        assert_eq!(prediction.source, PredictionSource::GlobalMean);
        // Training ratings: 5.0, 4.0, 3.0
        assert!((prediction.value - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_content_unknown_movie_returns_user_mean() {
        let recommender = fixture();
        let prediction = recommender.predict_content(1, 777, 5);
        assert_eq!(prediction.source, PredictionSource::UserMean);
        // User 1 rated 5.0 and 3.0
        assert!((prediction.value - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_content_genre_overlap_dominates() {
        // User 1 rated movies 10 (5.0, Action) and 20 (3.0, Action);
        // target 20 excluded from its own history pair list? No: the
        // pairs include the target itself when the user rated it, at
        // similarity 1.0. Predicting movie 30 (Romance) instead isolates
        // the no-overlap path: zero similarity mass -> user mean.
        let recommender = fixture();
        let prediction = recommender.predict_content(1, 30, 5);
        assert_eq!(prediction.source, PredictionSource::UserMean);

        // Predicting movie 20: both rated Action movies overlap fully, so
        // the weighted average uses similarity 1.0 each -> plain mean
        let prediction = recommender.predict_content(1, 20, 5);
        assert_eq!(prediction.source, PredictionSource::Neighborhood);
        assert!((prediction.value - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_content_top_k_truncation() {
        // With k=1 only the most similar rated movie contributes; movie 20
        // rated by user 1 ties with itself at similarity 1.0 and history
        // order keeps movie 10 first
        let recommender = fixture();
        let prediction = recommender.predict_content(1, 20, 1);
        assert_eq!(prediction.source, PredictionSource::Neighborhood);
        assert!((prediction.value - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_hybrid_is_linear_in_weight() {
        let recommender = fixture();
        let pure_collab = recommender.predict_hybrid(1, 20, 1.0, 0.0).value;
        let pure_content = recommender.predict_hybrid(1, 20, 0.0, 1.0).value;

        for step in 0..=10 {
            let w = step as f32 / 10.0;
            let blended = recommender.predict_hybrid(1, 20, w, 1.0 - w).value;
            let expected = w * pure_collab + (1.0 - w) * pure_content;
            assert!((blended - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_hybrid_weights_not_normalized() {
        let recommender = fixture();
        let doubled = recommender.predict_hybrid(1, 20, 2.0, 2.0).value;
        let unit = recommender.predict_hybrid(1, 20, 1.0, 1.0).value;
        assert!((doubled - 2.0 * unit).abs() < 1e-6);
    }

    #[test]
    fn test_fallback_flag() {
        let recommender = fixture();
        assert!(recommender.predict_collaborative(1, 777, 5).is_fallback());
        assert!(!recommender.predict_collaborative(2, 20, 5).is_fallback());
    }
}
