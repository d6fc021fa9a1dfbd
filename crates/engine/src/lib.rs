//! # Engine Crate
//!
//! The recommendation core: similarity matrices, rating prediction, hybrid
//! blending, and temporal analysis over the loaded dataset.
//!
//! ## Components
//!
//! ### Content Similarity
//! Movie×movie cosine similarity over TF-IDF-encoded genre tags:
//! "Movies that look like this movie".
//!
//! ### Collaborative Similarity
//! User×user cosine similarity over the zero-filled user-item rating
//! matrix: "Users who rate like you".
//!
//! ### Prediction
//! k-nearest-neighbor weighted averages on top of either matrix, with
//! documented mean fallbacks when the data is too sparse, plus the linear
//! hybrid blend of both predictors.
//!
//! ### Hybrid Top-N
//! Recommendation lists blending max-normalized content and collaborative
//! candidate scores.
//!
//! ### Temporal Analysis
//! Calendar-period statistics, popularity-trend windows, and exponential
//! time-decay weighting of user histories.
//!
//! ## Example Usage
//!
//! ```ignore
//! use engine::Recommender;
//!
//! let recommender = Recommender::fit(store.ratings(), &movies);
//!
//! let similar = recommender.content().top_similar(1, 10)?;
//! let predicted = recommender.predict_hybrid(1, 296, 0.5, 0.5);
//! let top = recommender.recommend(1, 10, 0.5, 20, 10)?;
//! ```
//!
//! ## Concurrency
//!
//! Everything here is built once and read-only afterwards; share the
//! `Recommender` behind an `Arc` across request handlers without locking.
//! Both similarity matrices are O(n²) in their dimension, which is the
//! dominant memory cost.

// Public modules
pub mod collaborative;
pub mod content;
pub mod error;
pub mod hybrid;
pub mod matrix;
pub mod predict;
pub mod temporal;

// Re-export commonly used types
pub use collaborative::{CollaborativeEngine, SimilarUser};
pub use content::{ContentEngine, SimilarMovie};
pub use error::{EngineError, Result};
pub use hybrid::{RecommendedMovie, DEFAULT_NEIGHBOR_K, DEFAULT_RECENT_K};
pub use predict::{
    HybridPrediction, Prediction, PredictionSource, Recommender, DEFAULT_COLLABORATIVE_K,
    DEFAULT_CONTENT_K,
};
pub use temporal::{
    PopularityTrends, RatingTrends, SeasonalPatterns, TemporalAnalyzer, UserTimeWeights,
    DEFAULT_DECAY_FACTOR,
};

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Movie, Rating};

    #[test]
    fn test_end_to_end_fit_and_query() {
        let movies = vec![
            Movie {
                id: 10,
                title: "A (2000)".to_string(),
                year: Some(2000),
                genres: vec!["Action".to_string()],
            },
            Movie {
                id: 20,
                title: "B (2001)".to_string(),
                year: Some(2001),
                genres: vec!["Action".to_string()],
            },
        ];
        let ratings = vec![
            Rating {
                user_id: 1,
                movie_id: 10,
                rating: 5.0,
                timestamp: 1_000,
            },
            Rating {
                user_id: 2,
                movie_id: 10,
                rating: 4.0,
                timestamp: 1_000,
            },
            Rating {
                user_id: 1,
                movie_id: 20,
                rating: 3.0,
                timestamp: 1_000,
            },
        ];

        let recommender = Recommender::fit(&ratings, &movies);

        // Content query works end to end
        let similar = recommender.content().top_similar(10, 5).unwrap();
        assert_eq!(similar[0].movie_id, 20);

        // Unknown movie errors instead of returning a silent zero
        assert!(matches!(
            recommender.content().top_similar(999, 5),
            Err(EngineError::UnknownMovie(999))
        ));

        // Hybrid prediction blends both engines
        let hybrid = recommender.predict_hybrid(2, 20, 0.5, 0.5);
        assert!(hybrid.value > 0.0);
    }
}
