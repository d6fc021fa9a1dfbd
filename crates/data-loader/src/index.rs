//! RatingStore building and indexing logic.
//!
//! Building the store from the two CSV files:
//! - Parse `ratings.csv` and `movies.csv` in parallel
//! - Populate the primary data and per-user/per-movie indices
//! - Compute aggregate movie statistics
//! - Validate data integrity

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::{MovieStats, RatingStore};
use rayon::prelude::*;
use std::path::Path;
use tracing::info;

impl RatingStore {
    /// Load the dataset from a directory holding `ratings.csv` and
    /// `movies.csv`.
    ///
    /// This is the main entry point; the returned store is never mutated
    /// afterwards.
    pub fn load_from_files(data_dir: &Path) -> Result<Self> {
        info!("Loading MovieLens dataset from {:?}", data_dir);

        let ratings_path = data_dir.join("ratings.csv");
        let movies_path = data_dir.join("movies.csv");

        // Parse both files in parallel
        let (ratings, movies) = rayon::join(
            || parser::parse_ratings(&ratings_path),
            || parser::parse_movies(&movies_path),
        );
        let ratings = ratings?;
        let movies = movies?;

        info!(
            movies = movies.len(),
            ratings = ratings.len(),
            "Parsed dataset files"
        );

        let mut store = RatingStore::new();
        for movie in movies {
            store.insert_movie(movie);
        }
        for rating in ratings {
            store.insert_rating(rating);
        }

        store.compute_movie_stats();
        store.validate()?;

        let (users, movies, ratings) = store.counts();
        info!(users, movies, ratings, "RatingStore built and validated");
        Ok(store)
    }

    /// Compute aggregate statistics for all rated movies.
    pub fn compute_movie_stats(&mut self) {
        let movie_stats = self
            .movie_ratings
            .par_iter()
            .map(|(&movie_id, ratings)| {
                let rating_count = ratings.len() as u32;
                let avg_rating = if rating_count > 0 {
                    let total: f32 = ratings.iter().map(|r| r.rating).sum();
                    total / rating_count as f32
                } else {
                    0.0
                };
                let popularity_score = compute_popularity_score(avg_rating, rating_count);

                (
                    movie_id,
                    MovieStats {
                        avg_rating,
                        rating_count,
                        popularity_score,
                    },
                )
            })
            .collect();
        self.movie_stats = movie_stats;
    }

    /// Validate data integrity: rated movies must exist in the catalog and
    /// every rating must be inside the valid 0.5-5.0 domain.
    pub fn validate(&self) -> Result<()> {
        for rating in &self.ratings {
            if !self.movies.contains_key(&rating.movie_id) {
                return Err(DataLoadError::ValidationError(format!(
                    "rating references unknown movie {}",
                    rating.movie_id
                )));
            }
            if rating.rating < 0.5 || rating.rating > 5.0 {
                return Err(DataLoadError::InvalidValue {
                    field: "rating".to_string(),
                    value: rating.rating.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Popularity formula: avg_rating * ln(rating_count + 1).
/// Rewards both high ratings and many ratings.
fn compute_popularity_score(avg_rating: f32, rating_count: u32) -> f32 {
    avg_rating * (rating_count as f32 + 1.0).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Movie, Rating};

    #[test]
    fn test_popularity_score() {
        let score1 = compute_popularity_score(4.5, 10);
        let score2 = compute_popularity_score(3.5, 1000);

        assert!(score1 > 0.0);
        assert!(score2 > score1);
    }

    #[test]
    fn test_stats_computed_per_movie() {
        let mut store = RatingStore::new();
        store.insert_movie(Movie {
            id: 1,
            title: "Test (2000)".to_string(),
            year: Some(2000),
            genres: vec!["Drama".to_string()],
        });
        store.insert_rating(Rating {
            user_id: 1,
            movie_id: 1,
            rating: 4.0,
            timestamp: 1_000,
        });
        store.insert_rating(Rating {
            user_id: 2,
            movie_id: 1,
            rating: 3.0,
            timestamp: 2_000,
        });
        store.compute_movie_stats();

        let stats = store.get_movie_stats(1).unwrap();
        assert_eq!(stats.rating_count, 2);
        assert!((stats.avg_rating - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_validate_rejects_unknown_movie() {
        let mut store = RatingStore::new();
        store.insert_rating(Rating {
            user_id: 1,
            movie_id: 42,
            rating: 4.0,
            timestamp: 0,
        });
        assert!(store.validate().is_err());
    }
}
