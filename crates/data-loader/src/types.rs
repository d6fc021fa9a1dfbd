//! Core domain types for the MovieLens ratings dataset.
//!
//! The store holds the two source tables (ratings, movies) plus the
//! indices the recommendation engines query: ratings by user, ratings by
//! movie, and precomputed per-movie statistics. Everything is read-only
//! once `RatingStore::load_from_files` returns.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Type Aliases
// =============================================================================
// These make the domain clearer and prevent mixing up user IDs with movie IDs

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for a movie
pub type MovieId = u32;

// =============================================================================
// Movie
// =============================================================================

/// A movie row from `movies.csv`.
///
/// Titles carry the release year in parentheses ("Toy Story (1995)").
/// Genres come from the pipe-delimited field, split into individual tags;
/// movies without genre data carry the literal `(no genres listed)` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Year extracted from the title, when present
    pub year: Option<u16>,
    /// Ordered genre tags, as they appear in the source file
    pub genres: Vec<String>,
}

impl Movie {
    /// Genre tags joined with spaces, the form the content engine encodes.
    pub fn genre_text(&self) -> String {
        self.genres.join(" ")
    }
}

// =============================================================================
// Rating
// =============================================================================

/// A single rating event from `ratings.csv`.
///
/// Ratings run from 0.5 to 5.0 in half-star steps. The lower bound matters:
/// the engines use 0.0 to mean "unrated" in the pivoted user-item matrix,
/// which is only unambiguous because a real rating can never be zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Rating value, 0.5 to 5.0
    pub rating: f32,
    /// Unix timestamp (seconds) when the rating was made
    pub timestamp: i64,
}

// =============================================================================
// Statistics
// =============================================================================

/// Precomputed statistics for a movie, built once at load time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MovieStats {
    pub avg_rating: f32,
    pub rating_count: u32,
    /// Popularity score derived from rating count and average
    pub popularity_score: f32,
}

// =============================================================================
// RatingStore - The In-Memory Dataset
// =============================================================================

/// Owns the loaded dataset and its lookup indices.
///
/// All getters return references or slices; after loading, no mutation
/// happens, so the store can be shared across request handlers behind an
/// `Arc` without locking.
#[derive(Debug)]
pub struct RatingStore {
    // Primary data
    pub(crate) movies: HashMap<MovieId, Movie>,
    /// All ratings in file order
    pub(crate) ratings: Vec<Rating>,

    // Rating indices for fast lookups
    /// All ratings made by each user, in file order
    pub(crate) user_ratings: HashMap<UserId, Vec<Rating>>,
    /// All ratings received by each movie, in file order
    pub(crate) movie_ratings: HashMap<MovieId, Vec<Rating>>,

    // Precomputed statistics
    pub(crate) movie_stats: HashMap<MovieId, MovieStats>,
}

impl RatingStore {
    /// Creates a new, empty store
    pub fn new() -> Self {
        Self {
            movies: HashMap::new(),
            ratings: Vec::new(),
            user_ratings: HashMap::new(),
            movie_ratings: HashMap::new(),
            movie_stats: HashMap::new(),
        }
    }

    /// Get a movie by ID
    pub fn get_movie(&self, id: MovieId) -> Option<&Movie> {
        self.movies.get(&id)
    }

    /// Every rating in the dataset, in file order
    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    /// Every movie in the catalog (iteration order is unspecified)
    pub fn movies(&self) -> impl Iterator<Item = &Movie> {
        self.movies.values()
    }

    /// Number of movies in the catalog
    pub fn movie_count(&self) -> usize {
        self.movies.len()
    }

    /// All ratings made by a user; empty slice if the user is unknown
    pub fn get_user_ratings(&self, user_id: UserId) -> &[Rating] {
        self.user_ratings
            .get(&user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All ratings for a movie; empty slice if the movie has none
    pub fn get_movie_ratings(&self, movie_id: MovieId) -> &[Rating] {
        self.movie_ratings
            .get(&movie_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Precomputed statistics for a movie
    pub fn get_movie_stats(&self, movie_id: MovieId) -> Option<&MovieStats> {
        self.movie_stats.get(&movie_id)
    }

    /// Case-insensitive substring search over movie titles.
    ///
    /// Results are sorted by movie id so repeated queries are deterministic.
    pub fn search_movies(&self, query: &str) -> Vec<&Movie> {
        let needle = query.to_lowercase();
        let mut hits: Vec<&Movie> = self
            .movies
            .values()
            .filter(|m| m.title.to_lowercase().contains(&needle))
            .collect();
        hits.sort_by_key(|m| m.id);
        hits
    }

    /// Mean over every rating in the dataset
    pub fn global_mean_rating(&self) -> f32 {
        if self.ratings.is_empty() {
            return 0.0;
        }
        let total: f64 = self.ratings.iter().map(|r| r.rating as f64).sum();
        (total / self.ratings.len() as f64) as f32
    }

    // Mutators - used only during loading

    /// Insert a movie into the store
    pub fn insert_movie(&mut self, movie: Movie) {
        self.movies.insert(movie.id, movie);
    }

    /// Insert a rating and update the per-user and per-movie indices
    pub fn insert_rating(&mut self, rating: Rating) {
        self.user_ratings
            .entry(rating.user_id)
            .or_default()
            .push(rating);
        self.movie_ratings
            .entry(rating.movie_id)
            .or_default()
            .push(rating);
        self.ratings.push(rating);
    }

    /// (users, movies, ratings) counts for logging and validation
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.user_ratings.len(), self.movies.len(), self.ratings.len())
    }
}

impl Default for RatingStore {
    fn default() -> Self {
        Self::new()
    }
}
