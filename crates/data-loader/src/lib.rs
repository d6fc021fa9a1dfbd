//! # Data Loader Crate
//!
//! Loads and indexes the MovieLens ratings dataset (`ratings.csv`,
//! `movies.csv`).
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Movie, Rating, RatingStore)
//! - **parser**: Parse the CSV files into Rust structs
//! - **index**: Build the store and its aggregate statistics
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::RatingStore;
//! use std::path::Path;
//!
//! let store = RatingStore::load_from_files(Path::new("data/ml-latest-small"))?;
//!
//! let movie = store.get_movie(1).unwrap();
//! let ratings = store.get_user_ratings(1);
//! println!("{} rated by {} users", movie.title, ratings.len());
//! ```

// Public modules
pub mod error;
pub mod index;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use types::{Movie, MovieId, MovieStats, Rating, RatingStore, UserId};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store() {
        let store = RatingStore::new();
        let (users, movies, ratings) = store.counts();

        assert_eq!(users, 0);
        assert_eq!(movies, 0);
        assert_eq!(ratings, 0);
        assert!(store.get_movie(999).is_none());
        assert!(store.get_user_ratings(999).is_empty());
        assert!(store.get_movie_ratings(999).is_empty());
    }

    #[test]
    fn test_insert_movie() {
        let mut store = RatingStore::new();

        store.insert_movie(Movie {
            id: 1,
            title: "Toy Story (1995)".to_string(),
            year: Some(1995),
            genres: vec![
                "Adventure".to_string(),
                "Animation".to_string(),
                "Children".to_string(),
            ],
        });

        let retrieved = store.get_movie(1).unwrap();
        assert_eq!(retrieved.id, 1);
        assert_eq!(retrieved.year, Some(1995));
        assert_eq!(retrieved.genre_text(), "Adventure Animation Children");
    }

    #[test]
    fn test_insert_rating() {
        let mut store = RatingStore::new();

        store.insert_rating(Rating {
            user_id: 1,
            movie_id: 1193,
            rating: 5.0,
            timestamp: 978_300_760,
        });

        assert_eq!(store.get_user_ratings(1).len(), 1);
        assert_eq!(store.get_user_ratings(1)[0].rating, 5.0);
        assert_eq!(store.get_movie_ratings(1193).len(), 1);
    }

    #[test]
    fn test_search_movies() {
        let mut store = RatingStore::new();
        store.insert_movie(Movie {
            id: 1,
            title: "Toy Story (1995)".to_string(),
            year: Some(1995),
            genres: vec![],
        });
        store.insert_movie(Movie {
            id: 3114,
            title: "Toy Story 2 (1999)".to_string(),
            year: Some(1999),
            genres: vec![],
        });
        store.insert_movie(Movie {
            id: 296,
            title: "Pulp Fiction (1994)".to_string(),
            year: Some(1994),
            genres: vec![],
        });

        let hits = store.search_movies("toy story");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[1].id, 3114);
    }

    #[test]
    fn test_global_mean_rating() {
        let mut store = RatingStore::new();
        for (user, rating) in [(1, 4.0), (2, 3.0), (3, 5.0)] {
            store.insert_rating(Rating {
                user_id: user,
                movie_id: 1,
                rating,
                timestamp: 0,
            });
        }
        assert!((store.global_mean_rating() - 4.0).abs() < 1e-6);
    }
}
