//! Parsers for the MovieLens CSV files.
//!
//! Two files make up the dataset:
//! - `ratings.csv`: userId,movieId,rating,timestamp
//! - `movies.csv`:  movieId,title,genres
//!
//! Titles may contain commas and are quoted in the source file
//! ("American President, The (1995)"), so parsing goes through a real CSV
//! reader rather than naive splitting.

use crate::error::{DataLoadError, Result};
use crate::types::{Movie, Rating};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

/// Raw `ratings.csv` record, field names as in the source header
#[derive(Debug, Deserialize)]
struct RatingRecord {
    #[serde(rename = "userId")]
    user_id: u32,
    #[serde(rename = "movieId")]
    movie_id: u32,
    rating: f32,
    timestamp: i64,
}

/// Raw `movies.csv` record
#[derive(Debug, Deserialize)]
struct MovieRecord {
    #[serde(rename = "movieId")]
    movie_id: u32,
    title: String,
    genres: String,
}

fn open_csv(path: &Path) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|_| DataLoadError::FileNotFound {
        path: path.display().to_string(),
    })?;
    Ok(csv::ReaderBuilder::new().has_headers(true).from_reader(file))
}

/// Parse `ratings.csv`
pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    let mut reader = open_csv(path)?;
    let mut ratings = Vec::new();

    for record in reader.deserialize::<RatingRecord>() {
        let record = record.map_err(|source| DataLoadError::CsvError {
            file: path.display().to_string(),
            source,
        })?;
        if !(0.5..=5.0).contains(&record.rating) {
            return Err(DataLoadError::InvalidValue {
                field: "rating".to_string(),
                value: record.rating.to_string(),
            });
        }
        ratings.push(Rating {
            user_id: record.user_id,
            movie_id: record.movie_id,
            rating: record.rating,
            timestamp: record.timestamp,
        });
    }

    Ok(ratings)
}

/// Parse `movies.csv`
pub fn parse_movies(path: &Path) -> Result<Vec<Movie>> {
    let mut reader = open_csv(path)?;
    let mut movies = Vec::new();

    for record in reader.deserialize::<MovieRecord>() {
        let record = record.map_err(|source| DataLoadError::CsvError {
            file: path.display().to_string(),
            source,
        })?;
        movies.push(Movie {
            id: record.movie_id,
            year: extract_year_from_title(&record.title),
            genres: split_genres(&record.genres),
            title: record.title,
        });
    }

    Ok(movies)
}

/// Extract year from a movie title
///
/// Example: "Toy Story (1995)" -> Some(1995)
///          "Movie Title" -> None
fn extract_year_from_title(title: &str) -> Option<u16> {
    let start = title.rfind('(')?;
    let end = title.rfind(')')?;
    if start < end {
        if let Ok(year) = title[start + 1..end].parse::<u16>() {
            return Some(year);
        }
    }
    None
}

/// Split the pipe-delimited genre field into individual tags.
///
/// An empty field yields no tags; `(no genres listed)` is kept verbatim as
/// a single tag, matching the source data.
pub fn split_genres(genres: &str) -> Vec<String> {
    if genres.is_empty() {
        return Vec::new();
    }
    genres.split('|').map(|g| g.to_string()).collect()
}
