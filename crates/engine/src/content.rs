//! Content similarity engine: TF-IDF over genre tags.
//!
//! Each movie's pipe-delimited genre string is normalized to space-delimited
//! tokens and encoded with TF-IDF over the whole catalog; the engine then
//! holds the full movie×movie cosine similarity matrix.
//!
//! The encoding follows the common vectorizer defaults: lowercase word
//! tokens of at least two characters, English stop-word removal, raw term
//! counts, smoothed idf `ln((1+n)/(1+df)) + 1`, L2-normalized rows.
//! Stop-word removal is meaningless for real genre tags; its one visible
//! effect is turning the placeholder tag `(no genres listed)` into the
//! tokens `genres listed`.

use crate::error::{EngineError, Result};
use crate::matrix::{pairwise_cosine, DenseMatrix};
use data_loader::{Movie, MovieId};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, instrument};

/// English stop words applied during tokenization.
///
/// Subset of the classic frozen English list shipped with text vectorizers;
/// covers every token that can plausibly appear in a genre field.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "cannot", "could", "did", "do", "does", "doing", "down", "during", "each",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it",
    "its", "itself", "me", "more", "most", "my", "myself", "no", "none", "nor", "not", "of",
    "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over",
    "own", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "with", "would", "you", "your",
    "yours", "yourself", "yourselves",
];

/// A single (movie, score) entry from a top-similar query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarMovie {
    pub movie_id: MovieId,
    pub score: f32,
}

/// Movie×movie similarity over TF-IDF genre vectors.
///
/// Built once from the catalog and read-only afterwards.
#[derive(Debug)]
pub struct ContentEngine {
    /// Catalog row order; queries break score ties by this order
    movie_ids: Vec<MovieId>,
    index_of: HashMap<MovieId, usize>,
    similarity: DenseMatrix,
}

impl ContentEngine {
    /// Build the similarity matrix from the movie catalog.
    ///
    /// Row order follows the input slice; callers should pass the catalog
    /// in a stable order (ascending id) so tie-breaks are reproducible.
    #[instrument(skip(movies), fields(movies = movies.len()))]
    pub fn build(movies: &[Movie]) -> Self {
        let movie_ids: Vec<MovieId> = movies.iter().map(|m| m.id).collect();
        let index_of: HashMap<MovieId, usize> = movie_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();

        let documents: Vec<Vec<String>> = movies
            .iter()
            .map(|m| tokenize(&m.genre_text()))
            .collect();
        let tfidf = encode_tfidf(&documents);
        let similarity = pairwise_cosine(&tfidf);

        debug!(
            movies = movie_ids.len(),
            terms = tfidf.cols(),
            "Content similarity matrix built"
        );

        Self {
            movie_ids,
            index_of,
            similarity,
        }
    }

    /// Whether the movie is part of the similarity matrix
    pub fn contains(&self, movie_id: MovieId) -> bool {
        self.index_of.contains_key(&movie_id)
    }

    /// Similarity between two movies, if both are known
    pub fn similarity(&self, a: MovieId, b: MovieId) -> Option<f32> {
        let i = *self.index_of.get(&a)?;
        let j = *self.index_of.get(&b)?;
        Some(self.similarity.get(i, j))
    }

    /// All movie ids in catalog row order
    pub fn movie_ids(&self) -> &[MovieId] {
        &self.movie_ids
    }

    /// The `n` movies most similar to `movie_id`, excluding the movie
    /// itself, sorted by score descending. Ties keep catalog row order
    /// (stable sort). Returns at most `available - 1` entries.
    #[instrument(skip(self))]
    pub fn top_similar(&self, movie_id: MovieId, n: usize) -> Result<Vec<SimilarMovie>> {
        let row_idx = *self
            .index_of
            .get(&movie_id)
            .ok_or(EngineError::UnknownMovie(movie_id))?;

        let row = self.similarity.row(row_idx);
        let mut scored: Vec<SimilarMovie> = row
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != row_idx)
            .map(|(i, &score)| SimilarMovie {
                movie_id: self.movie_ids[i],
                score,
            })
            .collect();

        // Stable sort keeps row order on equal scores
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n);
        Ok(scored)
    }
}

/// Lowercase word tokens of at least two characters, stop words removed.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.chars().count() >= 2)
        .filter(|t| !ENGLISH_STOP_WORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}

/// TF-IDF encode the token documents: raw counts × smoothed idf, rows
/// L2-normalized.
fn encode_tfidf(documents: &[Vec<String>]) -> DenseMatrix {
    // Vocabulary with columns in sorted term order
    let terms: BTreeSet<&str> = documents
        .iter()
        .flat_map(|doc| doc.iter().map(String::as_str))
        .collect();
    let vocabulary: HashMap<&str, usize> = terms
        .into_iter()
        .enumerate()
        .map(|(i, term)| (term, i))
        .collect();

    let n_docs = documents.len();
    let n_terms = vocabulary.len();

    // Document frequency per term
    let mut doc_freq = vec![0usize; n_terms];
    for doc in documents {
        let mut seen = vec![false; n_terms];
        for term in doc {
            let idx = vocabulary[term.as_str()];
            if !seen[idx] {
                seen[idx] = true;
                doc_freq[idx] += 1;
            }
        }
    }

    // Smoothed idf: ln((1 + n) / (1 + df)) + 1
    let idf: Vec<f64> = doc_freq
        .iter()
        .map(|&df| ((1 + n_docs) as f64 / (1 + df) as f64).ln() + 1.0)
        .collect();

    let mut matrix = DenseMatrix::zeros(n_docs, n_terms);
    for (row, doc) in documents.iter().enumerate() {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for term in doc {
            *counts.entry(vocabulary[term.as_str()]).or_insert(0) += 1;
        }

        let mut weights: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, count)| (idx, count as f64 * idf[idx]))
            .collect();

        // L2 normalization
        let norm: f64 = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in weights.iter_mut() {
                *w /= norm;
            }
        }
        for (idx, w) in weights {
            matrix.set(row, idx, w as f32);
        }
    }

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: MovieId, genres: &[&str]) -> Movie {
        Movie {
            id,
            title: format!("Movie {id}"),
            year: Some(2000),
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn fixture() -> Vec<Movie> {
        vec![
            movie(10, &["Action", "Adventure"]),
            movie(20, &["Action", "Adventure"]),
            movie(30, &["Romance"]),
            movie(40, &["Action", "Romance"]),
        ]
    }

    #[test]
    fn test_tokenize_splits_and_lowercases() {
        assert_eq!(tokenize("Action Sci-Fi"), vec!["action", "sci", "fi"]);
        assert_eq!(tokenize("Film-Noir"), vec!["film", "noir"]);
    }

    #[test]
    fn test_tokenize_strips_stop_words() {
        // "(no genres listed)" loses the stop word "no"
        assert_eq!(tokenize("(no genres listed)"), vec!["genres", "listed"]);
    }

    #[test]
    fn test_identical_genres_have_unit_similarity() {
        let engine = ContentEngine::build(&fixture());
        let sim = engine.similarity(10, 20).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_self_similarity_is_one() {
        let engine = ContentEngine::build(&fixture());
        assert!((engine.similarity(10, 10).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_disjoint_genres_have_zero_similarity() {
        let engine = ContentEngine::build(&fixture());
        assert_eq!(engine.similarity(10, 30).unwrap(), 0.0);
    }

    #[test]
    fn test_symmetry() {
        let engine = ContentEngine::build(&fixture());
        for &a in engine.movie_ids() {
            for &b in engine.movie_ids() {
                let forward = engine.similarity(a, b).unwrap() as f64;
                let backward = engine.similarity(b, a).unwrap() as f64;
                assert!((forward - backward).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_similarities_bounded() {
        let engine = ContentEngine::build(&fixture());
        for &a in engine.movie_ids() {
            for &b in engine.movie_ids() {
                let sim = engine.similarity(a, b).unwrap();
                assert!((0.0..=1.0 + 1e-6).contains(&sim));
            }
        }
    }

    #[test]
    fn test_top_similar_excludes_self_and_sorts() {
        let engine = ContentEngine::build(&fixture());
        let similar = engine.top_similar(10, 3).unwrap();

        assert_eq!(similar.len(), 3);
        assert!(similar.iter().all(|s| s.movie_id != 10));
        // 20 shares both genres, 40 shares one, 30 shares none
        assert_eq!(similar[0].movie_id, 20);
        assert_eq!(similar[2].movie_id, 30);
        assert!(similar[0].score >= similar[1].score);
        assert!(similar[1].score >= similar[2].score);
    }

    #[test]
    fn test_top_similar_ties_keep_row_order() {
        let movies = vec![
            movie(1, &["Drama"]),
            movie(2, &["Drama"]),
            movie(3, &["Drama"]),
        ];
        let engine = ContentEngine::build(&movies);
        let similar = engine.top_similar(1, 5).unwrap();

        // Both neighbors tie at 1.0; row order decides
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].movie_id, 2);
        assert_eq!(similar[1].movie_id, 3);
    }

    #[test]
    fn test_top_similar_unknown_movie() {
        let engine = ContentEngine::build(&fixture());
        assert_eq!(
            engine.top_similar(999, 5),
            Err(EngineError::UnknownMovie(999))
        );
    }

    #[test]
    fn test_top_similar_truncates_to_available() {
        let engine = ContentEngine::build(&fixture());
        let similar = engine.top_similar(10, 50).unwrap();
        assert_eq!(similar.len(), 3);
    }
}
