//! Collaborative similarity engine: user×user cosine over the rating matrix.
//!
//! Ratings pivot into a dense user×movie matrix with 0.0 for "unrated";
//! user similarity is plain cosine over the full rows, zero-filled cells
//! included. That deflates similarity for sparse users, and it is the
//! behavior the rest of the pipeline is calibrated against, so it stays.
//!
//! Invariant: 0.0 can double as "unrated" only because real ratings start
//! at 0.5.

use crate::error::{EngineError, Result};
use crate::matrix::{pairwise_cosine, DenseMatrix};
use data_loader::{MovieId, Rating, UserId};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, instrument};

/// A single (user, similarity) entry from a top-similar-users query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarUser {
    pub user_id: UserId,
    pub similarity: f32,
}

/// User×user similarity plus the user-item matrix it was computed from.
///
/// Built once from the training ratings and read-only afterwards.
#[derive(Debug)]
pub struct CollaborativeEngine {
    /// Distinct user ids, ascending (pivot row order)
    user_ids: Vec<UserId>,
    /// Distinct movie ids, ascending (pivot column order)
    movie_ids: Vec<MovieId>,
    user_index: HashMap<UserId, usize>,
    movie_index: HashMap<MovieId, usize>,
    /// user×movie rating matrix, 0.0 = unrated
    matrix: DenseMatrix,
    /// user×user cosine similarity
    similarity: DenseMatrix,
    /// Mean over every matrix cell, zeros included (last-resort fallback)
    matrix_mean: f32,
}

impl CollaborativeEngine {
    /// Pivot the ratings and compute the user-user similarity matrix.
    #[instrument(skip(ratings), fields(ratings = ratings.len()))]
    pub fn build(ratings: &[Rating]) -> Self {
        let user_set: BTreeSet<UserId> = ratings.iter().map(|r| r.user_id).collect();
        let movie_set: BTreeSet<MovieId> = ratings.iter().map(|r| r.movie_id).collect();

        let user_ids: Vec<UserId> = user_set.into_iter().collect();
        let movie_ids: Vec<MovieId> = movie_set.into_iter().collect();
        let user_index: HashMap<UserId, usize> =
            user_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let movie_index: HashMap<MovieId, usize> =
            movie_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut matrix = DenseMatrix::zeros(user_ids.len(), movie_ids.len());
        for rating in ratings {
            matrix.set(
                user_index[&rating.user_id],
                movie_index[&rating.movie_id],
                rating.rating,
            );
        }

        let similarity = pairwise_cosine(&matrix);
        let matrix_mean = matrix.mean();

        debug!(
            users = user_ids.len(),
            movies = movie_ids.len(),
            matrix_mean,
            "User similarity matrix built"
        );

        Self {
            user_ids,
            movie_ids,
            user_index,
            movie_index,
            matrix,
            similarity,
            matrix_mean,
        }
    }

    /// Whether the user appears in the matrix
    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.user_index.contains_key(&user_id)
    }

    /// Whether the movie appears in the matrix
    pub fn contains_movie(&self, movie_id: MovieId) -> bool {
        self.movie_index.contains_key(&movie_id)
    }

    /// Distinct user ids in row order
    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    /// Distinct movie ids in column order
    pub fn movie_ids(&self) -> &[MovieId] {
        &self.movie_ids
    }

    /// Mean over every cell of the user-item matrix, zeros included.
    ///
    /// Heavily diluted by sparsity; kept as the documented last-resort
    /// prediction fallback.
    pub fn matrix_mean(&self) -> f32 {
        self.matrix_mean
    }

    /// Mean rating of a movie across the users who actually rated it
    pub fn movie_mean(&self, movie_id: MovieId) -> Option<f32> {
        let col = *self.movie_index.get(&movie_id)?;
        let mut total = 0.0f64;
        let mut count = 0u32;
        for row in 0..self.matrix.rows() {
            let value = self.matrix.get(row, col);
            if value > 0.0 {
                total += value as f64;
                count += 1;
            }
        }
        if count == 0 {
            // Unreachable for matrices built from ratings, but a movie
            // column with no raters has no meaningful mean
            return Some(0.0);
        }
        Some((total / count as f64) as f32)
    }

    /// The training rating a user gave a movie; None when either id is
    /// unknown, 0.0 when known but unrated
    pub fn rating(&self, user_id: UserId, movie_id: MovieId) -> Option<f32> {
        let row = *self.user_index.get(&user_id)?;
        let col = *self.movie_index.get(&movie_id)?;
        Some(self.matrix.get(row, col))
    }

    /// Similarity between two users, if both are known
    pub fn similarity(&self, a: UserId, b: UserId) -> Option<f32> {
        let i = *self.user_index.get(&a)?;
        let j = *self.user_index.get(&b)?;
        Some(self.similarity.get(i, j))
    }

    /// The `k` users most similar to `user_id`, excluding the user
    /// themselves, sorted by similarity descending with stable ties.
    #[instrument(skip(self))]
    pub fn top_similar_users(&self, user_id: UserId, k: usize) -> Result<Vec<SimilarUser>> {
        let row_idx = *self
            .user_index
            .get(&user_id)
            .ok_or(EngineError::UnknownUser(user_id))?;

        let row = self.similarity.row(row_idx);
        let mut scored: Vec<SimilarUser> = row
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != row_idx)
            .map(|(i, &similarity)| SimilarUser {
                user_id: self.user_ids[i],
                similarity,
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }
}
