//! Accuracy, ranking, and beyond-accuracy metrics.
//!
//! The evaluator inner-joins predictions with held-out actuals on
//! (user, movie): predictions without a matching actual are silently
//! dropped, and vice versa. That implicitly shrinks the effective sample,
//! so `sample_size` is exposed for anyone comparing runs.
//!
//! Coverage, diversity, and novelty deliberately run over the *full*
//! prediction set rather than the join; they describe what was
//! recommended, not how well it matched.

use data_loader::{MovieId, Rating, UserId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Rating threshold above which an item counts as relevant
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 3.5;

/// One predicted rating for a (user, movie) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictedRating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub predicted: f32,
}

/// A prediction joined with its held-out actual
#[derive(Debug, Clone, Copy)]
struct JoinedRow {
    user_id: UserId,
    movie_id: MovieId,
    predicted: f32,
    actual: f32,
}

/// The full named metric set from one evaluation run
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub k: usize,
    pub sample_size: usize,
    pub rmse: Option<f64>,
    pub mae: Option<f64>,
    pub precision_at_k: f64,
    pub recall_at_k: f64,
    pub f1_score: f64,
    pub coverage: Option<f64>,
    pub diversity: f64,
    pub novelty: Option<f64>,
}

/// Computes metrics comparing predictions to held-out actual ratings.
pub struct Evaluator {
    predictions: Vec<PredictedRating>,
    merged: Vec<JoinedRow>,
    k: usize,
}

impl Evaluator {
    /// Join predictions with actuals on (user, movie).
    ///
    /// Duplicate actuals for the same pair keep the last one seen.
    pub fn new(predictions: Vec<PredictedRating>, actuals: &[Rating], k: usize) -> Self {
        let actual_by_pair: HashMap<(UserId, MovieId), f32> = actuals
            .iter()
            .map(|r| ((r.user_id, r.movie_id), r.rating))
            .collect();

        let merged: Vec<JoinedRow> = predictions
            .iter()
            .filter_map(|p| {
                actual_by_pair
                    .get(&(p.user_id, p.movie_id))
                    .map(|&actual| JoinedRow {
                        user_id: p.user_id,
                        movie_id: p.movie_id,
                        predicted: p.predicted,
                        actual,
                    })
            })
            .collect();

        debug!(
            predictions = predictions.len(),
            actuals = actuals.len(),
            joined = merged.len(),
            "Evaluator join complete"
        );

        Self {
            predictions,
            merged,
            k,
        }
    }

    /// Rows surviving the inner join
    pub fn sample_size(&self) -> usize {
        self.merged.len()
    }

    /// Root mean squared error; None when the join is empty
    pub fn rmse(&self) -> Option<f64> {
        if self.merged.is_empty() {
            return None;
        }
        let mse = self
            .merged
            .iter()
            .map(|row| {
                let err = row.predicted as f64 - row.actual as f64;
                err * err
            })
            .sum::<f64>()
            / self.merged.len() as f64;
        Some(mse.sqrt())
    }

    /// Mean absolute error; None when the join is empty
    pub fn mae(&self) -> Option<f64> {
        if self.merged.is_empty() {
            return None;
        }
        let mae = self
            .merged
            .iter()
            .map(|row| (row.predicted as f64 - row.actual as f64).abs())
            .sum::<f64>()
            / self.merged.len() as f64;
        Some(mae)
    }

    /// Per-user joined rows, join order preserved within each user
    fn rows_by_user(&self) -> Vec<(UserId, Vec<&JoinedRow>)> {
        let mut order: Vec<UserId> = Vec::new();
        let mut groups: HashMap<UserId, Vec<&JoinedRow>> = HashMap::new();
        for row in &self.merged {
            if !groups.contains_key(&row.user_id) {
                order.push(row.user_id);
            }
            groups.entry(row.user_id).or_default().push(row);
        }
        order
            .into_iter()
            .map(|user_id| {
                let rows = groups.remove(&user_id).unwrap_or_default();
                (user_id, rows)
            })
            .collect()
    }

    /// The user's rows sorted by predicted rating descending (stable),
    /// truncated to k
    fn top_k<'a>(&self, rows: &[&'a JoinedRow]) -> Vec<&'a JoinedRow> {
        let mut sorted: Vec<&JoinedRow> = rows.to_vec();
        sorted.sort_by(|a, b| {
            b.predicted
                .partial_cmp(&a.predicted)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted.truncate(self.k);
        sorted
    }

    /// Precision@K: of each user's top-K predicted items, the fraction
    /// actually relevant, averaged across users.
    ///
    /// The divisor is the fixed K even for users with fewer than K joined
    /// rows, a conservative choice that penalizes sparse users.
    pub fn precision_at_k(&self, threshold: f32) -> f64 {
        if self.k == 0 {
            return 0.0;
        }
        let mut scores: Vec<f64> = Vec::new();
        for (_, rows) in self.rows_by_user() {
            let relevant = self
                .top_k(&rows)
                .iter()
                .filter(|row| row.actual >= threshold)
                .count();
            scores.push(relevant as f64 / self.k as f64);
        }
        mean(&scores)
    }

    /// Recall@K: of each user's relevant items, the fraction surfaced in
    /// the top-K, averaged across users.
    ///
    /// Users with zero relevant items are skipped entirely rather than
    /// contributing a zero.
    pub fn recall_at_k(&self, threshold: f32) -> f64 {
        let mut scores: Vec<f64> = Vec::new();
        for (_, rows) in self.rows_by_user() {
            let total_relevant = rows.iter().filter(|row| row.actual >= threshold).count();
            if total_relevant == 0 {
                continue;
            }
            let relevant_in_top_k = self
                .top_k(&rows)
                .iter()
                .filter(|row| row.actual >= threshold)
                .count();
            scores.push(relevant_in_top_k as f64 / total_relevant as f64);
        }
        mean(&scores)
    }

    /// Harmonic mean of precision and recall; 0 when both are 0
    pub fn f1_score(&self, threshold: f32) -> f64 {
        let precision = self.precision_at_k(threshold);
        let recall = self.recall_at_k(threshold);
        if precision + recall == 0.0 {
            return 0.0;
        }
        2.0 * precision * recall / (precision + recall)
    }

    /// Percentage of the catalog appearing anywhere in the prediction set
    pub fn coverage(&self, total_movies: usize) -> f64 {
        if total_movies == 0 {
            return 0.0;
        }
        let unique: HashSet<MovieId> = self.predictions.iter().map(|p| p.movie_id).collect();
        unique.len() as f64 / total_movies as f64 * 100.0
    }

    /// Average per-user ratio of distinct recommended movies to total
    /// recommended, skipping users with fewer than two rows.
    ///
    /// Captures within-list duplication only, not any notion of distance
    /// between the recommended items.
    pub fn diversity(&self) -> f64 {
        let mut per_user: HashMap<UserId, Vec<MovieId>> = HashMap::new();
        for p in &self.predictions {
            per_user.entry(p.user_id).or_default().push(p.movie_id);
        }

        let mut scores: Vec<f64> = Vec::new();
        for recs in per_user.values() {
            if recs.len() < 2 {
                continue;
            }
            let unique: HashSet<&MovieId> = recs.iter().collect();
            scores.push(unique.len() as f64 / recs.len() as f64);
        }
        mean(&scores)
    }

    /// Mean of `1 - popularity(movie)` over prediction rows with a
    /// popularity entry; 0 when nothing matches
    pub fn novelty(&self, popularity: &HashMap<MovieId, f32>) -> f64 {
        let scores: Vec<f64> = self
            .predictions
            .iter()
            .filter_map(|p| popularity.get(&p.movie_id))
            .map(|&pop| 1.0 - pop as f64)
            .collect();
        mean(&scores)
    }

    /// Compute the whole metric set in one pass.
    ///
    /// Coverage needs the catalog size and novelty needs a popularity
    /// map; either is skipped (None) when its input is absent.
    pub fn summary(
        &self,
        threshold: f32,
        total_movies: Option<usize>,
        popularity: Option<&HashMap<MovieId, f32>>,
    ) -> MetricsSummary {
        MetricsSummary {
            k: self.k,
            sample_size: self.sample_size(),
            rmse: self.rmse(),
            mae: self.mae(),
            precision_at_k: self.precision_at_k(threshold),
            recall_at_k: self.recall_at_k(threshold),
            f1_score: self.f1_score(threshold),
            coverage: total_movies.map(|total| self.coverage(total)),
            diversity: self.diversity(),
            novelty: popularity.map(|pop| self.novelty(pop)),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
