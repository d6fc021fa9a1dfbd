//! # Evaluation Crate
//!
//! Offline evaluation harness for the recommendation engines: accuracy
//! metrics (RMSE, MAE), ranking metrics (Precision@K, Recall@K, F1), and
//! beyond-accuracy metrics (Coverage, Diversity, Novelty), plus a seeded
//! holdout split and a text report renderer.
//!
//! ## Example Usage
//!
//! ```ignore
//! use evaluation::{holdout_split, Evaluator, PredictedRating};
//!
//! let (train, test) = holdout_split(store.ratings(), 0.2, 42);
//! let predictions: Vec<PredictedRating> = run_model(&train, &test);
//!
//! let evaluator = Evaluator::new(predictions, &test, 10);
//! let summary = evaluator.summary(3.5, Some(store.movie_count()), None);
//! println!("{}", evaluation::render_report("Hybrid System", &summary));
//! ```

pub mod metrics;
pub mod report;
pub mod split;

pub use metrics::{
    Evaluator, MetricsSummary, PredictedRating, DEFAULT_RELEVANCE_THRESHOLD,
};
pub use report::render_report;
pub use split::holdout_split;
