//! Shared application state.
//!
//! Everything here is built once at startup and read-only afterwards, so
//! the handlers share it through plain `Arc`s: no locks, unlimited read
//! concurrency.

use data_loader::RatingStore;
use engine::{Recommender, TemporalAnalyzer};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RatingStore>,
    pub recommender: Arc<Recommender>,
    pub temporal: Arc<TemporalAnalyzer>,
}

impl AppState {
    /// Fit the engines over the full loaded dataset.
    pub fn new(store: Arc<RatingStore>) -> Self {
        // Stable catalog order so similarity tie-breaks are reproducible
        let mut movies: Vec<_> = store.movies().cloned().collect();
        movies.sort_by_key(|m| m.id);

        let recommender = Arc::new(Recommender::fit(store.ratings(), &movies));
        let temporal = Arc::new(TemporalAnalyzer::new(store.ratings()));

        Self {
            store,
            recommender,
            temporal,
        }
    }
}
