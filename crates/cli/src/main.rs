//! cinerec - movie recommendation analytics CLI.
//!
//! Loads the dataset once, then dispatches to the requested query or
//! offline job: catalog search, similarity lookups, point predictions,
//! hybrid recommendation lists, temporal reports, the evaluation harness,
//! and the TMDB enrichment batch.

mod enrich;
mod evaluate;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use data_loader::{MovieId, RatingStore, UserId};
use engine::{
    Recommender, TemporalAnalyzer, DEFAULT_COLLABORATIVE_K, DEFAULT_CONTENT_K,
    DEFAULT_DECAY_FACTOR, DEFAULT_NEIGHBOR_K, DEFAULT_RECENT_K,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

/// cinerec - Movie Recommendation Analytics
#[derive(Parser)]
#[command(name = "cinerec")]
#[command(about = "Movie recommendation analytics: similarity, prediction, evaluation", long_about = None)]
struct Cli {
    /// Path to the MovieLens dataset directory
    #[arg(short, long, default_value = "data/ml-latest-small")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PredictMethod {
    Collaborative,
    Content,
    Hybrid,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for movies by title
    Search {
        /// Title substring to search for (case-insensitive)
        #[arg(long)]
        title: String,
    },

    /// Show the movies most similar to a movie (genre similarity)
    Similar {
        #[arg(long)]
        movie_id: MovieId,

        /// Number of similar movies to return
        #[arg(long, default_value = "10")]
        n: usize,
    },

    /// Show the users most similar to a user (rating similarity)
    Neighbors {
        #[arg(long)]
        user_id: UserId,

        /// Number of neighbors to return
        #[arg(long, default_value = "5")]
        k: usize,
    },

    /// Predict the rating a user would give a movie
    Predict {
        #[arg(long)]
        user_id: UserId,

        #[arg(long)]
        movie_id: MovieId,

        #[arg(long, value_enum, default_value = "hybrid")]
        method: PredictMethod,

        /// Neighborhood size (defaults per method)
        #[arg(long)]
        k: Option<usize>,

        /// Collaborative weight for the hybrid blend
        #[arg(long, default_value = "0.5")]
        collab_weight: f32,

        /// Content weight for the hybrid blend
        #[arg(long, default_value = "0.5")]
        content_weight: f32,
    },

    /// Generate a hybrid top-N recommendation list for a user
    Recommend {
        #[arg(long)]
        user_id: UserId,

        /// Number of recommendations to return
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Content-side weight in [0, 1]; collaborative gets the rest
        #[arg(long, default_value = "0.5")]
        cb_weight: f32,
    },

    /// Print dataset overview statistics
    Stats,

    /// Temporal analysis: trends, seasonal patterns, trending movies
    Temporal {
        /// Number of trending movies to show
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Also write the full text report to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run the offline evaluation harness over a holdout split
    Evaluate {
        /// Fraction of ratings held out as the test set
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,

        /// RNG seed for the split
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Cap on scored test rows per method
        #[arg(long, default_value = "1000")]
        sample: usize,

        /// K for Precision@K / Recall@K
        #[arg(long, default_value = "10")]
        k: usize,

        /// Directory for the per-method report files
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Attach TMDB metadata (posters, overviews) to the movie catalog
    Enrich {
        /// Output file for the enriched catalog
        #[arg(long, default_value = "enriched_movies.json")]
        output: PathBuf,

        /// Delay between API requests in milliseconds
        #[arg(long, default_value = "250")]
        throttle_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    println!("Loading dataset from {}...", cli.data_dir.display());
    let start = Instant::now();
    let store = RatingStore::load_from_files(&cli.data_dir)
        .context("Failed to load MovieLens dataset")?;
    println!("{} Loaded dataset in {:?}", "OK".green(), start.elapsed());

    match cli.command {
        Commands::Search { title } => handle_search(&store, &title),
        Commands::Similar { movie_id, n } => handle_similar(&store, movie_id, n),
        Commands::Neighbors { user_id, k } => handle_neighbors(&store, user_id, k),
        Commands::Predict {
            user_id,
            movie_id,
            method,
            k,
            collab_weight,
            content_weight,
        } => handle_predict(&store, user_id, movie_id, method, k, collab_weight, content_weight),
        Commands::Recommend {
            user_id,
            limit,
            cb_weight,
        } => handle_recommend(&store, user_id, limit, cb_weight),
        Commands::Stats => handle_stats(&store),
        Commands::Temporal { limit, output } => handle_temporal(&store, limit, output),
        Commands::Evaluate {
            test_fraction,
            seed,
            sample,
            k,
            output_dir,
        } => evaluate::run(
            &store,
            &evaluate::EvaluateOptions {
                test_fraction,
                seed,
                sample,
                k,
                output_dir,
            },
        ),
        Commands::Enrich { output, throttle_ms } => {
            let api_key = std::env::var("TMDB_API_KEY")
                .context("TMDB_API_KEY environment variable not set")?;
            enrich::run(&store, &api_key, &output, throttle_ms).await
        }
    }
}

/// Fit both engines over the full dataset (most query commands need this)
fn fit_recommender(store: &RatingStore) -> Recommender {
    let mut movies: Vec<_> = store.movies().cloned().collect();
    movies.sort_by_key(|m| m.id);

    println!("Fitting similarity engines...");
    let start = Instant::now();
    let recommender = Recommender::fit(store.ratings(), &movies);
    println!("{} Engines ready in {:?}", "OK".green(), start.elapsed());
    recommender
}

fn movie_title(store: &RatingStore, movie_id: MovieId) -> String {
    store
        .get_movie(movie_id)
        .map(|m| m.title.clone())
        .unwrap_or_else(|| format!("<movie {movie_id}>"))
}

fn handle_search(store: &RatingStore, title: &str) -> Result<()> {
    let hits = store.search_movies(title);
    if hits.is_empty() {
        println!("No movies matching {title:?}");
        return Ok(());
    }

    println!("\n{} movies matching {title:?}:", hits.len());
    for movie in hits {
        let stats = store.get_movie_stats(movie.id);
        println!(
            "  {:>6}  {}  [{}]  {}",
            movie.id,
            movie.title.bold(),
            movie.genres.join(", "),
            stats
                .map(|s| format!("{:.2} avg over {} ratings", s.avg_rating, s.rating_count))
                .unwrap_or_else(|| "unrated".to_string())
                .dimmed(),
        );
    }
    Ok(())
}

fn handle_similar(store: &RatingStore, movie_id: MovieId, n: usize) -> Result<()> {
    let recommender = fit_recommender(store);
    let similar = recommender.content().top_similar(movie_id, n)?;

    println!(
        "\nMovies similar to {}:",
        movie_title(store, movie_id).bold()
    );
    for (rank, entry) in similar.iter().enumerate() {
        println!(
            "{:>3}. {} (similarity: {:.3})",
            rank + 1,
            movie_title(store, entry.movie_id),
            entry.score
        );
    }
    Ok(())
}

fn handle_neighbors(store: &RatingStore, user_id: UserId, k: usize) -> Result<()> {
    let recommender = fit_recommender(store);
    let neighbors = recommender.collaborative().top_similar_users(user_id, k)?;

    println!("\nUsers most similar to user {user_id}:");
    for (rank, neighbor) in neighbors.iter().enumerate() {
        println!(
            "{:>3}. user {:<6} (similarity: {:.3})",
            rank + 1,
            neighbor.user_id,
            neighbor.similarity
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_predict(
    store: &RatingStore,
    user_id: UserId,
    movie_id: MovieId,
    method: PredictMethod,
    k: Option<usize>,
    collab_weight: f32,
    content_weight: f32,
) -> Result<()> {
    let recommender = fit_recommender(store);
    let title = movie_title(store, movie_id);

    match method {
        PredictMethod::Collaborative => {
            let prediction = recommender.predict_collaborative(
                user_id,
                movie_id,
                k.unwrap_or(DEFAULT_COLLABORATIVE_K),
            );
            println!(
                "\nCollaborative prediction for user {user_id} on {title}: {} ({:?})",
                format!("{:.2}", prediction.value).bold(),
                prediction.source
            );
        }
        PredictMethod::Content => {
            let prediction =
                recommender.predict_content(user_id, movie_id, k.unwrap_or(DEFAULT_CONTENT_K));
            println!(
                "\nContent-based prediction for user {user_id} on {title}: {} ({:?})",
                format!("{:.2}", prediction.value).bold(),
                prediction.source
            );
        }
        PredictMethod::Hybrid => {
            let hybrid =
                recommender.predict_hybrid(user_id, movie_id, collab_weight, content_weight);
            println!(
                "\nHybrid prediction for user {user_id} on {title}: {}",
                format!("{:.2}", hybrid.value).bold()
            );
            println!(
                "  collaborative: {:.2} ({:?}), content: {:.2} ({:?})",
                hybrid.collaborative.value,
                hybrid.collaborative.source,
                hybrid.content.value,
                hybrid.content.source
            );
        }
    }
    Ok(())
}

fn handle_recommend(
    store: &RatingStore,
    user_id: UserId,
    limit: usize,
    cb_weight: f32,
) -> Result<()> {
    if !(0.0..=1.0).contains(&cb_weight) {
        return Err(anyhow!("cb_weight must be in [0, 1], got {cb_weight}"));
    }

    let recommender = fit_recommender(store);
    let ranked = recommender.recommend(
        user_id,
        limit,
        cb_weight,
        DEFAULT_RECENT_K,
        DEFAULT_NEIGHBOR_K,
    )?;

    println!(
        "\nTop {} recommendations for user {user_id} (cb_weight={cb_weight}):",
        ranked.len()
    );
    for (rank, rec) in ranked.iter().enumerate() {
        println!(
            "{:>3}. {} - score {:.3} (content {:.3}, collaborative {:.3})",
            rank + 1,
            movie_title(store, rec.movie_id).bold(),
            rec.score,
            rec.content_score,
            rec.collaborative_score
        );
    }
    Ok(())
}

fn handle_stats(store: &RatingStore) -> Result<()> {
    let (users, movies, ratings) = store.counts();

    println!("\n{}", "DATASET OVERVIEW".bold());
    println!("Movies:  {movies}");
    println!("Users:   {users}");
    println!("Ratings: {ratings}");

    // Rating value distribution in half-star steps
    let mut distribution: BTreeMap<u32, usize> = BTreeMap::new();
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for rating in store.ratings() {
        *distribution.entry((rating.rating * 2.0) as u32).or_insert(0) += 1;
        min = min.min(rating.rating);
        max = max.max(rating.rating);
    }
    println!("\nRating distribution:");
    for (half_stars, count) in &distribution {
        println!("  {:>4.1}: {}", *half_stars as f32 / 2.0, count);
    }
    if ratings > 0 {
        println!("Average rating: {:.2}", store.global_mean_rating());
        println!("Min rating: {min}, max rating: {max}");
    }

    // Matrix shape and sparsity
    let rated_movies = store
        .ratings()
        .iter()
        .map(|r| r.movie_id)
        .collect::<std::collections::HashSet<_>>()
        .len();
    let possible = users * rated_movies;
    println!("\nUser-item matrix: {users} x {rated_movies}");
    if possible > 0 {
        println!(
            "Sparsity: {:.2}%",
            100.0 * (1.0 - ratings as f64 / possible as f64)
        );
    }

    // Most rated movies
    let mut most_rated: Vec<_> = store
        .movies()
        .filter_map(|m| store.get_movie_stats(m.id).map(|s| (m, s.rating_count)))
        .collect();
    most_rated.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.id.cmp(&b.0.id)));

    println!("\nTop 10 most rated movies:");
    for (movie, count) in most_rated.iter().take(10) {
        println!("  {}: {} ratings", movie.title, count);
    }
    Ok(())
}

fn handle_temporal(store: &RatingStore, limit: usize, output: Option<PathBuf>) -> Result<()> {
    let analyzer = TemporalAnalyzer::new(store.ratings());

    let trends = analyzer.rating_trends();
    println!("\n{}", "YEARLY RATING TRENDS".bold());
    println!("year    mean    count");
    for stats in &trends.yearly {
        println!("{:<7} {:<7.3} {}", stats.period, stats.mean, stats.count);
    }

    let seasonal = analyzer.seasonal_patterns();
    if let Some(peak) = seasonal.peak_hour {
        println!("\nPeak activity hour: {peak}:00");
    }

    let popularity = analyzer.popularity_trends(limit);
    println!("\n{}", "TRENDING MOVIES (LAST YEAR)".bold());
    for trending in &popularity.recent_popular {
        println!(
            "  {} - {} ratings, {:.2} avg",
            movie_title(store, trending.movie_id),
            trending.rating_count,
            trending.avg_rating
        );
    }

    println!("\n{}", "RISING STARS".bold());
    for star in &popularity.rising_stars {
        println!(
            "  {} - {:.2} -> {:.2} ({:+.2})",
            movie_title(store, star.movie_id),
            star.old_avg_rating,
            star.avg_rating,
            star.rating_change
        );
    }

    // Example decay weighting for context: the first user in the dataset
    if let Some(first_user) = store.ratings().first().map(|r| r.user_id) {
        if let Ok(weights) = analyzer.user_time_weights(first_user, DEFAULT_DECAY_FACTOR) {
            println!(
                "\nUser {} time-weighted avg: {:.2} (plain {:.2}, adjustment {:+.2})",
                weights.user_id,
                weights.time_weighted_avg,
                weights.traditional_avg,
                weights.adjustment
            );
        }
    }

    if let Some(path) = output {
        std::fs::write(&path, analyzer.render_report())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("\nReport saved to {}", path.display().to_string().green());
    }
    Ok(())
}
