//! HTTP entry point: load the dataset, fit the engines once, serve queries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use data_loader::RatingStore;
use server::{create_router, AppState};

/// Movie recommendation analytics service
#[derive(Parser)]
#[command(name = "cinerec-server")]
#[command(about = "HTTP query service for the movie recommendation engines", long_about = None)]
struct Args {
    /// Path to the MovieLens dataset directory
    #[arg(short, long, default_value = "data/ml-latest-small")]
    data_dir: PathBuf,

    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:5000")]
    listen: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Loading dataset from {}", args.data_dir.display());
    let start = Instant::now();
    let store = Arc::new(
        RatingStore::load_from_files(&args.data_dir)
            .context("Failed to load MovieLens dataset")?,
    );
    let (users, movies, ratings) = store.counts();
    info!(users, movies, ratings, "Dataset loaded in {:?}", start.elapsed());

    info!("Fitting similarity engines (this builds both O(n^2) matrices)");
    let start = Instant::now();
    let state = AppState::new(store);
    info!("Engines ready in {:?}", start.elapsed());

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!("Listening on http://{}", args.listen);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
