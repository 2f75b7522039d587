mod config;
mod decoder;
mod detector;
mod error;
mod pipeline;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{CascadePaths, DetectionParams};
use crate::detector::SmileDetector;
use crate::pipeline::PipelineOptions;
use crate::server::AppState;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(long, default_value_t = 8000)]
    port: u16,
    /// Classify every Nth decoded frame
    #[arg(long, default_value_t = config::DEFAULT_FRAME_STRIDE)]
    frame_stride: usize,
    /// Smile hits required for a frame to count as happy
    #[arg(long, default_value_t = config::DEFAULT_MIN_HAPPY_FACES)]
    min_happy_faces: usize,
    /// Override for the frontal-face cascade file
    #[arg(long)]
    face_cascade: Option<PathBuf>,
    /// Override for the smile cascade file
    #[arg(long)]
    smile_cascade: Option<PathBuf>,
    #[arg(long, default_value_t = config::DEFAULT_MAX_UPLOAD_MB)]
    max_upload_mb: usize,
    /// Drop happy frames near-identical to the previously kept one
    #[arg(long, default_value_t = false)]
    dedup_similar: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("happy_frames=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    let cascades = CascadePaths::resolve(cli.face_cascade, cli.smile_cascade)
        .context("resolving haarcascade model files")?;
    let params = DetectionParams {
        min_happy_faces: cli.min_happy_faces,
        ..DetectionParams::default()
    };

    let workers = num_cpus::get();
    let detector =
        SmileDetector::new(&cascades, params, workers).context("loading cascade classifiers")?;
    info!(
        workers,
        face = %cascades.face.display(),
        smile = %cascades.smile.display(),
        "cascade classifiers loaded"
    );

    let state = Arc::new(AppState {
        detector,
        options: PipelineOptions {
            frame_stride: cli.frame_stride,
            dedup_similar: cli.dedup_similar,
        },
    });

    let router = server::build_router(state, cli.max_upload_mb * 1024 * 1024);
    server::serve(router, &cli.host, cli.port).await
}
