use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use emotion_lens::{
    server::{router, AppState},
    Config, EmotionAnalyzer,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(&config.log_level)?;
    config.validate()?;

    let addr = config.bind_addr()?;
    std::fs::create_dir_all(&config.upload_dir).with_context(|| {
        format!(
            "Failed to create upload directory: {}",
            config.upload_dir.display()
        )
    })?;

    let analyzer = EmotionAnalyzer::with_onnx_model(&config);
    match analyzer.runtime().load() {
        Ok(_) => info!(path = %config.model_path.display(), "emotion detection model ready"),
        Err(e) => {
            warn!(error = %e, "could not load emotion detection model");
            warn!("serving fallback results until the model becomes available");
        }
    }

    let state = AppState::new(analyzer, config.validator(), config.upload_dir.clone());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
