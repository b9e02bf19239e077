use anyhow::Context;
use moodfinance_server::config::OcrConfig;
use moodfinance_server::{telemetry, AppConfig, AppState, SERVICE_NAME};
use moodfinance_vision::{EmotionBackend, OcrBackend, UnavailableEmotionDetector};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    telemetry::init_tracing(SERVICE_NAME, &config.log)?;
    info!("Starting {SERVICE_NAME} with config: {:?}", config);

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    // The pool lives for the whole process and is closed after the server stops.
    let db = moodfinance_storage::create_db(&config.database.path)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.path.display()))?;
    info!("Database ready: {}", config.database.path.display());

    let state = AppState::new(db.clone(), ocr_backend(&config.ocr), emotion_backend(), &config);
    let app = moodfinance_server::app(state, &config.server);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {addr}");
    let prefix = config.server.route_prefix();
    info!("  GET  {prefix}/health");
    info!("  POST {prefix}/image");
    info!("  POST {prefix}/receipt");
    info!("  POST {prefix}/store-analysis");
    info!("  GET  {prefix}/insight");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Database connection closed");
    Ok(())
}

#[cfg(feature = "tesseract")]
fn ocr_backend(config: &OcrConfig) -> Arc<dyn OcrBackend> {
    use moodfinance_vision::recognizer::tesseract_backend::TesseractRecognizer;
    info!("OCR: Tesseract ({}, psm {})", config.lang, config.page_seg_mode);
    Arc::new(TesseractRecognizer::new(
        config.tessdata_path.clone(),
        &config.lang,
        config.page_seg_mode,
    ))
}

#[cfg(not(feature = "tesseract"))]
fn ocr_backend(_config: &OcrConfig) -> Arc<dyn OcrBackend> {
    use moodfinance_vision::UnavailableRecognizer;
    warn!("OCR engine not compiled in; /receipt will answer 503 (build with `--features tesseract`)");
    Arc::new(UnavailableRecognizer)
}

fn emotion_backend() -> Box<dyn EmotionBackend> {
    warn!("No emotion model configured; images are stored with an error outcome");
    Box::new(UnavailableEmotionDetector)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
