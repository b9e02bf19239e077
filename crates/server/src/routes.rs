use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use chrono::{DateTime, Utc};
use moodfinance_core::{analyze_patterns, AnalysisEntry, EmotionOutcome};
use moodfinance_vision::ReceiptAnalysis;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub id: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub uploaded_at: DateTime<Utc>,
    pub emotions: EmotionOutcome,
}

#[derive(Debug, Serialize)]
pub struct InsightResponse {
    pub count: usize,
    pub insights: Vec<String>,
}

struct Upload {
    filename: String,
    data: Bytes,
}

/// Pull the first `file` field out of a multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        return Ok(Upload { filename, data });
    }
    Err(ApiError::BadRequest(format!("missing multipart field '{FILE_FIELD}'")))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "service": state.service_name }))
}

/// `POST /image` — emotion analysis of a face photo, stored.
#[instrument(skip_all)]
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImageResponse>, ApiError> {
    let upload = read_upload(multipart).await?;
    let analyzer = state.images.clone();
    let filename = upload.filename;
    let data = upload.data;

    let analysis = tokio::task::spawn_blocking(move || analyzer.analyze(&filename, &data)).await??;
    let id = moodfinance_storage::insert_image(&state.db, &analysis.meta, &analysis.emotions).await?;

    info!(
        id = %id,
        width = analysis.meta.width,
        height = analysis.meta.height,
        dominant = analysis.emotions.dominant().unwrap_or("-"),
        "image stored"
    );

    let meta = analysis.meta;
    Ok(Json(ImageResponse {
        id,
        filename: meta.filename,
        width: meta.width,
        height: meta.height,
        uploaded_at: meta.uploaded_at,
        emotions: analysis.emotions,
    }))
}

/// `POST /receipt` — OCR + line parsing. Nothing is stored.
#[instrument(skip_all)]
pub async fn upload_receipt(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ReceiptAnalysis>, ApiError> {
    let upload = read_upload(multipart).await?;
    let pipeline = state.receipts.clone();
    let data = upload.data;

    let analysis = tokio::task::spawn_blocking(move || pipeline.process_bytes(&data)).await??;

    info!(
        items = analysis.parsed_data.items.len(),
        prices = analysis.parsed_data.prices.len(),
        total = ?analysis.parsed_data.total,
        "receipt parsed"
    );
    Ok(Json(analysis))
}

/// `POST /store-analysis`
#[instrument(skip_all, fields(emotion = %entry.emotion))]
pub async fn store_analysis(
    State(state): State<AppState>,
    Json(entry): Json<AnalysisEntry>,
) -> Result<Json<Value>, ApiError> {
    let id = moodfinance_storage::insert_analysis(&state.db, &entry)
        .await
        .map_err(ApiError::StoreFailed)?;
    info!(id = %id, "analysis stored");
    Ok(Json(json!({ "message": "저장 성공", "id": id })))
}

/// `GET /insight`
#[instrument(skip_all)]
pub async fn insight(State(state): State<AppState>) -> Result<Json<InsightResponse>, ApiError> {
    let entries = moodfinance_storage::get_all_analyses(&state.db).await?;
    let insights = analyze_patterns(&entries, state.insight_threshold);
    Ok(Json(InsightResponse { count: entries.len(), insights }))
}
