use chrono::{DateTime, Utc};
use moodfinance_core::{AnalysisEntry, EmotionOutcome, ImageMeta};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub type DbPool = Pool<Sqlite>;

const MAX_CONNECTIONS: u32 = 4;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Failed to encode record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Corrupt row {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// An image record as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub id: String,
    pub meta: ImageMeta,
    pub emotions: EmotionOutcome,
}

/// Open (creating if needed) the database at `path` and run migrations.
pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS images (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            width INTEGER NOT NULL,
            height INTEGER NOT NULL,
            sha256 TEXT NOT NULL,
            emotions TEXT NOT NULL,
            uploaded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_images_sha256 ON images (sha256)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            emotion TEXT NOT NULL,
            category TEXT NOT NULL,
            amount TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

// ── Images ────────────────────────────────────────────────────────────────────

pub async fn insert_image(
    pool: &DbPool,
    meta: &ImageMeta,
    emotions: &EmotionOutcome,
) -> Result<String, StorageError> {
    let id = Uuid::new_v4().to_string();
    let emotions_json = serde_json::to_string(emotions)?;

    sqlx::query(
        "INSERT INTO images (id, filename, width, height, sha256, emotions, uploaded_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&id)
    .bind(&meta.filename)
    .bind(i64::from(meta.width))
    .bind(i64::from(meta.height))
    .bind(&meta.sha256)
    .bind(emotions_json)
    .bind(meta.uploaded_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn get_image(pool: &DbPool, id: &str) -> Result<Option<StoredImage>, StorageError> {
    let row = sqlx::query_as::<_, (String, String, i64, i64, String, String, String)>(
        "SELECT id, filename, width, height, sha256, emotions, uploaded_at FROM images WHERE id = ?"
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some((id, filename, width, height, sha256, emotions, uploaded_at)) = row else {
        return Ok(None);
    };

    let corrupt = |reason: String| StorageError::Corrupt { id: id.clone(), reason };
    let width = u32::try_from(width).map_err(|e| corrupt(format!("width: {e}")))?;
    let height = u32::try_from(height).map_err(|e| corrupt(format!("height: {e}")))?;
    let uploaded_at = parse_timestamp(&uploaded_at).map_err(corrupt)?;
    let emotions: EmotionOutcome = serde_json::from_str(&emotions)?;

    Ok(Some(StoredImage {
        id: id.clone(),
        meta: ImageMeta { filename, width, height, uploaded_at, sha256 },
        emotions,
    }))
}

// ── Analysis entries ──────────────────────────────────────────────────────────

pub async fn insert_analysis(pool: &DbPool, entry: &AnalysisEntry) -> Result<String, StorageError> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO analyses (id, user_id, emotion, category, amount, timestamp, description) VALUES (?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(&id)
    .bind(entry.user_id.as_deref())
    .bind(&entry.emotion)
    .bind(&entry.category)
    .bind(entry.amount.to_string())
    .bind(entry.timestamp.to_rfc3339())
    .bind(entry.description.as_deref())
    .execute(pool)
    .await?;

    Ok(id)
}

/// All stored entries, oldest first.
pub async fn get_all_analyses(pool: &DbPool) -> Result<Vec<AnalysisEntry>, StorageError> {
    let rows = sqlx::query_as::<_, (String, Option<String>, String, String, String, String, Option<String>)>(
        "SELECT id, user_id, emotion, category, amount, timestamp, description FROM analyses ORDER BY rowid"
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(id, user_id, emotion, category, amount, timestamp, description)| {
            let amount = Decimal::from_str(&amount).map_err(|e| StorageError::Corrupt {
                id: id.clone(),
                reason: format!("amount: {e}"),
            })?;
            let timestamp = parse_timestamp(&timestamp)
                .map_err(|reason| StorageError::Corrupt { id: id.clone(), reason })?;
            Ok(AnalysisEntry { user_id, emotion, category, amount, timestamp, description })
        })
        .collect()
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("timestamp '{s}': {e}"))
}
