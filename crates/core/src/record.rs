use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Emotion label (`happy`, `sad`, …) to the detector's score for it.
pub type EmotionScores = BTreeMap<String, f64>;

/// What the emotion detector produced for one image.
///
/// Serialized untagged: either the bare score map or `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EmotionOutcome {
    Failed { error: String },
    Scores(EmotionScores),
}

impl EmotionOutcome {
    pub fn scores(&self) -> Option<&EmotionScores> {
        match self {
            EmotionOutcome::Scores(s) => Some(s),
            EmotionOutcome::Failed { .. } => None,
        }
    }

    /// Label with the highest score, if any scores are present.
    pub fn dominant(&self) -> Option<&str> {
        self.scores()?
            .iter()
            .filter(|(_, v)| v.is_finite())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| k.as_str())
    }
}

/// Metadata recorded for every uploaded face image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageMeta {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub uploaded_at: DateTime<Utc>,
    /// Hex SHA-256 of the uploaded bytes.
    pub sha256: String,
}

/// One spending entry tagged with the mood the user was in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisEntry {
    #[serde(default)]
    pub user_id: Option<String>,
    pub emotion: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
}
