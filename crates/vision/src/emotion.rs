use chrono::Utc;
use image::RgbImage;
use moodfinance_core::{EmotionOutcome, EmotionScores, ImageMeta};
use thiserror::Error;

use crate::hash;

#[derive(Debug, Error)]
pub enum EmotionError {
    #[error("Emotion model not configured")]
    NotAvailable,
}

/// Abstraction over a face-emotion model.
/// Scores are keyed by emotion label; their scale is up to the model.
pub trait EmotionBackend: Send + Sync {
    fn analyze(&self, image: &RgbImage) -> Result<EmotionScores, EmotionError>;
}

impl<T: EmotionBackend + ?Sized> EmotionBackend for Box<T> {
    fn analyze(&self, image: &RgbImage) -> Result<EmotionScores, EmotionError> {
        (**self).analyze(image)
    }
}

/// Returns the same scores for every image.
pub struct FixedEmotionDetector {
    scores: EmotionScores,
}

impl FixedEmotionDetector {
    pub fn new<K: Into<String>>(scores: impl IntoIterator<Item = (K, f64)>) -> Self {
        Self {
            scores: scores.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl EmotionBackend for FixedEmotionDetector {
    fn analyze(&self, _image: &RgbImage) -> Result<EmotionScores, EmotionError> {
        Ok(self.scores.clone())
    }
}

/// Stand-in used when no emotion model is wired up.
pub struct UnavailableEmotionDetector;

impl EmotionBackend for UnavailableEmotionDetector {
    fn analyze(&self, _image: &RgbImage) -> Result<EmotionScores, EmotionError> {
        Err(EmotionError::NotAvailable)
    }
}

// ── Image analysis ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    pub meta: ImageMeta,
    pub emotions: EmotionOutcome,
}

/// Decode → measure → run the emotion model.
///
/// A model failure is recorded in the outcome instead of failing the upload;
/// only undecodable bytes are an error.
pub struct ImageAnalyzer<E: EmotionBackend> {
    backend: E,
}

impl<E: EmotionBackend> ImageAnalyzer<E> {
    pub fn new(backend: E) -> Self {
        Self { backend }
    }

    pub fn analyze(&self, filename: &str, data: &[u8]) -> Result<ImageAnalysis, ImageError> {
        let rgb = image::load_from_memory(data)?.to_rgb8();

        let emotions = match self.backend.analyze(&rgb) {
            Ok(scores) => EmotionOutcome::Scores(scores),
            Err(e) => EmotionOutcome::Failed { error: e.to_string() },
        };

        let meta = ImageMeta {
            filename: filename.to_string(),
            width: rgb.width(),
            height: rgb.height(),
            uploaded_at: Utc::now(),
            sha256: hash::sha256_hex(data),
        };

        Ok(ImageAnalysis { meta, emotions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, _| Rgb([x as u8, 128, 64]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn analyze_records_dimensions_and_scores() {
        let analyzer = ImageAnalyzer::new(FixedEmotionDetector::new([("happy", 87.0), ("sad", 3.5)]));
        let data = png(12, 7);
        let a = analyzer.analyze("selfie.png", &data).unwrap();

        assert_eq!(a.meta.filename, "selfie.png");
        assert_eq!((a.meta.width, a.meta.height), (12, 7));
        assert_eq!(a.meta.sha256, hash::sha256_hex(&data));
        assert_eq!(a.emotions.dominant(), Some("happy"));
    }

    #[test]
    fn model_failure_is_captured_not_raised() {
        let analyzer = ImageAnalyzer::new(UnavailableEmotionDetector);
        let a = analyzer.analyze("x.png", &png(2, 2)).unwrap();
        assert_eq!(
            a.emotions,
            EmotionOutcome::Failed { error: "Emotion model not configured".into() }
        );
    }

    #[test]
    fn undecodable_bytes_are_an_error() {
        let analyzer = ImageAnalyzer::new(UnavailableEmotionDetector);
        assert!(matches!(analyzer.analyze("x.png", b"nope"), Err(ImageError::Decode(_))));
    }
}
