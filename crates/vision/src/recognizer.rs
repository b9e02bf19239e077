use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine could not read the prepared image: {0}")]
    Input(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("No OCR engine configured; rebuild with `--features tesseract`")]
    NotAvailable,
}

/// Turns a prepared receipt image into text.
///
/// `image_bytes` is the PNG produced by [`crate::preprocess`]: grayscale,
/// thresholded, downscaled. Backends should not expect raw uploads.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError>;
}

/// Lets the server share one engine between handlers and lets tests keep a
/// handle on the backend they installed.
impl<T: OcrBackend + ?Sized> OcrBackend for Arc<T> {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        (**self).recognize(image_bytes)
    }
}

// ── Fixed-text backend ────────────────────────────────────────────────────────

/// Answers every image with the same receipt text and remembers what it
/// was handed, so callers can check what reached the engine.
#[derive(Debug, Default)]
pub struct FixedTextRecognizer {
    text: String,
    calls: AtomicUsize,
    last_input: Mutex<Option<Vec<u8>>>,
}

impl FixedTextRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Bytes passed to the most recent `recognize` call.
    pub fn last_input(&self) -> Option<Vec<u8>> {
        self.last_input.lock().ok().and_then(|guard| guard.clone())
    }
}

impl OcrBackend for FixedTextRecognizer {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_input.lock() {
            *last = Some(image_bytes.to_vec());
        }
        Ok(self.text.clone())
    }
}

/// Installed when the server was built without an OCR engine; receipt
/// uploads then answer 503.
pub struct UnavailableRecognizer;

impl OcrBackend for UnavailableRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        Err(OcrError::NotAvailable)
    }
}

// ── Tesseract (`tesseract` feature) ───────────────────────────────────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError};
    use leptess::{LepTess, Variable};

    #[derive(Debug, Clone)]
    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
        page_seg_mode: u8,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, lang: &str, page_seg_mode: u8) -> Self {
            Self { data_path, lang: lang.to_string(), page_seg_mode }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
            // LepTess is not Sync; one engine per call.
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::Engine(format!("init {}: {e}", self.lang)))?;
            lt.set_variable(Variable::TesseditPagesegMode, &self.page_seg_mode.to_string())
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            // Keeps the gap between an item name and its price.
            lt.set_variable(Variable::PreserveInterwordSpaces, "1")
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::Input(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}
