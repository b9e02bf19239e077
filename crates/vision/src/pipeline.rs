use thiserror::Error;

use crate::preprocess;
use crate::receipt::ReceiptParser;
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::ReceiptAnalysis;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] crate::preprocess::PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

/// Orchestrates: preprocess → OCR → parse.
///
/// Recognition is synchronous and can be slow; async callers should run
/// [`ReceiptPipeline::process_bytes`] on a blocking thread.
pub struct ReceiptPipeline<R: OcrBackend> {
    recognizer: R,
    parser: ReceiptParser,
}

impl<R: OcrBackend> ReceiptPipeline<R> {
    pub fn new(recognizer: R, parser: ReceiptParser) -> Self {
        Self { recognizer, parser }
    }

    /// Process raw uploaded image bytes.
    pub fn process_bytes(&self, data: &[u8]) -> Result<ReceiptAnalysis, PipelineError> {
        let image_bytes = preprocess::prepare_for_ocr_from_bytes(data)?;
        let extracted_text = self.recognizer.recognize(&image_bytes)?;
        let parsed_data = self.parser.parse(&extracted_text);

        Ok(ReceiptAnalysis { extracted_text, parsed_data })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
