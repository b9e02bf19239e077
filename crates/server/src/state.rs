use moodfinance_storage::DbPool;
use moodfinance_vision::{
    EmotionBackend, ImageAnalyzer, OcrBackend, ReceiptParser, ReceiptPipeline,
};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::config::{AppConfig, SERVICE_NAME};

pub type SharedReceiptPipeline = Arc<ReceiptPipeline<Arc<dyn OcrBackend>>>;
pub type SharedImageAnalyzer = Arc<ImageAnalyzer<Box<dyn EmotionBackend>>>;

/// Everything a handler needs. The pool is opened once in `main` and handed
/// in here; handlers never reach for a global client.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub receipts: SharedReceiptPipeline,
    pub images: SharedImageAnalyzer,
    pub insight_threshold: Decimal,
    pub service_name: &'static str,
}

impl AppState {
    pub fn new(
        db: DbPool,
        ocr: Arc<dyn OcrBackend>,
        emotions: Box<dyn EmotionBackend>,
        config: &AppConfig,
    ) -> Self {
        let parser = ReceiptParser::new(config.receipt.clone());
        Self {
            db,
            receipts: Arc::new(ReceiptPipeline::new(ocr, parser)),
            images: Arc::new(ImageAnalyzer::new(emotions)),
            insight_threshold: config.insight.threshold,
            service_name: SERVICE_NAME,
        }
    }
}
