pub mod emotion;
pub mod hash;
pub mod pipeline;
pub mod preprocess;
pub mod receipt;
pub mod recognizer;
pub mod types;

pub use emotion::{
    EmotionBackend, EmotionError, FixedEmotionDetector, ImageAnalysis, ImageAnalyzer, ImageError,
    UnavailableEmotionDetector,
};
pub use hash::{sha256_bytes, sha256_hex};
pub use pipeline::{PipelineError, ReceiptPipeline};
pub use preprocess::{prepare_for_ocr_from_bytes, PreprocessError};
pub use receipt::{parse_receipt_text, ReceiptParser, ReceiptParserConfig};
pub use recognizer::{FixedTextRecognizer, OcrBackend, OcrError, UnavailableRecognizer};
pub use types::{LineItem, ParsedReceipt, ReceiptAnalysis};
