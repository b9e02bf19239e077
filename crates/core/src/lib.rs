pub mod insight;
pub mod money;
pub mod record;

pub use insight::{analyze_patterns, spending_by_emotion, EmotionSpending, DEFAULT_INSIGHT_THRESHOLD};
pub use money::Won;
pub use record::{AnalysisEntry, EmotionOutcome, EmotionScores, ImageMeta};
