use serde::{Deserialize, Serialize};

/// One priced line of a receipt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItem {
    /// Text preceding the price on the line, trimmed.
    #[serde(rename = "item")]
    pub name: String,
    /// Whole currency units (won).
    pub price: i64,
}

/// Structured view of a receipt's OCR text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedReceipt {
    pub items: Vec<LineItem>,
    /// Every detected price in line order, including those that became items.
    pub prices: Vec<i64>,
    pub total: Option<i64>,
}

/// Raw OCR text together with what was parsed out of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceiptAnalysis {
    pub extracted_text: String,
    pub parsed_data: ParsedReceipt,
}
