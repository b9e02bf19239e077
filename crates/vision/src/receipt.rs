use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{LineItem, ParsedReceipt};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

/// Comma-grouped thousands (`12,000`) or a bare digit run (`4500`). `\d` is
/// any Unicode decimal digit, so fullwidth `４,５００` from OCR output counts.
const NUMBER: &str = r"\d{1,3}(?:,\d{3})+|\d+";

re!(re_number, NUMBER);
re!(re_digit, r"^\d$");

// ── Configuration ────────────────────────────────────────────────────────────

/// Locale-specific markers used by [`ReceiptParser`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReceiptParserConfig {
    /// Substrings that flag a line as carrying the receipt total.
    /// Empty strings are ignored.
    pub total_markers: Vec<String>,
    /// Character allowed right after a price (whitespace in between is fine).
    pub currency_suffix: Option<char>,
}

impl Default for ReceiptParserConfig {
    fn default() -> Self {
        Self {
            total_markers: vec!["합계".to_string(), "총액".to_string()],
            currency_suffix: Some('원'),
        }
    }
}

// ── Parser ───────────────────────────────────────────────────────────────────

/// Line-oriented receipt parser.
///
/// Every line is scanned twice, independently:
///
/// 1. The leftmost price token becomes an entry in `prices`; the text before
///    it, trimmed, becomes a [`LineItem`] name when non-empty. Later numbers
///    on the same line are ignored. This is a policy, not a limitation.
/// 2. If the line contains a total marker, its leftmost number replaces
///    `total`. The last such line wins.
///
/// Parsing never fails. Text with no numbers yields an empty receipt.
#[derive(Debug, Clone)]
pub struct ReceiptParser {
    config: ReceiptParserConfig,
    price_re: Regex,
}

impl Default for ReceiptParser {
    fn default() -> Self {
        Self::new(ReceiptParserConfig::default())
    }
}

impl ReceiptParser {
    pub fn new(config: ReceiptParserConfig) -> Self {
        let pattern = match config.currency_suffix {
            Some(suffix) => format!(r"({NUMBER})(?:\s*{})?", regex::escape(&suffix.to_string())),
            None => format!("({NUMBER})"),
        };
        let price_re = Regex::new(&pattern).expect("price pattern is built from escaped parts");
        Self { config, price_re }
    }

    pub fn parse(&self, text: &str) -> ParsedReceipt {
        let mut receipt = ParsedReceipt::default();

        for line in split_lines(text) {
            if let Some((start, price)) = self.find_price(line) {
                receipt.prices.push(price);
                let name = line[..start].trim();
                if !name.is_empty() {
                    receipt.items.push(LineItem { name: name.to_string(), price });
                }
            }

            if self.is_total_line(line) {
                if let Some(total) = first_number(line) {
                    receipt.total = Some(total);
                }
            }
        }

        receipt
    }

    /// Byte offset where the leftmost price token starts, and its value.
    fn find_price(&self, line: &str) -> Option<(usize, i64)> {
        let c = self.price_re.captures(line)?;
        let start = c.get(0)?.start();
        let value = parse_grouped(c.get(1)?.as_str())?;
        Some((start, value))
    }

    fn is_total_line(&self, line: &str) -> bool {
        self.config
            .total_markers
            .iter()
            .any(|m| !m.is_empty() && line.contains(m.as_str()))
    }
}

/// Parse with the default markers (`합계`, `총액`) and suffix (`원`).
pub fn parse_receipt_text(text: &str) -> ParsedReceipt {
    static DEFAULT: OnceLock<ReceiptParser> = OnceLock::new();
    DEFAULT.get_or_init(ReceiptParser::default).parse(text)
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn first_number(line: &str) -> Option<i64> {
    parse_grouped(re_number().find(line)?.as_str())
}

/// Value of a matched [`NUMBER`] token. `None` when it overflows an `i64`.
fn parse_grouped(s: &str) -> Option<i64> {
    s.chars()
        .filter(|&c| c != ',')
        .try_fold(0i64, |acc, c| acc.checked_mul(10)?.checked_add(i64::from(digit_value(c)?)))
}

fn is_decimal_digit(c: char) -> bool {
    re_digit().is_match(c.encode_utf8(&mut [0; 4]))
}

/// Decimal digits are laid out in contiguous zero-to-nine runs, so a
/// non-ASCII digit's value is its distance from the start of its run.
fn digit_value(c: char) -> Option<u32> {
    if let Some(d) = c.to_digit(10) {
        return Some(d);
    }
    if !is_decimal_digit(c) {
        return None;
    }
    let mut offset = 0;
    let mut cp = u32::from(c);
    while let Some(prev) = cp.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        offset += 1;
        cp -= 1;
    }
    Some(offset % 10)
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Split at every line boundary, treating `\r\n` as one. A trailing break
/// does not produce an extra empty line; empty text has no lines.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' {
            if let Some(&(j, '\n')) = chars.peek() {
                chars.next();
                start = j + 1;
            }
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

// ── Tests ─────────────────────────────────────────────────────────────────────
