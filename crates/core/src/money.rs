use rust_decimal::Decimal;
use std::fmt;

/// A won amount for display. Won has no minor unit, so any fraction is
/// truncated toward zero when printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Won(Decimal);

impl Won {
    pub fn from_decimal(decimal: Decimal) -> Self {
        Won(decimal.trunc())
    }

    /// Digits grouped in threes with commas, e.g. `12,500`. No currency suffix.
    pub fn grouped(self) -> String {
        let abs = self.0.abs().to_string();
        let digits = abs.split('.').next().unwrap_or("0");

        let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
        if self.0.is_sign_negative() && !self.0.is_zero() {
            out.push('-');
        }
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(ch);
        }
        out
    }
}

impl fmt::Display for Won {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}원", self.grouped())
    }
}
