use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::money::Won;
use crate::record::AnalysisEntry;

/// Average spend per emotion above which a pattern is reported.
pub const DEFAULT_INSIGHT_THRESHOLD: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

pub const NO_PATTERN_MESSAGE: &str = "뚜렷한 소비 패턴이 발견되지 않았습니다.";

/// Mean spend for one emotion.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionSpending {
    pub emotion: String,
    pub count: usize,
    pub mean: Decimal,
}

/// Running total for one emotion. The exact sum is dropped once it leaves
/// `Decimal` range; the float sum keeps the mean approximately right.
struct Group<'a> {
    emotion: &'a str,
    exact: Option<Decimal>,
    approx: f64,
    count: usize,
}

impl<'a> Group<'a> {
    fn new(emotion: &'a str, amount: Decimal) -> Self {
        Group { emotion, exact: Some(amount), approx: amount.to_f64().unwrap_or(0.0), count: 1 }
    }

    fn add(&mut self, amount: Decimal) {
        self.exact = self.exact.and_then(|sum| sum.checked_add(amount));
        self.approx += amount.to_f64().unwrap_or(0.0);
        self.count += 1;
    }

    fn mean(&self) -> Decimal {
        let n = Decimal::from(self.count);
        match self.exact {
            Some(sum) => sum / n,
            None => {
                let mean = self.approx / self.count as f64;
                let clamp = if mean < 0.0 { Decimal::MIN } else { Decimal::MAX };
                Decimal::from_f64(mean).unwrap_or(clamp)
            }
        }
    }
}

/// Group amounts by emotion, preserving the order each emotion first appears.
/// Entries with an empty emotion label are ignored.
pub fn spending_by_emotion(entries: &[AnalysisEntry]) -> Vec<EmotionSpending> {
    let mut groups: Vec<Group<'_>> = Vec::new();

    for entry in entries {
        if entry.emotion.is_empty() {
            continue;
        }
        match groups.iter_mut().find(|g| g.emotion == entry.emotion) {
            Some(group) => group.add(entry.amount),
            None => groups.push(Group::new(&entry.emotion, entry.amount)),
        }
    }

    groups
        .iter()
        .map(|g| EmotionSpending { emotion: g.emotion.to_string(), count: g.count, mean: g.mean() })
        .collect()
}

/// Human-readable spending insights. Never empty: falls back to
/// [`NO_PATTERN_MESSAGE`] when no emotion's mean exceeds `threshold`.
pub fn analyze_patterns(entries: &[AnalysisEntry], threshold: Decimal) -> Vec<String> {
    let mut insights: Vec<String> = spending_by_emotion(entries)
        .into_iter()
        .filter(|s| s.mean > threshold)
        .map(|s| {
            let mean = Won::from_decimal(s.mean);
            format!("{} 상태일 때 평균 소비가 {}으로 높습니다.", s.emotion, mean)
        })
        .collect();

    if insights.is_empty() {
        insights.push(NO_PATTERN_MESSAGE.to_string());
    }
    insights
}
