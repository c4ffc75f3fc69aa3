use serde::Serialize;

/// A partial-match pattern: how many main and lucky numbers it covers, and for
/// single-lucky patterns which lucky slot (1 or 2) it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatternDef {
    pub count_main: usize,
    pub count_lucky: usize,
    pub special: Option<u8>,
}

const fn pattern(count_main: usize, count_lucky: usize, special: Option<u8>) -> PatternDef {
    PatternDef {
        count_main,
        count_lucky,
        special,
    }
}

pub const PATTERNS: [PatternDef; 12] = [
    pattern(5, 2, None),
    pattern(5, 1, Some(1)),
    pattern(5, 1, Some(2)),
    pattern(5, 0, None),
    pattern(4, 2, None),
    pattern(4, 1, Some(1)),
    pattern(4, 1, Some(2)),
    pattern(3, 2, None),
    pattern(4, 0, None),
    pattern(2, 2, None),
    pattern(3, 1, Some(1)),
    pattern(3, 1, Some(2)),
];

impl PatternDef {
    /// e.g. `5_main+2_lucky`, `4_main+1_lucky_special_2`.
    pub fn key(&self) -> String {
        let mut key = format!("{}_main+{}_lucky", self.count_main, self.count_lucky);
        if let (Some(special), 1) = (self.special, self.count_lucky) {
            key.push_str(&format!("_special_{}", special));
        }
        key
    }

    /// Number of leading positions averaged for this pattern.
    pub fn span(&self) -> usize {
        self.count_main + self.count_lucky
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternCeiling {
    pub key: String,
    pub pattern: PatternDef,
    pub probability: f64,
}

/// Averages the leading `span()` per-position percentages for every catalogued pattern.
///
/// The `special` slot only distinguishes the label; the average always covers the
/// first positions of the combination.
pub fn pattern_probabilities(position_pcts: &[f64]) -> Vec<PatternCeiling> {
    PATTERNS
        .iter()
        .map(|p| {
            let slice = &position_pcts[..p.span().min(position_pcts.len())];
            let probability = if slice.is_empty() {
                0.0
            } else {
                slice.iter().sum::<f64>() / slice.len() as f64
            };
            PatternCeiling {
                key: p.key(),
                pattern: *p,
                probability,
            }
        })
        .collect()
}
