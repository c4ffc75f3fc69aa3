//! Empirical thresholds derived once from the historical set.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use log::Level;
use serde::{Deserialize, Serialize};

use lotpick_db::models::{pad2, Block, Draw, MAIN_COUNT, SLOT_COUNT};

use crate::error::{LotpickError, Result};
use crate::patterns::{pattern_probabilities, PatternCeiling};
use crate::stats::{count_multiples, count_odd, floor_percentile, gaps, percentile};

pub const SUM_LOWER_PERCENTILE: f64 = 15.0;
pub const SUM_UPPER_PERCENTILE: f64 = 85.0;
pub const GAP_PERCENTILE: f64 = 95.0;
pub const MULTIPLES_PERCENTILE: f64 = 95.0;
pub const MULTIPLE_BASES: RangeInclusive<u8> = 2..=10;

/// Used when a block has fewer than two positions and yields no gaps.
pub const DEFAULT_MAIN_GAP_THRESHOLD: u32 = 19;
pub const DEFAULT_LUCKY_GAP_THRESHOLD: u32 = 5;

/// Inclusive `[min, max]` bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
}

impl Bounds {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OddEvenRow {
    pub label: String,
    pub odd_count: usize,
    pub count: u32,
    pub pct: f64,
}

/// Gap size -> occurrences, one histogram per adjacent position pair.
pub type GapHistogram = BTreeMap<u8, u32>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GapDistribution {
    pub main: Vec<GapHistogram>,
    pub lucky: Vec<GapHistogram>,
}

/// Value -> occurrences at one position.
pub type PositionCounter = BTreeMap<u8, u32>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatCell {
    pub pos: usize,
    pub num: u8,
    pub count: u32,
    /// Share of the position's draws within the displayed value range, in percent.
    pub pct: f64,
}

/// Read-only snapshot of everything the analyzer derives from one historical set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thresholds {
    pub total_draws: usize,
    pub odd_even: Vec<OddEvenRow>,
    pub odd_range: Bounds,
    pub sum_range: Bounds,
    pub main_gap_threshold: u32,
    pub lucky_gap_threshold: u32,
    pub gap_distribution: GapDistribution,
    pub multiples_allowed: BTreeMap<u8, u32>,
    pub position_frequency: Vec<PositionCounter>,
    pub max_pattern_probabilities: Vec<PatternCeiling>,
}

fn diagnostics_level(debug: bool) -> Level {
    if debug {
        Level::Info
    } else {
        Level::Debug
    }
}

/// Runs every analysis over `draws`. `debug` only raises the level of the diagnostic log lines.
pub fn analyze(draws: &[Draw], debug: bool) -> Result<Thresholds> {
    if draws.is_empty() {
        return Err(LotpickError::EmptyHistory);
    }
    let level = diagnostics_level(debug);

    let position_frequency = position_counters(draws);
    let max_pattern_probabilities = max_pattern_probabilities(draws, &position_frequency, level);
    let (odd_even, odd_range) = analyze_odd_even(draws, level);
    let sum_range = analyze_sum_range(draws, SUM_LOWER_PERCENTILE, SUM_UPPER_PERCENTILE, level);
    let gap_distribution = analyze_gap_distribution(draws);
    let (main_gap_threshold, lucky_gap_threshold) =
        determine_gap_thresholds(&gap_distribution, GAP_PERCENTILE);
    let multiples_allowed = max_multiples_allowed(draws, MULTIPLE_BASES, level);

    log::log!(
        level,
        "Gap thresholds (P{}): main={}, lucky={}",
        GAP_PERCENTILE,
        main_gap_threshold,
        lucky_gap_threshold
    );

    Ok(Thresholds {
        total_draws: draws.len(),
        odd_even,
        odd_range,
        sum_range,
        main_gap_threshold,
        lucky_gap_threshold,
        gap_distribution,
        multiples_allowed,
        position_frequency,
        max_pattern_probabilities,
    })
}

pub fn position_counters(draws: &[Draw]) -> Vec<PositionCounter> {
    let mut counters = vec![PositionCounter::new(); SLOT_COUNT];
    for draw in draws {
        for (counter, value) in counters.iter_mut().zip(draw.slots()) {
            *counter.entry(value).or_insert(0) += 1;
        }
    }
    counters
}

/// Odd-count table for the main block and the widest odd-count range ever observed.
pub fn analyze_odd_even(draws: &[Draw], level: Level) -> (Vec<OddEvenRow>, Bounds) {
    let mut distribution = [0u32; MAIN_COUNT + 1];
    for draw in draws {
        distribution[count_odd(&draw.main)] += 1;
    }

    let total = draws.len();
    log::log!(level, "Odd/even distribution over {} draws (main numbers):", total);

    let rows: Vec<OddEvenRow> = distribution
        .iter()
        .enumerate()
        .map(|(odd_count, &count)| {
            let pct = if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            let even_count = MAIN_COUNT - odd_count;
            log::log!(
                level,
                "  {} odd / {} even : {} draws ({:.2}%)",
                odd_count,
                even_count,
                count,
                pct
            );
            OddEvenRow {
                label: format!("{} odd / {} even", odd_count, even_count),
                odd_count,
                count,
                pct,
            }
        })
        .collect();

    let observed = || rows.iter().filter(|r| r.count > 0).map(|r| r.odd_count as u32);
    let range = Bounds::new(
        observed().min().unwrap_or(0),
        observed().max().unwrap_or(0),
    );
    (rows, range)
}

/// `[floor(P_lower), floor(P_upper)]` of the main-block sums.
pub fn analyze_sum_range(draws: &[Draw], lower: f64, upper: f64, level: Level) -> Bounds {
    let sums: Vec<f64> = draws
        .iter()
        .map(|d| d.main.iter().map(|&n| n as f64).sum())
        .collect();

    let low = percentile(&sums, lower);
    let high = percentile(&sums, upper);

    if log::log_enabled!(level) && !sums.is_empty() {
        let min = sums.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = sums.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = sums.iter().sum::<f64>() / sums.len() as f64;
        log::log!(level, "Sum range over {} draws: min={}, max={}", sums.len(), min, max);
        log::log!(level, "Mean sum: {:.2}, median sum: {}", mean, percentile(&sums, 50.0));
        log::log!(level, "Typical sum range (P{}-P{}): {} - {}", lower, upper, low, high);
    }

    Bounds::new(low.floor() as u32, high.floor() as u32)
}

fn block_histograms(draws: &[Draw], block: Block) -> Vec<GapHistogram> {
    let pairs = block.pick_count().saturating_sub(1);
    let mut histograms = vec![GapHistogram::new(); pairs];
    for draw in draws {
        let mut numbers = block.numbers_from(draw).to_vec();
        numbers.sort_unstable();
        for (histogram, gap) in histograms.iter_mut().zip(gaps(&numbers)) {
            *histogram.entry(gap).or_insert(0) += 1;
        }
    }
    histograms
}

pub fn analyze_gap_distribution(draws: &[Draw]) -> GapDistribution {
    GapDistribution {
        main: block_histograms(draws, Block::Main),
        lucky: block_histograms(draws, Block::Lucky),
    }
}

/// Expands every pair histogram of a block back into one pooled sample.
fn pooled_gaps(histograms: &[GapHistogram]) -> Vec<u8> {
    histograms
        .iter()
        .flat_map(|h| {
            h.iter()
                .flat_map(|(&gap, &count)| std::iter::repeat(gap).take(count as usize))
        })
        .collect()
}

/// `floor(P_p)` of the pooled gaps per block, falling back to the defaults for gapless blocks.
pub fn determine_gap_thresholds(distribution: &GapDistribution, p: f64) -> (u32, u32) {
    let threshold = |histograms: &[GapHistogram], fallback: u32| {
        let pooled = pooled_gaps(histograms);
        if pooled.is_empty() {
            fallback
        } else {
            floor_percentile(&pooled, p)
        }
    };
    (
        threshold(&distribution.main, DEFAULT_MAIN_GAP_THRESHOLD),
        threshold(&distribution.lucky, DEFAULT_LUCKY_GAP_THRESHOLD),
    )
}

/// For each base, `floor(P95)` of how many main numbers per draw it divides.
pub fn max_multiples_allowed(
    draws: &[Draw],
    bases: RangeInclusive<u8>,
    level: Level,
) -> BTreeMap<u8, u32> {
    let total = draws.len();
    let mut allowed = BTreeMap::new();

    for base in bases {
        let counts: Vec<u32> = draws
            .iter()
            .map(|d| count_multiples(&d.main, base) as u32)
            .collect();

        if log::log_enabled!(level) {
            let mut distribution: BTreeMap<u32, u32> = BTreeMap::new();
            for &c in &counts {
                *distribution.entry(c).or_insert(0) += 1;
            }
            log::log!(level, "Multiples of {} in main numbers:", base);
            for (count, draws_with) in &distribution {
                log::log!(
                    level,
                    "  Draws with exactly {} multiples of {}: {} ({:.2}%)",
                    count,
                    base,
                    draws_with,
                    *draws_with as f64 / total as f64 * 100.0
                );
            }
        }

        allowed.insert(base, floor_percentile(&counts, MULTIPLES_PERCENTILE));
    }

    log::log!(level, "Max multiples allowed: {:?}", allowed);
    allowed
}

/// Percentage of draws whose slot `pos` held `value`.
fn frequency_pct(counter: &PositionCounter, value: u8, total: usize) -> f64 {
    let count = counter.get(&value).copied().unwrap_or(0);
    if total > 0 {
        count as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// Ceiling of the positional score for each catalogued pattern, built from the most
/// frequent value of every position.
pub fn max_pattern_probabilities(
    draws: &[Draw],
    counters: &[PositionCounter],
    level: Level,
) -> Vec<PatternCeiling> {
    let total = draws.len();
    let top_pcts: Vec<f64> = counters
        .iter()
        .map(|counter| {
            let top = counter.values().copied().max().unwrap_or(0);
            if total > 0 {
                top as f64 / total as f64 * 100.0
            } else {
                0.0
            }
        })
        .collect();

    let ceilings = pattern_probabilities(&top_pcts);
    log::log!(level, "Max pattern probabilities possible:");
    for c in &ceilings {
        log::log!(level, "{:<30}: {:.2}%", c.key, c.probability);
    }
    ceilings
}

impl Thresholds {
    /// Historical frequency, in percent of all draws, of `value` at `pos`.
    pub fn position_pct(&self, pos: usize, value: u8) -> f64 {
        self.position_frequency
            .get(pos)
            .map(|counter| frequency_pct(counter, value, self.total_draws))
            .unwrap_or(0.0)
    }

    /// Most frequent value per position, zero-padded (ties resolve to the smallest value).
    pub fn top_numbers(&self) -> Vec<String> {
        self.position_frequency
            .iter()
            .map(|counter| {
                let top = counter.values().copied().max().unwrap_or(0);
                counter
                    .iter()
                    .find(|(_, &c)| c == top)
                    .map(|(&v, _)| pad2(v))
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Position x value grid over `[min, max]`, each position normalised to percentages.
    pub fn heatmap_cells(&self, min: u8, max: u8) -> Vec<HeatCell> {
        let mut cells = Vec::new();
        for (pos, counter) in self.position_frequency.iter().enumerate() {
            let total: u32 = (min..=max).map(|n| counter.get(&n).copied().unwrap_or(0)).sum();
            for num in min..=max {
                let count = counter.get(&num).copied().unwrap_or(0);
                cells.push(HeatCell {
                    pos,
                    num,
                    count,
                    pct: if total > 0 {
                        count as f64 / total as f64 * 100.0
                    } else {
                        0.0
                    },
                });
            }
        }
        cells
    }

    /// Histogram for pair `pair` (0-based) of a block, if that pair exists.
    pub fn gap_histogram(&self, block: Block, pair: usize) -> Option<&GapHistogram> {
        match block {
            Block::Main => self.gap_distribution.main.get(pair),
            Block::Lucky => self.gap_distribution.lucky.get(pair),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_test_draws;

    fn quiet() -> Level {
        Level::Trace
    }

    #[test]
    fn test_empty_history_rejected() {
        assert!(matches!(analyze(&[], false), Err(LotpickError::EmptyHistory)));
    }

    #[test]
    fn test_single_draw_degenerate_ranges() {
        let draws = vec![Draw::new([1, 2, 3, 4, 5], [1, 2])];
        let t = analyze(&draws, false).unwrap();
        assert_eq!(t.odd_range, Bounds::new(3, 3));
        assert_eq!(t.sum_range, Bounds::new(15, 15));
        assert_eq!(t.main_gap_threshold, 1);
        assert_eq!(t.lucky_gap_threshold, 1);
        assert_eq!(t.multiples_allowed[&2], 2);
        assert_eq!(t.multiples_allowed[&5], 1);
        assert_eq!(t.multiples_allowed[&10], 0);
    }

    #[test]
    fn test_odd_range_is_widest_observed() {
        let draws = vec![
            Draw::new([2, 4, 6, 8, 10], [1, 2]),   // 0 odd
            Draw::new([1, 3, 6, 8, 10], [1, 2]),   // 2 odd
            Draw::new([1, 3, 5, 7, 10], [1, 2]),   // 4 odd
        ];
        let (rows, range) = analyze_odd_even(&draws, quiet());
        assert_eq!(range, Bounds::new(0, 4));
        assert_eq!(rows.len(), MAIN_COUNT + 1);
        assert_eq!(rows[2].label, "2 odd / 3 even");
        assert_eq!(rows[2].count, 1);
        assert!((rows[2].pct - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(rows[5].count, 0);
    }

    #[test]
    fn test_multiples_constant_even_count() {
        // every draw has exactly two even main numbers
        let draws: Vec<Draw> = (0..30u8)
            .map(|i| {
                let o = (i % 5) * 2;
                Draw::new([1 + o, 2 + o * 2, 13, 20 + o * 2, 31 + o], [1, 2])
            })
            .collect();
        assert!(draws.iter().all(|d| count_multiples(&d.main, 2) == 2));
        let allowed = max_multiples_allowed(&draws, MULTIPLE_BASES, quiet());
        assert_eq!(allowed[&2], 2);
        assert_eq!(allowed.len(), 9);
    }

    #[test]
    fn test_gap_histograms_sort_each_block() {
        let draws = vec![Draw::new([40, 3, 22, 10, 31], [9, 2])];
        let dist = analyze_gap_distribution(&draws);
        assert_eq!(dist.main.len(), MAIN_COUNT - 1);
        assert_eq!(dist.main[0].get(&7), Some(&1));
        assert_eq!(dist.main[1].get(&12), Some(&1));
        assert_eq!(dist.main[3].get(&9), Some(&1));
        assert_eq!(dist.lucky[0].get(&7), Some(&1));
    }

    #[test]
    fn test_gap_thresholds_pool_pairs() {
        let mut dist = GapDistribution::default();
        dist.main = vec![
            BTreeMap::from([(1u8, 10u32)]),
            BTreeMap::from([(20u8, 10u32)]),
        ];
        dist.lucky = vec![BTreeMap::from([(3u8, 4u32)])];
        // pooled main sample: 10 x 1, 10 x 20 -> rank 18.05 lands on 20
        assert_eq!(determine_gap_thresholds(&dist, 95.0), (20, 3));
    }

    #[test]
    fn test_gap_thresholds_fallback() {
        let dist = GapDistribution::default();
        assert_eq!(
            determine_gap_thresholds(&dist, 95.0),
            (DEFAULT_MAIN_GAP_THRESHOLD, DEFAULT_LUCKY_GAP_THRESHOLD)
        );
    }

    #[test]
    fn test_sum_range_ordered_and_achievable() {
        let draws = make_test_draws(200, 7);
        let t = analyze(&draws, false).unwrap();
        assert!(t.sum_range.min <= t.sum_range.max);
        // smallest and largest sums of five distinct numbers in 1..=50
        assert!(t.sum_range.min >= 15 && t.sum_range.max <= 240);
        assert!(t.odd_range.min <= t.odd_range.max && t.odd_range.max <= MAIN_COUNT as u32);
    }

    #[test]
    fn test_odd_range_bounds_are_observed() {
        let draws = make_test_draws(150, 3);
        let t = analyze(&draws, false).unwrap();
        for bound in [t.odd_range.min, t.odd_range.max] {
            assert!(draws.iter().any(|d| count_odd(&d.main) as u32 == bound));
        }
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let draws = make_test_draws(120, 11);
        let a = analyze(&draws, false).unwrap();
        let b = analyze(&draws, true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_position_frequency_and_ceiling() {
        let draws = vec![
            Draw::new([1, 10, 20, 30, 40], [1, 2]),
            Draw::new([1, 11, 21, 31, 41], [3, 4]),
            Draw::new([2, 11, 22, 32, 42], [3, 5]),
            Draw::new([1, 12, 23, 33, 43], [6, 7]),
        ];
        let t = analyze(&draws, false).unwrap();
        assert_eq!(t.position_frequency.len(), SLOT_COUNT);
        assert_eq!(t.position_frequency[0][&1], 3);
        assert!((t.position_pct(0, 1) - 75.0).abs() < 1e-12);
        assert_eq!(t.position_pct(0, 50), 0.0);
        assert_eq!(t.top_numbers()[0], "01");
        assert_eq!(t.top_numbers()[1], "11");

        // top pcts: 75, 50, 25, 25, 25, 50, 25
        let full = &t.max_pattern_probabilities[0];
        assert_eq!(full.key, "5_main+2_lucky");
        assert!((full.probability - 275.0 / 7.0).abs() < 1e-9);
        let main_only = &t.max_pattern_probabilities[3];
        assert!((main_only.probability - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_heatmap_rows_normalised() {
        let draws = make_test_draws(80, 5);
        let t = analyze(&draws, false).unwrap();
        let cells = t.heatmap_cells(1, 50);
        assert_eq!(cells.len(), SLOT_COUNT * 50);
        for pos in 0..SLOT_COUNT {
            let total: f64 = cells.iter().filter(|c| c.pos == pos).map(|c| c.pct).sum();
            assert!((total - 100.0).abs() < 1e-9, "position {pos}: {total}");
        }
    }
}
