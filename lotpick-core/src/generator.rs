//! Rejection-sampling search for a novel combination that stays within the historical thresholds.

use std::collections::{BTreeSet, HashSet};

use log::Level;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use lotpick_db::models::{Draw, MAIN_COUNT, SLOT_COUNT};

use crate::config::GenerationConfig;
use crate::error::{LotpickError, Result};
use crate::stats::{cluster_counts, count_multiples, count_odd, max_consecutive_run, max_gap_exceeds, sum};
use crate::thresholds::{position_counters, PositionCounter};

/// Main blocks with a run of this many consecutive numbers are rejected.
pub const REJECTED_RUN_LENGTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    ExceedMultiples { base: u8, count: usize, allowed: u32 },
    MainGap,
    SumOutOfRange(u32),
    ConsecutiveRun(usize),
    OddEvenBalance(usize),
    Cluster,
    LuckyGap,
    GenerationDuplicate,
    HistoricalDuplicate,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::ExceedMultiples { base, count, allowed } => {
                write!(f, "{} multiples of {} in main numbers (max {})", count, base, allowed)
            }
            Rejection::MainGap => write!(f, "main gap exceeds threshold"),
            Rejection::SumOutOfRange(total) => write!(f, "sum {} outside range", total),
            Rejection::ConsecutiveRun(run) => write!(f, "{} consecutive main numbers", run),
            Rejection::OddEvenBalance(odd) => write!(f, "odd count {} outside range", odd),
            Rejection::Cluster => write!(f, "main numbers too clustered"),
            Rejection::LuckyGap => write!(f, "lucky gap exceeds threshold"),
            Rejection::GenerationDuplicate => write!(f, "already generated this run"),
            Rejection::HistoricalDuplicate => write!(f, "combination already drawn"),
        }
    }
}

/// Per-invocation tally of discarded candidates, by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RejectionStats {
    pub generation_duplicate: u64,
    pub exceed_multiples: u64,
    pub max_run: u64,
    pub cluster_count: u64,
    pub odd_even_balance: u64,
    pub gap_exceeds_threshold: u64,
    pub sum_in_range: u64,
    pub historical_duplicate: u64,
}

impl RejectionStats {
    fn record(&mut self, rejection: Rejection) {
        let counter = match rejection {
            Rejection::ExceedMultiples { .. } => &mut self.exceed_multiples,
            Rejection::MainGap | Rejection::LuckyGap => &mut self.gap_exceeds_threshold,
            Rejection::SumOutOfRange(_) => &mut self.sum_in_range,
            Rejection::ConsecutiveRun(_) => &mut self.max_run,
            Rejection::OddEvenBalance(_) => &mut self.odd_even_balance,
            Rejection::Cluster => &mut self.cluster_count,
            Rejection::GenerationDuplicate => &mut self.generation_duplicate,
            Rejection::HistoricalDuplicate => &mut self.historical_duplicate,
        };
        *counter += 1;
    }

    pub fn entries(&self) -> [(&'static str, u64); 8] {
        [
            ("Multiples", self.exceed_multiples),
            ("Gap", self.gap_exceeds_threshold),
            ("Sum", self.sum_in_range),
            ("Consecutive run", self.max_run),
            ("Odd/even", self.odd_even_balance),
            ("Cluster", self.cluster_count),
            ("Generation duplicate", self.generation_duplicate),
            ("Historical duplicate", self.historical_duplicate),
        ]
    }

    pub fn total(&self) -> u64 {
        self.entries().iter().map(|(_, n)| n).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    /// `None` only when no candidate survived every filter within the iteration budget.
    pub best_combination: Option<Draw>,
    pub best_score: f64,
    pub best_positional_probabilities: Option<Vec<f64>>,
    pub iterations: u64,
    /// Whether the search stopped early because a candidate reached `min_score`.
    pub accepted: bool,
    pub rejections: RejectionStats,
}

/// Draws `count` distinct integers uniformly from `[min, max]`, sorted ascending, retrying
/// while the set is already in `tried`.
pub fn generate_unique_numbers<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    min: u8,
    max: u8,
    tried: &HashSet<Vec<u8>>,
    max_attempts: u32,
) -> Result<Vec<u8>> {
    if count > (max.saturating_sub(min)) as usize + 1 || min > max {
        return Err(LotpickError::InvalidConfig(format!(
            "cannot pick {} distinct numbers from {}-{}",
            count, min, max
        )));
    }

    for _ in 0..max_attempts {
        let mut numbers = BTreeSet::new();
        while numbers.len() < count {
            numbers.insert(rng.random_range(min..=max));
        }
        let numbers: Vec<u8> = numbers.into_iter().collect();
        if !tried.contains(&numbers) {
            return Ok(numbers);
        }
    }

    Err(LotpickError::ConfigurationInfeasible {
        count,
        min,
        max,
        attempts: max_attempts,
    })
}

/// Main-block filters, cheapest and most discriminating first. `main` must be sorted.
pub fn check_main_numbers(main: &[u8], config: &GenerationConfig) -> Option<Rejection> {
    for (&base, &allowed) in &config.multiples_allowed {
        let count = count_multiples(main, base);
        if count as u32 > allowed {
            return Some(Rejection::ExceedMultiples { base, count, allowed });
        }
    }

    if max_gap_exceeds(main, config.main_gap_threshold) {
        return Some(Rejection::MainGap);
    }

    let total = sum(main);
    if !config.sum_range.contains(total) {
        return Some(Rejection::SumOutOfRange(total));
    }

    let run = max_consecutive_run(main);
    if run >= REJECTED_RUN_LENGTH {
        return Some(Rejection::ConsecutiveRun(run));
    }

    let odd = count_odd(main);
    if !config.odd_range.contains(odd as u32) {
        return Some(Rejection::OddEvenBalance(odd));
    }

    let clusters = cluster_counts(main, config.min_main, config.max_main, config.cluster_width);
    if clusters.iter().any(|&c| c > config.cluster_max) {
        return Some(Rejection::Cluster);
    }

    None
}

/// Lucky-block filter. `lucky` must be sorted.
pub fn check_lucky_numbers(lucky: &[u8], config: &GenerationConfig) -> Option<Rejection> {
    if max_gap_exceeds(lucky, config.lucky_gap_threshold) {
        return Some(Rejection::LuckyGap);
    }
    None
}

/// Percent of historical draws holding the candidate's value at each position.
pub fn positional_probabilities(
    combination: &Draw,
    counters: &[PositionCounter],
    total_draws: usize,
) -> Vec<f64> {
    combination
        .slots()
        .iter()
        .enumerate()
        .map(|(pos, value)| {
            let count = counters
                .get(pos)
                .and_then(|c| c.get(value))
                .copied()
                .unwrap_or(0);
            if total_draws > 0 {
                count as f64 / total_draws as f64 * 100.0
            } else {
                0.0
            }
        })
        .collect()
}

fn combine(main: &[u8], lucky: &[u8]) -> Draw {
    let mut slots = [0u8; SLOT_COUNT];
    slots[..MAIN_COUNT].copy_from_slice(main);
    slots[MAIN_COUNT..].copy_from_slice(lucky);
    Draw::from_slots(slots)
}

/// Combinations already seen during one invocation. Never shared between invocations.
#[derive(Default)]
struct SearchMemo {
    tried_main: HashSet<Vec<u8>>,
    tried_lucky: HashSet<Vec<u8>>,
    tried_combined: HashSet<Draw>,
}

struct Best {
    combination: Draw,
    score: f64,
    probabilities: Vec<f64>,
}

fn finish(
    best: Option<Best>,
    iterations: u64,
    accepted: bool,
    rejections: RejectionStats,
) -> GenerationResult {
    let (best_combination, best_score, best_positional_probabilities) = match best {
        Some(b) => (Some(b.combination), b.score, Some(b.probabilities)),
        None => (None, 0.0, None),
    };
    GenerationResult {
        best_combination,
        best_score,
        best_positional_probabilities,
        iterations,
        accepted,
        rejections,
    }
}

/// Samples candidates until one scores at least `config.min_score` or the iteration
/// budget runs out, returning the best candidate that passed every filter.
pub fn generate_valid_number_set<R: Rng + ?Sized>(
    history: &[Draw],
    config: &GenerationConfig,
    rng: &mut R,
) -> Result<GenerationResult> {
    if history.is_empty() {
        return Err(LotpickError::EmptyHistory);
    }
    config.validate()?;

    log::info!("Running lottery number generator. Max iterations: {}", config.max_iterations);

    let reject_level = if config.debug { Level::Debug } else { Level::Trace };
    let historical: HashSet<Draw> = history.iter().copied().collect();
    let counters = position_counters(history);
    let total_draws = history.len();

    let mut memo = SearchMemo::default();
    let mut stats = RejectionStats::default();
    let mut best: Option<Best> = None;
    let mut best_iteration = 0;

    for iteration in 1..=config.max_iterations {
        let main = generate_unique_numbers(
            &mut *rng,
            config.count_main,
            config.min_main,
            config.max_main,
            &memo.tried_main,
            config.max_unique_attempts,
        )?;

        if let Some(rejection) = check_main_numbers(&main, config) {
            log::log!(reject_level, "Iteration {}: {:?} {}. Regenerating...", iteration, main, rejection);
            stats.record(rejection);
            memo.tried_main.insert(main);
            continue;
        }

        let lucky = generate_unique_numbers(
            &mut *rng,
            config.count_lucky,
            config.min_lucky,
            config.max_lucky,
            &memo.tried_lucky,
            config.max_unique_attempts,
        )?;

        if let Some(rejection) = check_lucky_numbers(&lucky, config) {
            log::log!(reject_level, "Iteration {}: {:?} {}. Regenerating...", iteration, lucky, rejection);
            stats.record(rejection);
            memo.tried_lucky.insert(lucky);
            continue;
        }

        let combination = combine(&main, &lucky);

        if !memo.tried_combined.insert(combination) {
            log::log!(reject_level, "Iteration {}: {} {}", iteration, combination, Rejection::GenerationDuplicate);
            stats.record(Rejection::GenerationDuplicate);
            continue;
        }

        if historical.contains(&combination) {
            log::log!(reject_level, "Iteration {}: {} {}", iteration, combination, Rejection::HistoricalDuplicate);
            stats.record(Rejection::HistoricalDuplicate);
            continue;
        }

        let probabilities = positional_probabilities(&combination, &counters, total_draws);
        let score = probabilities.iter().sum::<f64>() / probabilities.len() as f64;

        // the first survivor is kept even at score 0, later ones must beat it
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(Best {
                combination,
                score,
                probabilities,
            });
            best_iteration = iteration;
        }

        if score >= config.min_score {
            log::info!("Iteration {}: valid combination found with score {:.2}%", iteration, score);
            return Ok(finish(best, iteration, true, stats));
        }
    }

    log::info!(
        "Max iterations reached. Best score so far: {:.2}%. Found at iteration {}",
        best.as_ref().map_or(0.0, |b| b.score),
        best_iteration
    );
    Ok(finish(best, config.max_iterations, false, stats))
}

/// Seeded entry point; `None` draws a fresh seed from the thread RNG.
pub fn generate(
    history: &[Draw],
    config: &GenerationConfig,
    seed: Option<u64>,
) -> Result<GenerationResult> {
    let mut rng: StdRng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    generate_valid_number_set(history, config, &mut rng)
}
