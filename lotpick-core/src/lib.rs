pub mod config;
pub mod error;
pub mod generator;
pub mod patterns;
pub mod stats;
pub mod thresholds;
pub mod worker;

use rand::rngs::StdRng;
use rand::SeedableRng;

use lotpick_db::models::{Draw, LUCKY_COUNT, MAIN_COUNT};

pub use config::GenerationConfig;
pub use error::{LotpickError, Result};
pub use generator::{generate, GenerationResult, RejectionStats};
pub use thresholds::{analyze, Bounds, Thresholds};
pub use worker::{generate_batch, spawn_generation, GenerationHandle};

/// Parses raw 7-field rows into draws, reporting the first bad row by index.
pub fn parse_history<S: AsRef<str>>(rows: &[Vec<S>]) -> Result<Vec<Draw>> {
    if rows.is_empty() {
        return Err(LotpickError::EmptyHistory);
    }
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            Draw::parse_fields(row).map_err(|e| LotpickError::MalformedDraw {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Deterministic synthetic history on the default 1-50 / 1-11 layout, sorted within each block.
pub fn make_test_draws(n: usize, seed: u64) -> Vec<Draw> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let mut main = [0u8; MAIN_COUNT];
            for (slot, idx) in main.iter_mut().zip(rand::seq::index::sample(&mut rng, 50, MAIN_COUNT)) {
                *slot = idx as u8 + 1;
            }
            main.sort_unstable();
            let mut lucky = [0u8; LUCKY_COUNT];
            for (slot, idx) in lucky.iter_mut().zip(rand::seq::index::sample(&mut rng, 11, LUCKY_COUNT)) {
                *slot = idx as u8 + 1;
            }
            lucky.sort_unstable();
            Draw::new(main, lucky)
        })
        .collect()
}
