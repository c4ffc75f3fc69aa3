//! Running generator invocations off the calling thread.
//!
//! Each invocation owns its memo sets; only the historical draws are shared, read-only.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rayon::prelude::*;

use lotpick_db::models::Draw;

use crate::config::GenerationConfig;
use crate::error::{LotpickError, Result};
use crate::generator::{generate, GenerationResult};

/// Pending result of a generation running on its own thread.
///
/// Dropping the handle abandons the run: the thread finishes on its own and its
/// result is discarded. Partial progress is never observable.
pub struct GenerationHandle {
    receiver: Receiver<Result<GenerationResult>>,
}

pub fn spawn_generation(
    history: Arc<[Draw]>,
    config: GenerationConfig,
    seed: Option<u64>,
) -> GenerationHandle {
    let (sender, receiver) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("lotpick-generator".into())
        .spawn(move || {
            let result = generate(&history, &config, seed);
            if sender.send(result).is_err() {
                log::debug!("Generation finished after its handle was dropped");
            }
        });
    // the sender died with the closure, so the handle reports WorkerLost
    if let Err(e) = spawned {
        log::error!("Cannot spawn generator thread: {}", e);
    }
    GenerationHandle { receiver }
}

impl GenerationHandle {
    /// Non-blocking poll.
    pub fn try_result(&self) -> Option<Result<GenerationResult>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(LotpickError::WorkerLost)),
        }
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<GenerationResult>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(LotpickError::WorkerLost)),
        }
    }

    pub fn join(self) -> Result<GenerationResult> {
        self.receiver.recv().map_err(|_| LotpickError::WorkerLost)?
    }
}

/// Runs one independent invocation per configuration in parallel.
/// With a seed, run `i` uses `seed + i` so the batch is reproducible.
pub fn generate_batch(
    history: &[Draw],
    configs: &[GenerationConfig],
    seed: Option<u64>,
) -> Vec<Result<GenerationResult>> {
    configs
        .par_iter()
        .enumerate()
        .map(|(i, config)| generate(history, config, seed.map(|s| s.wrapping_add(i as u64))))
        .collect()
}
