//! Errors raised by the analyzer and the generator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LotpickError {
    /// A bounded unique-number draw could not find a combination that had not been tried yet.
    #[error(
        "Could not generate a unique set of {count} numbers in {min}-{max} after {attempts} attempts"
    )]
    ConfigurationInfeasible {
        count: usize,
        min: u8,
        max: u8,
        attempts: u32,
    },

    #[error("Historical set is empty")]
    EmptyHistory,

    #[error("Malformed draw at index {index}: {reason}")]
    MalformedDraw { index: usize, reason: String },

    #[error("Invalid generation config: {0}")]
    InvalidConfig(String),

    #[error("Generation worker stopped before returning a result")]
    WorkerLost,
}

pub type Result<T> = std::result::Result<T, LotpickError>;
