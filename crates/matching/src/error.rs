//! Error type for the matching engine (C5).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchingError {
    #[error("invalid bounds: min_cycle_length {min} > max_cycle_length {max}")]
    InvalidBounds { min: usize, max: usize },

    #[error("min_cycle_length must be at least 2, got {0}")]
    CycleLengthTooShort(usize),
}

pub type Result<T> = std::result::Result<T, MatchingError>;
