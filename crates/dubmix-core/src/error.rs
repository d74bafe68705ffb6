//! Error types for dubmix

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DubmixError {
    #[error("Unknown frequency band: {0}")]
    UnknownBand(String),
    #[error("Unknown siren mode: {0}")]
    UnknownSirenMode(String),
    #[error("EQ band index out of range: {0}")]
    EqIndexOutOfRange(usize),
}

pub type Result<T> = std::result::Result<T, DubmixError>;
