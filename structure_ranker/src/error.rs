// src/error.rs

use thiserror::Error;

/// Why a single structure or domain row was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedReason {
    #[error("start residue {start} is after end residue {end}")]
    InvertedRange { start: i64, end: i64 },
    #[error("residue number {0} is outside 1..={max}", max = u32::MAX)]
    ResidueOutOfRange(i64),
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("resolution '{0}' is not a number")]
    UnparsableResolution(String),
    #[error("resolution {0} is not a positive finite value")]
    NonPositiveResolution(f64),
    #[error("chain listing '{0}' is not of the form A/B=start-end")]
    UnparsableChains(String),
    #[error("no chain spans given")]
    NoChains,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankerError {
    #[error("malformed record '{record}': {reason}")]
    MalformedRecord {
        record: String,
        reason: MalformedReason,
    },
}

impl RankerError {
    pub(crate) fn malformed(record: impl Into<String>, reason: MalformedReason) -> Self {
        RankerError::MalformedRecord {
            record: record.into(),
            reason,
        }
    }

    pub fn record(&self) -> &str {
        match self {
            RankerError::MalformedRecord { record, .. } => record,
        }
    }
}

pub type RankerResult<T> = Result<T, RankerError>;
