//! Domain error types.

use chrono::{DateTime, Utc};

use crate::domain::resolution::Resolution;

/// Top-level error type for quantframe.
#[derive(Debug, thiserror::Error)]
pub enum QuantframeError {
    #[error("out-of-order update for {symbol}: {time} is before last update {last}")]
    OutOfOrderUpdate {
        symbol: String,
        time: DateTime<Utc>,
        last: DateTime<Utc>,
    },

    #[error("index {index} out of range (valid {first}..={end})")]
    IndexOutOfRange { index: i64, first: i64, end: i64 },

    #[error("unknown instrument: {symbol}")]
    UnknownInstrument { symbol: String },

    #[error("unknown resolution {resolution} for {symbol}")]
    UnknownResolution {
        symbol: String,
        resolution: Resolution,
    },

    #[error("invalid range: {reason}")]
    InvalidRange { reason: String },

    #[error("missing or mistyped parameter {key}: {reason}")]
    MissingOrMistypedParameter { key: String, reason: String },

    #[error("strategy construction failed: {reason}")]
    StrategyConstructionFailed { reason: String },

    #[error("replay failed for {strategy}: {reason}")]
    ReplayFailed { strategy: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuantframeError {
    pub(crate) fn index_out_of_range(index: i64, first: Option<usize>, end: Option<usize>) -> Self {
        QuantframeError::IndexOutOfRange {
            index,
            first: first.map_or(0, |f| f as i64),
            end: end.map_or(-1, |e| e as i64),
        }
    }

    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        QuantframeError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&QuantframeError> for std::process::ExitCode {
    fn from(err: &QuantframeError) -> Self {
        let code: u8 = match err {
            QuantframeError::Io(_) => 1,
            QuantframeError::ConfigParse { .. }
            | QuantframeError::ConfigMissing { .. }
            | QuantframeError::ConfigInvalid { .. } => 2,
            QuantframeError::DataSource { .. } => 3,
            QuantframeError::InvalidRange { .. }
            | QuantframeError::MissingOrMistypedParameter { .. } => 4,
            QuantframeError::OutOfOrderUpdate { .. }
            | QuantframeError::IndexOutOfRange { .. }
            | QuantframeError::UnknownInstrument { .. }
            | QuantframeError::UnknownResolution { .. } => 5,
            QuantframeError::StrategyConstructionFailed { .. }
            | QuantframeError::ReplayFailed { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
