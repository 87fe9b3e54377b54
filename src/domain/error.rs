//! Domain error types.

use chrono::NaiveDateTime;

/// Why the order simulator refused an order.
///
/// Carried on rejected [`OrderEvent`](crate::domain::order::OrderEvent)s, so it
/// has to be `Clone` and comparable; converts into [`ReplayError`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderRejection {
    #[error("invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error("margin exceeded: exposure {required:.2} over limit {available:.2}")]
    MarginExceeded { required: f64, available: f64 },
}

/// Top-level error type for tickreplay.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("no data for {symbol} between {start} and {end}")]
    DataGap {
        symbol: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("indicator {indicator} is not ready ({samples}/{period} samples)")]
    NotReady {
        indicator: String,
        samples: usize,
        period: usize,
    },

    #[error("invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error("margin exceeded: exposure {required:.2} over limit {available:.2}")]
    MarginExceeded { required: f64, available: f64 },

    #[error("data provider error: {reason}")]
    Data { reason: String },

    #[error("strategy error: {reason}")]
    Strategy { reason: String },

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

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<OrderRejection> for ReplayError {
    fn from(rejection: OrderRejection) -> Self {
        match rejection {
            OrderRejection::InvalidOrder { reason } => ReplayError::InvalidOrder { reason },
            OrderRejection::MarginExceeded {
                required,
                available,
            } => ReplayError::MarginExceeded {
                required,
                available,
            },
        }
    }
}

impl From<&ReplayError> for std::process::ExitCode {
    fn from(err: &ReplayError) -> Self {
        let code: u8 = match err {
            ReplayError::Io(_) => 1,
            ReplayError::ConfigParse { .. }
            | ReplayError::ConfigMissing { .. }
            | ReplayError::ConfigInvalid { .. } => 2,
            ReplayError::Data { .. } => 3,
            ReplayError::Strategy { .. }
            | ReplayError::NotReady { .. }
            | ReplayError::InvalidOrder { .. }
            | ReplayError::MarginExceeded { .. } => 4,
            ReplayError::DataGap { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
