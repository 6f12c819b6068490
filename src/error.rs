use thiserror::Error;

/// Failures raised by the indicator pipeline before any value is computed.
///
/// An undefined percentile is not an error: it is carried as `None`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IndicatorError {
    #[error("invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("empty price series")]
    EmptySeries,
}

impl IndicatorError {
    pub(crate) fn invalid(name: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
