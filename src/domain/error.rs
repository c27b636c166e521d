//! Domain error types.

/// Top-level error type for swingtrader.
#[derive(Debug, thiserror::Error)]
pub enum SwingtraderError {
    #[error("invalid series: {reason}")]
    InvalidSeries { reason: String },

    #[error("insufficient pivots: have {found}, need at least 2")]
    InsufficientPivots { found: usize },

    #[error("out of range: {reason}")]
    OutOfRange { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

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

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SwingtraderError {
    pub(crate) fn invalid_series(reason: impl Into<String>) -> Self {
        SwingtraderError::InvalidSeries {
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_range(reason: impl Into<String>) -> Self {
        SwingtraderError::OutOfRange {
            reason: reason.into(),
        }
    }
}

impl From<&SwingtraderError> for std::process::ExitCode {
    fn from(err: &SwingtraderError) -> Self {
        let code: u8 = match err {
            SwingtraderError::Io(_) | SwingtraderError::Report { .. } => 1,
            SwingtraderError::ConfigParse { .. }
            | SwingtraderError::ConfigMissing { .. }
            | SwingtraderError::ConfigInvalid { .. } => 2,
            SwingtraderError::Data { .. } => 3,
            SwingtraderError::InvalidSeries { .. }
            | SwingtraderError::InsufficientPivots { .. }
            | SwingtraderError::OutOfRange { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
