//! Domain error types.

/// Top-level error type for alphatester.
///
/// The first three variants are raised by the pure core; the rest come from
/// the adapters and the CLI around it.
#[derive(Debug, thiserror::Error)]
pub enum AlphaError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("misaligned series: {reason}")]
    MisalignedSeries { reason: String },

    #[error("insufficient data: {reason}")]
    InsufficientData { reason: String },

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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AlphaError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        AlphaError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn misaligned(reason: impl Into<String>) -> Self {
        AlphaError::MisalignedSeries {
            reason: reason.into(),
        }
    }
}

impl From<&AlphaError> for std::process::ExitCode {
    fn from(err: &AlphaError) -> Self {
        let code: u8 = match err {
            AlphaError::Io(_) => 1,
            AlphaError::ConfigParse { .. }
            | AlphaError::ConfigMissing { .. }
            | AlphaError::ConfigInvalid { .. } => 2,
            AlphaError::Data { .. } => 3,
            AlphaError::InvalidParameter { .. } => 4,
            AlphaError::MisalignedSeries { .. } | AlphaError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
