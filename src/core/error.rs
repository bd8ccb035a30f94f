// Error types shared by the feedback core.

use thiserror::Error;

/// Failures reported by the external speech / vibration devices.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("voice data for '{0}' is not installed")]
    MissingVoiceData(String),

    #[error("language '{0}' is not supported by the speech engine")]
    UnsupportedLanguage(String),

    #[error("device unavailable")]
    Unavailable,

    #[error("device call failed: {0}")]
    Failed(String),
}

impl DeviceError {
    /// Configuration errors leave the engine unusable until settings change;
    /// everything else is transient.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingVoiceData(_) | Self::UnsupportedLanguage(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported language code '{0}'")]
    UnsupportedLanguage(String),

    #[error("invalid rotation {0} (expected 0, 90, 180 or 270)")]
    InvalidRotation(u32),

    #[error("trace line {line}: {message}")]
    Trace { line: usize, message: String },

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("feedback service is no longer running")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, FeedbackError>;
