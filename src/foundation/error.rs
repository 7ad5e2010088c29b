pub type ReelResult<T> = Result<T, ReelError>;

#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    #[error("validation error: {0}")]
    Validation(String),

    /// The user (or the platform) refused the capture permission prompt.
    #[error("capture permission denied: {0}")]
    CaptureDenied(String),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("recorder error: {0}")]
    Recorder(String),

    #[error("sequence error: {0}")]
    Sequence(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn capture_denied(msg: impl Into<String>) -> Self {
        Self::CaptureDenied(msg.into())
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    pub fn recorder(msg: impl Into<String>) -> Self {
        Self::Recorder(msg.into())
    }

    pub fn sequence(msg: impl Into<String>) -> Self {
        Self::Sequence(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Acquisition failures (denied or otherwise) leave no session behind.
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(self, Self::CaptureDenied(_) | Self::Capture(_))
    }
}

impl From<serde_json::Error> for ReelError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}
