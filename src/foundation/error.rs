/// Result alias used across the crate.
pub type SlidecastResult<T> = Result<T, SlidecastError>;

/// Error type for all library operations.
#[derive(thiserror::Error, Debug)]
pub enum SlidecastError {
    /// Invalid input or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// The operation needs assets that are not loaded yet.
    #[error("not ready: {0}")]
    NotReady(String),

    /// The operation conflicts with an active preview or export.
    #[error("busy: {0}")]
    Busy(String),

    /// Audio playback could not start or continue.
    #[error("playback error: {0}")]
    Playback(String),

    /// Capture pipeline could not be prepared.
    #[error("capture error: {0}")]
    Capture(String),

    /// Encoder failure.
    #[error("encode error: {0}")]
    Encode(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Catch-all with source chain preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlidecastError {
    /// Build a [`SlidecastError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SlidecastError::NotReady`].
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    /// Build a [`SlidecastError::Busy`].
    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy(msg.into())
    }

    /// Build a [`SlidecastError::Playback`].
    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback(msg.into())
    }

    /// Build a [`SlidecastError::Capture`].
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    /// Build a [`SlidecastError::Encode`].
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`SlidecastError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}
