use thiserror::Error;

pub type BindingResult<T> = Result<T, BindingError>;

pub type EngineResult<T> = Result<T, EngineRejection>;

/// Error raised by an engine that refuses a configuration.
///
/// Bindings propagate it unchanged; they never interpret or retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineRejection {
    #[error("invalid transformation options: {0}")]
    InvalidTransformation(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("unknown handle: {0}")]
    UnknownHandle(String),

    #[error("engine construction failed: {0}")]
    Construction(String),
}

#[derive(Debug, Error)]
pub enum BindingError {
    /// The engine scope was resolved before the host created its engine, or
    /// after the host was torn down.
    #[error("engine context is unavailable: bindings must live under a mounted engine host")]
    ContextUnavailable,

    #[error("`{binding}` handle was already destroyed")]
    HandleDestroyed { binding: &'static str },

    #[error("`{binding}` handle is not ready yet")]
    NotReady { binding: &'static str },

    #[error(transparent)]
    EngineRejected(#[from] EngineRejection),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl BindingError {
    /// `true` for errors caused by wrong composition of bindings by the host
    /// application, as opposed to engine refusals.
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::ContextUnavailable | Self::HandleDestroyed { .. } | Self::NotReady { .. }
        )
    }
}
