use thiserror::Error;

/// Process-local failures: configuration, disk state, and bootstrap.
/// Remote-service failures live with their collaborator traits instead.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("bad configuration: {message}")]
    Configuration { message: String },
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("local state: {message}")]
    State { message: String },
    #[error("telemetry setup: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Configuration { message }
    }

    pub fn state(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::State { message }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
