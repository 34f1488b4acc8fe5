//! Cloud provider error types

use thiserror::Error;

/// Errors raised by the graph builder, the orchestrator and providers
#[derive(Error, Debug)]
pub enum CloudError {
    /// Bad or missing input, detected before any provider call
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The provider rejected a call; the message is the provider's own
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn config(message: impl Into<String>) -> Self {
        CloudError::Configuration(message.into())
    }

    pub fn provider(message: impl Into<String>) -> Self {
        CloudError::Provider(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
