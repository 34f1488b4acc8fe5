//! Google Cloud provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GcpError {
    #[error("gcloud not found. Please install the Google Cloud SDK: https://cloud.google.com/sdk")]
    GcloudNotFound,

    #[error("gcloud authentication failed: {0}")]
    AuthenticationFailed(String),

    /// gcloud exited non-zero; carries its stderr verbatim
    #[error("{0}")]
    CommandFailed(String),

    #[error("Missing parameter '{key}' for resource {resource}")]
    MissingParameter { resource: String, key: String },

    #[error("Unexpected gcloud output: {0}")]
    UnexpectedOutput(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] gateflow_cloud::CloudError),
}

impl From<GcpError> for gateflow_cloud::CloudError {
    fn from(error: GcpError) -> Self {
        use gateflow_cloud::CloudError;

        match error {
            GcpError::GcloudNotFound => CloudError::CommandFailed(error.to_string()),
            GcpError::AuthenticationFailed(message) => CloudError::AuthenticationFailed(message),
            GcpError::CommandFailed(stderr) => CloudError::Provider(stderr.trim().to_string()),
            GcpError::MissingParameter { .. } => CloudError::Configuration(error.to_string()),
            GcpError::UnexpectedOutput(message) => CloudError::Provider(message),
            GcpError::JsonError(e) => CloudError::Json(e),
            GcpError::IoError(e) => CloudError::Io(e),
            GcpError::CloudError(e) => e,
        }
    }
}

pub type Result<T> = std::result::Result<T, GcpError>;
