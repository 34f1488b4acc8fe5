use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Config file not found. Looked in:\n\
        - GATEFLOW_CONFIG environment variable\n\
        - current directory: gateflow.local.yaml, .gateflow.local.yaml, gateflow.yaml, .gateflow.yaml\n\
        - ./.gateflow/ directory\n\
        - ~/.config/gateflow/gateflow.yaml"
    )]
    ConfigFileNotFound,

    #[error("Config file {path} does not exist")]
    ExplicitPathMissing { path: String },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
