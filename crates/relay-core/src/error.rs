use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("endpoint not found: {0}")]
    EndpointNotFound(String),

    #[error("no endpoints configured")]
    NoEndpoints,

    #[error("send to '{target}' failed: {detail}")]
    SendFailed { target: String, detail: String },

    #[error("capture from '{target}' failed: {detail}")]
    CaptureFailed { target: String, detail: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
