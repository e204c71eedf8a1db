use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, DeployerError>;

/// Errors surfaced by the deployer.
///
/// Credential and function-filter errors abort a deploy before any packaging
/// happens; packaging and provider errors are caught per function so the
/// remaining functions still get their turn.
#[derive(Debug, thiserror::Error)]
pub enum DeployerError {
    #[error(
        "configuration file '{0}' not found. Run 'serverless-deployer init' to create it"
    )]
    ConfigNotFound(String),

    #[error("{0}")]
    CredentialsMissing(String),

    #[error("function '{0}' not found in configuration")]
    FunctionNotFound(String),

    #[error("path '{0}' does not exist or is not a file/directory")]
    InvalidPath(PathBuf),

    #[error("provider request failed: {0}")]
    ProviderRequest(String),

    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}
