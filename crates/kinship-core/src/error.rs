use thiserror::Error;

/// Top-level error type shared by the kinship crates.
#[derive(Error, Debug)]
pub enum KinshipError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
