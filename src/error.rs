use std::{error::Error as StdError, io, path::PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FittsError>;

#[derive(Error, Debug)]
pub enum FittsError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Platform not supported")]
    PlatformNotSupported,

    #[error("Signal handling error")]
    SignalHandling {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create file {path}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[cfg(windows)]
    #[error(transparent)]
    Ctrlc(#[from] ctrlc::Error),
}

impl From<toml::de::Error> for FittsError {
    fn from(err: toml::de::Error) -> Self {
        FittsError::Config(format!("TOML parse error: {err}"))
    }
}
