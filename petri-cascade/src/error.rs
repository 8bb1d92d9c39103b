use std::io;

use crate::config::NetConfigBuilderError;

#[derive(thiserror::Error, Debug)]
pub enum PetriError {
    #[error("Filesystem error: {0}")]
    IOError(#[from] io::Error),
    #[error("Net definition could not be parsed: {0}")]
    DefinitionError(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    NetConfigError(#[from] NetConfigBuilderError),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("No source place named '{0}'")]
    UnknownSource(String),
    #[error("Cascade exceeded the maximum depth of {0}, is the net cyclic?")]
    CascadeDepthExceeded(usize),
}

pub type Result<T> = std::result::Result<T, PetriError>;
