use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Intent;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Unknown intent: {0}")]
    UnknownIntent(String),

    #[error("Intent classification failed: {0}")]
    Classification(String),

    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("No task executor is bound for intent '{0}'")]
    UnsupportedIntent(Intent),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serializable discriminant carried by failure envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidConfig,
    NotFound,
    Operation,
    Classification,
    RetrievalUnavailable,
    UnsupportedIntent,
    Generation,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Operation(_) => ErrorKind::Operation,
            Error::UnknownIntent(_) | Error::Classification(_) => ErrorKind::Classification,
            Error::RetrievalUnavailable(_) => ErrorKind::RetrievalUnavailable,
            Error::UnsupportedIntent(_) => ErrorKind::UnsupportedIntent,
            Error::Generation(_) => ErrorKind::Generation,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn classification(err: &anyhow::Error) -> Self {
        Error::Classification(format!("{err:#}"))
    }

    pub fn retrieval_unavailable(err: &anyhow::Error) -> Self {
        Error::RetrievalUnavailable(format!("{err:#}"))
    }

    pub fn generation(err: &anyhow::Error) -> Self {
        Error::Generation(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
