use std::fmt::{self, Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapError {
    Config(String),
    Io(#[from] std::io::Error),
    Internal(String),
    Serialization(String),
}

impl Display for SnapError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            SnapError::Config(s) => write!(f, "Configuration error: {}", s),
            SnapError::Io(e) => write!(f, "I/O error: {}", e),
            SnapError::Internal(s) => write!(f, "Internal error: {}", s),
            SnapError::Serialization(s) => write!(f, "Serialization error: {}", s),
        }
    }
}

impl SnapError {
    pub fn config(message: impl Into<String>) -> Self {
        SnapError::Config(message.into())
    }
}

impl From<serde_yaml_ng::Error> for SnapError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        SnapError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SnapError {
    fn from(err: serde_json::Error) -> Self {
        SnapError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SnapError>;
