//! Error types for genmeta.
//!
//! Internal stages report failures through `GenmetaError`. The parser boundary
//! never hands these to the caller as fatal: they are folded into the note of a
//! [`crate::ParseOutcome`].

use std::{io::ErrorKind, string::FromUtf8Error};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all genmeta operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum GenmetaError {
    /// The input is not a PNG/JPEG, or it is empty.
    #[error("unreadable input: {0}")]
    Unreadable(String),

    /// A payload could not be decoded at any pipeline stage.
    #[error("{0}")]
    Decode(String),

    /// Data conversion errors (JSON, base64, etc.).
    #[error("{0}")]
    Convert(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Workflow graph construction errors.
    #[error("{0}")]
    Graph(String),

    /// A flat-schema extractor found its payload but could not use it.
    #[error("{0}")]
    Extract(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

impl From<GenmetaError> for String {
    fn from(val: GenmetaError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for GenmetaError {
    fn from(error: std::io::Error) -> Self {
        GenmetaError::IoError(error.to_string())
    }
}

impl From<GenmetaError> for std::io::Error {
    fn from(val: GenmetaError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<FromUtf8Error> for GenmetaError {
    fn from(_: FromUtf8Error) -> Self {
        GenmetaError::Convert("Error with utf-8 string convert".to_string())
    }
}

impl From<serde_json::Error> for GenmetaError {
    fn from(error: serde_json::Error) -> Self {
        GenmetaError::Convert(error.to_string())
    }
}

impl From<base64::DecodeError> for GenmetaError {
    fn from(error: base64::DecodeError) -> Self {
        GenmetaError::Decode(error.to_string())
    }
}

impl From<toml::de::Error> for GenmetaError {
    fn from(error: toml::de::Error) -> Self {
        GenmetaError::Config(error.to_string())
    }
}
