// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for runez operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with runez Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during runez operations.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// An operation failed while running with a fatal policy
    #[error("{message}")]
    #[diagnostic(code(runez::aborted))]
    Aborted { message: String, code: i32 },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(runez::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to write file
    #[error("Failed to write file: {path:?}")]
    #[diagnostic(code(runez::write_failed))]
    WriteFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Text could not be deserialized as json
    #[error("Invalid json: {message}")]
    #[diagnostic(
        code(runez::invalid_json),
        help("Only objects, lists and strings are accepted as json documents")
    )]
    InvalidJson {
        message: String,
        #[source]
        error: Option<serde_json::Error>,
    },

    /// Program is missing from PATH
    #[error("{program} is not installed")]
    #[diagnostic(code(runez::not_installed), help("{instructions}"))]
    NotInstalled {
        program: String,
        instructions: String,
    },

    /// Validation error
    #[error("Validation failed: {0}")]
    #[diagnostic(code(runez::validation_failed))]
    ValidationFailed(String),

    /// Logging could not be set up
    #[error("Logging setup failed: {0}")]
    #[diagnostic(code(runez::logging))]
    Logging(String),

    /// Archive could not be read or written
    #[error("Archive error: {0}")]
    #[diagnostic(code(runez::archive))]
    Archive(#[from] zip::result::ZipError),

    /// Http client could not be set up, or a response body could not be read
    #[error("Http error: {0}")]
    #[diagnostic(code(runez::http))]
    Http(#[from] reqwest::Error),

    /// JSON error passthrough
    #[error(transparent)]
    #[diagnostic(code(runez::json_error))]
    Json(#[from] serde_json::Error),

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(runez::io_error))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Exit code to use when this error terminates a program.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Aborted { code, .. } => *code,
            _ => 1,
        }
    }
}
