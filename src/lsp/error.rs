//! Error type surfaced by connection management and request exchange.

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

use crate::lsp::parser::FrameError;

/// Errors produced while connecting to, exchanging with, or shutting down
/// the language server.
#[derive(Debug, Error)]
pub enum LspError {
    /// The request could not be serialized to JSON.
    #[error("unable to serialize request: {0}")]
    Encode(#[source] serde_json::Error),

    /// A frame write failed.
    #[error("error sending request to server: {0}")]
    Write(#[source] io::Error),

    /// A stream read failed while waiting for the response.
    #[error("error reading server response: {0}")]
    Read(#[source] io::Error),

    /// The stream ended before a response was produced.
    #[error("server closed the connection before responding")]
    UnexpectedEof,

    /// The response bytes could not be framed or decoded.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// `connect` was called on an already connected server.
    #[error("already connected to server")]
    AlreadyConnected,

    /// A stdio connect was requested without a configured subprocess.
    #[error("no language server subprocess present")]
    NoSubprocess,

    /// A send was attempted before `connect`.
    #[error("not connected to server")]
    NotConnected,

    /// The subprocess could not be started.
    #[error("unable to start language server: {0}")]
    Spawn(#[source] io::Error),

    /// The server address could not be dialed.
    #[error("unable to connect to language server: {0}")]
    Dial(#[source] io::Error),

    /// Waiting for the subprocess to terminate failed.
    #[error("error waiting for language server exit: {0}")]
    Wait(#[source] io::Error),

    /// The subprocess terminated with a failure status.
    #[error("language server exited unsuccessfully: {0}")]
    UncleanExit(ExitStatus),
}
