//! Protocol engine for talking to a Language Server Protocol server.
//!
//! This module owns everything between a JSON-RPC request and the bytes on
//! the wire: connection lifecycle, framing, and the request/response
//! exchange.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐      stdio pipes / TCP       ┌─────────────────────┐
//! │  HTTP gateway   │  ◄──────────────────────────►│  language server    │
//! │ (Client/Server) │   JSON-RPC 2.0 + framing     │ (rust-analyzer, ..) │
//! └─────────────────┘                              └─────────────────────┘
//! ```
//!
//! `Server` manages the connection, spawning the language server as a
//! subprocess when asked to. `Client` performs one locked send/receive
//! exchange at a time, and `ResponseParser` reassembles response frames
//! from whatever chunks the transport yields.
//!
//! # Protocol
//!
//! Messages use HTTP-style Content-Length framing:
//!
//! ```text
//! Content-Length: 60\r\n
//! \r\n
//! {"jsonrpc":"2.0","id":"1","method":"initialize","params":{}}
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use lspgate::lsp::{Client, Request, Server, CONNECT_STDIO};
//!
//! let server = Server::subprocess("rust-analyzer", vec![]);
//! server.connect(CONNECT_STDIO).await?;
//! let response = Client::new(&server)
//!     .send(Request::new("1", "initialize", None))
//!     .await?;
//! ```

mod client;
mod error;
mod parser;
mod protocol;
mod server;
mod transport;

pub use client::Client;
pub use error::LspError;
pub use parser::{FrameError, ResponseParser};
pub use protocol::{Request, Response, ResponseError, JSONRPC_VERSION};
pub use server::{Server, CONNECT_STDIO};
pub use transport::Transport;
