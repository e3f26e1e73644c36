//! lspgate library
//!
//! Core components for the lspgate HTTP gateway:
//!
//! - `lsp` - protocol engine: connection lifecycle, framing, and the
//!   JSON-RPC request/response exchange with a language server
//! - `gateway` - HTTP front end mapping `POST /lsp/{method}` calls onto
//!   that exchange
//!
//! # LSP Module
//!
//! The `lsp` module can be used on its own to drive a language server:
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

pub mod gateway;
pub mod lsp;
