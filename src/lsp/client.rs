//! Request/response exchange with the connected server.

use tracing::debug;

use crate::lsp::error::LspError;
use crate::lsp::parser::ResponseParser;
use crate::lsp::protocol::{Request, Response, JSONRPC_VERSION};
use crate::lsp::server::Server;
use crate::lsp::transport::READ_BUFFER_SIZE;

/// Sends requests to a `Server` and reads back the matching response.
///
/// Cheap to construct; holds no state of its own. The connection lock is
/// taken per send and held until the response frame completes, so frames
/// from concurrent callers never interleave on the wire.
pub struct Client<'a> {
    server: &'a Server,
}

impl<'a> Client<'a> {
    pub fn new(server: &'a Server) -> Self {
        Self { server }
    }

    /// Send one request and read its response.
    ///
    /// The protocol version is stamped on the request before encoding, so
    /// callers never set it. A request with an empty id is a notification:
    /// it is written and the call returns immediately with a marker
    /// response, without reading from the server.
    ///
    /// # Errors
    ///
    /// Fails when not connected, on encode/write/read errors, when the
    /// server closes the connection mid-response, or when the response
    /// frame is malformed.
    pub async fn send(&self, mut req: Request) -> Result<Response, LspError> {
        let mut guard = self.server.connection().await;
        let conn = guard.as_mut().ok_or(LspError::NotConnected)?;

        req.jsonrpc = JSONRPC_VERSION.to_owned();
        let body = serde_json::to_vec(&req).map_err(LspError::Encode)?;
        let headers = format!("Content-Length: {}\r\n\r\n", body.len());
        debug!("sending {} ({} bytes)", req.method, body.len());

        conn.transport
            .write(headers.as_bytes())
            .await
            .map_err(LspError::Write)?;
        conn.transport.write(&body).await.map_err(LspError::Write)?;

        if req.id.is_empty() {
            return Ok(Response {
                notification: true,
                ..Response::default()
            });
        }

        let mut parser = ResponseParser::new();
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            let n = conn.transport.read(&mut buf).await.map_err(LspError::Read)?;
            if n == 0 {
                return Err(LspError::UnexpectedEof);
            }
            if let Some(response) = parser.feed(&buf[..n])? {
                return Ok(response);
            }
        }
    }
}
