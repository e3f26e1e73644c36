//! HTTP front end that proxies requests to the language server.
//!
//! Each `POST /lsp/{method}` call becomes one JSON-RPC request: the path
//! tail (slashes included) is the method, the request body is `params`,
//! and the `X-LSP-Id` header is the request id. Omitting the id turns the
//! call into a notification, answered with `204 No Content`; an id the
//! gateway cannot read as a string is rejected. Gateway-level failures are
//! reported in the same JSON-RPC error shape the language server itself
//! would use, always with HTTP status 400.

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::lsp;

/// Request header carrying the JSON-RPC id for the proxied request.
pub const ID_HEADER: &str = "X-LSP-Id";

const LSP_PATH_PREFIX: &str = "/lsp/";

/// Accept connections on `addr` and serve the gateway until the listener
/// fails.
pub async fn serve(addr: &str, server: Arc<lsp::Server>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("unable to bind to {}", addr))?;

    loop {
        let (stream, peer) = listener.accept().await.context("accept failed")?;
        debug!("new connection from {}", peer);

        let server = Arc::clone(&server);
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| handle(req, Arc::clone(&server)));

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("error serving connection: {}", err);
            }
        });
    }
}

/// Route one HTTP request. Paths under `/lsp/` are proxied; everything
/// else is a plain 404.
pub async fn handle<B: Body>(
    req: Request<B>,
    server: Arc<lsp::Server>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_owned();
    let lsp_method = path.strip_prefix(LSP_PATH_PREFIX).map(str::to_owned);

    info!(
        "HTTP request: {} {} (lsp method: {})",
        req.method(),
        path,
        lsp_method.as_deref().unwrap_or("")
    );

    match lsp_method {
        Some(method) => {
            let lsp_response = proxy(req, &method, server).await;
            Ok(render(&lsp_response))
        }
        None => Ok(not_found()),
    }
}

/// Turn the HTTP request into a JSON-RPC exchange.
///
/// The body is decoded before anything else is validated, and a body that
/// is not valid JSON is reported under the id `"unknown"`, as is an id
/// header the gateway cannot read as a string. The HTTP and LSP methods
/// are checked next; only then is the request sent.
async fn proxy<B: Body>(
    req: Request<B>,
    lsp_method: &str,
    server: Arc<lsp::Server>,
) -> lsp::Response {
    let http_method = req.method().clone();
    let id = req
        .headers()
        .get(ID_HEADER)
        .map(|value| value.to_str().map(str::to_owned));

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    };

    let params: Value = match serde_json::from_slice(&body) {
        Ok(params) => params,
        Err(_) => return error_response("unknown", 400, "unable to unmarshal request json"),
    };

    let id = match id {
        None => String::new(),
        Some(Ok(id)) => id,
        Some(Err(_)) => return error_response("unknown", 400, "unable to read request id header"),
    };

    if http_method != Method::POST {
        return error_response(&id, 405, "method not allowed");
    }
    if lsp_method.is_empty() {
        return error_response(&id, 400, "no LSP method specified");
    }

    // A literal JSON null body means "no params", and the field is then
    // left out of the encoded request entirely.
    let params = match params {
        Value::Null => None,
        params => Some(params),
    };

    let request = lsp::Request::new(id.clone(), lsp_method, params);
    match lsp::Client::new(&server).send(request).await {
        Ok(response) => response,
        Err(e) => error_response(&id, 500, format!("proxy error: {}", e)),
    }
}

fn error_response(id: &str, code: i32, message: impl Into<String>) -> lsp::Response {
    lsp::Response {
        id: id.to_owned(),
        error: Some(lsp::ResponseError {
            code,
            message: message.into(),
            data: None,
        }),
        ..lsp::Response::default()
    }
}

/// Render a JSON-RPC response as HTTP.
///
/// Frame headers from the language server are copied onto the HTTP
/// response first; Content-Type and Content-Length are then set from the
/// actual HTTP body, overriding any copied value. Error payloads get
/// status 400, notifications 204 with an empty body, everything else 200.
fn render(lsp_response: &lsp::Response) -> Response<Full<Bytes>> {
    let data = if lsp_response.notification {
        Vec::new()
    } else {
        serde_json::to_vec(lsp_response).unwrap_or_else(|e| {
            error!("unable to marshal response json: {}", e);
            Vec::new()
        })
    };

    let mut response = Response::new(Full::new(Bytes::new()));

    // Header names the HTTP layer cannot represent are dropped.
    for (name, value) in &lsp_response.headers {
        let Ok(name) = HeaderName::try_from(name.as_str()) else {
            continue;
        };
        let Ok(value) = HeaderValue::try_from(value.as_str()) else {
            continue;
        };
        response.headers_mut().append(name, value);
    }

    if !lsp_response.notification {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
            .headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from(data.len()));
    }

    if lsp_response.error.is_some() {
        *response.status_mut() = StatusCode::BAD_REQUEST;
    } else if lsp_response.notification {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }

    *response.body_mut() = Full::new(Bytes::from(data));
    response
}

fn not_found() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from("404 page not found\n")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
