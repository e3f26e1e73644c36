//! Connection lifecycle for a language server.
//!
//! `Server` represents the language server being talked to, whether we
//! spawned it ourselves or it is managed externally. It owns the connection
//! state and the single lock that serializes request exchanges; `Client`
//! takes the lock for each send, so the manager itself never locks on the
//! send path.

use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, warn};

use crate::lsp::client::Client;
use crate::lsp::error::LspError;
use crate::lsp::protocol::Request;
use crate::lsp::transport::{Transport, READ_BUFFER_SIZE};

/// Connect method selecting the subprocess's stdio pipes instead of a
/// dialed address.
pub const CONNECT_STDIO: &str = "stdio";

/// Program and arguments of a server we manage ourselves.
struct SubprocessConfig {
    program: String,
    args: Vec<String>,
}

/// An established connection and, when we spawned it, the server process.
pub(crate) struct ActiveConnection {
    pub(crate) transport: Transport,
    child: Option<Child>,
}

/// The language server being talked to.
pub struct Server {
    subprocess: Option<SubprocessConfig>,
    conn: Mutex<Option<ActiveConnection>>,
}

impl Server {
    /// A server we spawn and manage as a subprocess.
    pub fn subprocess(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            subprocess: Some(SubprocessConfig {
                program: program.into(),
                args,
            }),
            conn: Mutex::new(None),
        }
    }

    /// An externally managed server we only connect to.
    pub fn external() -> Self {
        Self {
            subprocess: None,
            conn: Mutex::new(None),
        }
    }

    /// Establish the connection.
    ///
    /// `"stdio"` spawns the configured subprocess and talks over its pipes,
    /// draining its stderr into the log from a background task. Any other
    /// method is treated as a host:port address to dial; when a subprocess
    /// is configured it is spawned first, detached from our stdio.
    ///
    /// # Errors
    ///
    /// Fails if already connected, if `"stdio"` was requested without a
    /// configured subprocess, or if spawning or dialing fails. A subprocess
    /// spawned before a failed dial is left running; reconnect handling is
    /// out of scope.
    pub async fn connect(&self, method: &str) -> Result<(), LspError> {
        let mut conn = self.conn.lock().await;
        if conn.is_some() {
            return Err(LspError::AlreadyConnected);
        }

        if method == CONNECT_STDIO {
            let config = self.subprocess.as_ref().ok_or(LspError::NoSubprocess)?;
            let mut child = spawn_subprocess(config, Stdio::piped)?;
            let mut transport = Transport::pipe(&mut child)?;

            if let Some(stderr) = transport.take_stderr() {
                tokio::spawn(forward_stderr(stderr));
            }

            debug!("connected to language server over stdio");
            *conn = Some(ActiveConnection {
                transport,
                child: Some(child),
            });
        } else {
            let child = match &self.subprocess {
                Some(config) => Some(spawn_subprocess(config, Stdio::null)?),
                None => None,
            };
            let transport = Transport::dial(method).await?;

            debug!("connected to language server at {}", method);
            *conn = Some(ActiveConnection { transport, child });
        }

        Ok(())
    }

    /// Run the orderly shutdown sequence and reap the subprocess.
    ///
    /// Sends the `shutdown` request and the `exit` notification through the
    /// normal send path (failures are logged, not fatal), closes the
    /// transport, and waits for the process to terminate. A no-op when no
    /// subprocess is configured: an external server outlives us.
    pub async fn shutdown_and_exit(&self) -> Result<(), LspError> {
        if self.subprocess.is_none() {
            return Ok(());
        }

        let client = Client::new(self);
        if let Err(e) = client.send(Request::new("shutdown", "shutdown", None)).await {
            warn!("shutdown request failed: {}", e);
        }
        if let Err(e) = client.send(Request::notification("exit", None)).await {
            warn!("exit notification failed: {}", e);
        }

        let Some(active) = self.conn.lock().await.take() else {
            return Ok(());
        };

        // Closing stdin is a second exit nudge for servers that miss the
        // notification.
        if let Err(e) = active.transport.close().await {
            warn!("error closing language server transport: {}", e);
        }

        if let Some(mut child) = active.child {
            let status = child.wait().await.map_err(LspError::Wait)?;
            debug!("language server exited with {}", status);
            if !status.success() {
                return Err(LspError::UncleanExit(status));
            }
        }

        Ok(())
    }

    /// Take the connection lock. Held by `Client` for the full duration of
    /// each exchange.
    pub(crate) async fn connection(&self) -> MutexGuard<'_, Option<ActiveConnection>> {
        self.conn.lock().await
    }
}

fn spawn_subprocess(
    config: &SubprocessConfig,
    io: impl Fn() -> Stdio,
) -> Result<Child, LspError> {
    let mut command = Command::new(&config.program);
    command
        .args(&config.args)
        .stdin(io())
        .stdout(io())
        .stderr(io());

    // Its own process group, so a terminal Ctrl-C reaches the server only
    // through the shutdown sequence.
    #[cfg(unix)]
    command.process_group(0);

    command.spawn().map_err(LspError::Spawn)
}

/// Drain the server's stderr into the log until it closes.
///
/// Runs as its own task and owns the stream outright; it never touches the
/// connection lock.
async fn forward_stderr(mut stderr: ChildStderr) {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                error!(
                    "language server stderr: {}",
                    String::from_utf8_lossy(&buf[..n]).trim_end()
                );
            }
        }
    }
}
