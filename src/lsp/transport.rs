//! Byte transports for reaching a language server.
//!
//! Two flavors exist: the stdio pipes of a subprocess spawned by us, and a
//! TCP socket to an externally managed server. `Transport` folds both
//! behind one read/write surface so the layers above never branch on which
//! one is active.

use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};

use crate::lsp::error::LspError;

/// Chunk size for stream reads.
pub(crate) const READ_BUFFER_SIZE: usize = 4096;

/// A live byte channel to the language server.
///
/// Requests travel down the subprocess's stdin or the socket; responses
/// come back from its stdout or the same socket. Only the subprocess form
/// carries a separate error channel.
pub enum Transport {
    /// Stdio pipes of a subprocess we spawned.
    Pipe {
        stdout: ChildStdout,
        stderr: Option<ChildStderr>,
        stdin: ChildStdin,
    },
    /// A connected socket to an externally managed server.
    Tcp { stream: TcpStream },
}

impl Transport {
    /// Claim the stdio handles of a freshly spawned child.
    pub(crate) fn pipe(child: &mut Child) -> Result<Self, LspError> {
        let stdout = child.stdout.take().ok_or_else(|| pipe_missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| pipe_missing("stderr"))?;
        let stdin = child.stdin.take().ok_or_else(|| pipe_missing("stdin"))?;

        Ok(Self::Pipe {
            stdout,
            stderr: Some(stderr),
            stdin,
        })
    }

    /// Dial a language server listening on `addr`.
    pub(crate) async fn dial(addr: &str) -> Result<Self, LspError> {
        let stream = TcpStream::connect(addr).await.map_err(LspError::Dial)?;
        Ok(Self::Tcp { stream })
    }

    /// Read response bytes. `Ok(0)` means the stream ended; partial reads
    /// are normal, never an error.
    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Pipe { stdout, .. } => stdout.read(buf).await,
            Self::Tcp { stream } => stream.read(buf).await,
        }
    }

    /// Read from the error side channel. Immediate end-of-stream when the
    /// transport has none, or after it was detached for the drain task.
    pub async fn read_err(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Pipe {
                stderr: Some(stderr),
                ..
            } => stderr.read(buf).await,
            Self::Pipe { stderr: None, .. } | Self::Tcp { .. } => Ok(0),
        }
    }

    /// Write the whole buffer, returning its length.
    pub async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Pipe { stdin, .. } => {
                stdin.write_all(buf).await?;
                stdin.flush().await?;
            }
            Self::Tcp { stream } => {
                stream.write_all(buf).await?;
                stream.flush().await?;
            }
        }

        Ok(buf.len())
    }

    /// Close the transport. Any error comes from shutting down the write
    /// half.
    ///
    /// For a subprocess, stdin is flushed and dropped, delivering EOF; the
    /// read handles move to a background task that drains them until the
    /// server closes its end, so a final write from the server never hits
    /// a closed pipe. For a socket, the write half is shut down and the
    /// stream dropped.
    pub async fn close(self) -> io::Result<()> {
        match self {
            Self::Pipe {
                stdout,
                stderr,
                mut stdin,
            } => {
                let flushed = stdin.shutdown().await;
                drop(stdin);

                tokio::spawn(async move {
                    let _stderr = stderr;
                    let mut stdout = stdout;
                    let mut buf = [0u8; READ_BUFFER_SIZE];
                    loop {
                        match stdout.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(_) => {}
                        }
                    }
                });

                flushed
            }
            Self::Tcp { mut stream } => stream.shutdown().await,
        }
    }

    /// Detach the error channel so a drain task can own it outright.
    pub(crate) fn take_stderr(&mut self) -> Option<ChildStderr> {
        match self {
            Self::Pipe { stderr, .. } => stderr.take(),
            Self::Tcp { .. } => None,
        }
    }
}

fn pipe_missing(name: &str) -> LspError {
    LspError::Spawn(io::Error::new(
        io::ErrorKind::Other,
        format!("language server {} was not captured", name),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::process::Command;
    use tokio::time::timeout;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn tcp_transport_round_trips_and_has_no_error_channel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let peer_task = tokio::spawn(async move {
            let (mut peer, _) = listener.accept().await.expect("accept");
            let mut buf = [0u8; 5];
            peer.read_exact(&mut buf).await.expect("read request");
            assert_eq!(&buf, b"hello");
            peer.write_all(b"world").await.expect("write reply");
        });

        let mut transport = timeout(TEST_TIMEOUT, Transport::dial(&addr.to_string()))
            .await
            .expect("dial timed out")
            .expect("dial failed");

        assert_eq!(transport.write(b"hello").await.expect("write"), 5);

        let mut buf = [0u8; 16];
        let n = timeout(TEST_TIMEOUT, transport.read(&mut buf))
            .await
            .expect("read timed out")
            .expect("read failed");
        assert_eq!(&buf[..n], b"world");

        assert_eq!(transport.read_err(&mut buf).await.expect("read_err"), 0);

        transport.close().await.expect("close");
        peer_task.await.expect("peer task");
    }

    #[tokio::test]
    async fn pipe_transport_round_trips_through_cat() {
        let mut child = Command::new("cat")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn cat");

        let mut transport = Transport::pipe(&mut child).expect("claim pipes");

        transport.write(b"ping").await.expect("write");

        let mut buf = [0u8; 16];
        let n = timeout(TEST_TIMEOUT, transport.read(&mut buf))
            .await
            .expect("read timed out")
            .expect("read failed");
        assert_eq!(&buf[..n], b"ping");

        // Closing drops stdin, which ends cat's input.
        transport.close().await.expect("close");

        let status = timeout(TEST_TIMEOUT, child.wait())
            .await
            .expect("wait timed out")
            .expect("wait failed");
        assert!(status.success());
    }

    #[tokio::test]
    async fn pipe_transport_reads_stderr_until_detached() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("printf oops >&2; exec cat")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn");

        let mut transport = Transport::pipe(&mut child).expect("claim pipes");

        let mut buf = [0u8; 16];
        let n = timeout(TEST_TIMEOUT, transport.read_err(&mut buf))
            .await
            .expect("read_err timed out")
            .expect("read_err failed");
        assert_eq!(&buf[..n], b"oops");

        assert!(transport.take_stderr().is_some());
        assert_eq!(transport.read_err(&mut buf).await.expect("read_err"), 0);

        transport.close().await.expect("close");
        let _ = timeout(TEST_TIMEOUT, child.wait())
            .await
            .expect("wait timed out");
    }
}
