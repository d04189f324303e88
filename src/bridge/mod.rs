//! Protocol bridge to the storage node
//!
//! Translates HTTP file transfers into framed TCP exchanges:
//! - one ephemeral TCP connection per relay session, closed on every exit
//!   path (connections are never pooled or reused)
//! - bounded chunks in both directions, never the whole file in memory
//! - a semaphore caps concurrent sessions so a burst of requests cannot
//!   open an unbounded number of node connections
//!
//! The bridge does not retry: a failed session surfaces its error to the
//! caller and releases its connection.

pub mod download;
pub mod upload;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::debug;

use crate::protocol::FrameError;

pub use download::DownloadStream;
pub use upload::UploadReceipt;

/// Bytes moved per socket read/write. Bounds peak memory per session.
pub const CHUNK_SIZE: usize = 4096;

/// Errors from a relay session, in the order the HTTP layer cares about
/// them: unreachable node (503), caller-side short body (400), and peer
/// protocol trouble (500).
#[derive(Debug, Error)]
pub enum BridgeError {
    /// TCP connect to the storage node failed or timed out.
    #[error("storage node unreachable at {addr}: {source}")]
    NodeUnreachable { addr: String, source: io::Error },

    /// The body source ended before delivering the declared length.
    #[error("body ended after {sent} of {declared} declared bytes")]
    ShortBody { declared: u64, sent: u64 },

    /// The filename's byte length does not fit the wire header.
    #[error("filename of {len} bytes exceeds the protocol limit")]
    FilenameTooLong { len: usize },

    /// Header-level trouble: truncated or wrong-magic response.
    #[error("storage node protocol violation: {0}")]
    Frame(#[from] FrameError),

    /// The HTTP body stream failed while the upload was in flight.
    #[error("body source failed: {0}")]
    Source(String),

    /// Socket I/O failed or timed out mid-session.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The bridge is shutting down and admits no new sessions.
    #[error("bridge is shutting down")]
    Closed,
}

/// Immutable bridge configuration, fixed at construction.
///
/// Holding the node address here (rather than in process-wide state) keeps
/// relay logic untouched if routing ever grows beyond a single node.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Storage node address, `host:port`.
    pub node_addr: String,
    /// Deadline for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Deadline for each individual socket read or write.
    pub io_timeout: Duration,
    /// Maximum concurrent relay sessions (and thus node connections).
    pub max_sessions: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            node_addr: "127.0.0.1:9000".to_string(),
            connect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(30),
            max_sessions: 64,
        }
    }
}

/// The protocol bridge. Cheap to clone via `Arc`; shared across handlers.
pub struct Bridge {
    config: BridgeConfig,
    gate: Arc<Semaphore>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        let gate = Arc::new(Semaphore::new(config.max_sessions));
        Self { config, gate }
    }

    /// Address of the storage node this bridge talks to.
    pub fn node_addr(&self) -> &str {
        &self.config.node_addr
    }

    /// Sessions that may still be admitted right now.
    pub fn available_sessions(&self) -> usize {
        self.gate.available_permits()
    }

    /// Open a relay session: acquire an admission permit, then connect.
    ///
    /// The permit is returned alongside the socket and must live as long as
    /// the session does; dropping both closes the connection and readmits
    /// the next waiter.
    pub(crate) async fn open_session(
        &self,
    ) -> Result<(TcpStream, OwnedSemaphorePermit), BridgeError> {
        let permit = self
            .gate
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BridgeError::Closed)?;

        let addr = &self.config.node_addr;
        let stream = match timeout(self.config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(BridgeError::NodeUnreachable {
                    addr: addr.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(BridgeError::NodeUnreachable {
                    addr: addr.clone(),
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                })
            }
        };

        debug!(addr = %addr, "relay session opened");
        Ok((stream, permit))
    }

    pub(crate) fn io_timeout(&self) -> Duration {
        self.config.io_timeout
    }

    /// `write_all` bounded by the session's I/O deadline.
    pub(crate) async fn write_all<W>(&self, writer: &mut W, buf: &[u8]) -> Result<(), BridgeError>
    where
        W: AsyncWrite + Unpin,
    {
        timeout(self.config.io_timeout, writer.write_all(buf))
            .await
            .map_err(|_| {
                BridgeError::Io(io::Error::new(io::ErrorKind::TimedOut, "write timed out"))
            })??;
        Ok(())
    }
}
