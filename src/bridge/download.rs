//! Download relay: framed node request → lazy HTTP byte stream
//!
//! One request/response exchange per connection: send the request frame,
//! read the 14-byte response header, then hand the caller a lazy stream of
//! the declared body bytes. The stream is forward-only, finite, and
//! non-restartable; dropping it closes the node connection, which is how
//! an HTTP client disconnect cancels the session without further I/O.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::OwnedSemaphorePermit;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{Bridge, BridgeError, CHUNK_SIZE};
use crate::protocol::{FrameHeader, HEADER_LEN};

/// Body bytes flowing back from the storage node.
///
/// Yields at most `declared_len` bytes in bounded chunks. If the node
/// closes early, the stream terminates with an explicit truncation error
/// instead of ending quietly, so consumers can tell a complete transfer
/// from a broken one.
pub struct DownloadStream {
    declared_len: u64,
    inner: Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>,
}

impl DownloadStream {
    /// The body size the storage node committed to in its response header.
    pub fn declared_len(&self) -> u64 {
        self.declared_len
    }
}

impl Stream for DownloadStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Per-session state captured by the body stream. Dropping it closes the
/// socket and releases the admission permit.
struct BodyState {
    stream: TcpStream,
    _permit: OwnedSemaphorePermit,
    declared: u64,
    delivered: u64,
    io_timeout: Duration,
    done: bool,
}

impl Bridge {
    /// Request `filename` from the storage node and return the body stream.
    ///
    /// Errors here cover the request/response-header phase; body-phase
    /// failures surface as error items on the returned stream. The caller
    /// resolves the filename from its metadata record beforehand — the
    /// relay performs no lookups.
    pub async fn relay_download(&self, filename: &str) -> Result<DownloadStream, BridgeError> {
        let name = filename.as_bytes();
        let name_len = u32::try_from(name.len())
            .map_err(|_| BridgeError::FilenameTooLong { len: name.len() })?;

        let (mut stream, permit) = self.open_session().await?;

        let request = FrameHeader::download_request(name_len);
        self.write_all(&mut stream, &request.encode()).await?;
        self.write_all(&mut stream, name).await?;

        // The node either answers with a full header or closes; a short
        // header is the only "error signal" this protocol has, and it is
        // indistinguishable from a missing file.
        let mut buf = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            let n = timeout(self.io_timeout(), stream.read(&mut buf[filled..]))
                .await
                .map_err(|_| {
                    BridgeError::Io(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "storage node response timed out",
                    ))
                })??;
            if n == 0 {
                break;
            }
            filled += n;
        }

        let header = FrameHeader::decode(&buf[..filled])?;
        header.check_magic()?;
        // Deployed nodes echo the request's name_len in the response even
        // though no filename follows; the field is ignored either way.
        let declared_len = header.payload_len;

        debug!(filename, declared_len, "download response header received");

        let state = BodyState {
            stream,
            _permit: permit,
            declared: declared_len,
            delivered: 0,
            io_timeout: self.io_timeout(),
            done: false,
        };

        let inner = futures::stream::unfold(state, |mut st| async move {
            if st.done || st.delivered == st.declared {
                return None;
            }

            let want = CHUNK_SIZE.min((st.declared - st.delivered) as usize);
            let mut buf = [0u8; CHUNK_SIZE];
            let read = timeout(st.io_timeout, st.stream.read(&mut buf[..want])).await;

            let item = match read {
                Err(_) => {
                    st.done = true;
                    Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "storage node body read timed out",
                    ))
                }
                Ok(Err(e)) => {
                    st.done = true;
                    Err(e)
                }
                Ok(Ok(0)) => {
                    st.done = true;
                    warn!(
                        delivered = st.delivered,
                        declared = st.declared,
                        "storage node closed mid-body, truncating download"
                    );
                    Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "storage node closed after {} of {} body bytes",
                            st.delivered, st.declared
                        ),
                    ))
                }
                Ok(Ok(n)) => {
                    st.delivered += n as u64;
                    Ok(Bytes::copy_from_slice(&buf[..n]))
                }
            };

            Some((item, st))
        });

        Ok(DownloadStream {
            declared_len,
            inner: Box::pin(inner),
        })
    }
}