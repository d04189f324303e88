//! Upload relay: HTTP body stream → framed node upload
//!
//! The header commits to the final size before any body byte is sent, so
//! the relay requires the total length up front; open-ended sources cannot
//! be uploaded. Within one session the send order is strict:
//! header → filename → body.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{Bridge, BridgeError};
use crate::protocol::FrameHeader;

/// What a completed upload hands back so the caller can record metadata.
/// The bridge itself never touches the metadata store.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub filename: String,
    pub size_bytes: u64,
}

impl Bridge {
    /// Stream `declared_len` bytes from `body` to the storage node under
    /// one upload frame.
    ///
    /// The source must deliver at least `declared_len` bytes; ending early
    /// is a contract violation (`ShortBody`) and aborts the session with no
    /// further writes. Excess bytes past the declared total are not sent —
    /// the header's commitment wins.
    ///
    /// All bytes sent is treated as success; the node sends no
    /// acknowledgment frame in the current protocol, so a node-side write
    /// failure after a completed send is invisible here.
    pub async fn relay_upload<S, E>(
        &self,
        filename: &str,
        declared_len: u64,
        mut body: S,
    ) -> Result<UploadReceipt, BridgeError>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: std::error::Error,
    {
        let name = filename.as_bytes();
        let name_len = u32::try_from(name.len())
            .map_err(|_| BridgeError::FilenameTooLong { len: name.len() })?;

        let (mut stream, _permit) = self.open_session().await?;

        let header = FrameHeader::upload(name_len, declared_len);
        self.write_all(&mut stream, &header.encode()).await?;
        self.write_all(&mut stream, name).await?;

        let mut sent: u64 = 0;
        while sent < declared_len {
            let chunk = match body.next().await {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => return Err(BridgeError::Source(e.to_string())),
                None => break,
            };
            if chunk.is_empty() {
                continue;
            }

            let remaining = declared_len - sent;
            let take = chunk.len().min(remaining as usize);
            self.write_all(&mut stream, &chunk[..take]).await?;
            sent += take as u64;
        }

        if sent < declared_len {
            warn!(
                filename,
                declared = declared_len,
                sent,
                "upload body ended short, abandoning session"
            );
            return Err(BridgeError::ShortBody {
                declared: declared_len,
                sent,
            });
        }

        // Flush the FIN so the node sees a clean end of stream.
        stream.shutdown().await?;
        debug!(filename, bytes = sent, "upload relay complete");

        info!(
            filename,
            size_bytes = declared_len,
            node = self.node_addr(),
            "file uploaded to storage node"
        );

        Ok(UploadReceipt {
            filename: filename.to_string(),
            size_bytes: declared_len,
        })
    }
}
