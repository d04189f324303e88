//! Protocol bridge integration tests
//!
//! Stands up scripted storage nodes on ephemeral TCP ports and drives the
//! upload and download relays end to end: wire format, short bodies,
//! truncated responses, strangers on the port, and unreachable nodes.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use vaultmesh_panel::bridge::{Bridge, BridgeConfig, BridgeError};
use vaultmesh_panel::protocol::{Command, FrameHeader, MAGIC};

// =============================================================================
// Harness
// =============================================================================

fn bridge_for(addr: SocketAddr) -> Bridge {
    bridge_with_sessions(addr, 4)
}

fn bridge_with_sessions(addr: SocketAddr, max_sessions: usize) -> Bridge {
    Bridge::new(BridgeConfig {
        node_addr: addr.to_string(),
        connect_timeout: Duration::from_secs(1),
        io_timeout: Duration::from_secs(1),
        max_sessions,
    })
}

/// Node that accepts one connection and captures everything sent to it.
/// Upload requests end with the client's FIN, so read-to-end terminates.
async fn spawn_capture_node() -> (SocketAddr, oneshot::Receiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut captured = Vec::new();
        stream.read_to_end(&mut captured).await.unwrap();
        let _ = tx.send(captured);
    });

    (addr, rx)
}

/// Node that reads one download request (header + filename), captures it,
/// writes `response` verbatim, and closes.
async fn spawn_download_node(response: Vec<u8>) -> (SocketAddr, oneshot::Receiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut header = [0u8; 14];
        stream.read_exact(&mut header).await.unwrap();
        let name_len = u32::from_be_bytes(header[2..6].try_into().unwrap()) as usize;
        let mut name = vec![0u8; name_len];
        stream.read_exact(&mut name).await.unwrap();

        let mut request = header.to_vec();
        request.extend_from_slice(&name);

        stream.write_all(&response).await.unwrap();
        stream.shutdown().await.unwrap();
        let _ = tx.send(request);
    });

    (addr, rx)
}

fn response_header(payload_len: u64, name_len: u32) -> [u8; 14] {
    FrameHeader {
        magic: MAGIC,
        command: Command::Download as u8,
        name_len,
        payload_len,
    }
    .encode()
}

fn body_stream(chunks: Vec<&'static [u8]>) -> impl futures::Stream<Item = Result<Bytes, io::Error>> + Unpin {
    futures::stream::iter(
        chunks
            .into_iter()
            .map(|c| Ok(Bytes::from_static(c)))
            .collect::<Vec<_>>(),
    )
}

/// Drain a download stream into (data, terminal error).
async fn collect_download(
    mut stream: vaultmesh_panel::bridge::DownloadStream,
) -> (Vec<u8>, Option<io::Error>) {
    let mut data = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => data.extend_from_slice(&chunk),
            Err(e) => return (data, Some(e)),
        }
    }
    (data, None)
}

// =============================================================================
// Upload relay
// =============================================================================

#[tokio::test]
async fn test_upload_wire_format() {
    let (addr, captured) = spawn_capture_node().await;
    let bridge = bridge_for(addr);

    let receipt = bridge
        .relay_upload("report1.txt", 3, body_stream(vec![b"abc"]))
        .await
        .unwrap();
    assert_eq!(receipt.filename, "report1.txt");
    assert_eq!(receipt.size_bytes, 3);

    let observed = captured.await.unwrap();
    let mut expected = vec![
        0x56, 0x01, 0x00, 0x00, 0x00, 0x0B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03,
    ];
    expected.extend_from_slice(b"report1.txt");
    expected.extend_from_slice(b"abc");
    assert_eq!(observed, expected);
}

#[tokio::test]
async fn test_upload_multi_chunk_body_arrives_in_order() {
    let (addr, captured) = spawn_capture_node().await;
    let bridge = bridge_for(addr);

    let body: Vec<&'static [u8]> = vec![b"hello ", b"storage ", b"node"];
    let total: u64 = body.iter().map(|c| c.len() as u64).sum();

    bridge
        .relay_upload("greeting.txt", total, body_stream(body))
        .await
        .unwrap();

    let observed = captured.await.unwrap();
    let header = FrameHeader::decode(&observed[..14]).unwrap();
    assert_eq!(header.magic, MAGIC);
    assert_eq!(header.command, Command::Upload as u8);
    assert_eq!(header.name_len, "greeting.txt".len() as u32);
    assert_eq!(header.payload_len, total);

    let name_end = 14 + "greeting.txt".len();
    assert_eq!(&observed[14..name_end], b"greeting.txt");
    assert_eq!(&observed[name_end..], b"hello storage node");
}

#[tokio::test]
async fn test_upload_short_body_fails_and_stops_writing() {
    let (addr, captured) = spawn_capture_node().await;
    let bridge = bridge_for(addr);

    let result = bridge
        .relay_upload("short.bin", 10, body_stream(vec![b"abc"]))
        .await;

    match result {
        Err(BridgeError::ShortBody { declared, sent }) => {
            assert_eq!(declared, 10);
            assert_eq!(sent, 3);
        }
        other => panic!("expected ShortBody, got {other:?}"),
    }

    // Nothing is written past the shortfall: header + name + 3 body bytes.
    let observed = captured.await.unwrap();
    assert_eq!(observed.len(), 14 + "short.bin".len() + 3);
}

#[tokio::test]
async fn test_upload_overshooting_source_is_cut_at_declared_length() {
    let (addr, captured) = spawn_capture_node().await;
    let bridge = bridge_for(addr);

    bridge
        .relay_upload("three.bin", 3, body_stream(vec![b"abcde"]))
        .await
        .unwrap();

    let observed = captured.await.unwrap();
    assert_eq!(&observed[14 + "three.bin".len()..], b"abc");
}

#[tokio::test]
async fn test_upload_empty_file() {
    let (addr, captured) = spawn_capture_node().await;
    let bridge = bridge_for(addr);

    let receipt = bridge
        .relay_upload("empty.bin", 0, body_stream(vec![]))
        .await
        .unwrap();
    assert_eq!(receipt.size_bytes, 0);

    let observed = captured.await.unwrap();
    let header = FrameHeader::decode(&observed[..14]).unwrap();
    assert_eq!(header.payload_len, 0);
    assert_eq!(observed.len(), 14 + "empty.bin".len());
}

// =============================================================================
// Download relay
// =============================================================================

#[tokio::test]
async fn test_download_request_wire_format_and_body() {
    let mut response = response_header(3, 0).to_vec();
    response.extend_from_slice(b"abc");
    let (addr, captured) = spawn_download_node(response).await;
    let bridge = bridge_for(addr);

    let stream = bridge.relay_download("report1.txt").await.unwrap();
    assert_eq!(stream.declared_len(), 3);

    let (data, err) = collect_download(stream).await;
    assert!(err.is_none());
    assert_eq!(data, b"abc");

    let request = captured.await.unwrap();
    let mut expected = vec![
        0x56, 0x02, 0x00, 0x00, 0x00, 0x0B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];
    expected.extend_from_slice(b"report1.txt");
    assert_eq!(request, expected);
}

#[tokio::test]
async fn test_download_large_body_streams_in_bounded_chunks() {
    let body: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    let mut response = response_header(body.len() as u64, 0).to_vec();
    response.extend_from_slice(&body);
    let (addr, _captured) = spawn_download_node(response).await;
    let bridge = bridge_for(addr);

    let mut stream = bridge.relay_download("big.bin").await.unwrap();
    assert_eq!(stream.declared_len(), body.len() as u64);

    let mut data = Vec::new();
    while let Some(item) = stream.next().await {
        let chunk = item.unwrap();
        assert!(chunk.len() <= 4096, "chunk of {} bytes", chunk.len());
        data.extend_from_slice(&chunk);
    }
    assert_eq!(data, body);
}

#[tokio::test]
async fn test_download_tolerates_echoed_name_len_in_response() {
    // Deployed nodes put the request's filename length in the response
    // header even though no filename follows.
    let mut response = response_header(3, 11).to_vec();
    response.extend_from_slice(b"abc");
    let (addr, _captured) = spawn_download_node(response).await;
    let bridge = bridge_for(addr);

    let stream = bridge.relay_download("report1.txt").await.unwrap();
    let (data, err) = collect_download(stream).await;
    assert!(err.is_none());
    assert_eq!(data, b"abc");
}

#[tokio::test]
async fn test_download_truncated_before_any_body_byte() {
    // Header promises 5 bytes, node closes immediately.
    let response = response_header(5, 0).to_vec();
    let (addr, _captured) = spawn_download_node(response).await;
    let bridge = bridge_for(addr);

    let stream = bridge.relay_download("gone.bin").await.unwrap();
    assert_eq!(stream.declared_len(), 5);

    let (data, err) = collect_download(stream).await;
    assert!(data.is_empty());
    let err = err.expect("truncation must surface as an error");
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[tokio::test]
async fn test_download_truncated_mid_body() {
    let mut response = response_header(5, 0).to_vec();
    response.extend_from_slice(b"ab");
    let (addr, _captured) = spawn_download_node(response).await;
    let bridge = bridge_for(addr);

    let stream = bridge.relay_download("half.bin").await.unwrap();
    let (data, err) = collect_download(stream).await;
    assert_eq!(data, b"ab");
    assert_eq!(err.unwrap().kind(), io::ErrorKind::UnexpectedEof);
}

#[tokio::test]
async fn test_download_rejects_wrong_magic() {
    let mut response = response_header(3, 0).to_vec();
    response[0] = 0x47;
    response.extend_from_slice(b"abc");
    let (addr, _captured) = spawn_download_node(response).await;
    let bridge = bridge_for(addr);

    match bridge.relay_download("any.bin").await {
        Err(BridgeError::Frame(e)) => {
            assert!(e.to_string().contains("magic"), "unexpected error: {e}")
        }
        other => panic!("expected protocol mismatch, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_download_short_response_header() {
    // Seven bytes, then close: never a partial decode.
    let response = response_header(3, 0)[..7].to_vec();
    let (addr, _captured) = spawn_download_node(response).await;
    let bridge = bridge_for(addr);

    match bridge.relay_download("any.bin").await {
        Err(BridgeError::Frame(e)) => {
            assert!(e.to_string().contains("malformed"), "unexpected error: {e}")
        }
        other => panic!("expected malformed header, got {:?}", other.map(|_| ())),
    }
}

// =============================================================================
// Connection lifecycle
// =============================================================================

#[tokio::test]
async fn test_both_relays_fail_when_node_unreachable() {
    // Bind then drop to get a port with no listener.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let bridge = bridge_for(addr);

    match bridge
        .relay_upload("f.bin", 1, body_stream(vec![b"x"]))
        .await
    {
        Err(BridgeError::NodeUnreachable { .. }) => {}
        other => panic!("expected NodeUnreachable, got {other:?}"),
    }

    match bridge.relay_download("f.bin").await {
        Err(BridgeError::NodeUnreachable { .. }) => {}
        other => panic!("expected NodeUnreachable, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_session_permit_held_for_download_stream_lifetime() {
    let mut response = response_header(3, 0).to_vec();
    response.extend_from_slice(b"abc");
    let (addr, _captured) = spawn_download_node(response).await;
    let bridge = bridge_with_sessions(addr, 1);

    let stream = bridge.relay_download("held.bin").await.unwrap();
    assert_eq!(bridge.available_sessions(), 0);

    // Dropping the stream mid-transfer cancels the session and readmits
    // the next caller.
    drop(stream);
    assert_eq!(bridge.available_sessions(), 1);
}

#[tokio::test]
async fn test_filename_byte_length_on_the_wire() {
    let (addr, captured) = spawn_capture_node().await;
    let bridge = bridge_for(addr);

    // 9 chars, 10 bytes once UTF-8 encoded.
    let name = "naïve.txt";
    bridge
        .relay_upload(name, 1, body_stream(vec![b"x"]))
        .await
        .unwrap();

    let observed = captured.await.unwrap();
    let header = FrameHeader::decode(&observed[..14]).unwrap();
    assert_eq!(header.name_len as usize, name.len());
    assert!(header.name_len as usize > name.chars().count());
}
