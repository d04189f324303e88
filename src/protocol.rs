//! Wire framing for the storage node protocol.
//!
//! Every exchange with a storage node begins with a fixed-size binary
//! header, followed by the UTF-8 filename bytes, followed (for uploads and
//! download responses) by the raw file data.
//!
//! ```text
//! +-------+---------+------------------+--------------------+
//! | magic | command | name_len (u32)   | payload_len (u64)  |
//! | 0x56  | 1 | 2   | big-endian       | big-endian         |
//! +-------+---------+------------------+--------------------+
//!   1 byte  1 byte       4 bytes             8 bytes
//!                 ← fixed 14 bytes →
//! ```
//!
//! `name_len` is the BYTE length of the filename that follows the header in
//! requests; responses carry no filename regardless of the field's value.
//! `payload_len` is the declared body size for uploads and download
//! responses, and 0 in download requests. Both peers must agree on this
//! layout bit-for-bit; it is the wire contract, not an implementation
//! detail.

use bytes::{Buf, BufMut};
use thiserror::Error;

/// Magic byte — 'V' for VaultMesh. Lets either peer detect a stranger.
pub const MAGIC: u8 = 0x56;

/// Fixed header size in bytes: magic(1) + command(1) + name_len(4) + payload_len(8).
pub const HEADER_LEN: usize = 14;

/// Protocol opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Upload = 0x01,
    Download = 0x02,
}

impl TryFrom<u8> for Command {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, FrameError> {
        match value {
            0x01 => Ok(Command::Upload),
            0x02 => Ok(Command::Download),
            other => Err(FrameError::UnknownCommand { command: other }),
        }
    }
}

/// Errors produced while encoding or decoding a frame header.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Fewer than [`HEADER_LEN`] bytes were available. Decoding never
    /// partially succeeds.
    #[error("malformed frame header: got {got} of {HEADER_LEN} bytes")]
    Truncated { got: usize },

    /// The peer is not speaking this protocol (or the stream desynced).
    #[error("protocol mismatch: unexpected magic byte {magic:#04x}")]
    BadMagic { magic: u8 },

    /// Opcode outside the known command set.
    #[error("unknown command byte {command:#04x}")]
    UnknownCommand { command: u8 },
}

/// The fixed header that prefixes every node exchange.
///
/// `magic` and `command` are kept as raw bytes: the codec passes through
/// whatever was on the wire and leaves range checks to the caller, which
/// decides how strict to be (see [`FrameHeader::check_magic`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub magic: u8,
    pub command: u8,
    pub name_len: u32,
    pub payload_len: u64,
}

impl FrameHeader {
    /// Header for an upload request carrying `payload_len` body bytes.
    pub fn upload(name_len: u32, payload_len: u64) -> Self {
        Self {
            magic: MAGIC,
            command: Command::Upload as u8,
            name_len,
            payload_len,
        }
    }

    /// Header for a download request. Download requests carry no payload.
    pub fn download_request(name_len: u32) -> Self {
        Self {
            magic: MAGIC,
            command: Command::Download as u8,
            name_len,
            payload_len: 0,
        }
    }

    /// Serialize into the fixed 14-byte wire form.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        {
            let mut cursor = &mut buf[..];
            cursor.put_u8(self.magic);
            cursor.put_u8(self.command);
            cursor.put_u32(self.name_len);
            cursor.put_u64(self.payload_len);
        }
        buf
    }

    /// Parse a header from the first [`HEADER_LEN`] bytes of `buf`.
    ///
    /// Fails with [`FrameError::Truncated`] when fewer bytes are supplied;
    /// performs no other validation.
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < HEADER_LEN {
            return Err(FrameError::Truncated { got: buf.len() });
        }
        let mut cursor = buf;
        Ok(Self {
            magic: cursor.get_u8(),
            command: cursor.get_u8(),
            name_len: cursor.get_u32(),
            payload_len: cursor.get_u64(),
        })
    }

    /// Reject a header from a peer that is not speaking this protocol.
    pub fn check_magic(&self) -> Result<(), FrameError> {
        if self.magic != MAGIC {
            return Err(FrameError::BadMagic { magic: self.magic });
        }
        Ok(())
    }
}
