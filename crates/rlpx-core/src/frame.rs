//! Frame header and content layout.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |            Frame size (24 bits)               | Header data   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+               +
//! |   rlp([capability-id, context-id]), zero padded to 16 bytes   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The frame content that follows is `rlp(code) || payload`, zero padded to a
//! multiple of 16 bytes. Encryption and MACs are applied by `rlpx-crypto`.

use alloy_rlp::{Decodable, Encodable, Header};
use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::rlp::take_list;
use crate::{WireError, FRAME_HEADER_LEN, MAX_FRAME_SIZE};

/// Plaintext frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader {
    /// Length of the frame content before padding.
    pub frame_size: usize,
    /// Capability hint. Session frames carry zero; other values are kept on read.
    pub capability_id: u64,
    /// Context hint. Zero when unused.
    pub context_id: u64,
}

impl FrameHeader {
    pub fn new(frame_size: usize) -> Result<Self, WireError> {
        if frame_size > MAX_FRAME_SIZE {
            return Err(WireError::FrameTooLarge(frame_size));
        }
        Ok(Self {
            frame_size,
            ..Self::default()
        })
    }

    /// Content length rounded up to the cipher block size.
    pub fn padded_size(&self) -> usize {
        padded_len(self.frame_size)
    }

    pub fn encode(&self) -> Result<[u8; FRAME_HEADER_LEN], WireError> {
        if self.frame_size > MAX_FRAME_SIZE {
            return Err(WireError::FrameTooLarge(self.frame_size));
        }

        let payload_length = self.capability_id.length() + self.context_id.length();
        let header_data_len = Header {
            list: true,
            payload_length,
        }
        .length()
            + payload_length;
        if 3 + header_data_len > FRAME_HEADER_LEN {
            return Err(WireError::HeaderDataTooLarge);
        }

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN);
        let size = (self.frame_size as u32).to_be_bytes();
        buf.put_slice(&size[1..]);
        Header {
            list: true,
            payload_length,
        }
        .encode(&mut buf);
        self.capability_id.encode(&mut buf);
        self.context_id.encode(&mut buf);

        let mut out = [0u8; FRAME_HEADER_LEN];
        out[..buf.len()].copy_from_slice(&buf);
        Ok(out)
    }

    /// Decode a plaintext header.
    ///
    /// Header data that does not parse is treated as absent; only the size
    /// field is load-bearing.
    pub fn decode(bytes: &[u8; FRAME_HEADER_LEN]) -> Self {
        let frame_size = u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]) as usize;
        let (capability_id, context_id) = match decode_header_data(&bytes[3..]) {
            Ok(hint) => hint,
            Err(e) => {
                trace!("ignoring unparseable frame header data: {}", e);
                (0, 0)
            }
        };

        Self {
            frame_size,
            capability_id,
            context_id,
        }
    }
}

fn decode_header_data(mut buf: &[u8]) -> Result<(u64, u64), WireError> {
    let mut items = take_list(&mut buf)?;
    let capability_id = if items.is_empty() {
        0
    } else {
        u64::decode(&mut items)?
    };
    let context_id = if items.is_empty() {
        0
    } else {
        u64::decode(&mut items)?
    };
    Ok((capability_id, context_id))
}

/// Round `len` up to the next multiple of 16.
pub fn padded_len(len: usize) -> usize {
    match len % 16 {
        0 => len,
        rem => len + (16 - rem),
    }
}

/// Append `rlp(code) || payload` to `out` and return the frame size.
pub fn encode_content(code: u64, payload: &[u8], out: &mut BytesMut) -> Result<usize, WireError> {
    let frame_size = code.length() + payload.len();
    if frame_size > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge(frame_size));
    }
    code.encode(out);
    out.put_slice(payload);
    Ok(frame_size)
}

/// Split unpadded frame content into the message code and the payload.
pub fn decode_content(content: &[u8]) -> Result<(u64, &[u8]), WireError> {
    let mut buf = content;
    let code = u64::decode(&mut buf)?;
    Ok((code, buf))
}
