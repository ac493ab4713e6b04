//! Encrypted, MAC-authenticated frames.
//!
//! # Wire Format
//!
//! ```text
//! [header ciphertext (16B)][header MAC (16B)][content ciphertext (padded)][frame MAC (16B)]
//! ```
//!
//! Both directions encrypt with AES-256-CTR under the session AES key and a
//! zero IV; each direction owns its own keystream position and running MAC.
//! Headers are authenticated before they are decrypted, and content before
//! it is decrypted.

use aes::cipher::generic_array::GenericArray;
use aes::Aes256;
use bytes::{BufMut, Bytes, BytesMut};
use ctr::cipher::{KeyIvInit, StreamCipher};
use rlpx_core::{
    decode_content, encode_content, padded_len, FrameHeader, FRAME_HEADER_LEN, MAC_LEN,
};
use tracing::warn;

use crate::error::SessionError;
use crate::mac::RunningMac;
use crate::secrets::Secrets;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Encrypted header plus its MAC.
pub const HEADER_BLOCK_LEN: usize = FRAME_HEADER_LEN + MAC_LEN;

/// One decoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub code: u64,
    pub payload: Bytes,
    /// Payload size as carried on the wire, before decompression.
    pub wire_size: usize,
}

/// Split session secrets into the egress and ingress halves of a codec.
pub fn split(mut secrets: Secrets) -> (FrameWriter, FrameReader) {
    let egress = std::mem::take(&mut secrets.egress_mac);
    let ingress = std::mem::take(&mut secrets.ingress_mac);

    let writer = FrameWriter {
        cipher: stream_cipher(&secrets.aes_key),
        mac: RunningMac::new(&secrets.mac_key, egress),
    };
    let reader = FrameReader {
        cipher: stream_cipher(&secrets.aes_key),
        mac: RunningMac::new(&secrets.mac_key, ingress),
    };
    (writer, reader)
}

fn stream_cipher(key: &[u8; 32]) -> Aes256Ctr {
    Aes256Ctr::new(GenericArray::from_slice(key), &GenericArray::default())
}

/// Egress half: encrypts and tags outgoing frames.
pub struct FrameWriter {
    cipher: Aes256Ctr,
    mac: RunningMac,
}

impl FrameWriter {
    /// Encode one message into a complete wire frame.
    ///
    /// Size checks run before any cipher or MAC state advances.
    pub fn encode(&mut self, code: u64, payload: &[u8]) -> Result<Bytes, SessionError> {
        let mut content = BytesMut::with_capacity(padded_len(payload.len() + 9));
        let frame_size = encode_content(code, payload, &mut content)?;
        let mut header = FrameHeader::new(frame_size)?.encode()?;

        self.cipher.apply_keystream(&mut header);
        let header_mac = self.mac.header_tag(&header);

        content.resize(padded_len(frame_size), 0);
        self.cipher.apply_keystream(&mut content);
        let frame_mac = self.mac.frame_tag(&content);

        let mut out = BytesMut::with_capacity(HEADER_BLOCK_LEN + content.len() + MAC_LEN);
        out.put_slice(&header);
        out.put_slice(&header_mac);
        out.put_slice(&content);
        out.put_slice(&frame_mac);
        Ok(out.freeze())
    }
}

/// Ingress half: authenticates and decrypts incoming frames.
pub struct FrameReader {
    cipher: Aes256Ctr,
    mac: RunningMac,
}

impl FrameReader {
    /// Authenticate and decrypt the 32-byte header block.
    pub fn decode_header(
        &mut self,
        block: &[u8; HEADER_BLOCK_LEN],
    ) -> Result<FrameHeader, SessionError> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        header.copy_from_slice(&block[..FRAME_HEADER_LEN]);

        if !self.mac.verify_header(&header, &block[FRAME_HEADER_LEN..]) {
            warn!("frame header MAC mismatch");
            return Err(SessionError::auth("bad header MAC"));
        }

        self.cipher.apply_keystream(&mut header);
        Ok(FrameHeader::decode(&header))
    }

    /// Bytes to read after the header block: padded content plus frame MAC.
    pub fn body_len(header: &FrameHeader) -> usize {
        header.padded_size() + MAC_LEN
    }

    /// Authenticate and decrypt the frame body in place, returning the
    /// unpadded content.
    pub fn decode_body<'a>(
        &mut self,
        header: &FrameHeader,
        body: &'a mut [u8],
    ) -> Result<&'a [u8], SessionError> {
        if body.len() != Self::body_len(header) {
            return Err(SessionError::malformed(format!(
                "frame body is {} bytes, header declares {}",
                body.len(),
                Self::body_len(header)
            )));
        }

        let (content, tag) = body.split_at_mut(header.padded_size());
        if !self.mac.verify_frame(content, tag) {
            warn!(size = header.frame_size, "frame MAC mismatch");
            return Err(SessionError::auth("bad frame MAC"));
        }

        self.cipher.apply_keystream(content);
        Ok(&content[..header.frame_size])
    }

    /// Decode a complete frame held in memory into `(code, content)`.
    pub fn decode(&mut self, frame: &[u8]) -> Result<(u64, Bytes), SessionError> {
        if frame.len() < HEADER_BLOCK_LEN {
            return Err(SessionError::malformed(format!(
                "frame too short: {} bytes",
                frame.len()
            )));
        }

        let mut block = [0u8; HEADER_BLOCK_LEN];
        block.copy_from_slice(&frame[..HEADER_BLOCK_LEN]);
        let header = self.decode_header(&block)?;

        let mut body = frame[HEADER_BLOCK_LEN..].to_vec();
        let content = self.decode_body(&header, &mut body)?;
        let (code, payload) = decode_content(content)?;
        Ok((code, Bytes::copy_from_slice(payload)))
    }
}
