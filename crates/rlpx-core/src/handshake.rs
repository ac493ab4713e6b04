//! Handshake message bodies.
//!
//! Both messages exist in two encodings:
//!
//! ```text
//! EIP-8:   rlp([field, field, ..., version, trailing...]) || zero padding
//! Legacy:  fixed offsets, see AUTH_LEGACY_LEN / ACK_LEGACY_LEN
//! ```
//!
//! EIP-8 decoding reads the first RLP list and ignores whatever follows it
//! (the sender's padding). Elements after the version are kept verbatim in
//! [`TrailingItems`] so newer peers can extend the messages without breaking
//! older ones.

use alloy_rlp::{BufMut, Decodable, Encodable, Header};
use bytes::Bytes;

use crate::rlp::{fixed, take_fixed, take_list, take_raw_item};
use crate::{
    WireError, ACK_LEGACY_LEN, AUTH_LEGACY_LEN, NONCE_LEN, PROTOCOL_VERSION, PUBLIC_KEY_LEN,
    SIGNATURE_LEN,
};

/// Raw RLP items found after the mandatory fields of a handshake message.
///
/// Each entry is one complete, undecoded item (header included), in wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrailingItems(Vec<Bytes>);

impl TrailingItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one pre-encoded RLP item.
    ///
    /// The bytes must form exactly one item, otherwise the encoded message
    /// would shift every following field.
    pub fn push_raw(&mut self, item: impl Into<Bytes>) -> Result<(), WireError> {
        let item = item.into();
        let mut cursor = &item[..];
        take_raw_item(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(WireError::Length {
                field: "trailing item",
                expected: item.len() - cursor.len(),
                got: item.len(),
            });
        }
        self.0.push(item);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.0.iter().map(|item| &item[..])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn decode(mut payload: &[u8]) -> Result<Self, WireError> {
        let mut items = Vec::new();
        while !payload.is_empty() {
            let item = take_raw_item(&mut payload)?;
            items.push(Bytes::copy_from_slice(item));
        }
        Ok(Self(items))
    }

    fn encoded_len(&self) -> usize {
        self.0.iter().map(|item| item.len()).sum()
    }

    fn encode(&self, out: &mut dyn BufMut) {
        for item in &self.0 {
            out.put_slice(item);
        }
    }
}

/// Initiator → responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthMessage {
    /// Recoverable signature over `ECDH(static, static) XOR nonce` made with
    /// the initiator's ephemeral key.
    pub signature: [u8; SIGNATURE_LEN],
    pub initiator_pubkey: [u8; PUBLIC_KEY_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub version: u64,
    pub rest: TrailingItems,
}

impl AuthMessage {
    pub fn new(
        signature: [u8; SIGNATURE_LEN],
        initiator_pubkey: [u8; PUBLIC_KEY_LEN],
        nonce: [u8; NONCE_LEN],
    ) -> Self {
        Self {
            signature,
            initiator_pubkey,
            nonce,
            version: PROTOCOL_VERSION,
            rest: TrailingItems::new(),
        }
    }

    fn payload_length(&self) -> usize {
        self.signature[..].length()
            + self.initiator_pubkey[..].length()
            + self.nonce[..].length()
            + self.version.length()
            + self.rest.encoded_len()
    }

    /// Write the EIP-8 RLP list (without padding).
    pub fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.signature[..].encode(out);
        self.initiator_pubkey[..].encode(out);
        self.nonce[..].encode(out);
        self.version.encode(out);
        self.rest.encode(out);
    }

    pub fn to_rlp(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload_length() + 3);
        self.encode(&mut out);
        out
    }

    /// Decode the EIP-8 form. Bytes after the list are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut input = buf;
        let mut payload = take_list(&mut input)?;

        let signature = take_fixed::<SIGNATURE_LEN>(&mut payload, "signature")?;
        let initiator_pubkey = take_fixed::<PUBLIC_KEY_LEN>(&mut payload, "initiator public key")?;
        let nonce = take_fixed::<NONCE_LEN>(&mut payload, "nonce")?;
        let version = u64::decode(&mut payload)?;
        let rest = TrailingItems::decode(payload)?;

        Ok(Self {
            signature,
            initiator_pubkey,
            nonce,
            version,
            rest,
        })
    }

    /// Decode the fixed-offset pre-EIP-8 form.
    ///
    /// The legacy body carries a hash of the ephemeral key between the
    /// signature and the public key; it is redundant with the signature and
    /// skipped.
    pub fn decode_legacy(plain: &[u8]) -> Result<Self, WireError> {
        if plain.len() != AUTH_LEGACY_LEN {
            return Err(WireError::Length {
                field: "legacy auth",
                expected: AUTH_LEGACY_LEN,
                got: plain.len(),
            });
        }
        let (signature, rest) = plain.split_at(SIGNATURE_LEN);
        let (_ephemeral_hash, rest) = rest.split_at(32);
        let (pubkey, rest) = rest.split_at(PUBLIC_KEY_LEN);
        let (nonce, _) = rest.split_at(NONCE_LEN);

        Ok(Self {
            signature: fixed(signature, "signature")?,
            initiator_pubkey: fixed(pubkey, "initiator public key")?,
            nonce: fixed(nonce, "nonce")?,
            version: PROTOCOL_VERSION,
            rest: TrailingItems::new(),
        })
    }
}

/// Responder → initiator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub ephemeral_pubkey: [u8; PUBLIC_KEY_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub version: u64,
    pub rest: TrailingItems,
}

impl AuthResponse {
    pub fn new(ephemeral_pubkey: [u8; PUBLIC_KEY_LEN], nonce: [u8; NONCE_LEN]) -> Self {
        Self {
            ephemeral_pubkey,
            nonce,
            version: PROTOCOL_VERSION,
            rest: TrailingItems::new(),
        }
    }

    fn payload_length(&self) -> usize {
        self.ephemeral_pubkey[..].length()
            + self.nonce[..].length()
            + self.version.length()
            + self.rest.encoded_len()
    }

    /// Write the EIP-8 RLP list (without padding).
    pub fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.ephemeral_pubkey[..].encode(out);
        self.nonce[..].encode(out);
        self.version.encode(out);
        self.rest.encode(out);
    }

    pub fn to_rlp(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload_length() + 3);
        self.encode(&mut out);
        out
    }

    /// Decode the EIP-8 form. Bytes after the list are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut input = buf;
        let mut payload = take_list(&mut input)?;

        let ephemeral_pubkey = take_fixed::<PUBLIC_KEY_LEN>(&mut payload, "ephemeral public key")?;
        let nonce = take_fixed::<NONCE_LEN>(&mut payload, "nonce")?;
        let version = u64::decode(&mut payload)?;
        let rest = TrailingItems::decode(payload)?;

        Ok(Self {
            ephemeral_pubkey,
            nonce,
            version,
            rest,
        })
    }

    /// Fixed-offset pre-EIP-8 body, sent only in reply to a legacy auth.
    pub fn encode_legacy(&self) -> [u8; ACK_LEGACY_LEN] {
        let mut out = [0u8; ACK_LEGACY_LEN];
        out[..PUBLIC_KEY_LEN].copy_from_slice(&self.ephemeral_pubkey);
        out[PUBLIC_KEY_LEN..PUBLIC_KEY_LEN + NONCE_LEN].copy_from_slice(&self.nonce);
        out
    }

    pub fn decode_legacy(plain: &[u8]) -> Result<Self, WireError> {
        if plain.len() != ACK_LEGACY_LEN {
            return Err(WireError::Length {
                field: "legacy ack",
                expected: ACK_LEGACY_LEN,
                got: plain.len(),
            });
        }
        let (pubkey, rest) = plain.split_at(PUBLIC_KEY_LEN);
        let (nonce, _) = rest.split_at(NONCE_LEN);

        Ok(Self {
            ephemeral_pubkey: fixed(pubkey, "ephemeral public key")?,
            nonce: fixed(nonce, "nonce")?,
            version: PROTOCOL_VERSION,
            rest: TrailingItems::new(),
        })
    }
}
