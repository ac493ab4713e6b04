//! Core RLPx wire types, framing, and constants.
//!
//! This crate provides:
//! - Handshake messages (`AuthMessage`, `AuthResponse`) in EIP-8 and legacy form
//! - Opaque trailing items for forward-compatible decoding
//! - The 16-byte frame header and frame content encoding
//!
//! Nothing in here touches key material. Encryption, MAC state and the
//! handshake engine live in `rlpx-crypto`.

#![forbid(unsafe_code)]

pub mod frame;
pub mod handshake;
mod rlp;

pub use frame::{decode_content, encode_content, padded_len, FrameHeader};
pub use handshake::{AuthMessage, AuthResponse, TrailingItems};

/// Handshake version advertised by this implementation.
pub const PROTOCOL_VERSION: u64 = 4;

/// Length of a handshake nonce.
pub const NONCE_LEN: usize = 32;

/// Length of a node public key on the wire (uncompressed point without the 0x04 tag).
pub const PUBLIC_KEY_LEN: usize = 64;

/// Length of a recoverable signature on the wire: `[R (32B)][S (32B)][V (1B)]`.
pub const SIGNATURE_LEN: usize = 65;

/// Plaintext size of a pre-EIP-8 auth message:
/// [Signature (65B)][Keccak(ephemeral) (32B)][PublicKey (64B)][Nonce (32B)][0x00]
pub const AUTH_LEGACY_LEN: usize = SIGNATURE_LEN + 32 + PUBLIC_KEY_LEN + NONCE_LEN + 1;

/// Plaintext size of a pre-EIP-8 ack message:
/// [EphemeralKey (64B)][Nonce (32B)][0x00]
pub const ACK_LEGACY_LEN: usize = PUBLIC_KEY_LEN + NONCE_LEN + 1;

/// Size of the encrypted frame header.
pub const FRAME_HEADER_LEN: usize = 16;

/// Size of the header and frame MAC tags.
pub const MAC_LEN: usize = 16;

/// Largest frame size expressible in the 3-byte header length field.
pub const MAX_FRAME_SIZE: usize = 0xFF_FFFF;

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("rlp: {0}")]
    Rlp(#[from] alloy_rlp::Error),
    #[error("input too short: {0} bytes")]
    TooShort(usize),
    #[error("unexpected {field} length: expected {expected}, got {got}")]
    Length {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("expected rlp {0}")]
    Unexpected(&'static str),
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),
    #[error("frame header data does not fit in the header")]
    HeaderDataTooLarge,
}
