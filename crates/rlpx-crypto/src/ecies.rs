//! ECIES envelopes for handshake messages.
//!
//! # Wire Format
//!
//! ```text
//! [R (65B)][IV (16B)][ciphertext][tag (32B)]
//! ```
//!
//! `R` is a fresh ephemeral public key. The ECDH x-coordinate goes through
//! the NIST SP 800-56 concatenation KDF (SHA-256, empty shared info) to give
//! a 16-byte AES-128-CTR key and, hashed once more, a 32-byte HMAC-SHA-256
//! key. The tag covers `IV || ciphertext || shared_mac_data`.

use aes::cipher::generic_array::GenericArray;
use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::curve::{Curve, CurveError, EphemeralKeypair};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type HmacSha256 = Hmac<Sha256>;

pub const IV_LEN: usize = 16;
pub const TAG_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum EciesError {
    #[error("envelope too short: {0} bytes")]
    TooShort(usize),

    #[error("invalid envelope key: {0}")]
    InvalidKey(#[from] CurveError),

    #[error("envelope authentication failed")]
    BadTag,
}

/// Bytes an envelope adds on top of the plaintext.
pub fn overhead<C: Curve>() -> usize {
    C::ENVELOPE_KEY_LEN + IV_LEN + TAG_LEN
}

/// Encrypt `plaintext` to `recipient`.
///
/// `shared_mac_data` is authenticated but not transmitted; the receiver must
/// supply the same bytes to [`open`].
pub fn seal<C: Curve, R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    recipient: &C::PublicKey,
    plaintext: &[u8],
    shared_mac_data: &[u8],
) -> Result<Vec<u8>, EciesError> {
    let ephemeral = EphemeralKeypair::<C>::generate(rng);
    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut iv);
    seal_with(ephemeral, &iv, recipient, plaintext, shared_mac_data)
}

fn seal_with<C: Curve>(
    ephemeral: EphemeralKeypair<C>,
    iv: &[u8; IV_LEN],
    recipient: &C::PublicKey,
    plaintext: &[u8],
    shared_mac_data: &[u8],
) -> Result<Vec<u8>, EciesError> {
    let mut out = Vec::with_capacity(overhead::<C>() + plaintext.len());
    out.extend_from_slice(&C::encode_envelope_key(ephemeral.public_key()));

    let (enc_key, mac_key) = derive_keys(&ephemeral.diffie_hellman(recipient));

    let body_start = out.len();
    out.extend_from_slice(iv);
    out.extend_from_slice(plaintext);
    let mut cipher = Aes128Ctr::new(
        GenericArray::from_slice(&enc_key[..]),
        GenericArray::from_slice(iv),
    );
    cipher.apply_keystream(&mut out[body_start + IV_LEN..]);

    let mut mac = HmacSha256::new_from_slice(&mac_key[..]).map_err(|_| EciesError::BadTag)?;
    mac.update(&out[body_start..]);
    mac.update(shared_mac_data);
    out.extend_from_slice(&mac.finalize().into_bytes());

    Ok(out)
}

/// Authenticate and decrypt an envelope.
///
/// The tag is checked in constant time before any decryption happens.
pub fn open<C: Curve>(
    secret: &C::SecretKey,
    envelope: &[u8],
    shared_mac_data: &[u8],
) -> Result<Vec<u8>, EciesError> {
    if envelope.len() < overhead::<C>() {
        return Err(EciesError::TooShort(envelope.len()));
    }

    let (key_bytes, rest) = envelope.split_at(C::ENVELOPE_KEY_LEN);
    let (body, tag) = rest.split_at(rest.len() - TAG_LEN);
    let ephemeral = C::decode_envelope_key(key_bytes)?;

    let (enc_key, mac_key) = derive_keys(&C::diffie_hellman(secret, &ephemeral));

    let mut mac = HmacSha256::new_from_slice(&mac_key[..]).map_err(|_| EciesError::BadTag)?;
    mac.update(body);
    mac.update(shared_mac_data);
    mac.verify_slice(tag).map_err(|_| EciesError::BadTag)?;

    let (iv, ciphertext) = body.split_at(IV_LEN);
    let mut plaintext = ciphertext.to_vec();
    let mut cipher = Aes128Ctr::new(
        GenericArray::from_slice(&enc_key[..]),
        GenericArray::from_slice(iv),
    );
    cipher.apply_keystream(&mut plaintext);
    Ok(plaintext)
}

/// Concatenation KDF with a single SHA-256 round, then the MAC key hash.
fn derive_keys(shared: &[u8; 32]) -> (Zeroizing<[u8; 16]>, Zeroizing<[u8; 32]>) {
    let mut hasher = Sha256::new();
    hasher.update(1u32.to_be_bytes());
    hasher.update(shared);
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&hasher.finalize());

    let mut enc_key = Zeroizing::new([0u8; 16]);
    enc_key.copy_from_slice(&key[..16]);
    let mut mac_key = Zeroizing::new([0u8; 32]);
    mac_key.copy_from_slice(&Sha256::digest(&key[16..]));

    (enc_key, mac_key)
}
