//! Running Keccak-256 MAC over the frame stream.
//!
//! Each direction keeps one hash that absorbs every header and frame
//! ciphertext in order, so a tag depends on all traffic before it. Tags are
//! the first 16 bytes of the digest after an AES-256 whitening step keyed
//! with the session MAC secret.
//!
//! Verification runs on a copy of the hash and only commits when the tag
//! matches, so a forged tag leaves the state untouched.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes256;
use rlpx_core::{FRAME_HEADER_LEN, MAC_LEN};
use sha3::{Digest, Keccak256};

pub struct RunningMac {
    cipher: Aes256,
    hash: Keccak256,
}

impl RunningMac {
    /// Start from a hash already seeded by the handshake.
    pub fn new(mac_key: &[u8; 32], seed: Keccak256) -> Self {
        Self {
            cipher: Aes256::new(GenericArray::from_slice(mac_key)),
            hash: seed,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hash.update(data);
    }

    /// Current digest, without finalizing the running hash.
    pub fn digest(&self) -> [u8; 32] {
        digest_of(&self.hash)
    }

    /// Absorb an encrypted header and return its tag.
    pub fn header_tag(&mut self, header: &[u8; FRAME_HEADER_LEN]) -> [u8; MAC_LEN] {
        header_step(&self.cipher, &mut self.hash, header)
    }

    /// Absorb encrypted frame content and return its tag.
    pub fn frame_tag(&mut self, content: &[u8]) -> [u8; MAC_LEN] {
        frame_step(&self.cipher, &mut self.hash, content)
    }

    pub fn verify_header(&mut self, header: &[u8; FRAME_HEADER_LEN], tag: &[u8]) -> bool {
        let mut candidate = self.hash.clone();
        let expected = header_step(&self.cipher, &mut candidate, header);
        self.commit_if(candidate, &expected, tag)
    }

    pub fn verify_frame(&mut self, content: &[u8], tag: &[u8]) -> bool {
        let mut candidate = self.hash.clone();
        let expected = frame_step(&self.cipher, &mut candidate, content);
        self.commit_if(candidate, &expected, tag)
    }

    fn commit_if(&mut self, candidate: Keccak256, expected: &[u8], tag: &[u8]) -> bool {
        let ok = constant_time_eq(expected, tag);
        if ok {
            self.hash = candidate;
        }
        ok
    }
}

fn header_step(
    cipher: &Aes256,
    hash: &mut Keccak256,
    header: &[u8; FRAME_HEADER_LEN],
) -> [u8; MAC_LEN] {
    let sum = digest_of(hash);
    whiten(cipher, hash, &sum, header)
}

fn frame_step(cipher: &Aes256, hash: &mut Keccak256, content: &[u8]) -> [u8; MAC_LEN] {
    hash.update(content);
    let seed = digest_of(hash);
    let mut head = [0u8; 16];
    head.copy_from_slice(&seed[..16]);
    whiten(cipher, hash, &seed, &head)
}

/// `hash.update(AES(sum[..16]) ^ seed)`, then take the tag.
fn whiten(
    cipher: &Aes256,
    hash: &mut Keccak256,
    sum: &[u8; 32],
    seed: &[u8; 16],
) -> [u8; MAC_LEN] {
    let mut block = GenericArray::clone_from_slice(&sum[..16]);
    cipher.encrypt_block(&mut block);
    for (b, s) in block.iter_mut().zip(seed) {
        *b ^= s;
    }
    hash.update(block);

    let mut tag = [0u8; MAC_LEN];
    tag.copy_from_slice(&digest_of(hash)[..MAC_LEN]);
    tag
}

fn digest_of(hash: &Keccak256) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash.clone().finalize());
    out
}

/// Constant-time byte comparison for tags.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (lhs, rhs) in a.iter().zip(b.iter()) {
        diff |= lhs ^ rhs;
    }
    diff == 0
}
